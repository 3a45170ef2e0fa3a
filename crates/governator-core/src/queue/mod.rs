//! Queue store: the time-ordered due set plus per-request hashes.
//!
//! The producer adds a handle to the due set with its due time as score and
//! stores the request metadata in a hash named after the handle. Removing a
//! handle from the due set is the claim: only one caller sees a non-zero
//! removal count for it.

pub mod redis;

pub use self::redis::RedisQueueStore;

use crate::error::Result;

/// Capabilities the coordinator needs from the queue store.
///
/// Methods take `&mut self` because implementations hold a single
/// long-lived connection.
pub trait QueueStore {
    /// Up to `limit` members of `set_key` with `min <= score <= max`,
    /// ascending by score.
    fn range_by_score(
        &mut self,
        set_key: &str,
        min: i64,
        max: i64,
        limit: usize,
    ) -> Result<Vec<String>>;

    /// Remove `member` from `set_key`, returning how many members were removed.
    fn remove(&mut self, set_key: &str, member: &str) -> Result<u64>;

    fn field_exists(&mut self, key: &str, field: &str) -> Result<bool>;

    fn get_field(&mut self, key: &str, field: &str) -> Result<Option<Vec<u8>>>;
}

impl<T: QueueStore + ?Sized> QueueStore for Box<T> {
    fn range_by_score(
        &mut self,
        set_key: &str,
        min: i64,
        max: i64,
        limit: usize,
    ) -> Result<Vec<String>> {
        (**self).range_by_score(set_key, min, max, limit)
    }

    fn remove(&mut self, set_key: &str, member: &str) -> Result<u64> {
        (**self).remove(set_key, member)
    }

    fn field_exists(&mut self, key: &str, field: &str) -> Result<bool> {
        (**self).field_exists(key, field)
    }

    fn get_field(&mut self, key: &str, field: &str) -> Result<Option<Vec<u8>>> {
        (**self).get_field(key, field)
    }
}

/// Key layout of one named queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueKeys {
    queue_name: String,
}

impl QueueKeys {
    /// Hash field set by the producer to cancel a pending request.
    pub const CANCELLATION_FIELD: &'static str = "cancellation";
    /// Hash field holding the JSON request metadata.
    pub const METADATA_FIELD: &'static str = "request:metadata";

    pub fn new(queue_name: impl Into<String>) -> Self {
        Self {
            queue_name: queue_name.into(),
        }
    }

    /// Sorted set of pending handles scored by due time.
    pub fn deploys_key(&self) -> String {
        self.key("governator:deploys")
    }

    /// Hash holding the cancellation flag and metadata for `handle`.
    pub fn request_key(&self, handle: &str) -> String {
        self.key(handle)
    }

    fn key(&self, suffix: &str) -> String {
        format!("{}:{}", self.queue_name, suffix)
    }
}
