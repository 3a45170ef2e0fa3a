//! In-memory stand-ins for the queue store, config store and notifier.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use chrono::{DateTime, TimeZone, Utc};
use governator_core::coordinator::Clock;
use governator_core::error::{DeployError, Result};
use governator_core::notify::StatusNotifier;
use governator_core::queue::{QueueKeys, QueueStore};
use governator_core::request::ImageReference;
use governator_core::runner::ShutdownSignal;
use governator_core::store::ConfigStore;

pub const QUEUE: &str = "redis-queue:name";

pub fn keys() -> QueueKeys {
    QueueKeys::new(QUEUE)
}

pub fn metadata_json(etcd_dir: &str, docker_url: &str) -> Vec<u8> {
    format!(r#"{{"etcdDir":"{}", "dockerUrl":"{}"}}"#, etcd_dir, docker_url).into_bytes()
}

/// Fixed point in time; due scores are compared against its Unix seconds.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    pub fn at_unix(secs: i64) -> Self {
        Self(Utc.timestamp_opt(secs, 0).unwrap())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Sorted set and hashes kept in memory, with an operation log.
#[derive(Debug, Default)]
pub struct FakeQueue {
    members: Vec<(String, i64)>,
    hashes: HashMap<String, HashMap<String, Vec<u8>>>,
    /// Operations performed, as `"<COMMAND> <key>"`.
    pub calls: Vec<String>,
    /// `limit` passed to every range query.
    pub range_limits: Vec<usize>,
    fail: HashMap<&'static str, String>,
    lose_claims: bool,
}

impl FakeQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue `handle` the way a producer does.
    pub fn enqueue(&mut self, handle: &str, due: i64, metadata: Option<Vec<u8>>) -> &mut Self {
        self.members.push((handle.to_string(), due));
        if let Some(payload) = metadata {
            self.set_field(handle, QueueKeys::METADATA_FIELD, payload);
        }
        self
    }

    pub fn cancel(&mut self, handle: &str) -> &mut Self {
        self.set_field(handle, QueueKeys::CANCELLATION_FIELD, b"true".to_vec());
        self
    }

    pub fn set_field(&mut self, handle: &str, field: &str, value: Vec<u8>) {
        self.hashes
            .entry(keys().request_key(handle))
            .or_default()
            .insert(field.to_string(), value);
    }

    /// Make `command` fail with `message`.
    pub fn fail_on(&mut self, command: &'static str, message: &str) -> &mut Self {
        self.fail.insert(command, message.to_string());
        self
    }

    /// Another worker removes every handle just before this one tries to.
    pub fn lose_claims(&mut self) -> &mut Self {
        self.lose_claims = true;
        self
    }

    pub fn pending(&self) -> Vec<&str> {
        self.members.iter().map(|(h, _)| h.as_str()).collect()
    }

    pub fn commands(&self) -> Vec<&str> {
        self.calls
            .iter()
            .map(|c| c.split(' ').next().unwrap_or_default())
            .collect()
    }

    fn record(&mut self, command: &'static str, key: &str) -> Result<()> {
        self.calls.push(format!("{} {}", command, key));
        match self.fail.get(command) {
            Some(message) => Err(DeployError::queue_store(command, message.clone())),
            None => Ok(()),
        }
    }
}

impl QueueStore for FakeQueue {
    fn range_by_score(
        &mut self,
        set_key: &str,
        min: i64,
        max: i64,
        limit: usize,
    ) -> Result<Vec<String>> {
        self.record("ZRANGEBYSCORE", set_key)?;
        self.range_limits.push(limit);
        assert_eq!(set_key, keys().deploys_key());
        let mut due: Vec<&(String, i64)> = self
            .members
            .iter()
            .filter(|(_, score)| *score >= min && *score <= max)
            .collect();
        due.sort_by_key(|(_, score)| *score);
        Ok(due.into_iter().take(limit).map(|(h, _)| h.clone()).collect())
    }

    fn remove(&mut self, set_key: &str, member: &str) -> Result<u64> {
        self.record("ZREM", set_key)?;
        let before = self.members.len();
        self.members.retain(|(h, _)| h != member);
        if self.lose_claims {
            return Ok(0);
        }
        Ok((before - self.members.len()) as u64)
    }

    fn field_exists(&mut self, key: &str, field: &str) -> Result<bool> {
        self.record("HEXISTS", key)?;
        Ok(self.hashes.get(key).is_some_and(|h| h.contains_key(field)))
    }

    fn get_field(&mut self, key: &str, field: &str) -> Result<Option<Vec<u8>>> {
        self.record("HGET", key)?;
        Ok(self.hashes.get(key).and_then(|h| h.get(field).cloned()))
    }
}

/// Records every `set`; optionally fails the n-th write (zero based).
#[derive(Debug, Default)]
pub struct FakeEtcd {
    pub sets: RefCell<Vec<(String, String)>>,
    fail_at: Option<(usize, String)>,
}

impl FakeEtcd {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_at(index: usize, message: &str) -> Self {
        Self {
            sets: RefCell::default(),
            fail_at: Some((index, message.to_string())),
        }
    }

    pub fn sets(&self) -> Vec<(String, String)> {
        self.sets.borrow().clone()
    }
}

impl ConfigStore for FakeEtcd {
    fn set(&self, key: &str, value: &str) -> Result<()> {
        let index = self.sets.borrow().len();
        self.sets
            .borrow_mut()
            .push((key.to_string(), value.to_string()));
        match &self.fail_at {
            Some((at, message)) if *at == index => {
                Err(DeployError::config_store(key, message.clone()))
            }
            _ => Ok(()),
        }
    }
}

/// Notifier that records images and answers with a fixed status.
#[derive(Debug, Clone)]
pub struct FakeNotifier {
    pub images: Rc<RefCell<Vec<ImageReference>>>,
    status: u16,
    stop_after: Option<(usize, ShutdownSignal)>,
}

impl FakeNotifier {
    pub fn responding(status: u16) -> Self {
        Self {
            images: Rc::default(),
            status,
            stop_after: None,
        }
    }

    /// Trigger `signal` once `count` notifications have been received.
    pub fn stop_after(mut self, count: usize, signal: ShutdownSignal) -> Self {
        self.stop_after = Some((count, signal));
        self
    }

    pub fn images(&self) -> Vec<ImageReference> {
        self.images.borrow().clone()
    }
}

impl StatusNotifier for FakeNotifier {
    fn deployment_passed(&self, image: &ImageReference) -> Result<()> {
        self.images.borrow_mut().push(image.clone());
        if let Some((count, signal)) = &self.stop_after
            && self.images.borrow().len() >= *count
        {
            signal.trigger();
        }
        if self.status > 399 {
            return Err(DeployError::NotifyRejected {
                url: format!("http://deploy-state/{}", image.passed_path("test")),
                status: self.status,
            });
        }
        Ok(())
    }
}
