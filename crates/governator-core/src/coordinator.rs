//! Deploy coordinator: find, claim, validate and apply one due request.
//!
//! A processing step touches at most one queue entry:
//!
//! 1. take the earliest member of the due set whose score is at most `now`
//! 2. claim it by removing it from the due set; a zero removal count means
//!    another worker got there first
//! 3. skip it if the producer set the cancellation field
//! 4. read and decode its metadata
//! 5. write docker url, release tag and restart trigger into the config store
//! 6. tell the deploy-state service, when one is configured
//!
//! Once claimed, a request is never put back. A failure in 4-6 surfaces to
//! the caller and leaves whatever was already written in place.

use chrono::{DateTime, Utc};

use crate::error::{DeployError, Result};
use crate::notify::StatusNotifier;
use crate::queue::{QueueKeys, QueueStore};
use crate::request::{ConfigWriteSet, ImageReference, RequestMetadata};
use crate::store::ConfigStore;

/// Source of the current time.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Why a step finished without applying anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleReason {
    /// No member of the due set has come due.
    NothingDue,
    /// Another worker removed the handle first.
    LostClaim,
    /// The request was cancelled before it was processed.
    Cancelled,
}

/// A request that was fully applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedDeploy {
    pub handle: String,
    pub metadata: RequestMetadata,
    /// Whether the deploy-state service was told.
    pub notified: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Applied(AppliedDeploy),
    Idle(IdleReason),
}

impl StepOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, StepOutcome::Applied(_))
    }
}

/// Runs the dequeue, claim, validate, apply sequence against its stores.
pub struct Deployer<Q, C> {
    queue: Q,
    config: C,
    notifier: Option<Box<dyn StatusNotifier>>,
    keys: QueueKeys,
    clock: Box<dyn Clock>,
}

impl<Q: QueueStore, C: ConfigStore> Deployer<Q, C> {
    pub fn new(queue: Q, config: C, keys: QueueKeys) -> Self {
        Self {
            queue,
            config,
            notifier: None,
            keys,
            clock: Box::new(SystemClock),
        }
    }

    /// Notify `notifier` after every fully applied request.
    pub fn with_notifier(mut self, notifier: impl StatusNotifier + 'static) -> Self {
        self.notifier = Some(Box::new(notifier));
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn queue(&self) -> &Q {
        &self.queue
    }

    /// Process at most one due request.
    ///
    /// Idle conditions return `Ok(StepOutcome::Idle(_))`. Every error is
    /// returned as-is; nothing is retried.
    pub fn process_once(&mut self) -> Result<StepOutcome> {
        let Some(handle) = self.next_due()? else {
            return Ok(StepOutcome::Idle(IdleReason::NothingDue));
        };

        let span = tracing::debug_span!("deploy", handle = %handle);
        let _guard = span.enter();

        if !self.claim(&handle)? {
            tracing::debug!("failed to obtain lock");
            return Ok(StepOutcome::Idle(IdleReason::LostClaim));
        }

        if self.is_cancelled(&handle)? {
            tracing::info!("deploy was cancelled");
            return Ok(StepOutcome::Idle(IdleReason::Cancelled));
        }

        let metadata = self.metadata(&handle)?;
        let notified = self.deploy(&metadata)?;

        tracing::info!(
            etcd_dir = %metadata.etcd_dir,
            docker_url = %metadata.docker_url,
            notified,
            "deploy applied"
        );

        Ok(StepOutcome::Applied(AppliedDeploy {
            handle,
            metadata,
            notified,
        }))
    }

    fn next_due(&mut self) -> Result<Option<String>> {
        let now = self.clock.now().timestamp();
        let set_key = self.keys.deploys_key();
        let due = self.queue.range_by_score(&set_key, 0, now, 1)?;
        Ok(due.into_iter().next())
    }

    fn claim(&mut self, handle: &str) -> Result<bool> {
        tracing::debug!("lock deploy");
        let removed = self.queue.remove(&self.keys.deploys_key(), handle)?;
        Ok(removed != 0)
    }

    fn is_cancelled(&mut self, handle: &str) -> Result<bool> {
        tracing::debug!("validate deploy");
        self.queue
            .field_exists(&self.keys.request_key(handle), QueueKeys::CANCELLATION_FIELD)
    }

    fn metadata(&mut self, handle: &str) -> Result<RequestMetadata> {
        tracing::debug!("get metadata");
        let payload = self
            .queue
            .get_field(&self.keys.request_key(handle), QueueKeys::METADATA_FIELD)?
            .ok_or_else(|| DeployError::MetadataNotFound {
                handle: handle.to_string(),
            })?;
        RequestMetadata::from_payload(handle, &payload)
    }

    /// Apply the write set, stopping at the first failed write, then notify.
    fn deploy(&self, metadata: &RequestMetadata) -> Result<bool> {
        let writes = ConfigWriteSet::for_request(metadata, self.clock.now());
        for (key, value) in writes.iter() {
            self.config.set(key, value)?;
        }

        let Some(notifier) = &self.notifier else {
            return Ok(false);
        };
        let image = ImageReference::parse(&metadata.docker_url)?;
        notifier.deployment_passed(&image)?;
        Ok(true)
    }
}

impl<Q, C> std::fmt::Debug for Deployer<Q, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deployer")
            .field("keys", &self.keys)
            .field("notifier", &self.notifier.is_some())
            .finish_non_exhaustive()
    }
}
