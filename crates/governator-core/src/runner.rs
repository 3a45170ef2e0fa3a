//! Poll loop driving the coordinator.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::coordinator::{Deployer, StepOutcome};
use crate::error::DeployError;
use crate::queue::QueueStore;
use crate::store::ConfigStore;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Cloneable flag asking the poll loop to stop after the current step.
///
/// Waiters blocked in [`ShutdownSignal::wait_timeout`] wake as soon as the
/// signal is triggered.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal(Arc<(Mutex<bool>, Condvar)>);

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        let (_, wake) = &*self.0;
        *self.flag() = true;
        wake.notify_all();
    }

    pub fn is_triggered(&self) -> bool {
        *self.flag()
    }

    /// Block until triggered or until `timeout` elapses. Returns whether the
    /// signal was triggered.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let (_, wake) = &*self.0;
        let (triggered, _) = wake
            .wait_timeout_while(self.flag(), timeout, |triggered| !*triggered)
            .unwrap_or_else(PoisonError::into_inner);
        *triggered
    }

    fn flag(&self) -> MutexGuard<'_, bool> {
        let (flag, _) = &*self.0;
        flag.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Counters for a loop that stopped on request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub steps: u64,
    pub applied: u64,
}

/// A step failure together with what the loop did before it.
#[derive(Debug, thiserror::Error)]
#[error("deploy step {step} failed: {source}")]
pub struct RunError {
    pub step: u64,
    pub summary: RunSummary,
    #[source]
    pub source: DeployError,
}

/// Calls [`Deployer::process_once`] on a fixed interval until shut down.
///
/// An in-flight step always completes. The first step error ends the loop;
/// the caller decides what to do with it.
#[derive(Debug)]
pub struct Runner {
    interval: Duration,
    shutdown: ShutdownSignal,
}

impl Runner {
    pub fn new(interval: Duration, shutdown: ShutdownSignal) -> Self {
        Self { interval, shutdown }
    }

    pub fn run<Q: QueueStore, C: ConfigStore>(
        &self,
        deployer: &mut Deployer<Q, C>,
    ) -> Result<RunSummary, RunError> {
        let mut summary = RunSummary::default();

        while !self.shutdown.is_triggered() {
            tracing::trace!(step = summary.steps + 1, "process_once");
            match deployer.process_once() {
                Ok(outcome) => {
                    summary.steps += 1;
                    if let StepOutcome::Applied(_) = outcome {
                        summary.applied += 1;
                    }
                }
                Err(source) => {
                    return Err(RunError {
                        step: summary.steps + 1,
                        summary,
                        source,
                    });
                }
            }

            self.shutdown.wait_timeout(self.interval);
        }

        Ok(summary)
    }
}

impl Default for Runner {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL, ShutdownSignal::new())
    }
}
