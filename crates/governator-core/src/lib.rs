//! Governator Core Library
//!
//! Consumes due deploy requests from a Redis queue and applies them to etcd,
//! optionally reporting each finished deploy to a deploy-state service.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod http;
pub mod notify;
pub mod queue;
pub mod request;
pub mod runner;
pub mod store;

/// Re-exports of commonly used types
pub mod prelude {
    // Configuration
    pub use crate::config::{GovernatorConfig, NotifierConfig, ResolvedConfig, Setting};

    // Coordinator
    pub use crate::coordinator::{
        AppliedDeploy, Clock, Deployer, IdleReason, StepOutcome, SystemClock,
    };
    pub use crate::runner::{RunError, RunSummary, Runner, ShutdownSignal};

    // Stores and notification
    pub use crate::notify::{DeployStateNotifier, StatusNotifier};
    pub use crate::queue::{QueueKeys, QueueStore, RedisQueueStore};
    pub use crate::store::{ConfigStore, EtcdConfigStore};

    // Data model
    pub use crate::error::DeployError;
    pub use crate::request::{ImageReference, RequestMetadata, release_version};
}
