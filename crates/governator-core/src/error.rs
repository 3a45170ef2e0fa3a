//! Error taxonomy for a single processing step.

use thiserror::Error;

/// Boxed error produced by a store or notifier implementation.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T, E = DeployError> = std::result::Result<T, E>;

/// Everything that can fail a processing step.
///
/// Idle conditions (nothing due, lost claim, cancellation) are not errors and
/// never appear here.
#[derive(Debug, Error)]
pub enum DeployError {
    /// A read or write against the queue store failed.
    #[error("queue store {operation} failed: {source}")]
    QueueStore {
        operation: &'static str,
        #[source]
        source: BoxError,
    },

    /// The handle was claimed but its request hash holds no metadata.
    #[error("Deploy metadata not found for '{handle}'")]
    MetadataNotFound { handle: String },

    /// The metadata payload could not be decoded.
    #[error("invalid deploy metadata for '{handle}': {source}")]
    InvalidMetadata {
        handle: String,
        #[source]
        source: serde_json::Error,
    },

    /// A configuration store write failed. Earlier writes are not rolled back.
    #[error("failed to set '{key}': {source}")]
    ConfigStore {
        key: String,
        #[source]
        source: BoxError,
    },

    /// The image reference does not split into `<repository>:<tag>`.
    #[error("invalid docker url: '{docker_url}'")]
    InvalidDockerUrl { docker_url: String },

    /// The repository part is neither `owner/repo` nor `registry/owner/repo`.
    #[error("invalid base docker url: '{docker_url}'")]
    InvalidBaseDockerUrl { docker_url: String },

    /// The status notifier could not be reached.
    #[error("failed to notify deploy-state-service at {url}: {source}")]
    Notify {
        url: String,
        #[source]
        source: BoxError,
    },

    /// The status notifier answered with a status of 400 or above.
    #[error("invalid response from deploy-state-service: HTTP {status} from {url}")]
    NotifyRejected { url: String, status: u16 },
}

impl DeployError {
    pub fn queue_store(operation: &'static str, source: impl Into<BoxError>) -> Self {
        Self::QueueStore {
            operation,
            source: source.into(),
        }
    }

    pub fn config_store(key: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::ConfigStore {
            key: key.into(),
            source: source.into(),
        }
    }

    /// True for errors caused by malformed request data rather than a
    /// failing dependency.
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            Self::MetadataNotFound { .. }
                | Self::InvalidMetadata { .. }
                | Self::InvalidDockerUrl { .. }
                | Self::InvalidBaseDockerUrl { .. }
        )
    }
}
