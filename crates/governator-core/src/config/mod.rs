//! Process configuration
//!
//! Values come from three layers, highest precedence first:
//! - command line flags and their environment variables
//! - `governator.toml`
//! - built-in defaults

pub mod parser;
pub mod paths;

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub use parser::{load_config_file, parse_config, parse_config_str};
pub use paths::{CONFIG_FILE_NAME, config_path_in, default_config_path};

use crate::runner::DEFAULT_POLL_INTERVAL;

/// A configurable value and the ways to supply it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Setting {
    EtcdUri,
    RedisUri,
    RedisQueue,
    DeployStateUri,
    Cluster,
    PollIntervalMs,
}

impl Setting {
    /// Long flag name, also the key in governator.toml
    pub fn flag(self) -> &'static str {
        match self {
            Setting::EtcdUri => "etcd-uri",
            Setting::RedisUri => "redis-uri",
            Setting::RedisQueue => "redis-queue",
            Setting::DeployStateUri => "deploy-state-uri",
            Setting::Cluster => "cluster",
            Setting::PollIntervalMs => "poll-interval-ms",
        }
    }

    pub fn env_var(self) -> &'static str {
        match self {
            Setting::EtcdUri => "GOVERNATOR_ETCD_URI",
            Setting::RedisUri => "GOVERNATOR_REDIS_URI",
            Setting::RedisQueue => "GOVERNATOR_REDIS_QUEUE",
            Setting::DeployStateUri => "GOVERNATOR_DEPLOY_STATE_URI",
            Setting::Cluster => "GOVERNATOR_CLUSTER",
            Setting::PollIntervalMs => "GOVERNATOR_POLL_INTERVAL_MS",
        }
    }
}

impl std::fmt::Display for Setting {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "--{} or {}", self.flag(), self.env_var())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required settings: {}", join_settings(.0))]
    Missing(Vec<Setting>),

    #[error("invalid {setting} '{value}': {source}")]
    InvalidUri {
        setting: &'static str,
        value: String,
        #[source]
        source: url::ParseError,
    },

    #[error("--cluster or GOVERNATOR_CLUSTER is required when a deploy-state URI is set")]
    MissingCluster,

    #[error("poll interval must be greater than zero")]
    ZeroPollInterval,
}

fn join_settings(settings: &[Setting]) -> String {
    settings
        .iter()
        .map(|s| s.flag())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Unvalidated configuration as read from any one layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct GovernatorConfig {
    /// etcd server to deploy to
    #[serde(default)]
    pub etcd_uri: Option<String>,

    /// Redis server to pull deployments from
    #[serde(default)]
    pub redis_uri: Option<String>,

    /// Redis queue to pull deployments from
    #[serde(default)]
    pub redis_queue: Option<String>,

    /// Deploy-state service to notify after a deploy
    #[serde(default)]
    pub deploy_state_uri: Option<String>,

    /// Cluster name reported to the deploy-state service
    #[serde(default)]
    pub cluster: Option<String>,

    #[serde(default)]
    pub poll_interval_ms: Option<u64>,
}

impl GovernatorConfig {
    /// Overlay `other` on top of this config. Set values in `other` win.
    pub fn merge(&mut self, other: GovernatorConfig) {
        fn overlay<T>(base: &mut Option<T>, top: Option<T>) {
            if top.is_some() {
                *base = top;
            }
        }

        overlay(&mut self.etcd_uri, other.etcd_uri);
        overlay(&mut self.redis_uri, other.redis_uri);
        overlay(&mut self.redis_queue, other.redis_queue);
        overlay(&mut self.deploy_state_uri, other.deploy_state_uri);
        overlay(&mut self.cluster, other.cluster);
        overlay(&mut self.poll_interval_ms, other.poll_interval_ms);
    }

    /// Required settings that are absent or empty.
    pub fn missing(&self) -> Vec<Setting> {
        let required = [
            (Setting::EtcdUri, &self.etcd_uri),
            (Setting::RedisUri, &self.redis_uri),
            (Setting::RedisQueue, &self.redis_queue),
        ];
        required
            .into_iter()
            .filter(|(_, value)| value.as_deref().is_none_or(str::is_empty))
            .map(|(setting, _)| setting)
            .collect()
    }

    /// Check the merged configuration and resolve defaults.
    pub fn validate(&self) -> Result<ResolvedConfig, ConfigError> {
        let missing = self.missing();
        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        let etcd_uri = required(&self.etcd_uri);
        let redis_uri = required(&self.redis_uri);
        check_uri(Setting::EtcdUri, &etcd_uri)?;
        check_uri(Setting::RedisUri, &redis_uri)?;

        let notifier = match self.deploy_state_uri.as_deref().filter(|s| !s.is_empty()) {
            Some(base_uri) => {
                check_uri(Setting::DeployStateUri, base_uri)?;
                let cluster = self
                    .cluster
                    .clone()
                    .filter(|c| !c.is_empty())
                    .ok_or(ConfigError::MissingCluster)?;
                Some(NotifierConfig {
                    base_uri: base_uri.to_string(),
                    cluster,
                })
            }
            None => None,
        };

        let poll_interval = match self.poll_interval_ms {
            Some(0) => return Err(ConfigError::ZeroPollInterval),
            Some(ms) => Duration::from_millis(ms),
            None => DEFAULT_POLL_INTERVAL,
        };

        Ok(ResolvedConfig {
            etcd_uri,
            redis_uri,
            redis_queue: required(&self.redis_queue),
            notifier,
            poll_interval,
        })
    }
}

fn required(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn check_uri(setting: Setting, value: &str) -> Result<(), ConfigError> {
    Url::parse(value)
        .map(|_| ())
        .map_err(|source| ConfigError::InvalidUri {
            setting: setting.flag(),
            value: value.to_string(),
            source,
        })
}

/// Deploy-state service endpoint and the cluster it is told about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifierConfig {
    pub base_uri: String,
    pub cluster: String,
}

/// Validated configuration ready for wiring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub etcd_uri: String,
    pub redis_uri: String,
    pub redis_queue: String,
    pub notifier: Option<NotifierConfig>,
    pub poll_interval: Duration,
}
