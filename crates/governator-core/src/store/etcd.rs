//! etcd v2 keys API adapter.

use anyhow::Context;
use serde::Deserialize;
use url::Url;

use super::ConfigStore;
use crate::error::{DeployError, Result};
use crate::http::BlockingHttp;

/// Error document returned by etcd for rejected requests.
#[derive(Debug, Deserialize)]
struct EtcdErrorBody {
    #[serde(rename = "errorCode")]
    error_code: u32,
    message: String,
    #[serde(default)]
    cause: Option<String>,
}

/// Configuration store writing through `PUT /v2/keys/<key>`.
#[derive(Debug, Clone)]
pub struct EtcdConfigStore {
    base: Url,
    http: BlockingHttp,
}

impl EtcdConfigStore {
    pub fn new(uri: &str, http: BlockingHttp) -> anyhow::Result<Self> {
        let base = Url::parse(uri).with_context(|| format!("Invalid etcd URI: {}", uri))?;
        if base.cannot_be_a_base() {
            anyhow::bail!("Invalid etcd URI: {}", uri);
        }
        Ok(Self { base, http })
    }

    /// URL of `key` in the v2 keys namespace. Segments are percent-encoded.
    pub fn key_url(&self, key: &str) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .push("v2")
                .push("keys")
                .extend(key.split('/').filter(|s| !s.is_empty()));
        }
        url
    }

    async fn put(&self, url: Url, key: &str, value: &str) -> Result<()> {
        let response = self
            .http
            .client()
            .put(url.clone())
            .form(&[("value", value)])
            .send()
            .await
            .map_err(|e| DeployError::config_store(key, e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        let reason = match serde_json::from_str::<EtcdErrorBody>(&body) {
            Ok(EtcdErrorBody {
                error_code,
                message,
                cause: Some(cause),
            }) => format!("etcd error {}: {} ({})", error_code, message, cause),
            Ok(EtcdErrorBody {
                error_code,
                message,
                cause: None,
            }) => format!("etcd error {}: {}", error_code, message),
            Err(_) => format!("HTTP {} from {}", status, url),
        };
        Err(DeployError::config_store(key, reason))
    }
}

impl ConfigStore for EtcdConfigStore {
    fn set(&self, key: &str, value: &str) -> Result<()> {
        let url = self.key_url(key);
        tracing::debug!(%url, "etcd set");
        self.http.block_on(self.put(url, key, value))
    }
}
