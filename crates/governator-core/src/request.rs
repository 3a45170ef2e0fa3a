//! Deploy request metadata and the values derived from it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DeployError, Result};

/// Metadata stored by the producer under a request's hash.
///
/// Unknown fields are ignored. Empty values are accepted and written through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestMetadata {
    /// Configuration store namespace, e.g. `/octoblu/my-application`
    #[serde(rename = "etcdDir")]
    pub etcd_dir: String,

    /// Image reference, `<registry>/<owner>/<repo>:<tag>` or `<owner>/<repo>:<tag>`
    #[serde(rename = "dockerUrl")]
    pub docker_url: String,
}

impl RequestMetadata {
    pub fn new(etcd_dir: impl Into<String>, docker_url: impl Into<String>) -> Self {
        Self {
            etcd_dir: etcd_dir.into(),
            docker_url: docker_url.into(),
        }
    }

    /// Decode the JSON payload read from the queue store.
    pub fn from_payload(handle: &str, payload: &[u8]) -> Result<Self> {
        serde_json::from_slice(payload).map_err(|source| DeployError::InvalidMetadata {
            handle: handle.to_string(),
            source,
        })
    }

    pub fn release_version(&self) -> &str {
        release_version(&self.docker_url)
    }
}

/// Release tag of an image reference: everything after the last `:`.
///
/// A reference without a `:` is returned whole.
pub fn release_version(docker_url: &str) -> &str {
    match docker_url.rsplit_once(':') {
        Some((_, tag)) => tag,
        None => docker_url,
    }
}

/// An image reference split into the parts the deploy-state service keys on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    pub owner: String,
    pub repo: String,
    pub tag: String,
}

impl ImageReference {
    /// Parse `owner/repo:tag` or `registry/owner/repo:tag`.
    ///
    /// The registry segment is dropped. A reference with a port in the
    /// registry (a second `:`) is rejected.
    pub fn parse(docker_url: &str) -> Result<Self> {
        let parts: Vec<&str> = docker_url.split(':').collect();
        if parts.len() != 2 {
            return Err(DeployError::InvalidDockerUrl {
                docker_url: docker_url.to_string(),
            });
        }
        let (repository, tag) = (parts[0], parts[1]);

        let project: Vec<&str> = repository.split('/').collect();
        let (owner, repo) = match project.as_slice() {
            [owner, repo] => (*owner, *repo),
            [_registry, owner, repo] => (*owner, *repo),
            _ => {
                return Err(DeployError::InvalidBaseDockerUrl {
                    docker_url: docker_url.to_string(),
                });
            }
        };

        Ok(Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            tag: tag.to_string(),
        })
    }

    /// Path below the deploy-state base URI that marks this image as passed.
    pub fn passed_path(&self, cluster: &str) -> String {
        format!(
            "deployments/{}/{}/{}/cluster/{}/passed",
            self.owner, self.repo, self.tag, cluster
        )
    }
}

/// Configuration store key under a request's namespace.
pub fn namespaced_key(etcd_dir: &str, name: &str) -> String {
    format!("{}/{}", etcd_dir, name)
}

/// The ordered writes that apply one deploy request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWriteSet {
    writes: Vec<(String, String)>,
}

impl ConfigWriteSet {
    pub const DOCKER_URL: &'static str = "docker_url";
    pub const SENTRY_RELEASE: &'static str = "env/SENTRY_RELEASE";
    pub const RESTART: &'static str = "restart";

    /// Image, release tag, then restart trigger. The restart value changes on
    /// every apply; that change is what restarts the service.
    pub fn for_request(metadata: &RequestMetadata, restarted_at: DateTime<Utc>) -> Self {
        let dir = &metadata.etcd_dir;
        Self {
            writes: vec![
                (
                    namespaced_key(dir, Self::DOCKER_URL),
                    metadata.docker_url.clone(),
                ),
                (
                    namespaced_key(dir, Self::SENTRY_RELEASE),
                    metadata.release_version().to_string(),
                ),
                (namespaced_key(dir, Self::RESTART), restarted_at.to_string()),
            ],
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.writes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_release_version_takes_last_segment() {
        assert_eq!(release_version("registry.example.com/org/app:1.2.3"), "1.2.3");
        assert_eq!(release_version("docker_url:version"), "version");
        assert_eq!(release_version("localhost:5000/org/app:v2"), "v2");
    }

    #[test]
    fn test_release_version_without_tag_is_whole_string() {
        assert_eq!(release_version("octoblu/app"), "octoblu/app");
        assert_eq!(release_version(""), "");
    }

    #[test]
    fn test_metadata_ignores_unknown_fields() {
        let payload = br#"{"etcdDir":"/octoblu/app", "dockerUrl":"docker_url:version", "extra":1}"#;
        let metadata = RequestMetadata::from_payload("h", payload).unwrap();
        assert_eq!(
            metadata,
            RequestMetadata::new("/octoblu/app", "docker_url:version")
        );
    }

    #[test]
    fn test_metadata_accepts_empty_values() {
        let metadata =
            RequestMetadata::from_payload("h", br#"{"etcdDir":"","dockerUrl":""}"#).unwrap();
        assert_eq!(metadata.etcd_dir, "");
        assert_eq!(metadata.release_version(), "");
    }

    #[test]
    fn test_metadata_missing_field_is_invalid() {
        let err = RequestMetadata::from_payload("deploy-9", br#"{"etcdDir":"/a"}"#).unwrap_err();
        assert!(
            matches!(err, DeployError::InvalidMetadata { ref handle, .. } if handle == "deploy-9")
        );
    }

    #[test]
    fn test_metadata_garbage_is_invalid() {
        let err = RequestMetadata::from_payload("deploy-9", b"not json").unwrap_err();
        assert!(matches!(err, DeployError::InvalidMetadata { .. }));
    }

    #[test]
    fn test_image_reference_two_segments() {
        let image = ImageReference::parse("acme/widget:7").unwrap();
        assert_eq!(image.owner, "acme");
        assert_eq!(image.repo, "widget");
        assert_eq!(image.tag, "7");
        assert_eq!(
            image.passed_path("prod"),
            "deployments/acme/widget/7/cluster/prod/passed"
        );
    }

    #[test]
    fn test_image_reference_drops_registry() {
        let image = ImageReference::parse("registry.io/acme/widget:7").unwrap();
        assert_eq!(image, ImageReference::parse("acme/widget:7").unwrap());
    }

    #[test]
    fn test_image_reference_requires_single_colon() {
        for url in ["acme/widget", "localhost:5000/acme/widget:7"] {
            let err = ImageReference::parse(url).unwrap_err();
            assert!(matches!(err, DeployError::InvalidDockerUrl { .. }), "{url}");
        }
    }

    #[test]
    fn test_image_reference_rejects_bad_repository_shape() {
        for url in ["widget:7", "a/b/c/d:7"] {
            let err = ImageReference::parse(url).unwrap_err();
            assert!(matches!(err, DeployError::InvalidBaseDockerUrl { .. }), "{url}");
        }
    }

    #[test]
    fn test_write_set_order_and_values() {
        let metadata = RequestMetadata::new("/octoblu/my-application", "docker_url:version");
        let at = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
        let writes = ConfigWriteSet::for_request(&metadata, at);
        let writes: Vec<(&str, &str)> = writes.iter().collect();

        assert_eq!(
            writes,
            vec![
                ("/octoblu/my-application/docker_url", "docker_url:version"),
                ("/octoblu/my-application/env/SENTRY_RELEASE", "version"),
                ("/octoblu/my-application/restart", "2026-10-19 12:00:00 UTC"),
            ]
        );
    }
}
