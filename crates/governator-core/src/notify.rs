//! Deploy-state notification after a successful apply.

use crate::error::{DeployError, Result};
use crate::http::{BlockingHttp, join_url};
use crate::request::ImageReference;

/// Reports that a deployment of an image has passed on this cluster.
pub trait StatusNotifier {
    fn deployment_passed(&self, image: &ImageReference) -> Result<()>;
}

impl<T: StatusNotifier + ?Sized> StatusNotifier for Box<T> {
    fn deployment_passed(&self, image: &ImageReference) -> Result<()> {
        (**self).deployment_passed(image)
    }
}

/// Notifier for the deploy-state service.
///
/// Issues one `PUT` with an empty body. Status codes of 400 and above fail
/// the step; there is no retry.
#[derive(Debug, Clone)]
pub struct DeployStateNotifier {
    base_uri: String,
    cluster: String,
    http: BlockingHttp,
}

impl DeployStateNotifier {
    pub fn new(
        base_uri: impl Into<String>,
        cluster: impl Into<String>,
        http: BlockingHttp,
    ) -> Self {
        Self {
            base_uri: base_uri.into(),
            cluster: cluster.into(),
            http,
        }
    }

    pub fn passed_url(&self, image: &ImageReference) -> String {
        join_url(&self.base_uri, &image.passed_path(&self.cluster))
    }
}

impl StatusNotifier for DeployStateNotifier {
    fn deployment_passed(&self, image: &ImageReference) -> Result<()> {
        let url = self.passed_url(image);
        tracing::debug!(%url, "making request to deploy-state-service");

        let status = self.http.block_on(async {
            self.http
                .client()
                .put(&url)
                .send()
                .await
                .map(|response| response.status())
        });

        let status = status.map_err(|e| DeployError::Notify {
            url: url.clone(),
            source: e.into(),
        })?;
        tracing::debug!(status = status.as_u16(), "deploy-state-service responded");

        if status.as_u16() > 399 {
            return Err(DeployError::NotifyRejected {
                url,
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}
