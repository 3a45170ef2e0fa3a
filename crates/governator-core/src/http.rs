//! Blocking facade over the async HTTP client.
//!
//! The coordinator runs synchronously; the HTTP-backed adapters drive their
//! requests to completion on a shared single-threaded runtime.

use std::future::Future;
use std::sync::Arc;

use anyhow::Context;

/// User agent sent with every request.
pub const USER_AGENT: &str = concat!("governator/", env!("CARGO_PKG_VERSION"));

/// HTTP client paired with the runtime that drives it.
///
/// Cloning shares both the connection pool and the runtime. Must not be used
/// from inside another tokio runtime.
#[derive(Clone)]
pub struct BlockingHttp {
    client: reqwest::Client,
    runtime: Arc<tokio::runtime::Runtime>,
}

impl BlockingHttp {
    pub fn new() -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to create tokio runtime")?;

        Ok(Self {
            client,
            runtime: Arc::new(runtime),
        })
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Run `future` to completion on the shared runtime.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }
}

impl std::fmt::Debug for BlockingHttp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockingHttp").finish_non_exhaustive()
    }
}

/// Join `path` onto `base`, tolerating a trailing slash on the base.
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
