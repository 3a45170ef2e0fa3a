//! Shutdown on SIGTERM.
//!
//! The poll loop is synchronous, so the signal is awaited on a dedicated
//! thread that only flips the shutdown flag. The current step always
//! finishes. SIGINT keeps its default action, so Ctrl-C still aborts a step
//! stuck on the network.

use anyhow::Context;

use governator_core::runner::ShutdownSignal;

/// Register the handler, then wait for the signal on a background thread.
///
/// The handler is in place when this returns.
pub fn install(shutdown: ShutdownSignal) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create signal runtime")?;

    let mut listener = {
        let _guard = runtime.enter();
        Listener::register().context("Failed to install signal handler")?
    };

    std::thread::Builder::new()
        .name("governator-signals".to_string())
        .spawn(move || {
            let name = runtime.block_on(listener.recv());
            tracing::info!(signal = name, "shutdown signal");
            println!("{name} received, waiting to exit");
            shutdown.trigger();
        })
        .context("Failed to spawn signal thread")?;

    Ok(())
}

struct Listener {
    #[cfg(unix)]
    sigterm: tokio::signal::unix::Signal,
    #[cfg(windows)]
    ctrl_c: tokio::signal::windows::CtrlC,
}

impl Listener {
    #[cfg(unix)]
    fn register() -> std::io::Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};

        Ok(Self {
            sigterm: signal(SignalKind::terminate())?,
        })
    }

    #[cfg(windows)]
    fn register() -> std::io::Result<Self> {
        Ok(Self {
            ctrl_c: tokio::signal::windows::ctrl_c()?,
        })
    }

    #[cfg(unix)]
    async fn recv(&mut self) -> &'static str {
        self.sigterm.recv().await;
        "SIGTERM"
    }

    #[cfg(windows)]
    async fn recv(&mut self) -> &'static str {
        self.ctrl_c.recv().await;
        "Ctrl-C"
    }
}
