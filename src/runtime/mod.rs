//! Process-level plumbing: observability setup and the signal handler that
//! turns an interrupt into a graceful scan shutdown.

use std::sync::Arc;

use tracing::info;

use crate::provider::ProviderDriver;
use crate::scanner::Scanner;

/// Initializes structured logging for the process.
///
/// Verbosity is controlled through `RUST_LOG`, e.g. `RUST_LOG=driftscan=debug`.
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}

/// Installs a signal handler that interrupts the scan and shuts the provider
/// plugins down before the process exits.
///
/// Without this, an interrupt mid-scan leaks the plugin child processes.
pub fn install_cleanup_handler(scanner: Arc<Scanner>, driver: Arc<ProviderDriver>) {
    tokio::spawn(async move {
        if wait_for_interrupt().await {
            info!("interrupt received, stopping scan");
            scanner.stop();
            driver.cleanup().await;
        }
    });
}

#[cfg(unix)]
async fn wait_for_interrupt() -> bool {
    use tokio::signal::unix::{signal, SignalKind};
    let mut term = match signal(SignalKind::terminate()) {
        Ok(term) => term,
        Err(err) => {
            tracing::warn!(%err, "cannot install SIGTERM handler");
            return tokio::signal::ctrl_c().await.is_ok();
        }
    };
    tokio::select! {
        res = tokio::signal::ctrl_c() => res.is_ok(),
        _ = term.recv() => true,
    }
}

#[cfg(not(unix))]
async fn wait_for_interrupt() -> bool {
    tokio::signal::ctrl_c().await.is_ok()
}
