//! # OS signal → cancellation bridge.
//!
//! The supervisor itself only understands one cancellation signal: a
//! [`CancellationToken`]. This module bridges OS termination signals into
//! that token for deployments that run the entrypoint as PID 1.
//!
//! ## Signals
//! **Unix:** `SIGINT`, `SIGTERM`, `SIGQUIT` (plus `ctrl_c` as fallback).
//! **Other platforms:** `Ctrl-C` via [`tokio::signal::ctrl_c`].

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Cancels `token` when the process receives a termination signal.
///
/// Spawns a detached listener; dropping the returned token clone elsewhere
/// does not stop it. If signal registration fails the listener gives up
/// with a warning — the caller can still cancel the token explicitly.
pub fn cancel_on_signal(token: CancellationToken) {
    tokio::spawn(async move {
        match wait_for_signal().await {
            Ok(()) => {
                info!("termination signal received, requesting shutdown");
                token.cancel();
            }
            Err(err) => {
                warn!(error = %err, "failed to install signal handlers");
            }
        }
    });
}

#[cfg(unix)]
async fn wait_for_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {},
        _ = sigint.recv() => {},
        _ = sigterm.recv() => {},
        _ = sigquit.recv() => {},
    }
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
