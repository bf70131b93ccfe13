//! # Control-plane collaborator seam.
//!
//! The wire protocol and transport security used to reach the deployment
//! server live outside this crate. The core only needs two things from
//! that collaborator:
//!
//! - [`Dialer`]: establishes the connection once, during `Starting`.
//! - [`ControlClient`]: the live connection handle. After a successful
//!   dial it is shared read-only with every background stream task; only
//!   the cleanup stack closes it, at unwind, so it outlives every task
//!   that might still be using it during drain.
//!
//! A dial failure is fatal for the whole run. Retry/backoff of the
//! connection, if desired, belongs inside the dialer implementation.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::BoxError;

/// Shared handle to the live control-plane connection.
pub type ClientRef = Arc<dyn ControlClient>;

/// Live connection to the deployment server.
///
/// Implementations own whatever channel/session state the protocol needs.
/// The core never closes the handle directly; it registers
/// [`close`](ControlClient::close) with the cleanup stack instead.
pub trait ControlClient: Send + Sync {
    /// Releases the connection. Must be safe to call once, from the
    /// cleanup stack, after every stream task has been told to stop.
    fn close(&self);
}

/// Establishes the control-plane connection for one run.
#[async_trait]
pub trait Dialer: Send + Sync {
    /// Dials the server described by `cfg`.
    ///
    /// Should observe `ctx` and abort promptly when it fires. Errors are
    /// surfaced as [`RunError::Connectivity`](crate::RunError::Connectivity).
    async fn dial(&self, ctx: &CancellationToken, cfg: &Config) -> Result<ClientRef, BoxError>;
}
