//! # Background stream initializers.
//!
//! Each control-plane stream (configuration, logs, URL/ingress tunnel)
//! follows one uniform contract, [`StreamInit`]: on success it has started
//! exactly one long-running task that runs until its token is cancelled,
//! and it has registered that task's teardown with the cleanup stack.
//! Failure is fatal to the whole run — once configured, streams are
//! required, not optional.
//!
//! The protocol bodies live outside this crate. What lives here is the
//! wiring: [`BackgroundStream`] adapts a collaborator-supplied
//! [`StreamDriver`] to the init contract, and [`DriverFn`] lets a plain
//! closure act as a driver.
//!
//! ```text
//! Supervisor (Starting)
//!    │  init(ctx, session, cfg, cleanup)
//!    ▼
//! BackgroundStream ── driver.open() ──► pump future   (collaborator body)
//!    │                                      │
//!    ├─ tokio::spawn(pump)                  └─ loops until token fires
//!    └─ cleanup.register(cancel + abort)
//! ```

mod background;
mod driver;

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::cleanup::CleanupStack;
use crate::config::Config;
use crate::error::BoxError;
use crate::session::SessionRef;

pub use crate::error::StreamKind;
pub use background::BackgroundStream;
pub use driver::{BoxStreamFuture, DriverFn, DriverRef, StreamDriver};

/// Uniform contract for background stream initialization.
///
/// Implementations must, on success:
/// 1. have spawned exactly one long-running concurrent task that observes
///    the shared cancellation signal, and
/// 2. have registered with `cleanup` whatever teardown stops that task and
///    releases its resources.
///
/// The session (and through it the connection handle) is shared read-only;
/// initializers never close the connection themselves.
#[async_trait]
pub trait StreamInit: Send + Sync {
    /// Which stream this initializer establishes.
    fn kind(&self) -> StreamKind;

    /// Establishes the stream against the control-plane session.
    async fn init(
        &self,
        ctx: &CancellationToken,
        session: &SessionRef,
        cfg: &Arc<Config>,
        cleanup: &CleanupStack,
    ) -> Result<(), BoxError>;
}

/// Shared handle to a stream initializer.
pub type StreamRef = Arc<dyn StreamInit>;
