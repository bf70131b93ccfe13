//! # Stream drivers (`StreamDriver`, `DriverFn`).
//!
//! A driver is the collaborator half of a background stream: it performs
//! the protocol-specific setup (opening the stream over the connection)
//! and hands back the long-running pump future. The wiring half —
//! spawning, teardown registration — stays in
//! [`BackgroundStream`](super::BackgroundStream).
//!
//! [`DriverFn`] wraps a closure as a driver, producing a fresh setup
//! future per call, the same way a function-backed task avoids shared
//! mutable state.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::BoxError;
use crate::session::SessionRef;

/// The long-running half of a stream: loops on its own I/O until the
/// token it captured at open time fires.
pub type BoxStreamFuture = BoxFuture<'static, ()>;

/// Shared handle to a stream driver.
pub type DriverRef = Arc<dyn StreamDriver>;

/// Opens one control-plane stream and returns its pump future.
///
/// `open` runs during `Starting` and its failure aborts the whole run.
/// The returned future must observe `ctx` and terminate promptly when it
/// fires; the teardown registered by the wiring cancels exactly that
/// token.
#[async_trait]
pub trait StreamDriver: Send + Sync + 'static {
    /// Performs stream setup and returns the long-running pump.
    async fn open(
        &self,
        ctx: CancellationToken,
        session: SessionRef,
        cfg: Arc<Config>,
    ) -> Result<BoxStreamFuture, BoxError>;
}

/// Function-backed stream driver.
///
/// Wraps a closure that *creates* a new setup future per open.
///
/// ## Example
/// ```
/// use std::sync::Arc;
/// use tokio_util::sync::CancellationToken;
/// use procvisor::streams::{BoxStreamFuture, DriverFn, DriverRef};
/// use procvisor::{BoxError, Config, SessionRef};
///
/// let driver: DriverRef = DriverFn::arc(|ctx: CancellationToken, _session: SessionRef, _cfg: Arc<Config>| async move {
///     // protocol setup would happen here
///     let pump: BoxStreamFuture = Box::pin(async move {
///         ctx.cancelled().await;
///     });
///     Ok::<_, BoxError>(pump)
/// });
/// # let _ = driver;
/// ```
pub struct DriverFn<F> {
    f: F,
}

impl<F> DriverFn<F> {
    /// Creates a new function-backed driver.
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Creates the driver and returns it as a shared handle.
    pub fn arc(f: F) -> Arc<Self> {
        Arc::new(Self::new(f))
    }
}

#[async_trait]
impl<F, Fut> StreamDriver for DriverFn<F>
where
    F: Fn(CancellationToken, SessionRef, Arc<Config>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<BoxStreamFuture, BoxError>> + Send + 'static,
{
    async fn open(
        &self,
        ctx: CancellationToken,
        session: SessionRef,
        cfg: Arc<Config>,
    ) -> Result<BoxStreamFuture, BoxError> {
        (self.f)(ctx, session, cfg).await
    }
}
