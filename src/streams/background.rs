//! # Background stream wiring.
//!
//! [`BackgroundStream`] turns a [`StreamDriver`](super::StreamDriver)
//! into a [`StreamInit`]:
//! it derives a child cancellation token for the stream, awaits the
//! driver's setup, spawns the returned pump as exactly one tokio task,
//! and registers the teardown (cancel, then abort) with the cleanup
//! stack before `init` returns, so a later startup failure still tears
//! this stream down.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::cleanup::CleanupStack;
use crate::config::Config;
use crate::error::{BoxError, StreamKind};
use crate::session::SessionRef;

use super::driver::DriverRef;
use super::{StreamInit, StreamRef};

/// Driver-backed implementation of the stream init contract.
pub struct BackgroundStream {
    kind: StreamKind,
    driver: DriverRef,
}

impl BackgroundStream {
    /// Wires a driver as the configuration stream.
    pub fn config(driver: DriverRef) -> StreamRef {
        Self::wrap(StreamKind::Config, driver)
    }

    /// Wires a driver as the log stream.
    pub fn log(driver: DriverRef) -> StreamRef {
        Self::wrap(StreamKind::Log, driver)
    }

    /// Wires a driver as the URL/ingress service.
    pub fn url(driver: DriverRef) -> StreamRef {
        Self::wrap(StreamKind::Url, driver)
    }

    fn wrap(kind: StreamKind, driver: DriverRef) -> StreamRef {
        Arc::new(Self { kind, driver })
    }
}

#[async_trait]
impl StreamInit for BackgroundStream {
    fn kind(&self) -> StreamKind {
        self.kind
    }

    async fn init(
        &self,
        ctx: &CancellationToken,
        session: &SessionRef,
        cfg: &Arc<Config>,
        cleanup: &CleanupStack,
    ) -> Result<(), BoxError> {
        let kind = self.kind;
        let token = ctx.child_token();
        let pump = self
            .driver
            .open(token.clone(), Arc::clone(session), Arc::clone(cfg))
            .await?;

        debug!(stream = %kind, "stream established, starting task");
        let handle = tokio::spawn(async move {
            pump.await;
            debug!(stream = %kind, "stream task finished");
        });

        cleanup.register(move || {
            debug!(stream = %kind, "stopping stream task");
            token.cancel();
            handle.abort();
        });
        Ok(())
    }
}

impl std::fmt::Debug for BackgroundStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundStream")
            .field("kind", &self.kind)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::InstanceId;
    use crate::session::SessionState;
    use crate::streams::{BoxStreamFuture, DriverFn};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    struct NullClient;
    impl crate::client::ControlClient for NullClient {
        fn close(&self) {}
    }

    fn session() -> SessionRef {
        SessionState::new(InstanceId::new("inst-test"), Arc::new(NullClient))
    }

    #[tokio::test]
    async fn init_spawns_pump_and_registers_teardown() {
        let started = Arc::new(AtomicBool::new(false));
        let stopped = Arc::new(AtomicBool::new(false));
        let (started2, stopped2) = (Arc::clone(&started), Arc::clone(&stopped));

        let stream = BackgroundStream::log(DriverFn::arc(move |ctx: CancellationToken, _session: SessionRef, _cfg: Arc<Config>| {
            let (started, stopped) = (Arc::clone(&started2), Arc::clone(&stopped2));
            async move {
                let pump: BoxStreamFuture = Box::pin(async move {
                    started.store(true, Ordering::SeqCst);
                    ctx.cancelled().await;
                    stopped.store(true, Ordering::SeqCst);
                });
                Ok::<_, BoxError>(pump)
            }
        }));

        let ctx = CancellationToken::new();
        let cleanup = CleanupStack::new();
        stream
            .init(&ctx, &session(), &Arc::new(Config::default()), &cleanup)
            .await
            .unwrap();
        assert_eq!(cleanup.len(), 1);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(started.load(Ordering::SeqCst));
        assert!(!stopped.load(Ordering::SeqCst));

        cleanup.unwind();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(stopped.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn open_failure_registers_nothing() {
        let stream = BackgroundStream::config(DriverFn::arc(|_ctx: CancellationToken, _session: SessionRef, _cfg: Arc<Config>| async {
            Err::<BoxStreamFuture, BoxError>("stream refused".into())
        }));

        let cleanup = CleanupStack::new();
        let res = stream
            .init(
                &CancellationToken::new(),
                &session(),
                &Arc::new(Config::default()),
                &cleanup,
            )
            .await;
        assert!(res.is_err());
        assert!(cleanup.is_empty());
    }

    #[tokio::test]
    async fn pump_observes_the_shared_signal() {
        let stopped = Arc::new(AtomicBool::new(false));
        let stopped2 = Arc::clone(&stopped);

        let stream = BackgroundStream::url(DriverFn::arc(move |ctx: CancellationToken, _session: SessionRef, _cfg: Arc<Config>| {
            let stopped = Arc::clone(&stopped2);
            async move {
                let pump: BoxStreamFuture = Box::pin(async move {
                    ctx.cancelled().await;
                    stopped.store(true, Ordering::SeqCst);
                });
                Ok::<_, BoxError>(pump)
            }
        }));

        let ctx = CancellationToken::new();
        let cleanup = CleanupStack::new();
        stream
            .init(&ctx, &session(), &Arc::new(Config::default()), &cleanup)
            .await
            .unwrap();

        // Cancelling the run-wide token stops the pump without unwinding.
        ctx.cancel();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(stopped.load(Ordering::SeqCst));
    }
}
