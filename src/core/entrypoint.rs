//! # Entrypoint: the supervision state machine.
//!
//! [`Entrypoint`] owns the ordered startup sequence, the single blocking
//! point of the run, and the guaranteed cleanup unwind:
//!
//! ```text
//! Starting:
//!   identity ──► dial ──► child start ──► config stream ──► log stream ──► url service
//!      │           │           │               │                │              │
//!      │           └ register(close)           └ each init registers its own teardown
//!      │                                         before the next stage runs
//!      ▼ (any failure short-circuits straight to the unwind)
//!
//! Running:
//!   tokio::select! {
//!     child exit   ──► Ok / RunError::ChildExit      (Draining)
//!     cancellation ──► kill child, await real exit   (Draining, clean Ok)
//!   }
//!
//! Stopped:
//!   CleanupStack::unwind() — exactly once, latest-registered first,
//!   on every path out of run().
//! ```
//!
//! ## Rules
//! - No retry anywhere in the core: every `Starting` failure is fatal.
//! - The child is never left running: cancellation kills it and the run
//!   does not return until the real exit event is observed.
//! - The connection handle is closed only by the unwind, after every
//!   stream task has been told to stop.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::child::ChildProcess;
use crate::cleanup::CleanupStack;
use crate::client::Dialer;
use crate::config::Config;
use crate::error::RunError;
use crate::identity::{IdentityRef, UuidSource};
use crate::session::{SessionRef, SessionState};
use crate::streams::StreamRef;

/// Supervises one child process and its control-plane sessions.
///
/// Built via [`Entrypoint::builder`]; collaborators (dialer, stream
/// initializers, identity source) are wired once and the entrypoint can
/// then [`run`](Entrypoint::run) with a finished [`Config`].
pub struct Entrypoint {
    identity: IdentityRef,
    dialer: Arc<dyn Dialer>,
    config_stream: Option<StreamRef>,
    log_stream: Option<StreamRef>,
    url_service: Option<StreamRef>,
}

impl Entrypoint {
    /// Starts building an entrypoint around the given dialer.
    pub fn builder(dialer: Arc<dyn Dialer>) -> EntrypointBuilder {
        EntrypointBuilder::new(dialer)
    }

    /// Runs the supervision loop until the child exits or `ctx` fires.
    ///
    /// Returns `Ok(())` when the child exits successfully **or** when a
    /// cancellation produced a clean stop. Every acquired resource is
    /// released before this returns, in reverse order of acquisition,
    /// regardless of which path triggered the stop.
    pub async fn run(&self, ctx: &CancellationToken, cfg: Config) -> Result<(), RunError> {
        let cleanup = CleanupStack::new();
        let res = self.run_inner(ctx, Arc::new(cfg), &cleanup).await;
        cleanup.unwind();

        if let Err(err) = &res {
            warn!(stage = err.as_label(), error = %err, "supervision run failed");
        }
        res
    }

    async fn run_inner(
        &self,
        ctx: &CancellationToken,
        cfg: Arc<Config>,
        cleanup: &CleanupStack,
    ) -> Result<(), RunError> {
        // Starting: strictly sequential, each stage registers its own
        // teardown before the next stage runs.
        let instance_id = self
            .identity
            .generate()
            .map_err(|source| RunError::Identity { source })?;

        info!(
            %instance_id,
            deployment_id = %cfg.deployment_id,
            args = ?cfg.exec_args,
            "entrypoint starting"
        );

        let client = self
            .dialer
            .dial(ctx, &cfg)
            .await
            .map_err(|source| RunError::Connectivity {
                addr: cfg.server_addr.clone(),
                source,
            })?;
        {
            let client = Arc::clone(&client);
            cleanup.register(move || client.close());
        }

        let session = SessionState::new(instance_id, client);
        let mut child = ChildProcess::start(&cfg)?;
        let exec_id = session.next_exec_id();
        info!(pid = ?child.id(), exec_id, "child process started");

        self.init_stream(&self.config_stream, ctx, &session, &cfg, cleanup)
            .await?;
        self.init_stream(&self.log_stream, ctx, &session, &cfg, cleanup)
            .await?;
        if cfg.url_enabled() {
            if self.url_service.is_some() {
                self.init_stream(&self.url_service, ctx, &session, &cfg, cleanup)
                    .await?;
            } else {
                warn!("url labels configured but no url service wired");
            }
        }

        // Running: the only concurrent wait point on the main control path.
        let exited = tokio::select! {
            status = child.wait() => Some(status?),
            _ = ctx.cancelled() => None,
        };

        match exited {
            Some(status) => {
                info!(%status, "child process exited");
                if status.success() {
                    Ok(())
                } else {
                    Err(RunError::ChildExit { status })
                }
            }
            None => {
                info!("received cancellation request, stopping child process");
                child.kill();
                // No timeout here: the kill is fire-and-forget and we still
                // wait for the real exit so no orphan survives the run.
                let status = child.wait().await?;
                info!(%status, "child process terminated");
                Ok(())
            }
        }
    }

    async fn init_stream(
        &self,
        stream: &Option<StreamRef>,
        ctx: &CancellationToken,
        session: &SessionRef,
        cfg: &Arc<Config>,
        cleanup: &CleanupStack,
    ) -> Result<(), RunError> {
        let Some(stream) = stream else {
            return Ok(());
        };
        stream
            .init(ctx, session, cfg, cleanup)
            .await
            .map_err(|source| RunError::StreamInit {
                kind: stream.kind(),
                source,
            })
    }
}

impl std::fmt::Debug for Entrypoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entrypoint")
            .field("config_stream", &self.config_stream.is_some())
            .field("log_stream", &self.log_stream.is_some())
            .field("url_service", &self.url_service.is_some())
            .finish()
    }
}

/// Builder for wiring an [`Entrypoint`]'s collaborators.
pub struct EntrypointBuilder {
    identity: IdentityRef,
    dialer: Arc<dyn Dialer>,
    config_stream: Option<StreamRef>,
    log_stream: Option<StreamRef>,
    url_service: Option<StreamRef>,
}

impl EntrypointBuilder {
    fn new(dialer: Arc<dyn Dialer>) -> Self {
        Self {
            identity: Arc::new(UuidSource),
            dialer,
            config_stream: None,
            log_stream: None,
            url_service: None,
        }
    }

    /// Replaces the default (UUID) identity source.
    pub fn with_identity_source(mut self, identity: IdentityRef) -> Self {
        self.identity = identity;
        self
    }

    /// Wires the configuration stream initializer.
    pub fn with_config_stream(mut self, stream: StreamRef) -> Self {
        self.config_stream = Some(stream);
        self
    }

    /// Wires the log stream initializer.
    pub fn with_log_stream(mut self, stream: StreamRef) -> Self {
        self.log_stream = Some(stream);
        self
    }

    /// Wires the URL service initializer.
    ///
    /// Only invoked for runs whose configuration carries an ingress label
    /// set; otherwise it is skipped and registers nothing.
    pub fn with_url_service(mut self, stream: StreamRef) -> Self {
        self.url_service = Some(stream);
        self
    }

    /// Finishes the wiring.
    pub fn build(self) -> Entrypoint {
        Entrypoint {
            identity: self.identity,
            dialer: self.dialer,
            config_stream: self.config_stream,
            log_stream: self.log_stream,
            url_service: self.url_service,
        }
    }
}
