//! # procvisor
//!
//! **Procvisor** is a process-supervision entrypoint library. It replaces a
//! container's normal entrypoint: it launches the real workload as a child
//! process, keeps long-lived control-plane sessions to a deployment server
//! alive alongside it, and coordinates graceful termination of both when
//! the process is asked to stop.
//!
//! ## Architecture
//! ```text
//!              ┌────────────────────┐
//!              │  Config (mutators) │   with_env_defaults / with_exec / ...
//!              └─────────┬──────────┘
//!                        ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  Entrypoint (supervision state machine)                         │
//! │  Starting:                                                      │
//! │    identity ─► dial ─► child start ─► stream inits (in order)   │
//! │    each stage registers its teardown with the CleanupStack      │
//! │  Running:                                                       │
//! │    select! { child exit  |  cancellation ─► kill + await exit } │
//! │  Stopped:                                                       │
//! │    CleanupStack::unwind() — LIFO, exactly once, on every path   │
//! └───────┬───────────────┬───────────────┬─────────────────────────┘
//!         ▼               ▼               ▼
//!   config stream     log stream     url service        (one task each,
//!   BackgroundStream + StreamDriver per stream;          url only when
//!   pumps loop until the shared token fires)             labels present)
//! ```
//!
//! ## Collaborator seams
//! The wire protocol, log encoding, and tunnel protocol live outside this
//! crate, behind narrow traits:
//! - [`Dialer`] / [`ControlClient`] — establish and own the connection.
//! - [`StreamInit`] / [`StreamDriver`] — open each long-running stream.
//! - [`IdentitySource`] — generate the unique instance identifier.
//!
//! ## Lifecycle guarantees
//! - Initialization is strictly sequential; any failure short-circuits the
//!   remaining stages and still unwinds everything already acquired.
//! - Cleanup is LIFO: a resource is never released before something that
//!   depends on it. The connection handle is closed last of the stream
//!   teardowns that use it.
//! - The child never outlives the run: cancellation kills it and the run
//!   returns only after the real exit event is observed.
//! - No retries anywhere in the core; restart policy belongs to the
//!   collaborators or an outer supervisor.
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use tokio_util::sync::CancellationToken;
//! use procvisor::{
//!     config::{self, Config},
//!     core::{cancel_on_signal, Entrypoint},
//!     BoxError, ClientRef, ControlClient, Dialer,
//! };
//!
//! struct MyDialer;
//! struct MyClient;
//!
//! impl ControlClient for MyClient {
//!     fn close(&self) { /* tear down the transport */ }
//! }
//!
//! #[async_trait]
//! impl Dialer for MyDialer {
//!     async fn dial(&self, _ctx: &CancellationToken, _cfg: &Config) -> Result<ClientRef, BoxError> {
//!         Ok(Arc::new(MyClient))
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = Config::build([
//!         config::with_env_defaults(),
//!         config::with_exec(std::env::args().skip(1).collect::<Vec<_>>()),
//!     ])?;
//!
//!     let token = CancellationToken::new();
//!     cancel_on_signal(token.clone());
//!
//!     let entry = Entrypoint::builder(Arc::new(MyDialer)).build();
//!     entry.run(&token, cfg).await?;
//!     Ok(())
//! }
//! ```

mod child;
mod cleanup;
mod client;
pub mod config;
pub mod core;
mod error;
mod identity;
mod session;
pub mod streams;

// ---- Public re-exports ----

pub use child::ChildProcess;
pub use cleanup::CleanupStack;
pub use client::{ClientRef, ControlClient, Dialer};
pub use config::{Config, Opt};
pub use crate::core::{Entrypoint, EntrypointBuilder};
pub use error::{BoxError, ConfigError, RunError, StreamKind};
pub use identity::{IdentityRef, IdentitySource, InstanceId, UuidSource};
pub use session::{SessionRef, SessionState};
pub use streams::{BackgroundStream, DriverFn, StreamDriver, StreamInit, StreamRef};
