//! # Live state of one supervision run.
//!
//! [`SessionState`] bundles the handles a run owns once the control-plane
//! connection is up: the instance identity, the shared client handle, and
//! a monotonically increasing counter for execution-scoped identifiers
//! (e.g. stream sequence numbers).
//!
//! The supervisor owns the state; background stream tasks receive an
//! `Arc` and read it only — no task mutates the session beyond drawing
//! fresh identifiers from the counter.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use crate::client::ClientRef;
use crate::identity::InstanceId;

/// Shared handle to the session state.
pub type SessionRef = Arc<SessionState>;

/// Handles owned by one supervision run.
pub struct SessionState {
    /// Identity of this running instance.
    pub instance_id: InstanceId,
    /// Connection handle shared with all background stream tasks.
    pub client: ClientRef,
    exec_seq: AtomicI64,
}

impl SessionState {
    /// Creates the session state once the connection is established.
    pub fn new(instance_id: InstanceId, client: ClientRef) -> SessionRef {
        Arc::new(Self {
            instance_id,
            client,
            exec_seq: AtomicI64::new(0),
        })
    }

    /// Returns the next execution-scoped identifier.
    ///
    /// Strictly increasing for the lifetime of the session; used by stream
    /// implementations to sequence per-execution events.
    pub fn next_exec_id(&self) -> i64 {
        self.exec_seq.fetch_add(1, Ordering::Relaxed) + 1
    }
}

impl std::fmt::Debug for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionState")
            .field("instance_id", &self.instance_id)
            .field("exec_seq", &self.exec_seq.load(Ordering::Relaxed))
            .finish()
    }
}
