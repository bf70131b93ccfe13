//! Runtime core: orchestration and lifecycle.
//!
//! The only public API from this module is [`Entrypoint`] (plus its
//! builder), which sequences startup, races the child's exit against
//! cancellation, and drives the cleanup unwind.
//!
//! Internal modules:
//! - `entrypoint`: the supervision state machine and builder;
//! - `shutdown`: bridges OS termination signals into the cancellation token.

mod entrypoint;
mod shutdown;

pub use entrypoint::{Entrypoint, EntrypointBuilder};
pub use shutdown::cancel_on_signal;
