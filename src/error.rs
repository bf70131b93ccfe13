//! Error types used by the entrypoint runtime.
//!
//! This module defines two main error enums:
//!
//! - [`RunError`] — fatal failures raised by the supervision run itself.
//! - [`ConfigError`] — failures raised while folding configuration mutators.
//!
//! Every `RunError` produced during startup is terminal: the run
//! short-circuits the remaining initialization steps and unwinds the
//! cleanup stack before returning. Both types provide `as_label()` for
//! stable snake_case identifiers in logs.

use std::process::ExitStatus;

use thiserror::Error;

/// Boxed error type used at the collaborator seams (dialer, stream drivers).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Identifies which background stream a [`RunError::StreamInit`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    /// Configuration stream (server pushes config for the child's environment).
    Config,
    /// Log stream (ships child output to the control plane).
    Log,
    /// URL/ingress tunnel (exposes the child's port through the control plane).
    Url,
}

impl StreamKind {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            StreamKind::Config => "config_stream",
            StreamKind::Log => "log_stream",
            StreamKind::Url => "url_service",
        }
    }
}

impl std::fmt::Display for StreamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_label())
    }
}

/// # Fatal errors produced by a supervision run.
///
/// These cover every way a run can fail: identity bootstrap, control-plane
/// connectivity, child process lifecycle, and background stream
/// initialization. A cancellation observed while the child runs is *not*
/// an error — it yields a clean `Ok` after the child is terminated.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RunError {
    /// Instance identity generation failed. Fatal, never retried.
    #[error("failed to generate instance identity: {source}")]
    Identity {
        /// Underlying identity-source failure.
        source: BoxError,
    },

    /// Dialing the control-plane server failed.
    ///
    /// Retry policy, if any, belongs to the dialer collaborator; the run
    /// itself never re-dials.
    #[error("failed to connect to control plane at {addr}: {source}")]
    Connectivity {
        /// Server address from the configuration.
        addr: String,
        /// Underlying dial failure.
        source: BoxError,
    },

    /// The child process could not be started (e.g. executable not found).
    ///
    /// Raised before any background stream is initialized.
    #[error("failed to start child process {program:?}: {source}")]
    ChildStart {
        /// The executable that failed to start.
        program: String,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// Observing the child's exit failed at the OS level.
    #[error("failed to observe child process exit: {source}")]
    ChildWait {
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// A background stream initializer failed during startup.
    #[error("{kind} initialization failed: {source}")]
    StreamInit {
        /// Which stream failed.
        kind: StreamKind,
        /// Underlying initializer failure.
        source: BoxError,
    },

    /// The child process exited with a non-success status.
    #[error("child process exited with {status}")]
    ChildExit {
        /// The child's exit status.
        status: ExitStatus,
    },

    /// Configuration assembly failed before the run could start.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl RunError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use procvisor::RunError;
    ///
    /// let err = RunError::Identity { source: "no entropy".into() };
    /// assert_eq!(err.as_label(), "identity_generation");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RunError::Identity { .. } => "identity_generation",
            RunError::Connectivity { .. } => "connectivity",
            RunError::ChildStart { .. } => "child_start",
            RunError::ChildWait { .. } => "child_wait",
            RunError::StreamInit { .. } => "stream_init",
            RunError::ChildExit { .. } => "child_exit",
            RunError::Config(_) => "config",
        }
    }
}

/// # Errors produced while building a [`Config`](crate::Config).
///
/// Any mutator returning one of these aborts the fold immediately; the
/// partially-applied configuration is discarded.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required credential variable was absent.
    ///
    /// Raised when the ingress label set is present but no ingress token
    /// was provided.
    #[error("missing required credential: {var} is not set")]
    MissingCredential {
        /// Name of the absent environment variable.
        var: &'static str,
    },

    /// The listen-port variable held a non-numeric value.
    #[error("invalid value for {var}: {value:?}: {source}")]
    InvalidPort {
        /// Name of the offending environment variable.
        var: &'static str,
        /// The raw value observed.
        value: String,
        /// Parse failure.
        #[source]
        source: std::num::ParseIntError,
    },
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::MissingCredential { .. } => "missing_credential",
            ConfigError::InvalidPort { .. } => "invalid_port",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_kind_labels_are_stable() {
        assert_eq!(StreamKind::Config.as_label(), "config_stream");
        assert_eq!(StreamKind::Log.as_label(), "log_stream");
        assert_eq!(StreamKind::Url.as_label(), "url_service");
    }

    #[test]
    fn run_error_displays_stage_context() {
        let err = RunError::Connectivity {
            addr: "deploy.example.com:9701".into(),
            source: "connection refused".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("deploy.example.com:9701"));
        assert!(msg.contains("connection refused"));
        assert_eq!(err.as_label(), "connectivity");
    }

    #[test]
    fn config_error_names_the_variable() {
        let err = ConfigError::MissingCredential {
            var: "PROCVISOR_TOKEN",
        };
        assert!(err.to_string().contains("PROCVISOR_TOKEN"));
        assert_eq!(err.as_label(), "missing_credential");
    }
}
