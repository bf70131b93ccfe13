//! # Instance identity.
//!
//! Every supervision run is labelled by an [`InstanceId`], an opaque
//! unique string generated once at startup and immutable for the process
//! lifetime. All outbound telemetry carries it, and the control plane uses
//! it to correlate streams with this running instance.
//!
//! The generator is a trait seam ([`IdentitySource`]) so deployments with
//! their own identity scheme can plug one in; [`UuidSource`] is the
//! default.

use std::sync::Arc;

use crate::error::BoxError;

/// Opaque unique identifier for one running instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InstanceId(String);

impl InstanceId {
    /// Wraps an already-generated identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for InstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Shared handle to an identity source.
pub type IdentityRef = Arc<dyn IdentitySource>;

/// Produces a globally-unique instance identifier, or fails.
///
/// A failure here is fatal to the run
/// ([`RunError::Identity`](crate::RunError::Identity)); the supervisor
/// never retries identity generation.
pub trait IdentitySource: Send + Sync {
    /// Generates a fresh unique identifier.
    fn generate(&self) -> Result<InstanceId, BoxError>;
}

/// Default identity source backed by random UUIDs (v4).
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidSource;

impl IdentitySource for UuidSource {
    fn generate(&self) -> Result<InstanceId, BoxError> {
        Ok(InstanceId::new(uuid::Uuid::new_v4().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid_source_generates_unique_ids() {
        let src = UuidSource;
        let a = src.generate().unwrap();
        let b = src.generate().unwrap();
        assert_ne!(a, b);
        assert!(!a.as_str().is_empty());
    }

    #[test]
    fn instance_id_displays_raw_value() {
        let id = InstanceId::new("inst-01");
        assert_eq!(id.to_string(), "inst-01");
        assert_eq!(id.as_str(), "inst-01");
    }
}
