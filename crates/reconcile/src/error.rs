//! Pass failures and the combined error written into the `Applied` condition.

use std::fmt;

use ocmhub_core::{Feature, ResourceId};
use thiserror::Error;

/// Type tag printed for legacy APIService cleanup failures.
pub const LEGACY_OBJECT_TYPE: &str = "apiregistration.k8s.io/v1/APIService";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// `object_type` is `None` when the manifest never got far enough to be parsed.
    Apply { object_type: Option<String> },
    Cleanup,
}

/// One collected failure from the apply or legacy-cleanup phase.
#[derive(Debug)]
pub struct PassFailure {
    pub identifier: String,
    pub kind: FailureKind,
    pub cause: anyhow::Error,
}

impl PassFailure {
    pub fn apply(identifier: &ResourceId, object_type: Option<String>, cause: anyhow::Error) -> Self {
        Self { identifier: identifier.to_string(), kind: FailureKind::Apply { object_type }, cause }
    }

    pub fn cleanup(name: impl Into<String>, cause: anyhow::Error) -> Self {
        Self { identifier: name.into(), kind: FailureKind::Cleanup, cause }
    }

    pub fn is_cleanup(&self) -> bool { matches!(self.kind, FailureKind::Cleanup) }
}

impl fmt::Display for PassFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            FailureKind::Apply { object_type } => write!(
                f,
                "\"{}\" ({}): {:#}",
                self.identifier,
                object_type.as_deref().unwrap_or("<unknown>"),
                self.cause
            ),
            FailureKind::Cleanup => {
                write!(f, "legacy \"{}\" ({}): {:#}", self.identifier, LEGACY_OBJECT_TYPE, self.cause)
            }
        }
    }
}

/// Every non-fatal failure of a pass, in attempt order.
#[derive(Debug)]
pub struct AggregateError {
    failures: Vec<PassFailure>,
}

impl AggregateError {
    /// `None` for an empty list; an aggregate always holds at least one failure.
    pub fn from_failures(failures: Vec<PassFailure>) -> Option<Self> {
        if failures.is_empty() { None } else { Some(Self { failures }) }
    }

    pub fn failures(&self) -> &[PassFailure] { &self.failures }
    pub fn len(&self) -> usize { self.failures.len() }
    pub fn is_empty(&self) -> bool { self.failures.is_empty() }

    pub fn apply_failures(&self) -> impl Iterator<Item = &PassFailure> {
        self.failures.iter().filter(|f| !f.is_cleanup())
    }

    pub fn cleanup_failures(&self) -> impl Iterator<Item = &PassFailure> {
        self.failures.iter().filter(|f| f.is_cleanup())
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.failures.as_slice() {
            [single] => write!(f, "{}", single),
            many => {
                f.write_str("[")?;
                for (i, failure) in many.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", failure)?;
                }
                f.write_str("]")
            }
        }
    }
}

impl std::error::Error for AggregateError {}

#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Removing a disabled feature's resource failed; nothing was applied.
    #[error("failed to remove {feature} resource \"{identifier}\": {source:#}")]
    Decommission {
        feature: Feature,
        identifier: ResourceId,
        #[source]
        source: anyhow::Error,
    },
    #[error("failed to remove hub resource \"{identifier}\": {source:#}")]
    Teardown {
        identifier: ResourceId,
        #[source]
        source: anyhow::Error,
    },
    #[error(transparent)]
    Aggregate(#[from] AggregateError),
    #[error("reconcile pass cancelled")]
    Cancelled,
}

impl ReconcileError {
    pub fn is_cancelled(&self) -> bool { matches!(self, ReconcileError::Cancelled) }

    pub fn aggregate(&self) -> Option<&AggregateError> {
        match self {
            ReconcileError::Aggregate(a) => Some(a),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn single_failure_renders_bare() {
        let agg = AggregateError::from_failures(vec![PassFailure::apply(
            &ResourceId::from_static("hub/sa.yaml"),
            Some("v1/ServiceAccount".into()),
            anyhow!("forbidden"),
        )])
        .unwrap();
        assert_eq!(agg.to_string(), "\"hub/sa.yaml\" (v1/ServiceAccount): forbidden");
    }

    #[test]
    fn many_failures_render_as_list_in_order() {
        let agg = AggregateError::from_failures(vec![
            PassFailure::apply(&ResourceId::from_static("a.yaml"), None, anyhow!("bad template")),
            PassFailure::cleanup("v1.admission.work.open-cluster-management.io", anyhow!("timeout")),
        ])
        .unwrap();
        assert_eq!(
            agg.to_string(),
            "[\"a.yaml\" (<unknown>): bad template, legacy \"v1.admission.work.open-cluster-management.io\" (apiregistration.k8s.io/v1/APIService): timeout]"
        );
        assert_eq!(agg.apply_failures().count(), 1);
        assert_eq!(agg.cleanup_failures().count(), 1);
    }

    #[test]
    fn empty_list_builds_nothing() {
        assert!(AggregateError::from_failures(Vec::new()).is_none());
    }

    #[test]
    fn cause_context_is_kept() {
        let cause = anyhow!("connection refused").context("patching ClusterRole");
        let f = PassFailure::apply(&ResourceId::from_static("cr.yaml"), Some("rbac.authorization.k8s.io/v1/ClusterRole".into()), cause);
        assert!(f.to_string().ends_with("patching ClusterRole: connection refused"), "{}", f);
    }
}
