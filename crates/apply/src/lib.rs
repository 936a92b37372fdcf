//! ocmhub apply: the per-object apply and delete primitives the reconcile core
//! drives, with a kube-backed implementation (server-side apply over dynamic
//! objects).

#![forbid(unsafe_code)]

use ocmhub_core::{ObjectRef, ResourceId};
use thiserror::Error;

mod cache;
mod kube_impl;

pub use cache::{content_hash, ApplyCache};
pub use kube_impl::{KubeApplier, KubeDeleter};

fn apply_concurrency() -> usize {
    std::env::var("OCMHUB_APPLY_CONCURRENCY")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(4)
}

fn field_manager() -> String {
    std::env::var("OCMHUB_FIELD_MANAGER").unwrap_or_else(|_| "ocmhub-operator".to_string())
}

fn apply_cache_disabled() -> bool {
    std::env::var("OCMHUB_DISABLE_APPLY_CACHE")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// A rendered manifest ready to be applied.
#[derive(Debug, Clone)]
pub struct Manifest {
    pub identifier: ResourceId,
    pub bytes: Vec<u8>,
}

/// Outcome of applying one manifest. Produced once per manifest per pass.
#[derive(Debug)]
pub struct ResourceApplyResult {
    pub identifier: ResourceId,
    /// `group/version/Kind` once the manifest has been parsed.
    pub object_type: Option<String>,
    pub error: Option<anyhow::Error>,
}

impl ResourceApplyResult {
    pub fn ok(identifier: ResourceId, object_type: impl Into<String>) -> Self {
        Self { identifier, object_type: Some(object_type.into()), error: None }
    }

    pub fn failed(identifier: ResourceId, object_type: Option<String>, error: anyhow::Error) -> Self {
        Self { identifier, object_type, error: Some(error) }
    }

    pub fn is_ok(&self) -> bool { self.error.is_none() }
}

#[derive(Debug, Error)]
pub enum DeleteError {
    #[error("not found")]
    NotFound,
    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

impl DeleteError {
    pub fn is_not_found(&self) -> bool { matches!(self, DeleteError::NotFound) }
}

/// Applies rendered manifests. Implementations must return exactly one result
/// per input, in input order, and be idempotent per object.
#[async_trait::async_trait]
pub trait Applier: Send + Sync {
    async fn apply_all(&self, manifests: Vec<Manifest>) -> Vec<ResourceApplyResult>;
}

/// Deletes a single object. A missing object must surface as `DeleteError::NotFound`.
#[async_trait::async_trait]
pub trait Deleter: Send + Sync {
    async fn delete(&self, object: &ObjectRef) -> Result<(), DeleteError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_constructors() {
        let ok = ResourceApplyResult::ok(ResourceId::from_static("a.yaml"), "v1/Namespace");
        assert!(ok.is_ok());
        assert_eq!(ok.object_type.as_deref(), Some("v1/Namespace"));

        let bad = ResourceApplyResult::failed(ResourceId::from_static("b.yaml"), None, anyhow::anyhow!("boom"));
        assert!(!bad.is_ok());
        assert_eq!(bad.error.unwrap().to_string(), "boom");
    }

    #[test]
    fn delete_error_classifies_not_found() {
        assert!(DeleteError::NotFound.is_not_found());
        assert!(!DeleteError::Failed(anyhow::anyhow!("denied")).is_not_found());
        assert_eq!(DeleteError::Failed(anyhow::anyhow!("denied")).to_string(), "denied");
    }
}
