//! ocmhub core types: the cluster-manager descriptor, the hub configuration
//! derived from it, status conditions and the small value types shared by the
//! selector, the apply layer and the reconcile core.

#![forbid(unsafe_code)]

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

pub mod conditions;
pub mod config;
pub mod descriptor;

pub use conditions::{Condition, ConditionSet, ConditionStatus};
pub use config::{Feature, FeatureConfig, HubConfig, WebhookConfig};
pub use descriptor::{
    ClusterManager, ClusterManagerSpec, ClusterManagerStatus, DeployOption, FeatureGate,
    FeatureGateMode, FeatureGatesConfig, HostedConfiguration, InstallMode, Metadata,
    RelatedResourceMeta, WebhookConfiguration,
};

/// Condition type written by the hub reconcile stage and by the pipeline on success.
pub const CONDITION_APPLIED: &str = "Applied";

/// Control signal handed back to the outer reconcile loop after a stage.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ReconcileSignal {
    /// Proceed to the next stage.
    Continue,
    /// Do not run further stages this pass.
    Stop,
}

impl ReconcileSignal {
    pub fn is_stop(self) -> bool { matches!(self, ReconcileSignal::Stop) }
}

/// Name of a manifest asset. Opaque to everything except the renderer.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(Cow<'static, str>);

impl ResourceId {
    pub const fn from_static(s: &'static str) -> Self { Self(Cow::Borrowed(s)) }
    pub fn new(s: impl Into<String>) -> Self { Self(Cow::Owned(s.into())) }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl From<&'static str> for ResourceId {
    fn from(s: &'static str) -> Self { Self::from_static(s) }
}

/// Identity of a single object on the control plane.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectRef {
    pub api_version: String,
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub name: String,
}

impl ObjectRef {
    pub fn cluster_scoped(api_version: impl Into<String>, kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self { api_version: api_version.into(), kind: kind.into(), namespace: None, name: name.into() }
    }

    /// `(group, version)`; the core group is the empty string.
    pub fn group_version(&self) -> (&str, &str) {
        match self.api_version.split_once('/') {
            Some((g, v)) => (g, v),
            None => ("", self.api_version.as_str()),
        }
    }

    /// `v1/Kind` or `group/v1/Kind`.
    pub fn gvk_key(&self) -> String { format!("{}/{}", self.api_version, self.kind) }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{} {}/{}", self.gvk_key(), ns, self.name),
            None => write!(f, "{} {}", self.gvk_key(), self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_ref_splits_core_and_named_groups() {
        let ns = ObjectRef::cluster_scoped("v1", "Namespace", "hub");
        assert_eq!(ns.group_version(), ("", "v1"));
        assert_eq!(ns.gvk_key(), "v1/Namespace");

        let cr = ObjectRef::cluster_scoped("rbac.authorization.k8s.io/v1", "ClusterRole", "x");
        assert_eq!(cr.group_version(), ("rbac.authorization.k8s.io", "v1"));
        assert_eq!(cr.to_string(), "rbac.authorization.k8s.io/v1/ClusterRole x");
    }

    #[test]
    fn resource_id_is_transparent_in_json() {
        let id = ResourceId::from_static("cluster-manager/cluster-manager-namespace.yaml");
        let s = serde_json::to_string(&id).unwrap();
        assert_eq!(s, "\"cluster-manager/cluster-manager-namespace.yaml\"");
        assert_eq!(ResourceId::new("a"), ResourceId::from_static("a"));
    }
}
