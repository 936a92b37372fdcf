//! Static, versioned catalog of hub manifests and the selector that turns a
//! (mode, feature flags) pair into the ordered set of resources to converge.

use std::fmt;

use ocmhub_core::{Feature, FeatureConfig, InstallMode, ResourceId};
use serde::Serialize;

/// Every manifest the hub stage may apply, partitioned into disjoint groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceCatalog {
    pub version: &'static str,
    pub namespace: &'static str,
    /// Role/binding/identity triads for the always-on subsystems.
    pub baseline: &'static [&'static str],
    pub addon_manager: &'static [&'static str],
    pub mw_replica_set: &'static [&'static str],
    pub default_webhook_services: &'static [&'static str],
    pub hosted_webhook_services: &'static [&'static str],
    /// Hosted only, and only when the registration webhook address is an IP.
    pub hosted_registration_endpoint: &'static str,
    /// Hosted only, and only when the work webhook address is an IP.
    pub hosted_work_endpoint: &'static str,
}

impl ResourceCatalog {
    pub const V1: ResourceCatalog = ResourceCatalog {
        version: "v1",
        namespace: "cluster-manager/cluster-manager-namespace.yaml",
        baseline: &[
            // registration
            "cluster-manager/hub/cluster-manager-registration-clusterrole.yaml",
            "cluster-manager/hub/cluster-manager-registration-clusterrolebinding.yaml",
            "cluster-manager/hub/cluster-manager-registration-serviceaccount.yaml",
            // registration-webhook
            "cluster-manager/hub/cluster-manager-registration-webhook-clusterrole.yaml",
            "cluster-manager/hub/cluster-manager-registration-webhook-clusterrolebinding.yaml",
            "cluster-manager/hub/cluster-manager-registration-webhook-serviceaccount.yaml",
            // work-webhook
            "cluster-manager/hub/cluster-manager-work-webhook-clusterrole.yaml",
            "cluster-manager/hub/cluster-manager-work-webhook-clusterrolebinding.yaml",
            "cluster-manager/hub/cluster-manager-work-webhook-serviceaccount.yaml",
            // placement
            "cluster-manager/hub/cluster-manager-placement-clusterrole.yaml",
            "cluster-manager/hub/cluster-manager-placement-clusterrolebinding.yaml",
            "cluster-manager/hub/cluster-manager-placement-serviceaccount.yaml",
        ],
        addon_manager: &[
            "cluster-manager/hub/cluster-manager-addon-manager-clusterrole.yaml",
            "cluster-manager/hub/cluster-manager-addon-manager-clusterrolebinding.yaml",
            "cluster-manager/hub/cluster-manager-addon-manager-serviceaccount.yaml",
        ],
        mw_replica_set: &[
            "cluster-manager/hub/cluster-manager-manifestworkreplicaset-clusterrole.yaml",
            "cluster-manager/hub/cluster-manager-manifestworkreplicaset-clusterrolebinding.yaml",
            "cluster-manager/hub/cluster-manager-manifestworkreplicaset-serviceaccount.yaml",
        ],
        default_webhook_services: &[
            "cluster-manager/hub/cluster-manager-registration-webhook-service.yaml",
            "cluster-manager/hub/cluster-manager-work-webhook-service.yaml",
        ],
        hosted_webhook_services: &[
            "cluster-manager/hub/cluster-manager-registration-webhook-service-hosted.yaml",
            "cluster-manager/hub/cluster-manager-work-webhook-service-hosted.yaml",
        ],
        hosted_registration_endpoint: "cluster-manager/hub/cluster-manager-registration-webhook-endpoint-hosted.yaml",
        hosted_work_endpoint: "cluster-manager/hub/cluster-manager-work-webhook-endpoint-hosted.yaml",
    };

    pub fn feature_members(&self, feature: Feature) -> &'static [&'static str] {
        match feature {
            Feature::AddOnManager => self.addon_manager,
            Feature::ManifestWorkReplicaSet => self.mw_replica_set,
        }
    }
}

impl Default for ResourceCatalog {
    fn default() -> Self { Self::V1 }
}

/// Name of one disjoint group in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ResourceGroup {
    Baseline,
    Feature(Feature),
    DefaultTopology,
    HostedTopology,
    HostedRegistrationEndpoint,
    HostedWorkEndpoint,
}

impl fmt::Display for ResourceGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceGroup::Baseline => f.write_str("baseline"),
            ResourceGroup::Feature(feat) => write!(f, "feature:{}", feat),
            ResourceGroup::DefaultTopology => f.write_str("mode:default"),
            ResourceGroup::HostedTopology => f.write_str("mode:hosted"),
            ResourceGroup::HostedRegistrationEndpoint => f.write_str("mode:hosted:registration-ip"),
            ResourceGroup::HostedWorkEndpoint => f.write_str("mode:hosted:work-ip"),
        }
    }
}

fn ids(names: &'static [&'static str]) -> impl Iterator<Item = ResourceId> {
    names.iter().map(|n| ResourceId::from_static(*n))
}

/// Pure selection over an injected catalog.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResourceSetSelector {
    catalog: ResourceCatalog,
}

impl ResourceSetSelector {
    pub fn new(catalog: ResourceCatalog) -> Self { Self { catalog } }

    pub fn catalog(&self) -> &ResourceCatalog { &self.catalog }

    /// Ordered resources to converge toward for `mode` and `features`.
    pub fn select(&self, mode: InstallMode, features: &FeatureConfig) -> Vec<ResourceId> {
        let c = &self.catalog;
        let mut out: Vec<ResourceId> = Vec::with_capacity(1 + c.baseline.len() + 8);
        out.push(ResourceId::from_static(c.namespace));
        out.extend(ids(c.baseline));
        for feature in Feature::ALL {
            if features.is_enabled(feature) {
                out.extend(ids(c.feature_members(feature)));
            }
        }
        match mode {
            InstallMode::Hosted => {
                out.extend(ids(c.hosted_webhook_services));
                if features.registration_webhook_uses_ip_endpoint {
                    out.push(ResourceId::from_static(c.hosted_registration_endpoint));
                }
                if features.work_webhook_uses_ip_endpoint {
                    out.push(ResourceId::from_static(c.hosted_work_endpoint));
                }
            }
            InstallMode::Default => out.extend(ids(c.default_webhook_services)),
        }
        out
    }

    /// Members of a feature's group, whether or not the feature is enabled.
    pub fn feature_group(&self, feature: Feature) -> Vec<ResourceId> {
        ids(self.catalog.feature_members(feature)).collect()
    }

    /// Every group in the catalog with its members.
    pub fn groups(&self) -> Vec<(ResourceGroup, Vec<ResourceId>)> {
        let c = &self.catalog;
        let mut baseline = vec![ResourceId::from_static(c.namespace)];
        baseline.extend(ids(c.baseline));
        let mut out = vec![(ResourceGroup::Baseline, baseline)];
        for feature in Feature::ALL {
            out.push((ResourceGroup::Feature(feature), self.feature_group(feature)));
        }
        out.push((ResourceGroup::DefaultTopology, ids(c.default_webhook_services).collect()));
        out.push((ResourceGroup::HostedTopology, ids(c.hosted_webhook_services).collect()));
        out.push((ResourceGroup::HostedRegistrationEndpoint, vec![ResourceId::from_static(c.hosted_registration_endpoint)]));
        out.push((ResourceGroup::HostedWorkEndpoint, vec![ResourceId::from_static(c.hosted_work_endpoint)]));
        out
    }

    /// Which group `id` belongs to, if any.
    pub fn group_of(&self, id: &ResourceId) -> Option<ResourceGroup> {
        self.groups()
            .into_iter()
            .find(|(_, members)| members.contains(id))
            .map(|(g, _)| g)
    }
}
