//! Hub configuration derived from a ClusterManager descriptor.
//!
//! `HubConfig` is both the rendering context for manifest templates (hence
//! the PascalCase field names) and the source of the feature flags the
//! resource selector consumes.

use std::fmt;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::descriptor::{ClusterManager, InstallMode, WebhookConfiguration, DEFAULT_WEBHOOK_PORT};

/// Namespace the hub components run in when not hosted.
pub const DEFAULT_HUB_NAMESPACE: &str = "open-cluster-management-hub";

pub const ADDON_MANAGEMENT_GATE: &str = "AddonManagement";
pub const MANIFEST_WORK_REPLICA_SET_GATE: &str = "ManifestWorkReplicaSet";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct WebhookConfig {
    pub address: String,
    pub port: i32,
    #[serde(rename = "IsIPFormat")]
    pub is_ip_format: bool,
}

impl WebhookConfig {
    pub fn from_configuration(c: &WebhookConfiguration) -> Self {
        Self { address: c.address.clone(), port: c.port, is_ip_format: is_ip_literal(&c.address) }
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            cluster_manager_name: "cluster-manager".to_string(),
            cluster_manager_namespace: DEFAULT_HUB_NAMESPACE.to_string(),
            hosted_mode: false,
            registration_webhook: WebhookConfig { port: DEFAULT_WEBHOOK_PORT, ..WebhookConfig::default() },
            work_webhook: WebhookConfig { port: DEFAULT_WEBHOOK_PORT, ..WebhookConfig::default() },
            add_on_manager_enabled: false,
            mw_replica_set_enabled: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct HubConfig {
    pub cluster_manager_name: String,
    pub cluster_manager_namespace: String,
    pub hosted_mode: bool,
    pub registration_webhook: WebhookConfig,
    pub work_webhook: WebhookConfig,
    pub add_on_manager_enabled: bool,
    #[serde(rename = "MWReplicaSetEnabled")]
    pub mw_replica_set_enabled: bool,
}

impl HubConfig {
    pub fn from_cluster_manager(cm: &ClusterManager) -> Self {
        let spec = &cm.spec;
        let hosted_mode = spec.deploy_option.mode == InstallMode::Hosted;
        let namespace = if hosted_mode { cm.metadata.name.clone() } else { DEFAULT_HUB_NAMESPACE.to_string() };
        let (registration_webhook, work_webhook) = match (hosted_mode, spec.deploy_option.hosted.as_ref()) {
            (true, Some(h)) => (
                WebhookConfig::from_configuration(&h.registration_webhook_configuration),
                WebhookConfig::from_configuration(&h.work_webhook_configuration),
            ),
            _ => {
                let d = HubConfig::default();
                (d.registration_webhook, d.work_webhook)
            }
        };
        Self {
            cluster_manager_name: cm.metadata.name.clone(),
            cluster_manager_namespace: namespace,
            hosted_mode,
            registration_webhook,
            work_webhook,
            add_on_manager_enabled: spec
                .add_on_manager_configuration
                .as_ref()
                .map(|c| c.is_enabled(ADDON_MANAGEMENT_GATE))
                .unwrap_or(false),
            mw_replica_set_enabled: spec
                .work_configuration
                .as_ref()
                .map(|c| c.is_enabled(MANIFEST_WORK_REPLICA_SET_GATE))
                .unwrap_or(false),
        }
    }

    pub fn mode(&self) -> InstallMode {
        if self.hosted_mode { InstallMode::Hosted } else { InstallMode::Default }
    }

    pub fn features(&self) -> FeatureConfig {
        FeatureConfig {
            add_on_manager_enabled: self.add_on_manager_enabled,
            manifest_work_replica_set_enabled: self.mw_replica_set_enabled,
            registration_webhook_uses_ip_endpoint: self.registration_webhook.is_ip_format,
            work_webhook_uses_ip_endpoint: self.work_webhook.is_ip_format,
        }
    }
}

fn is_ip_literal(address: &str) -> bool { address.parse::<IpAddr>().is_ok() }

/// The four flags that decide which resource groups are selected.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct FeatureConfig {
    pub add_on_manager_enabled: bool,
    pub manifest_work_replica_set_enabled: bool,
    pub registration_webhook_uses_ip_endpoint: bool,
    pub work_webhook_uses_ip_endpoint: bool,
}

impl FeatureConfig {
    pub fn is_enabled(&self, feature: Feature) -> bool {
        match feature {
            Feature::AddOnManager => self.add_on_manager_enabled,
            Feature::ManifestWorkReplicaSet => self.manifest_work_replica_set_enabled,
        }
    }

    /// Features currently off, in `Feature::ALL` order.
    pub fn disabled(&self) -> impl Iterator<Item = Feature> + '_ {
        Feature::ALL.into_iter().filter(move |f| !self.is_enabled(*f))
    }
}

/// Toggleable hub subsystems, each owning one resource group.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Feature {
    AddOnManager,
    ManifestWorkReplicaSet,
}

impl Feature {
    pub const ALL: [Feature; 2] = [Feature::AddOnManager, Feature::ManifestWorkReplicaSet];

    pub fn as_str(&self) -> &'static str {
        match self {
            Feature::AddOnManager => "addon-manager",
            Feature::ManifestWorkReplicaSet => "manifestworkreplicaset",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}
