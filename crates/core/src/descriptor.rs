//! ClusterManager descriptor schema (the desired state driving a pass).

use serde::{Deserialize, Serialize};

use crate::conditions::ConditionSet;

pub const DEFAULT_WEBHOOK_PORT: i32 = 443;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterManager {
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub spec: ClusterManagerSpec,
    #[serde(default)]
    pub status: ClusterManagerStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterManagerSpec {
    #[serde(default)]
    pub deploy_option: DeployOption,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub add_on_manager_configuration: Option<FeatureGatesConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_configuration: Option<FeatureGatesConfig>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum InstallMode {
    #[default]
    Default,
    Hosted,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeployOption {
    #[serde(default)]
    pub mode: InstallMode,
    /// Only read in `Hosted` mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hosted: Option<HostedConfiguration>,
}

/// Where the hub apiserver reaches the webhooks that run outside of it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HostedConfiguration {
    #[serde(default)]
    pub registration_webhook_configuration: WebhookConfiguration,
    #[serde(default)]
    pub work_webhook_configuration: WebhookConfiguration,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WebhookConfiguration {
    /// IP literal or DNS name.
    pub address: String,
    #[serde(default = "default_webhook_port")]
    pub port: i32,
}

impl Default for WebhookConfiguration {
    fn default() -> Self { Self { address: String::new(), port: DEFAULT_WEBHOOK_PORT } }
}

fn default_webhook_port() -> i32 { DEFAULT_WEBHOOK_PORT }

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FeatureGatesConfig {
    #[serde(default)]
    pub feature_gates: Vec<FeatureGate>,
}

impl FeatureGatesConfig {
    /// Last entry for `feature` wins; absent means disabled.
    pub fn is_enabled(&self, feature: &str) -> bool {
        self.feature_gates
            .iter()
            .rev()
            .find(|g| g.feature == feature)
            .map(|g| g.mode == FeatureGateMode::Enable)
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FeatureGate {
    pub feature: String,
    #[serde(default)]
    pub mode: FeatureGateMode,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum FeatureGateMode {
    Enable,
    #[default]
    Disable,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterManagerStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
    #[serde(default)]
    pub conditions: ConditionSet,
    /// Every object touched by a pass; consumed by external observers only.
    #[serde(default)]
    pub related_resources: Vec<RelatedResourceMeta>,
}

impl ClusterManagerStatus {
    /// Returns false when the identity was already recorded.
    pub fn record_related(&mut self, meta: RelatedResourceMeta) -> bool {
        if self.related_resources.contains(&meta) {
            return false;
        }
        self.related_resources.push(meta);
        true
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct RelatedResourceMeta {
    pub group: String,
    pub version: String,
    pub resource: String,
    #[serde(default)]
    pub namespace: String,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hosted_descriptor_with_defaults() {
        let y = r#"
metadata:
  name: cm
spec:
  deployOption:
    mode: Hosted
    hosted:
      registrationWebhookConfiguration:
        address: 10.0.0.7
      workWebhookConfiguration:
        address: work.example.com
        port: 8443
  workConfiguration:
    featureGates:
      - feature: ManifestWorkReplicaSet
        mode: Enable
"#;
        let cm: ClusterManager = serde_yaml::from_str(y).unwrap();
        assert_eq!(cm.spec.deploy_option.mode, InstallMode::Hosted);
        let hosted = cm.spec.deploy_option.hosted.as_ref().unwrap();
        assert_eq!(hosted.registration_webhook_configuration.port, DEFAULT_WEBHOOK_PORT);
        assert_eq!(hosted.work_webhook_configuration.port, 8443);
        assert!(cm.spec.work_configuration.as_ref().unwrap().is_enabled("ManifestWorkReplicaSet"));
        assert!(cm.spec.add_on_manager_configuration.is_none());
        assert!(cm.status.conditions.is_empty());
    }

    #[test]
    fn last_feature_gate_entry_wins() {
        let cfg = FeatureGatesConfig {
            feature_gates: vec![
                FeatureGate { feature: "AddonManagement".into(), mode: FeatureGateMode::Enable },
                FeatureGate { feature: "AddonManagement".into(), mode: FeatureGateMode::Disable },
            ],
        };
        assert!(!cfg.is_enabled("AddonManagement"));
        assert!(!cfg.is_enabled("Unknown"));
    }

    #[test]
    fn related_resources_are_not_duplicated() {
        let mut st = ClusterManagerStatus::default();
        let m = RelatedResourceMeta { group: "".into(), version: "v1".into(), resource: "namespaces".into(), namespace: "".into(), name: "hub".into() };
        assert!(st.record_related(m.clone()));
        assert!(!st.record_related(m));
        assert_eq!(st.related_resources.len(), 1);
    }
}
