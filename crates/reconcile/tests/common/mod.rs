#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use ocmhub_apply::{Applier, DeleteError, Deleter, Manifest, ResourceApplyResult};
use ocmhub_core::{
    ClusterManager, FeatureGate, FeatureGateMode, FeatureGatesConfig, HostedConfiguration,
    HubConfig, InstallMode, ObjectRef, ResourceId, WebhookConfiguration,
};
use ocmhub_manifests::{parse_manifest, RenderError, Renderer, TemplateRenderer};
use tokio_util::sync::CancellationToken;

/// Records every batch and fails the identifiers it was told to fail.
#[derive(Default)]
pub struct FakeApplier {
    pub fail: HashSet<String>,
    pub batches: Mutex<Vec<Vec<ResourceId>>>,
    /// Cancel this token and never return.
    pub hang_with: Option<CancellationToken>,
}

impl FakeApplier {
    pub fn failing(ids: &[&str]) -> Self {
        Self { fail: ids.iter().map(|s| s.to_string()).collect(), ..Default::default() }
    }

    pub fn calls(&self) -> usize { self.batches.lock().unwrap().len() }

    pub fn last_batch(&self) -> Vec<ResourceId> { self.batches.lock().unwrap().last().cloned().unwrap_or_default() }
}

#[async_trait::async_trait]
impl Applier for FakeApplier {
    async fn apply_all(&self, manifests: Vec<Manifest>) -> Vec<ResourceApplyResult> {
        self.batches.lock().unwrap().push(manifests.iter().map(|m| m.identifier.clone()).collect());
        if let Some(token) = &self.hang_with {
            token.cancel();
            std::future::pending::<()>().await;
        }
        manifests
            .into_iter()
            .map(|m| {
                let ty = parse_manifest(&m.bytes).ok().map(|p| p.object.gvk_key());
                if self.fail.contains(m.identifier.as_str()) {
                    ResourceApplyResult::failed(m.identifier, ty, anyhow!("apply denied"))
                } else {
                    ResourceApplyResult { identifier: m.identifier, object_type: ty, error: None }
                }
            })
            .collect()
    }
}

/// Every object is absent unless listed in `present`; names in `fail` error out.
#[derive(Default)]
pub struct FakeDeleter {
    pub present: Mutex<HashSet<ObjectRef>>,
    pub fail: HashSet<String>,
    pub calls: Mutex<Vec<ObjectRef>>,
}

impl FakeDeleter {
    pub fn failing(names: &[&str]) -> Self {
        Self { fail: names.iter().map(|s| s.to_string()).collect(), ..Default::default() }
    }

    pub fn deleted(&self) -> Vec<ObjectRef> { self.calls.lock().unwrap().clone() }

    pub fn deleted_kinds(&self, kind: &str) -> Vec<String> {
        self.deleted().into_iter().filter(|o| o.kind == kind).map(|o| o.name).collect()
    }
}

#[async_trait::async_trait]
impl Deleter for FakeDeleter {
    async fn delete(&self, object: &ObjectRef) -> Result<(), DeleteError> {
        self.calls.lock().unwrap().push(object.clone());
        if self.fail.contains(&object.name) {
            return Err(DeleteError::Failed(anyhow!("delete refused for {}", object.name)));
        }
        if self.present.lock().unwrap().remove(object) { Ok(()) } else { Err(DeleteError::NotFound) }
    }
}

/// Embedded templates, except the listed identifiers fail to render.
pub struct BrokenRenderer {
    inner: TemplateRenderer,
    broken: HashSet<String>,
}

impl BrokenRenderer {
    pub fn new(broken: &[&str]) -> Self {
        Self { inner: TemplateRenderer::embedded(), broken: broken.iter().map(|s| s.to_string()).collect() }
    }
}

impl Renderer for BrokenRenderer {
    fn render(&self, id: &ResourceId, config: &HubConfig) -> Result<Vec<u8>, RenderError> {
        if self.broken.contains(id.as_str()) {
            return Err(RenderError::UnknownTemplate(id.to_string()));
        }
        self.inner.render(id, config)
    }
}

pub fn gates(feature: &str, on: bool) -> Option<FeatureGatesConfig> {
    let mode = if on { FeatureGateMode::Enable } else { FeatureGateMode::Disable };
    Some(FeatureGatesConfig { feature_gates: vec![FeatureGate { feature: feature.to_string(), mode }] })
}

pub fn cluster_manager(addon: bool, mwrs: bool) -> ClusterManager {
    let mut cm = ClusterManager::default();
    cm.metadata.name = "cluster-manager".into();
    cm.metadata.generation = Some(2);
    cm.spec.add_on_manager_configuration = gates("AddonManagement", addon);
    cm.spec.work_configuration = gates("ManifestWorkReplicaSet", mwrs);
    cm
}

pub fn hosted_cluster_manager(registration: &str, work: &str) -> ClusterManager {
    let mut cm = cluster_manager(false, false);
    cm.metadata.name = "hub-a".into();
    cm.spec.deploy_option.mode = InstallMode::Hosted;
    cm.spec.deploy_option.hosted = Some(HostedConfiguration {
        registration_webhook_configuration: WebhookConfiguration { address: registration.into(), port: 443 },
        work_webhook_configuration: WebhookConfiguration { address: work.into(), port: 443 },
    });
    cm
}

/// Object identities the embedded templates produce for `ids`.
pub fn objects_of(ids: &[ResourceId], config: &HubConfig) -> Vec<ObjectRef> {
    let r = TemplateRenderer::embedded();
    ids.iter()
        .map(|id| parse_manifest(&r.render(id, config).unwrap()).unwrap().object)
        .collect()
}
