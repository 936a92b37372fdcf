//! The hub stage: converge the hub resource set for one descriptor.

use std::sync::Arc;

use anyhow::anyhow;
use metrics::{counter, histogram};
use ocmhub_apply::{Applier, Deleter, Manifest, ResourceApplyResult};
use ocmhub_core::{
    ClusterManager, Condition, ConditionStatus, HubConfig, ResourceId, CONDITION_APPLIED,
};
use ocmhub_manifests::{parse_manifest, related_resource, Renderer, ResourceCatalog, ResourceSetSelector};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::decommission::remove_resource;
use crate::{
    cancellable, AggregateError, FeatureDecommissioner, LegacyCleaner, PassFailure,
    ReconcileError, Stage, StageOutcome,
};

pub const REASON_APPLY_FAILED: &str = "HubResourceApplyFailed";

pub struct HubReconcile {
    selector: ResourceSetSelector,
    renderer: Arc<dyn Renderer>,
    applier: Arc<dyn Applier>,
    deleter: Arc<dyn Deleter>,
    decommissioner: FeatureDecommissioner,
    legacy: LegacyCleaner,
}

/// A selected identifier after rendering. On success its bytes went into the
/// manifests batch handed to the applier.
enum Rendered {
    Manifest,
    Failed(anyhow::Error),
}

impl HubReconcile {
    pub fn new(renderer: Arc<dyn Renderer>, applier: Arc<dyn Applier>, deleter: Arc<dyn Deleter>) -> Self {
        Self::with_catalog(ResourceCatalog::V1, renderer, applier, deleter)
    }

    pub fn with_catalog(
        catalog: ResourceCatalog,
        renderer: Arc<dyn Renderer>,
        applier: Arc<dyn Applier>,
        deleter: Arc<dyn Deleter>,
    ) -> Self {
        let selector = ResourceSetSelector::new(catalog);
        Self {
            selector,
            decommissioner: FeatureDecommissioner::new(selector, renderer.clone(), deleter.clone()),
            legacy: LegacyCleaner::new(deleter.clone()),
            renderer,
            applier,
            deleter,
        }
    }

    pub fn selector(&self) -> &ResourceSetSelector { &self.selector }

    async fn converge(&self, cancel: &CancellationToken, cm: &mut ClusterManager, config: &HubConfig) -> Result<(), ReconcileError> {
        if cancel.is_cancelled() {
            return Err(ReconcileError::Cancelled);
        }
        self.decommissioner.decommission(cancel, cm, config).await?;

        let desired = self.selector.select(config.mode(), &config.features());
        debug!(cluster_manager = %cm.metadata.name, resources = desired.len(), "selected hub resources");

        let mut rendered = Vec::with_capacity(desired.len());
        let mut manifests = Vec::with_capacity(desired.len());
        for id in &desired {
            match self.renderer.render(id, config) {
                Ok(bytes) => {
                    if let Ok(parsed) = parse_manifest(&bytes) {
                        cm.status.record_related(related_resource(&parsed.object));
                    }
                    manifests.push(Manifest { identifier: id.clone(), bytes });
                    rendered.push(Rendered::Manifest);
                }
                Err(e) => {
                    warn!(id = %id, error = %e, "render failed");
                    rendered.push(Rendered::Failed(e.into()));
                }
            }
        }

        let applied = cancellable(cancel, self.applier.apply_all(manifests)).await?;
        let mut failures = collect_apply_failures(&desired, rendered, applied);
        failures.extend(self.legacy.cleanup(cancel).await?);

        match AggregateError::from_failures(failures) {
            None => Ok(()),
            Some(agg) => {
                let message = format!("Failed to apply hub resources: {}", agg);
                cm.status.conditions.set(
                    Condition::new(CONDITION_APPLIED, ConditionStatus::False, REASON_APPLY_FAILED, message)
                        .with_observed_generation(cm.metadata.generation),
                );
                Err(ReconcileError::Aggregate(agg))
            }
        }
    }

    async fn teardown(&self, cancel: &CancellationToken, config: &HubConfig) -> Result<(), ReconcileError> {
        if cancel.is_cancelled() {
            return Err(ReconcileError::Cancelled);
        }
        for id in self.selector.select(config.mode(), &config.features()) {
            remove_resource(cancel, self.renderer.as_ref(), self.deleter.as_ref(), &id, config)
                .await?
                .map_err(|source| ReconcileError::Teardown { identifier: id.clone(), source })?;
        }
        Ok(())
    }
}

/// Merge render failures and applier results back into selection order.
fn collect_apply_failures(
    desired: &[ResourceId],
    rendered: Vec<Rendered>,
    applied: Vec<ResourceApplyResult>,
) -> Vec<PassFailure> {
    let mut applied = applied.into_iter();
    let mut failures = Vec::new();
    for (id, r) in desired.iter().zip(rendered) {
        match r {
            Rendered::Failed(cause) => failures.push(PassFailure::apply(id, None, cause)),
            Rendered::Manifest => match applied.next() {
                Some(ResourceApplyResult { error: Some(cause), object_type, .. }) => {
                    failures.push(PassFailure::apply(id, object_type, cause))
                }
                Some(_) => {}
                None => failures.push(PassFailure::apply(id, None, anyhow!("applier returned no result"))),
            },
        }
    }
    failures
}

#[async_trait::async_trait]
impl Stage for HubReconcile {
    fn name(&self) -> &'static str { "hub" }

    async fn reconcile(&self, cancel: &CancellationToken, cm: &mut ClusterManager, config: &HubConfig) -> StageOutcome {
        let t0 = std::time::Instant::now();
        counter!("hub_reconcile_passes", 1u64);
        let res = self.converge(cancel, cm, config).await;
        histogram!("hub_reconcile_latency_ms", t0.elapsed().as_secs_f64() * 1000.0);
        match res {
            Ok(()) => {
                info!(cluster_manager = %cm.metadata.name, "hub resources converged");
                StageOutcome::proceed()
            }
            Err(e) => {
                counter!("hub_reconcile_failures", 1u64);
                warn!(cluster_manager = %cm.metadata.name, error = %e, "hub reconcile stopped");
                StageOutcome::stop(e)
            }
        }
    }

    async fn clean(&self, cancel: &CancellationToken, cm: &mut ClusterManager, config: &HubConfig) -> StageOutcome {
        match self.teardown(cancel, config).await {
            Ok(()) => {
                info!(cluster_manager = %cm.metadata.name, "hub resources removed");
                StageOutcome::proceed()
            }
            Err(e) => {
                warn!(cluster_manager = %cm.metadata.name, error = %e, "hub teardown stopped");
                StageOutcome::stop(e)
            }
        }
    }
}
