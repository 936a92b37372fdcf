//! Ordered stage runner and the success condition.

use ocmhub_core::{ClusterManager, Condition, ConditionStatus, HubConfig, CONDITION_APPLIED};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{Stage, StageOutcome};

pub const REASON_APPLIED: &str = "ClusterManagerApplied";
pub const MESSAGE_APPLIED: &str = "Components of cluster manager are applied";

#[derive(Default)]
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    pub fn new() -> Self { Self::default() }

    pub fn with_stage(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn stage_names(&self) -> Vec<&'static str> { self.stages.iter().map(|s| s.name()).collect() }

    /// Runs every stage in order and stops at the first `Stop`. Only a pass in
    /// which every stage continued marks the descriptor `Applied=True`.
    ///
    /// Related resources are reset first; stages append what this pass touches.
    pub async fn reconcile(&self, cancel: &CancellationToken, cm: &mut ClusterManager) -> StageOutcome {
        let config = HubConfig::from_cluster_manager(cm);
        cm.status.related_resources.clear();
        for stage in &self.stages {
            let outcome = stage.reconcile(cancel, cm, &config).await;
            if outcome.is_stop() {
                debug!(stage = stage.name(), "stage stopped the pass");
                return outcome;
            }
        }
        cm.status.conditions.set(
            Condition::new(CONDITION_APPLIED, ConditionStatus::True, REASON_APPLIED, MESSAGE_APPLIED)
                .with_observed_generation(cm.metadata.generation),
        );
        cm.status.observed_generation = cm.metadata.generation;
        info!(cluster_manager = %cm.metadata.name, "cluster manager applied");
        StageOutcome::proceed()
    }

    /// Tears stages down in reverse order, stopping at the first `Stop`.
    pub async fn clean(&self, cancel: &CancellationToken, cm: &mut ClusterManager) -> StageOutcome {
        let config = HubConfig::from_cluster_manager(cm);
        for stage in self.stages.iter().rev() {
            let outcome = stage.clean(cancel, cm, &config).await;
            if outcome.is_stop() {
                return outcome;
            }
        }
        StageOutcome::proceed()
    }
}
