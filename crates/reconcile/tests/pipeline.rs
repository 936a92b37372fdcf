#![forbid(unsafe_code)]

mod common;

use std::sync::{Arc, Mutex};

use common::*;
use ocmhub_core::{ClusterManager, ConditionStatus, Feature, HubConfig, CONDITION_APPLIED};
use ocmhub_manifests::{related_resource, ResourceSetSelector, TemplateRenderer};
use ocmhub_reconcile::{
    HubReconcile, Pipeline, ReconcileError, Stage, StageOutcome, MESSAGE_APPLIED, REASON_APPLIED,
};
use tokio_util::sync::CancellationToken;

/// Logs which of its methods ran; stops when told to.
struct Recorder {
    name: &'static str,
    stop: bool,
    log: Arc<Mutex<Vec<String>>>,
}

#[async_trait::async_trait]
impl Stage for Recorder {
    fn name(&self) -> &'static str { self.name }

    async fn reconcile(&self, _: &CancellationToken, _: &mut ClusterManager, _: &HubConfig) -> StageOutcome {
        self.log.lock().unwrap().push(format!("reconcile:{}", self.name));
        if self.stop { StageOutcome::stop(ReconcileError::Cancelled) } else { StageOutcome::proceed() }
    }

    async fn clean(&self, _: &CancellationToken, _: &mut ClusterManager, _: &HubConfig) -> StageOutcome {
        self.log.lock().unwrap().push(format!("clean:{}", self.name));
        StageOutcome::proceed()
    }
}

#[tokio::test]
async fn success_condition_only_after_every_stage_continues() {
    let applier = Arc::new(FakeApplier::default());
    let deleter = Arc::new(FakeDeleter::default());
    let log = Arc::new(Mutex::new(Vec::new()));
    let pipeline = Pipeline::new()
        .with_stage(HubReconcile::new(Arc::new(TemplateRenderer::embedded()), applier, deleter))
        .with_stage(Recorder { name: "runtime", stop: false, log: log.clone() });
    let mut cm = cluster_manager(true, true);

    let out = pipeline.reconcile(&CancellationToken::new(), &mut cm).await;

    assert!(out.error.is_none());
    let cond = cm.status.conditions.get(CONDITION_APPLIED).expect("applied condition");
    assert_eq!(cond.status, ConditionStatus::True);
    assert_eq!(cond.reason, REASON_APPLIED);
    assert_eq!(cond.message, MESSAGE_APPLIED);
    assert!(cond.last_transition_time.is_some());
    assert_eq!(cm.status.observed_generation, Some(2));
    assert_eq!(*log.lock().unwrap(), vec!["reconcile:runtime"]);
}

#[tokio::test]
async fn later_stop_keeps_success_condition_unwritten() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let pipeline = Pipeline::new()
        .with_stage(HubReconcile::new(
            Arc::new(TemplateRenderer::embedded()),
            Arc::new(FakeApplier::default()),
            Arc::new(FakeDeleter::default()),
        ))
        .with_stage(Recorder { name: "runtime", stop: true, log: log.clone() })
        .with_stage(Recorder { name: "never", stop: false, log: log.clone() });
    let mut cm = cluster_manager(false, false);

    let out = pipeline.reconcile(&CancellationToken::new(), &mut cm).await;

    assert!(out.is_stop());
    assert!(cm.status.conditions.get(CONDITION_APPLIED).is_none());
    assert_eq!(cm.status.observed_generation, None);
    assert_eq!(*log.lock().unwrap(), vec!["reconcile:runtime"]);
}

#[tokio::test]
async fn failed_pass_then_recovery_flips_condition() {
    let mut cm = cluster_manager(false, false);
    let failing = Pipeline::new().with_stage(HubReconcile::new(
        Arc::new(TemplateRenderer::embedded()),
        Arc::new(FakeApplier::failing(&["cluster-manager/cluster-manager-namespace.yaml"])),
        Arc::new(FakeDeleter::default()),
    ));
    assert!(failing.reconcile(&CancellationToken::new(), &mut cm).await.is_stop());
    assert!(cm.status.conditions.is_status(CONDITION_APPLIED, ConditionStatus::False));

    let healthy = Pipeline::new().with_stage(HubReconcile::new(
        Arc::new(TemplateRenderer::embedded()),
        Arc::new(FakeApplier::default()),
        Arc::new(FakeDeleter::default()),
    ));
    assert!(!healthy.reconcile(&CancellationToken::new(), &mut cm).await.is_stop());
    assert!(cm.status.conditions.is_status(CONDITION_APPLIED, ConditionStatus::True));
    assert_eq!(cm.status.conditions.len(), 1);
}

#[tokio::test]
async fn clean_runs_stages_in_reverse() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let pipeline = Pipeline::new()
        .with_stage(Recorder { name: "hub", stop: false, log: log.clone() })
        .with_stage(Recorder { name: "runtime", stop: false, log: log.clone() });
    assert_eq!(pipeline.stage_names(), vec!["hub", "runtime"]);

    let mut cm = cluster_manager(false, false);
    assert!(!pipeline.clean(&CancellationToken::new(), &mut cm).await.is_stop());
    assert_eq!(*log.lock().unwrap(), vec!["clean:runtime", "clean:hub"]);
}

#[tokio::test]
async fn related_resources_only_list_this_pass() {
    let pipeline = Pipeline::new().with_stage(HubReconcile::new(
        Arc::new(TemplateRenderer::embedded()),
        Arc::new(FakeApplier::default()),
        Arc::new(FakeDeleter::default()),
    ));
    let cancel = CancellationToken::new();
    let mut cm = cluster_manager(true, false);
    let addon: Vec<_> = objects_of(
        &ResourceSetSelector::default().feature_group(Feature::AddOnManager),
        &HubConfig::from_cluster_manager(&cm),
    )
    .iter()
    .map(related_resource)
    .collect();

    assert!(!pipeline.reconcile(&cancel, &mut cm).await.is_stop());
    let first = cm.status.related_resources.len();
    assert!(addon.iter().all(|r| cm.status.related_resources.contains(r)));

    cm.spec.add_on_manager_configuration = gates("AddonManagement", false);
    assert!(!pipeline.reconcile(&cancel, &mut cm).await.is_stop());

    assert_eq!(cm.status.related_resources.len(), first - addon.len());
    assert!(addon.iter().all(|r| !cm.status.related_resources.contains(r)), "addon-manager identities still listed");
}
