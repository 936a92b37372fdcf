//! ocmhub reconcile: one convergence pass of the hub resources for a
//! cluster-manager descriptor, and the stage pipeline that drives it.
//!
//! A pass decommissions disabled features, renders and applies the selected
//! resource set, removes legacy registrations, and folds every non-fatal
//! failure into a single `Applied=False` condition.

#![forbid(unsafe_code)]

use std::future::Future;

use ocmhub_core::{ClusterManager, HubConfig, ReconcileSignal};
use tokio_util::sync::CancellationToken;

pub mod decommission;
pub mod error;
pub mod hub;
pub mod legacy;
pub mod pipeline;

pub use decommission::FeatureDecommissioner;
pub use error::{AggregateError, FailureKind, PassFailure, ReconcileError};
pub use hub::{HubReconcile, REASON_APPLY_FAILED};
pub use legacy::{LegacyCleaner, LEGACY_API_SERVICES};
pub use pipeline::{Pipeline, MESSAGE_APPLIED, REASON_APPLIED};

/// What a stage hands back to its caller.
#[derive(Debug)]
pub struct StageOutcome {
    pub signal: ReconcileSignal,
    pub error: Option<ReconcileError>,
}

impl StageOutcome {
    pub fn proceed() -> Self { Self { signal: ReconcileSignal::Continue, error: None } }

    pub fn stop(error: ReconcileError) -> Self { Self { signal: ReconcileSignal::Stop, error: Some(error) } }

    pub fn is_stop(&self) -> bool { self.signal.is_stop() }

    pub fn into_result(self) -> Result<ReconcileSignal, ReconcileError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.signal),
        }
    }
}

/// A unit of convergence run by the `Pipeline`.
#[async_trait::async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> &'static str;

    async fn reconcile(&self, cancel: &CancellationToken, cm: &mut ClusterManager, config: &HubConfig) -> StageOutcome;

    async fn clean(&self, cancel: &CancellationToken, cm: &mut ClusterManager, config: &HubConfig) -> StageOutcome;
}

/// Runs `fut` unless `cancel` fires first; the losing future is dropped.
pub(crate) async fn cancellable<F: Future>(cancel: &CancellationToken, fut: F) -> Result<F::Output, ReconcileError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ReconcileError::Cancelled),
        out = fut => Ok(out),
    }
}
