//! Removal of resource groups: disabled features before each pass, and the
//! whole selected set on teardown.

use std::sync::Arc;

use anyhow::Context;
use ocmhub_apply::{DeleteError, Deleter};
use ocmhub_core::{ClusterManager, HubConfig, ResourceId};
use ocmhub_manifests::{parse_manifest, Renderer, ResourceSetSelector};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{cancellable, ReconcileError};

/// Renders `id` to learn its identity, then deletes it. Missing objects are fine.
pub(crate) async fn remove_resource(
    cancel: &CancellationToken,
    renderer: &dyn Renderer,
    deleter: &dyn Deleter,
    id: &ResourceId,
    config: &HubConfig,
) -> Result<Result<(), anyhow::Error>, ReconcileError> {
    let object = match renderer
        .render(id, config)
        .map_err(anyhow::Error::from)
        .and_then(|bytes| parse_manifest(&bytes))
        .with_context(|| format!("resolving object for {id}"))
    {
        Ok(parsed) => parsed.object,
        Err(e) => return Ok(Err(e)),
    };
    match cancellable(cancel, deleter.delete(&object)).await? {
        Ok(()) => {
            info!(id = %id, object = %object, "removed");
            Ok(Ok(()))
        }
        Err(DeleteError::NotFound) => {
            debug!(id = %id, object = %object, "already absent");
            Ok(Ok(()))
        }
        Err(DeleteError::Failed(e)) => Ok(Err(e)),
    }
}

/// Removes the resource group of every disabled feature.
pub struct FeatureDecommissioner {
    selector: ResourceSetSelector,
    renderer: Arc<dyn Renderer>,
    deleter: Arc<dyn Deleter>,
}

impl FeatureDecommissioner {
    pub fn new(selector: ResourceSetSelector, renderer: Arc<dyn Renderer>, deleter: Arc<dyn Deleter>) -> Self {
        Self { selector, renderer, deleter }
    }

    /// Stops at the first failed removal; whatever was already removed stays removed.
    pub async fn decommission(&self, cancel: &CancellationToken, cm: &ClusterManager, config: &HubConfig) -> Result<(), ReconcileError> {
        for feature in config.features().disabled() {
            for id in self.selector.feature_group(feature) {
                remove_resource(cancel, self.renderer.as_ref(), self.deleter.as_ref(), &id, config)
                    .await?
                    .map_err(|source| ReconcileError::Decommission { feature, identifier: id.clone(), source })?;
            }
            debug!(cluster_manager = %cm.metadata.name, %feature, "feature decommissioned");
        }
        Ok(())
    }
}
