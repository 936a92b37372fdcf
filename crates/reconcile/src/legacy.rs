//! Best-effort removal of webhook APIService registrations left behind by
//! older hub releases.

use std::sync::Arc;

use ocmhub_apply::{DeleteError, Deleter};
use ocmhub_core::ObjectRef;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{cancellable, PassFailure, ReconcileError};

pub const LEGACY_API_SERVICES: &[&str] = &[
    "v1.admission.cluster.open-cluster-management.io",
    "v1.admission.work.open-cluster-management.io",
];

pub struct LegacyCleaner {
    deleter: Arc<dyn Deleter>,
    names: &'static [&'static str],
}

impl LegacyCleaner {
    pub fn new(deleter: Arc<dyn Deleter>) -> Self { Self { deleter, names: LEGACY_API_SERVICES } }

    pub fn names(&self) -> &'static [&'static str] { self.names }

    /// Tries every name and returns the failures; not-found counts as removed.
    /// Only cancellation is returned as an error.
    pub async fn cleanup(&self, cancel: &CancellationToken) -> Result<Vec<PassFailure>, ReconcileError> {
        let mut failures = Vec::new();
        for name in self.names {
            let object = ObjectRef::cluster_scoped("apiregistration.k8s.io/v1", "APIService", *name);
            match cancellable(cancel, self.deleter.delete(&object)).await? {
                Ok(()) => debug!(name = %name, "legacy APIService removed"),
                Err(DeleteError::NotFound) => {}
                Err(DeleteError::Failed(e)) => {
                    warn!(name = %name, error = %e, "legacy APIService cleanup failed");
                    failures.push(PassFailure::cleanup(*name, e));
                }
            }
        }
        Ok(failures)
    }
}
