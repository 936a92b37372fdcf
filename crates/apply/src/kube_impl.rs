//! Kube-backed `Applier` and `Deleter`.

use std::future::Future;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use futures::stream::{self, StreamExt};
use kube::api::{DeleteParams, Patch, PatchParams};
use metrics::{counter, histogram};
use ocmhub_core::ObjectRef;
use ocmhub_kubehub::{is_not_found, ResourceResolver};
use ocmhub_manifests::parse_manifest;
use tracing::{debug, info, warn};

use crate::{
    apply_cache_disabled, apply_concurrency, content_hash, field_manager, ApplyCache, Applier,
    DeleteError, Deleter, Manifest, ResourceApplyResult,
};

/// Server-side apply over dynamic objects.
///
/// Manifests are applied with bounded concurrency through an ordered stream,
/// so results come back in input order regardless of completion order.
pub struct KubeApplier {
    resolver: Arc<ResourceResolver>,
    cache: Arc<ApplyCache>,
    field_manager: String,
    concurrency: usize,
    use_cache: bool,
}

enum Outcome {
    Applied(Option<String>),
    Skipped,
}

impl KubeApplier {
    pub fn new(resolver: Arc<ResourceResolver>, cache: Arc<ApplyCache>) -> Self {
        Self {
            resolver,
            cache,
            field_manager: field_manager(),
            concurrency: apply_concurrency(),
            use_cache: !apply_cache_disabled(),
        }
    }

    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }

    pub fn cache(&self) -> &Arc<ApplyCache> { &self.cache }

    async fn apply_one(&self, manifest: Manifest) -> ResourceApplyResult {
        let t0 = std::time::Instant::now();
        counter!("hub_apply_attempts", 1u64);
        let parsed = match parse_manifest(&manifest.bytes) {
            Ok(p) => p,
            Err(e) => {
                counter!("hub_apply_err", 1u64);
                return ResourceApplyResult::failed(manifest.identifier, None, e);
            }
        };
        let object_type = parsed.object.gvk_key();
        let hash = content_hash(&manifest.bytes);
        match self.patch(&parsed.object, &parsed.json, hash).await {
            Ok(Outcome::Skipped) => {
                counter!("hub_apply_skipped", 1u64);
                debug!(id = %manifest.identifier, object = %parsed.object, "unchanged since last apply");
                ResourceApplyResult::ok(manifest.identifier, object_type)
            }
            Ok(Outcome::Applied(rv)) => {
                histogram!("hub_apply_latency_ms", t0.elapsed().as_secs_f64() * 1000.0);
                counter!("hub_apply_ok", 1u64);
                info!(id = %manifest.identifier, object = %parsed.object, rv = ?rv, "applied");
                if self.use_cache {
                    self.cache.record(&parsed.object, hash, rv);
                }
                ResourceApplyResult::ok(manifest.identifier, object_type)
            }
            Err(e) => {
                counter!("hub_apply_err", 1u64);
                warn!(id = %manifest.identifier, object = %parsed.object, error = %e, "apply failed");
                self.cache.evict(&parsed.object);
                ResourceApplyResult::failed(manifest.identifier, Some(object_type), e)
            }
        }
    }

    async fn patch(&self, object: &ObjectRef, json: &serde_json::Value, hash: u64) -> Result<Outcome> {
        let api = self
            .resolver
            .api_for(object)
            .await?
            .ok_or_else(|| anyhow!("kind {} is not served by the API server", object.gvk_key()))?;

        if self.use_cache && self.cache.fresh_version(object, hash).is_some() {
            let live = api.get_opt(&object.name).await.context("reading live object")?;
            let live_rv = live.and_then(|o| o.metadata.resource_version);
            if self.cache.is_current(object, hash, live_rv.as_deref()) {
                return Ok(Outcome::Skipped);
            }
        }

        let pp = PatchParams::apply(&self.field_manager).force();
        let obj = api
            .patch(&object.name, &pp, &Patch::Apply(json))
            .await
            .map_err(|e| anyhow!("server-side apply failed: {}", e))?;
        Ok(Outcome::Applied(obj.metadata.resource_version))
    }
}

#[async_trait::async_trait]
impl Applier for KubeApplier {
    async fn apply_all(&self, manifests: Vec<Manifest>) -> Vec<ResourceApplyResult> {
        in_order(manifests, self.concurrency, |m| self.apply_one(m)).await
    }
}

/// Runs `op` over `items` with at most `limit` in flight. Output follows input
/// order, not completion order.
pub(crate) async fn in_order<T, F, Fut>(items: Vec<T>, limit: usize, op: F) -> Vec<Fut::Output>
where
    F: FnMut(T) -> Fut,
    Fut: Future,
{
    stream::iter(items).map(op).buffered(limit.max(1)).collect().await
}

/// Dynamic delete with background propagation.
pub struct KubeDeleter {
    resolver: Arc<ResourceResolver>,
    cache: Option<Arc<ApplyCache>>,
}

impl KubeDeleter {
    pub fn new(resolver: Arc<ResourceResolver>) -> Self { Self { resolver, cache: None } }

    /// Share the applier's cache so removed objects are re-applied from scratch.
    pub fn with_cache(mut self, cache: Arc<ApplyCache>) -> Self {
        self.cache = Some(cache);
        self
    }
}

#[async_trait::async_trait]
impl Deleter for KubeDeleter {
    async fn delete(&self, object: &ObjectRef) -> Result<(), DeleteError> {
        let t0 = std::time::Instant::now();
        counter!("hub_delete_attempts", 1u64);
        let Some(api) = self.resolver.api_for(object).await? else {
            counter!("hub_delete_not_found", 1u64);
            debug!(object = %object, "kind not served; nothing to delete");
            return Err(DeleteError::NotFound);
        };
        match api.delete(&object.name, &DeleteParams::background()).await {
            Ok(_) => {
                histogram!("hub_delete_latency_ms", t0.elapsed().as_secs_f64() * 1000.0);
                counter!("hub_delete_ok", 1u64);
                info!(object = %object, "deleted");
                if let Some(cache) = &self.cache {
                    cache.evict(object);
                }
                Ok(())
            }
            Err(e) if is_not_found(&e) => {
                counter!("hub_delete_not_found", 1u64);
                Err(DeleteError::NotFound)
            }
            Err(e) => {
                counter!("hub_delete_err", 1u64);
                Err(DeleteError::Failed(anyhow!("delete {} failed: {}", object, e)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn results_follow_input_order_not_completion() {
        // earlier items finish last
        let delays = vec![40u64, 30, 20, 10, 0];
        let out = in_order(delays.clone(), 4, |ms| async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            ms
        })
        .await;
        assert_eq!(out, delays);
    }

    #[tokio::test]
    async fn concurrency_is_bounded() {
        let live = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let out = in_order((0..10).collect(), 3, |i: usize| {
            let live = live.clone();
            let peak = peak.clone();
            async move {
                let now = live.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                live.fetch_sub(1, Ordering::SeqCst);
                i
            }
        })
        .await;
        assert_eq!(out, (0..10).collect::<Vec<_>>());
        assert!(peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn zero_limit_still_makes_progress() {
        let out = in_order(vec![1, 2], 0, |i| async move { i * 2 }).await;
        assert_eq!(out, vec![2, 4]);
    }
}
