//! ocmhub kubehub: kube client bootstrap and GVK discovery with a per-process cache.

#![forbid(unsafe_code)]

use std::sync::Mutex;

use anyhow::{Context, Result};
use kube::{
    api::Api,
    core::{ApiResource, DynamicObject, GroupVersionKind},
    discovery::{Discovery, Scope},
    Client,
};
use metrics::counter;
use ocmhub_core::ObjectRef;
use rustc_hash::FxHashMap;
use tokio::sync::OnceCell;
use tracing::{debug, info};

static CLIENT: OnceCell<Client> = OnceCell::const_new();

/// Shared client for the current kube context (kubeconfig or in-cluster).
pub async fn get_kube_client() -> Result<Client> {
    let client = CLIENT
        .get_or_try_init(|| async {
            let c = Client::try_default().await.context("building kube client")?;
            info!(default_ns = %c.default_namespace(), "kube client ready");
            Ok::<_, anyhow::Error>(c)
        })
        .await?;
    Ok(client.clone())
}

/// Served resource for a GVK and whether it is namespaced.
#[derive(Debug, Clone)]
pub struct ResolvedKind {
    pub resource: ApiResource,
    pub namespaced: bool,
}

/// Resolves GVKs through API discovery and caches the answer, including
/// "not served". Kinds the hub applies are static, so entries never expire.
pub struct ResourceResolver {
    client: Client,
    cache: Mutex<FxHashMap<GroupVersionKind, Option<ResolvedKind>>>,
}

impl std::fmt::Debug for ResourceResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceResolver").finish_non_exhaustive()
    }
}

impl ResourceResolver {
    pub fn new(client: Client) -> Self {
        Self { client, cache: Mutex::new(FxHashMap::default()) }
    }

    pub fn client(&self) -> &Client { &self.client }

    /// `Ok(None)` when the server does not serve the kind.
    pub async fn resolve(&self, gvk: &GroupVersionKind) -> Result<Option<ResolvedKind>> {
        if let Some(hit) = self.cached(gvk) {
            return Ok(hit);
        }
        counter!("hub_discovery_lookups", 1u64);
        let found = find_api_resource(self.client.clone(), gvk).await?;
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(gvk.clone(), found.clone());
        }
        Ok(found)
    }

    fn cached(&self, gvk: &GroupVersionKind) -> Option<Option<ResolvedKind>> {
        self.cache.lock().ok().and_then(|c| c.get(gvk).cloned())
    }

    /// Dynamic API handle for `object`; `Ok(None)` when its kind is not served.
    pub async fn api_for(&self, object: &ObjectRef) -> Result<Option<Api<DynamicObject>>> {
        let (group, version) = object.group_version();
        let gvk = GroupVersionKind::gvk(group, version, &object.kind);
        let Some(kind) = self.resolve(&gvk).await? else { return Ok(None) };
        let api = if kind.namespaced {
            let ns = object.namespace.as_deref().unwrap_or_else(|| self.client.default_namespace());
            Api::namespaced_with(self.client.clone(), ns, &kind.resource)
        } else {
            Api::all_with(self.client.clone(), &kind.resource)
        };
        Ok(Some(api))
    }
}

async fn find_api_resource(client: Client, gvk: &GroupVersionKind) -> Result<Option<ResolvedKind>> {
    let discovery = Discovery::new(client)
        .filter(&[gvk.group.as_str()])
        .run()
        .await
        .with_context(|| format!("discovering API group {:?}", gvk.group))?;
    for group in discovery.groups() {
        for (ar, caps) in group.recommended_resources() {
            if ar.group == gvk.group && ar.version == gvk.version && ar.kind == gvk.kind {
                let namespaced = matches!(caps.scope, Scope::Namespaced);
                debug!(kind = %gvk.kind, plural = %ar.plural, namespaced, "resolved kind");
                return Ok(Some(ResolvedKind { resource: ar, namespaced }));
            }
        }
    }
    debug!(group = %gvk.group, version = %gvk.version, kind = %gvk.kind, "kind not served");
    Ok(None)
}

/// True for an API error with HTTP status 404.
pub fn is_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(resp) if resp.code == 404)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::error::ErrorResponse;

    #[test]
    fn not_found_only_matches_404() {
        let nf = kube::Error::Api(ErrorResponse { status: "Failure".into(), message: "gone".into(), reason: "NotFound".into(), code: 404 });
        let conflict = kube::Error::Api(ErrorResponse { status: "Failure".into(), message: "busy".into(), reason: "Conflict".into(), code: 409 });
        assert!(is_not_found(&nf));
        assert!(!is_not_found(&conflict));
    }
}
