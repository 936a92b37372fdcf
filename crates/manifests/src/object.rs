//! Rendered manifest parsing: object identity and related-resource metadata.

use anyhow::{anyhow, Context, Result};
use kube::core::{ApiResource, GroupVersionKind};
use ocmhub_core::{ObjectRef, RelatedResourceMeta};
use serde_json::Value as Json;

fn max_manifest_bytes() -> usize {
    std::env::var("OCMHUB_MAX_MANIFEST_BYTES")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(1_000_000) // 1 MiB default
}

/// A rendered manifest converted to JSON, plus the identity it declares.
#[derive(Debug, Clone)]
pub struct ParsedManifest {
    pub json: Json,
    pub object: ObjectRef,
}

pub fn parse_manifest(bytes: &[u8]) -> Result<ParsedManifest> {
    if bytes.len() > max_manifest_bytes() {
        return Err(anyhow!("manifest too large (>{} bytes)", max_manifest_bytes()));
    }
    let val: serde_yaml::Value = serde_yaml::from_slice(bytes).context("parsing YAML")?;
    let json = serde_json::to_value(val).context("converting YAML to JSON")?;
    let api_version = json.get("apiVersion").and_then(|v| v.as_str()).ok_or_else(|| anyhow!("manifest missing apiVersion"))?.to_string();
    let kind = json.get("kind").and_then(|v| v.as_str()).ok_or_else(|| anyhow!("manifest missing kind"))?.to_string();
    let meta = json.get("metadata");
    let name = meta
        .and_then(|m| m.get("name"))
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| anyhow!("manifest missing metadata.name"))?
        .to_string();
    let namespace = meta.and_then(|m| m.get("namespace")).and_then(|v| v.as_str()).map(|s| s.to_string());
    Ok(ParsedManifest { object: ObjectRef { api_version, kind, namespace, name }, json })
}

pub fn gvk_of(object: &ObjectRef) -> GroupVersionKind {
    let (group, version) = object.group_version();
    GroupVersionKind::gvk(group, version, &object.kind)
}

/// Status entry for an object touched by a pass; the resource plural follows
/// kube's pluralisation rules.
pub fn related_resource(object: &ObjectRef) -> RelatedResourceMeta {
    let ar = ApiResource::from_gvk(&gvk_of(object));
    RelatedResourceMeta {
        group: ar.group,
        version: ar.version,
        resource: ar.plural,
        namespace: object.namespace.clone().unwrap_or_default(),
        name: object.name.clone(),
    }
}
