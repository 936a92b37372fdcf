//! ocmhub manifests: the versioned hub catalog, resource-set selection,
//! embedded templates and the renderer that turns them into objects.

#![forbid(unsafe_code)]

pub mod assets;
pub mod catalog;
pub mod object;
pub mod render;

pub use catalog::{ResourceCatalog, ResourceGroup, ResourceSetSelector};
pub use object::{gvk_of, parse_manifest, related_resource, ParsedManifest};
pub use render::{RenderError, Renderer, TemplateRenderer};
