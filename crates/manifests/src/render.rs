//! Template rendering for catalog manifests.
//!
//! Templates use minijinja's default `{{ ... }}` / `{% ... %}` syntax with
//! `HubConfig` (PascalCase keys) as the context. Undefined variables fail the
//! render instead of producing empty strings.

use minijinja::{Environment, UndefinedBehavior};
use ocmhub_core::{HubConfig, ResourceId};
use thiserror::Error;
use tracing::debug;

use crate::assets;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("no template named {0:?}")]
    UnknownTemplate(String),
    #[error("rendering {name:?}: {source}")]
    Template {
        name: String,
        #[source]
        source: minijinja::Error,
    },
}

/// Turns a resource identifier into manifest bytes. Must be pure.
pub trait Renderer: Send + Sync {
    fn render(&self, id: &ResourceId, config: &HubConfig) -> Result<Vec<u8>, RenderError>;
}

pub struct TemplateRenderer {
    env: Environment<'static>,
}

impl std::fmt::Debug for TemplateRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateRenderer").finish_non_exhaustive()
    }
}

impl Default for TemplateRenderer {
    fn default() -> Self { Self::embedded() }
}

impl TemplateRenderer {
    /// Renderer over the manifests compiled into this crate.
    ///
    /// # Panics
    ///
    /// If an embedded template fails to parse.
    pub fn embedded() -> Self {
        // Embedded templates are covered by tests; a syntax error here is a build defect.
        Self::from_sources(assets::ASSETS).unwrap_or_else(|(name, e)| panic!("embedded template {name} is invalid: {e}"))
    }

    /// Build from `(name, source)` pairs; returns the first template that fails to parse.
    pub fn from_sources(sources: &'static [(&'static str, &'static str)]) -> Result<Self, (&'static str, minijinja::Error)> {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_keep_trailing_newline(true);
        for (name, src) in sources {
            env.add_template(*name, *src).map_err(|e| (*name, e))?;
        }
        Ok(Self { env })
    }
}

impl Renderer for TemplateRenderer {
    fn render(&self, id: &ResourceId, config: &HubConfig) -> Result<Vec<u8>, RenderError> {
        let tmpl = self
            .env
            .get_template(id.as_str())
            .map_err(|_| RenderError::UnknownTemplate(id.to_string()))?;
        let out = tmpl
            .render(config)
            .map_err(|source| RenderError::Template { name: id.to_string(), source })?;
        debug!(template = %id, bytes = out.len(), "rendered manifest");
        Ok(out.into_bytes())
    }
}
