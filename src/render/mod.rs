//! Component rendering collaborator.
//!
//! The router only needs `render(component, context) -> html`. The default
//! [`TemplateRenderer`] is a development renderer backed by minijinja; any
//! other implementation of [`Renderer`] can be plugged in.

pub mod template;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub use template::TemplateRenderer;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("component not found: {0}")]
    NotFound(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("template error in {path}: {source}")]
    Template {
        path: String,
        #[source]
        source: minijinja::Error,
    },

    #[error("{0}")]
    Other(String),
}

/// Turns a component reference and its context into HTML.
#[async_trait]
pub trait Renderer: Send + Sync + 'static {
    async fn render(&self, component: &str, context: &Value) -> Result<String, RenderError>;
}
