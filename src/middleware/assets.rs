//! Stylesheet injection.
//!
//! The asset build pipeline is external; it leaves a compiled stylesheet on
//! disk. [`FileAssets`] reads it and falls back to a CDN script tag when it
//! is missing.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::config::AssetsConfig;
use crate::http::request::RequestInfo;
use crate::middleware::{fragment, ContextMap, Middleware, MiddlewareError};

/// Context key the snapshot is injected under.
pub const ASSETS_KEY: &str = "assets";

/// What templates see under `assets`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AssetSnapshot {
    pub css_content: String,
    pub css_url: String,
    pub has_css: bool,
    pub use_cdn: bool,
    pub cdn_html: String,
}

/// Source of compiled assets.
#[async_trait]
pub trait AssetProvider: Send + Sync + 'static {
    async fn snapshot(&self) -> AssetSnapshot;

    /// Raw compiled stylesheet, if one exists.
    async fn stylesheet(&self) -> Option<String>;
}

/// Reads the compiled stylesheet from disk on every call.
#[derive(Debug, Clone)]
pub struct FileAssets {
    css_path: PathBuf,
    css_url: String,
    cdn_url: String,
}

impl FileAssets {
    pub fn new(config: &AssetsConfig) -> Self {
        Self {
            css_path: PathBuf::from(&config.css_path),
            css_url: config.css_url.clone(),
            cdn_url: config.cdn_url.clone(),
        }
    }
}

#[async_trait]
impl AssetProvider for FileAssets {
    async fn snapshot(&self) -> AssetSnapshot {
        match self.stylesheet().await {
            Some(css) => AssetSnapshot {
                css_content: css,
                css_url: self.css_url.clone(),
                has_css: true,
                use_cdn: false,
                cdn_html: String::new(),
            },
            None => AssetSnapshot {
                css_content: String::new(),
                css_url: self.css_url.clone(),
                has_css: false,
                use_cdn: true,
                cdn_html: format!(r#"<script src="{}"></script>"#, self.cdn_url),
            },
        }
    }

    async fn stylesheet(&self) -> Option<String> {
        match tokio::fs::read_to_string(&self.css_path).await {
            Ok(css) if !css.trim().is_empty() => Some(css),
            Ok(_) => None,
            Err(e) => {
                tracing::debug!(path = %self.css_path.display(), error = %e, "Compiled stylesheet unavailable");
                None
            }
        }
    }
}

pub struct AssetsMiddleware {
    priority: i32,
    provider: Arc<dyn AssetProvider>,
}

impl AssetsMiddleware {
    pub fn new(provider: Arc<dyn AssetProvider>, priority: i32) -> Self {
        Self { priority, provider }
    }
}

#[async_trait]
impl Middleware for AssetsMiddleware {
    fn name(&self) -> &str {
        "assets"
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    async fn before_request(
        &self,
        _request: &RequestInfo,
    ) -> Result<Option<ContextMap>, MiddlewareError> {
        let snapshot = self.provider.snapshot().await;
        let value = serde_json::to_value(snapshot)
            .map_err(|e| MiddlewareError::failed(format!("asset snapshot: {e}")))?;
        Ok(fragment(ASSETS_KEY, value))
    }
}
