//! Request interceptors.
//!
//! # Data Flow
//! ```text
//! RequestInfo
//!     → chain.rs run_before (ascending priority)  → merged context
//!     → [guards, render]
//!     → chain.rs run_after  (descending priority) → merged context
//! ```
//!
//! # Design Decisions
//! - Fail-open: a failing middleware contributes nothing, the chain continues
//! - Later contributions overwrite earlier ones key by key
//! - Instances are shared by all in-flight requests; per-request state lives
//!   in concurrent maps keyed by request id, never in plain fields

pub mod assets;
pub mod auth;
pub mod chain;
pub mod cors;
pub mod logging;

use async_trait::async_trait;
use axum::http::StatusCode;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::http::request::RequestInfo;

pub use assets::{AssetProvider, AssetSnapshot, AssetsMiddleware, FileAssets};
pub use auth::AuthMiddleware;
pub use chain::{MiddlewareChain, MiddlewareDescriptor, MiddlewareInfo};
pub use cors::CorsMiddleware;
pub use logging::LoggingMiddleware;

/// Key/value fragment merged into the render context.
pub type ContextMap = Map<String, Value>;

/// Priority used when a middleware does not state one.
pub const DEFAULT_PRIORITY: i32 = 50;

/// Error raised by a middleware. Always absorbed by the chain.
#[derive(Debug, Error)]
pub enum MiddlewareError {
    #[error("{0}")]
    Failed(String),

    #[error("deadline exceeded")]
    DeadlineExceeded,

    #[error("panicked: {0}")]
    Panicked(String),
}

impl MiddlewareError {
    pub fn failed(message: impl Into<String>) -> Self {
        MiddlewareError::Failed(message.into())
    }
}

/// What the after phase gets to see of a rendered response.
#[derive(Debug, Clone)]
pub struct ResponseData {
    pub status: StatusCode,
    pub html: String,
}

/// A request interceptor with a before and an after hook.
#[async_trait]
pub trait Middleware: Send + Sync + 'static {
    /// Unique registry name, referenced from page directives.
    fn name(&self) -> &str;

    /// Priority used by [`MiddlewareChain::add`]. Lower runs earlier.
    fn priority(&self) -> i32 {
        DEFAULT_PRIORITY
    }

    /// Runs before guards and rendering.
    async fn before_request(
        &self,
        _request: &RequestInfo,
    ) -> Result<Option<ContextMap>, MiddlewareError> {
        Ok(None)
    }

    /// Runs after a successful render.
    async fn after_request(
        &self,
        _request: &RequestInfo,
        _response: &ResponseData,
    ) -> Result<Option<ContextMap>, MiddlewareError> {
        Ok(None)
    }
}

/// Wrap a single value under `key`.
pub(crate) fn fragment(key: &str, value: Value) -> Option<ContextMap> {
    let mut map = ContextMap::new();
    map.insert(key.to_string(), value);
    Some(map)
}
