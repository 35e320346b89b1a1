//! Request view shared by middleware, guards and the renderer.
//!
//! # Responsibilities
//! - Capture the parts of an HTTP request the pipeline needs
//! - Carry the request id and the per-request deadline
//! - Project the request into the render context
//!
//! # Design Decisions
//! - Built once per request, never shared across requests
//! - Request id comes from `x-request-id` (set by the request-id layer) or a fresh UUID

use std::collections::HashMap;
use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, Uri};
use serde_json::{json, Map, Value};
use tokio::time::Instant;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

/// Header carrying the request id.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Layer assigning a UUID v4 request id to requests that lack one.
pub fn set_request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::new(HeaderName::from_static(X_REQUEST_ID), MakeRequestUuid)
}

/// Layer copying the request id onto the response.
pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::new(HeaderName::from_static(X_REQUEST_ID))
}

/// Read-only request data handed to every pipeline stage.
#[derive(Debug, Clone)]
pub struct RequestInfo {
    pub id: String,
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub query: HashMap<String, String>,
    pub remote_addr: Option<SocketAddr>,
    /// Template of the matched route, e.g. `/user/[id]`.
    pub route: Option<String>,
    /// Point in time after which pipeline stages are abandoned.
    pub deadline: Option<Instant>,
}

impl RequestInfo {
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            method,
            uri,
            headers: HeaderMap::new(),
            query: HashMap::new(),
            remote_addr: None,
            route: None,
            deadline: None,
        }
    }

    /// Build from the request head produced by Axum.
    pub fn from_parts(parts: &Parts, query: HashMap<String, String>) -> Self {
        let id = parts
            .headers
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let remote_addr = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);

        Self {
            id,
            method: parts.method.clone(),
            uri: parts.uri.clone(),
            headers: parts.headers.clone(),
            query,
            remote_addr,
            route: None,
            deadline: None,
        }
    }

    pub fn with_header(mut self, name: &'static str, value: &str) -> Self {
        if let Ok(value) = HeaderValue::from_str(value) {
            self.headers.insert(HeaderName::from_static(name), value);
        }
        self
    }

    pub fn with_route(mut self, template: &str) -> Self {
        self.route = Some(template.to_string());
        self
    }

    pub fn with_deadline(mut self, deadline: Option<Instant>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Matched route template, or the concrete path before routing.
    pub fn route_or_path(&self) -> &str {
        self.route.as_deref().unwrap_or_else(|| self.path())
    }

    /// Header value as UTF-8, if present and valid.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Bearer token from the `Authorization` header.
    pub fn bearer_token(&self) -> Option<&str> {
        self.header("authorization")?.strip_prefix("Bearer ")
    }

    /// The `request` entry of the render context.
    pub fn to_context_value(&self) -> Value {
        let headers: Map<String, Value> = self
            .headers
            .iter()
            .filter_map(|(name, value)| {
                let value = value.to_str().ok()?;
                Some((name.as_str().to_string(), Value::String(value.to_string())))
            })
            .collect();

        json!({
            "id": self.id,
            "method": self.method.as_str(),
            "url": self.uri.to_string(),
            "path": self.path(),
            "query": self.query,
            "headers": headers,
            "client_ip": self.remote_addr.map(|addr| addr.ip().to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[test]
    fn test_from_parts_reads_request_id() {
        let (parts, _) = Request::builder()
            .uri("/user/5?tab=posts")
            .header(X_REQUEST_ID, "abc-123")
            .body(())
            .unwrap()
            .into_parts();

        let query = HashMap::from([("tab".to_string(), "posts".to_string())]);
        let info = RequestInfo::from_parts(&parts, query);
        assert_eq!(info.id, "abc-123");
        assert_eq!(info.path(), "/user/5");

        let ctx = info.to_context_value();
        assert_eq!(ctx["path"], "/user/5");
        assert_eq!(ctx["query"]["tab"], "posts");
        assert_eq!(ctx["headers"][X_REQUEST_ID], "abc-123");
    }

    #[test]
    fn test_bearer_token() {
        let info = RequestInfo::new(Method::GET, Uri::from_static("/"))
            .with_header("authorization", "Bearer tok");
        assert_eq!(info.bearer_token(), Some("tok"));

        let info = RequestInfo::new(Method::GET, Uri::from_static("/"))
            .with_header("authorization", "Basic xyz");
        assert_eq!(info.bearer_token(), None);
    }
}
