//! CORS bookkeeping for page requests.
//!
//! Reports whether the origin and method are allowed before rendering, and
//! contributes `cors_headers` afterwards; the router applies any after-phase
//! `*_headers` object to the response.

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::config::CorsConfig;
use crate::http::request::RequestInfo;
use crate::middleware::{fragment, ContextMap, Middleware, MiddlewareError, ResponseData};

pub struct CorsMiddleware {
    priority: i32,
    allowed_origins: Vec<String>,
    allowed_methods: Vec<String>,
    allowed_headers: Vec<String>,
    allow_credentials: bool,
    max_age_secs: u64,
}

impl CorsMiddleware {
    pub fn new(config: &CorsConfig) -> Self {
        Self {
            priority: config.priority,
            allowed_origins: config.allowed_origins.clone(),
            allowed_methods: config
                .allowed_methods
                .iter()
                .map(|m| m.to_ascii_uppercase())
                .collect(),
            allowed_headers: config.allowed_headers.clone(),
            allow_credentials: config.allow_credentials,
            max_age_secs: config.max_age_secs,
        }
    }

    fn allows_any_origin(&self) -> bool {
        self.allowed_origins.iter().any(|o| o == "*")
    }

    fn origin_allowed(&self, origin: Option<&str>) -> bool {
        self.allows_any_origin()
            || origin
                .map(|origin| self.allowed_origins.iter().any(|o| o == origin))
                .unwrap_or(false)
    }
}

#[async_trait]
impl Middleware for CorsMiddleware {
    fn name(&self) -> &str {
        "cors"
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    async fn before_request(
        &self,
        request: &RequestInfo,
    ) -> Result<Option<ContextMap>, MiddlewareError> {
        let origin = request.header("origin");
        let method = request.method.as_str();

        Ok(fragment(
            "cors",
            json!({
                "origin": origin,
                "origin_allowed": self.origin_allowed(origin),
                "method_allowed": self.allowed_methods.iter().any(|m| m == method),
                "is_preflight": request.method == axum::http::Method::OPTIONS,
            }),
        ))
    }

    async fn after_request(
        &self,
        request: &RequestInfo,
        _response: &ResponseData,
    ) -> Result<Option<ContextMap>, MiddlewareError> {
        let mut headers = Map::new();
        let origin = request.header("origin");

        if self.allows_any_origin() {
            headers.insert("access-control-allow-origin".into(), "*".into());
        } else if let Some(origin) = origin.filter(|o| self.origin_allowed(Some(*o))) {
            headers.insert("access-control-allow-origin".into(), origin.into());
            headers.insert("vary".into(), "Origin".into());
        }
        headers.insert(
            "access-control-allow-methods".into(),
            self.allowed_methods.join(", ").into(),
        );
        headers.insert(
            "access-control-allow-headers".into(),
            self.allowed_headers.join(", ").into(),
        );
        headers.insert(
            "access-control-max-age".into(),
            self.max_age_secs.to_string().into(),
        );
        if self.allow_credentials {
            headers.insert("access-control-allow-credentials".into(), "true".into());
        }

        Ok(fragment("cors_headers", Value::Object(headers)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Method, StatusCode, Uri};

    fn restricted() -> CorsMiddleware {
        CorsMiddleware::new(&CorsConfig {
            allowed_origins: vec!["https://app.example".into()],
            allow_credentials: false,
            ..CorsConfig::default()
        })
    }

    fn request(method: Method, origin: &str) -> RequestInfo {
        RequestInfo::new(method, Uri::from_static("/")).with_header("origin", origin)
    }

    #[tokio::test]
    async fn test_before_reports_origin_and_method() {
        let cors = restricted();

        let ctx = cors
            .before_request(&request(Method::GET, "https://app.example"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ctx["cors"]["origin_allowed"], true);
        assert_eq!(ctx["cors"]["method_allowed"], true);
        assert_eq!(ctx["cors"]["is_preflight"], false);

        let ctx = cors
            .before_request(&request(Method::PATCH, "https://evil.example"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ctx["cors"]["origin_allowed"], false);
        assert_eq!(ctx["cors"]["method_allowed"], false);
    }

    #[tokio::test]
    async fn test_after_headers() {
        let response = ResponseData {
            status: StatusCode::OK,
            html: String::new(),
        };

        let ctx = restricted()
            .after_request(&request(Method::GET, "https://app.example"), &response)
            .await
            .unwrap()
            .unwrap();
        let headers = &ctx["cors_headers"];
        assert_eq!(headers["access-control-allow-origin"], "https://app.example");
        assert!(headers.get("access-control-allow-credentials").is_none());

        let ctx = CorsMiddleware::new(&CorsConfig::default())
            .after_request(&request(Method::GET, "https://other"), &response)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ctx["cors_headers"]["access-control-allow-origin"], "*");
        assert_eq!(ctx["cors_headers"]["access-control-allow-credentials"], "true");
    }
}
