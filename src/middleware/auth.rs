//! Bearer-token authentication context.
//!
//! Never denies a request by itself; it only tells templates and guards who
//! the caller is. Denial is the job of the `authenticated` and role guards.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use serde_json::{json, Value};

use crate::config::AuthConfig;
use crate::http::request::RequestInfo;
use crate::middleware::{fragment, ContextMap, Middleware, MiddlewareError, ResponseData};
use crate::security::jwt::{Claims, JwtAuthority, JwtError, TokenSubject};

pub struct AuthMiddleware {
    priority: i32,
    authority: Arc<JwtAuthority>,
    excluded_paths: Vec<String>,
    token_ttl: Duration,
}

impl AuthMiddleware {
    pub fn new(config: &AuthConfig, authority: Arc<JwtAuthority>) -> Self {
        Self {
            priority: config.priority,
            authority,
            excluded_paths: config.excluded_paths.clone(),
            token_ttl: Duration::hours(config.token_ttl_hours),
        }
    }

    /// `/public` excludes `/public` and `/public/x`, not `/publications`.
    /// `/` excludes only the root.
    pub fn is_excluded(&self, path: &str) -> bool {
        self.excluded_paths.iter().any(|excluded| {
            let prefix = excluded.trim_end_matches('/');
            if prefix.is_empty() {
                return path == "/";
            }
            path == prefix
                || path
                    .strip_prefix(prefix)
                    .map(|rest| rest.starts_with('/'))
                    .unwrap_or(false)
        })
    }

    pub fn add_excluded_path(&mut self, path: impl Into<String>) {
        let path = path.into();
        if !self.excluded_paths.contains(&path) {
            tracing::info!(path = %path, "Path excluded from authentication");
            self.excluded_paths.push(path);
        }
    }

    /// Issue a token with the configured lifetime.
    pub fn generate_token(&self, subject: &TokenSubject) -> Result<String, JwtError> {
        self.authority.issue(subject, self.token_ttl)
    }
}

fn user_value(claims: &Claims) -> Value {
    json!({
        "id": claims.sub,
        "email": claims.email,
        "name": claims.name,
        "roles": claims.roles,
    })
}

fn anonymous(error: Option<String>) -> Option<ContextMap> {
    let mut auth = json!({ "authenticated": false, "user": null });
    if let (Some(error), Value::Object(map)) = (error, &mut auth) {
        map.insert("error".into(), Value::String(error));
    }
    fragment("auth", auth)
}

#[async_trait]
impl Middleware for AuthMiddleware {
    fn name(&self) -> &str {
        "auth"
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    async fn before_request(
        &self,
        request: &RequestInfo,
    ) -> Result<Option<ContextMap>, MiddlewareError> {
        if self.is_excluded(request.path()) {
            return Ok(anonymous(None));
        }

        let Some(token) = request.bearer_token() else {
            return Ok(anonymous(Some("token not provided".into())));
        };

        match self.authority.verify(token) {
            Ok(claims) => Ok(fragment(
                "auth",
                json!({ "authenticated": true, "user": user_value(&claims) }),
            )),
            Err(e) => {
                tracing::debug!(request_id = %request.id, error = %e, "Bearer token rejected");
                Ok(anonymous(Some(e.to_string())))
            }
        }
    }

    async fn after_request(
        &self,
        _request: &RequestInfo,
        _response: &ResponseData,
    ) -> Result<Option<ContextMap>, MiddlewareError> {
        Ok(fragment(
            "security_headers",
            json!({
                "x-frame-options": "DENY",
                "x-content-type-options": "nosniff",
            }),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Method, Uri};

    fn auth() -> AuthMiddleware {
        AuthMiddleware::new(&AuthConfig::default(), Arc::new(JwtAuthority::new("s3cret")))
    }

    fn request(path: &'static str) -> RequestInfo {
        RequestInfo::new(Method::GET, Uri::from_static(path))
    }

    #[test]
    fn test_exclusions_are_segment_aware() {
        let auth = auth();
        assert!(auth.is_excluded("/"));
        assert!(auth.is_excluded("/login"));
        assert!(auth.is_excluded("/public/logo"));
        assert!(!auth.is_excluded("/publications"));
        assert!(!auth.is_excluded("/dashboard"));
    }

    #[tokio::test]
    async fn test_valid_token() {
        let auth = auth();
        let token = auth
            .generate_token(&TokenSubject {
                id: "7".into(),
                roles: vec!["admin".into()],
                ..TokenSubject::default()
            })
            .unwrap();
        let request =
            request("/dashboard").with_header("authorization", &format!("Bearer {token}"));

        let ctx = auth.before_request(&request).await.unwrap().unwrap();
        assert_eq!(ctx["auth"]["authenticated"], true);
        assert_eq!(ctx["auth"]["user"]["id"], "7");
        assert_eq!(ctx["auth"]["user"]["roles"][0], "admin");
    }

    #[tokio::test]
    async fn test_missing_and_bad_tokens() {
        let auth = auth();

        let ctx = auth.before_request(&request("/dashboard")).await.unwrap().unwrap();
        assert_eq!(ctx["auth"]["authenticated"], false);
        assert_eq!(ctx["auth"]["error"], "token not provided");

        let bad = request("/dashboard").with_header("authorization", "Bearer nope");
        let ctx = auth.before_request(&bad).await.unwrap().unwrap();
        assert_eq!(ctx["auth"]["authenticated"], false);
        assert!(ctx["auth"]["error"].as_str().unwrap().starts_with("invalid token"));
    }

    #[tokio::test]
    async fn test_excluded_path_skips_verification() {
        let ctx = auth().before_request(&request("/")).await.unwrap().unwrap();
        assert_eq!(ctx["auth"]["authenticated"], false);
        assert!(ctx["auth"].get("error").is_none());
    }
}
