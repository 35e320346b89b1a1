//! Token-based guards.

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::StatusCode;

use crate::guards::{Guard, GuardDecision, GuardError};
use crate::http::request::RequestInfo;
use crate::security::jwt::{Claims, JwtAuthority};

fn verified(authority: &JwtAuthority, request: &RequestInfo) -> Result<Claims, GuardDecision> {
    let token = request
        .bearer_token()
        .ok_or_else(|| GuardDecision::deny_with(StatusCode::UNAUTHORIZED, "authentication required"))?;
    authority
        .verify(token)
        .map_err(|e| GuardDecision::deny_with(StatusCode::UNAUTHORIZED, e.to_string()))
}

/// Admits requests carrying a valid bearer token (401 otherwise).
pub struct AuthenticatedGuard {
    authority: Arc<JwtAuthority>,
}

impl AuthenticatedGuard {
    pub fn new(authority: Arc<JwtAuthority>) -> Self {
        Self { authority }
    }
}

#[async_trait]
impl Guard for AuthenticatedGuard {
    fn name(&self) -> &str {
        "authenticated"
    }

    async fn can_activate(&self, request: &RequestInfo) -> Result<GuardDecision, GuardError> {
        Ok(match verified(&self.authority, request) {
            Ok(_) => GuardDecision::allow(),
            Err(denied) => denied,
        })
    }
}

/// Admits tokens carrying `role`. Missing token is 401, missing role 403.
pub struct RoleGuard {
    name: String,
    role: String,
    authority: Arc<JwtAuthority>,
}

impl RoleGuard {
    pub fn new(name: impl Into<String>, role: impl Into<String>, authority: Arc<JwtAuthority>) -> Self {
        Self {
            name: name.into(),
            role: role.into(),
            authority,
        }
    }
}

#[async_trait]
impl Guard for RoleGuard {
    fn name(&self) -> &str {
        &self.name
    }

    async fn can_activate(&self, request: &RequestInfo) -> Result<GuardDecision, GuardError> {
        Ok(match verified(&self.authority, request) {
            Ok(claims) if claims.has_role(&self.role) => GuardDecision::allow(),
            Ok(_) => GuardDecision::deny(format!("role `{}` required", self.role)),
            Err(denied) => denied,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::jwt::TokenSubject;
    use axum::http::{Method, Uri};
    use chrono::Duration;

    fn authority() -> Arc<JwtAuthority> {
        Arc::new(JwtAuthority::new("guard-secret"))
    }

    fn with_roles(authority: &JwtAuthority, roles: &[&str]) -> RequestInfo {
        let token = authority
            .issue(
                &TokenSubject {
                    id: "u1".into(),
                    roles: roles.iter().map(|r| r.to_string()).collect(),
                    ..TokenSubject::default()
                },
                Duration::minutes(5),
            )
            .unwrap();
        RequestInfo::new(Method::GET, Uri::from_static("/admin"))
            .with_header("authorization", &format!("Bearer {token}"))
    }

    #[tokio::test]
    async fn test_authenticated_guard() {
        let authority = authority();
        let guard = AuthenticatedGuard::new(authority.clone());

        let anonymous = RequestInfo::new(Method::GET, Uri::from_static("/admin"));
        let decision = guard.can_activate(&anonymous).await.unwrap();
        assert_eq!(decision.status_code, 401);

        let decision = guard.can_activate(&with_roles(&authority, &[])).await.unwrap();
        assert!(decision.allowed);
    }

    #[tokio::test]
    async fn test_role_guard() {
        let authority = authority();
        let guard = RoleGuard::new("admin", "admin", authority.clone());

        let decision = guard
            .can_activate(&with_roles(&authority, &["editor"]))
            .await
            .unwrap();
        assert_eq!(decision.status_code, 403);
        assert!(decision.message.contains("admin"));

        let decision = guard
            .can_activate(&with_roles(&authority, &["admin"]))
            .await
            .unwrap();
        assert!(decision.allowed);
    }

    #[tokio::test]
    async fn test_token_from_other_secret() {
        let guard = RoleGuard::new("admin", "admin", authority());
        let foreign = JwtAuthority::new("other");
        let decision = guard
            .can_activate(&with_roles(&foreign, &["admin"]))
            .await
            .unwrap();
        assert_eq!(decision.status_code, 401);
    }
}
