//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Detect clashing middleware priorities and guard names
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: TagonConfig → Result<(), Vec<ValidationError>>

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::TagonConfig;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address `{value}`")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    ZeroValue(&'static str),

    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("guard name `{0}` is defined more than once")]
    DuplicateGuard(String),

    #[error("unknown log level `{0}`")]
    UnknownLogLevel(String),

    #[error("`{0}` is not a valid HTTP method")]
    InvalidMethod(String),
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Check `config`, returning every problem found.
pub fn validate_config(config: &TagonConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "server.bind_address", &config.server.bind_address);
    if config.server.request_timeout_secs == 0 {
        errors.push(ValidationError::ZeroValue("server.request_timeout_secs"));
    }
    if config.server.pipeline_timeout_ms == Some(0) {
        errors.push(ValidationError::ZeroValue("server.pipeline_timeout_ms"));
    }

    if config.pages.pages_dir.trim().is_empty() {
        errors.push(ValidationError::Empty("pages.pages_dir"));
    }
    if config.pages.extension.trim().is_empty() {
        errors.push(ValidationError::Empty("pages.extension"));
    }

    let auth = &config.middleware.auth;
    if auth.enabled && auth.secret.is_empty() {
        errors.push(ValidationError::Empty("middleware.auth.secret"));
    }
    if auth.token_ttl_hours <= 0 {
        errors.push(ValidationError::ZeroValue("middleware.auth.token_ttl_hours"));
    }

    for method in &config.middleware.cors.allowed_methods {
        if method.parse::<axum::http::Method>().is_err() {
            errors.push(ValidationError::InvalidMethod(method.clone()));
        }
    }

    let mut names = HashSet::new();
    if config.guards.authenticated {
        names.insert("authenticated".to_string());
    }
    for role in &config.guards.roles {
        if role.name.trim().is_empty() {
            errors.push(ValidationError::Empty("guards.roles.name"));
        } else if !names.insert(role.name.clone()) {
            errors.push(ValidationError::DuplicateGuard(role.name.clone()));
        }
    }

    let level = config.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::UnknownLogLevel(
            config.observability.log_level.clone(),
        ));
    }
    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::RoleGuardConfig;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&TagonConfig::default()).is_ok());
    }

    #[test]
    fn test_all_errors_reported() {
        let mut config = TagonConfig::default();
        config.server.bind_address = "nowhere".into();
        config.server.pipeline_timeout_ms = Some(0);
        config.observability.log_level = "loud".into();
        config.guards.roles.push(RoleGuardConfig {
            name: "authenticated".into(),
            role: "x".into(),
        });

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::DuplicateGuard("authenticated".into())));
        assert!(errors.contains(&ValidationError::ZeroValue("server.pipeline_timeout_ms")));
    }

    #[test]
    fn test_invalid_cors_method() {
        let mut config = TagonConfig::default();
        config.middleware.cors.allowed_methods.push("NOT A METHOD".into());
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::InvalidMethod("NOT A METHOD".into())]);
    }
}
