//! Access-control checks evaluated before rendering.
//!
//! # Design Decisions
//! - Guards run in the order the route declares them, not by priority
//! - First denial wins and is returned verbatim
//! - Fail-closed: an error, panic or missed deadline denies with 500

pub mod builtin;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::StatusCode;
use serde::Serialize;
use thiserror::Error;

use crate::http::request::RequestInfo;
use crate::resilience::timeouts::{isolate, Isolated};

pub use builtin::{AuthenticatedGuard, RoleGuard};

/// Message sent with a fail-closed denial.
pub const GUARD_EXECUTION_ERROR: &str = "guard execution error";

/// Outcome of a guard check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuardDecision {
    pub allowed: bool,
    pub message: String,
    pub status_code: u16,
}

impl GuardDecision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            message: String::new(),
            status_code: StatusCode::OK.as_u16(),
        }
    }

    /// Deny with 403.
    pub fn deny(message: impl Into<String>) -> Self {
        Self::deny_with(StatusCode::FORBIDDEN, message)
    }

    pub fn deny_with(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            allowed: false,
            message: message.into(),
            status_code: status.as_u16(),
        }
    }

    fn execution_error() -> Self {
        Self::deny_with(StatusCode::INTERNAL_SERVER_ERROR, GUARD_EXECUTION_ERROR)
    }

    /// Status to respond with; out-of-range codes become 403.
    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::FORBIDDEN)
    }
}

#[derive(Debug, Error)]
#[error("{0}")]
pub struct GuardError(pub String);

/// A pre-render access check.
#[async_trait]
pub trait Guard: Send + Sync + 'static {
    fn name(&self) -> &str;

    async fn can_activate(&self, request: &RequestInfo) -> Result<GuardDecision, GuardError>;
}

#[derive(Debug, Clone, Serialize)]
pub struct GuardsInfo {
    pub total: usize,
    pub guards: Vec<String>,
}

/// Guard registry keyed by name.
#[derive(Default)]
pub struct RouteGuard {
    guards: BTreeMap<String, Arc<dyn Guard>>,
}

impl RouteGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `guard`, replacing any guard with the same name.
    pub fn register_guard(&mut self, guard: Arc<dyn Guard>) {
        let name = guard.name().to_string();
        if self.guards.insert(name.clone(), guard).is_some() {
            tracing::warn!(guard = %name, "Replacing registered guard");
        }
        tracing::info!(guard = %name, "Guard registered");
    }

    pub fn contains(&self, name: &str) -> bool {
        self.guards.contains_key(name)
    }

    /// Evaluate `names` in order, stopping at the first denial.
    pub async fn check_guards(&self, request: &RequestInfo, names: &[String]) -> GuardDecision {
        for name in names {
            let Some(guard) = self.guards.get(name) else {
                tracing::warn!(guard = %name, "Unknown guard, skipping");
                continue;
            };

            let decision = match isolate(request.deadline, guard.can_activate(request)).await {
                Isolated::Completed(Ok(decision)) => decision,
                Isolated::Completed(Err(e)) => {
                    tracing::error!(guard = %name, request_id = %request.id, error = %e, "Guard failed, denying");
                    GuardDecision::execution_error()
                }
                Isolated::TimedOut => {
                    tracing::error!(guard = %name, request_id = %request.id, "Guard missed deadline, denying");
                    GuardDecision::execution_error()
                }
                Isolated::Panicked(msg) => {
                    tracing::error!(guard = %name, request_id = %request.id, panic = %msg, "Guard panicked, denying");
                    GuardDecision::execution_error()
                }
            };

            if !decision.allowed {
                return decision;
            }
        }
        GuardDecision::allow()
    }

    pub fn guards_info(&self) -> GuardsInfo {
        GuardsInfo {
            total: self.guards.len(),
            guards: self.guards.keys().cloned().collect(),
        }
    }
}
