//! Operator endpoints.
//!
//! Read-only views of the registries plus runtime middleware toggles,
//! served as JSON under `/api`. Protected by a bearer key when one is
//! configured.

pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::http::server::AppState;

/// Every path this router serves. Page routes may not claim these.
pub const ADMIN_PATHS: [&str; 9] = [
    "/api/status",
    "/api/health",
    "/api/routes",
    "/api/middlewares",
    "/api/middlewares/{name}/enable",
    "/api/middlewares/{name}/disable",
    "/api/guards",
    "/api/params",
    "/api/performance",
];

pub fn setup_admin_router(state: AppState) -> Router {
    Router::new()
        .route("/api/status", get(get_status))
        .route("/api/health", get(get_health))
        .route("/api/routes", get(get_routes))
        .route("/api/middlewares", get(get_middlewares))
        .route("/api/middlewares/{name}/enable", post(enable_middleware))
        .route("/api/middlewares/{name}/disable", post(disable_middleware))
        .route("/api/guards", get(get_guards))
        .route("/api/params", get(get_params))
        .route("/api/performance", get(get_performance))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            admin_auth_middleware,
        ))
        .with_state(state)
}
