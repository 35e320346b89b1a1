use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;

use crate::guards::GuardsInfo;
use crate::http::server::AppState;
use crate::middleware::MiddlewareInfo;
use crate::routing::params::ParamInfo;
use crate::routing::RoutesInfo;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub uptime_secs: u64,
    pub routes: usize,
    pub middlewares: usize,
    pub guards: usize,
}

#[derive(Serialize)]
pub struct Health {
    pub status: &'static str,
    pub routes: usize,
}

#[derive(Serialize)]
pub struct Toggled {
    pub name: String,
    pub enabled: bool,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    let manager = &state.manager;
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        uptime_secs: state.started_at.elapsed().as_secs(),
        routes: manager.routes().count(),
        middlewares: manager.middleware().execution_order().len(),
        guards: manager.guards_info().total,
    })
}

pub async fn get_health(State(state): State<AppState>) -> Json<Health> {
    Json(Health {
        status: "healthy",
        routes: state.manager.routes().count(),
    })
}

pub async fn get_routes(State(state): State<AppState>) -> Json<RoutesInfo> {
    Json(state.manager.routes_info())
}

pub async fn get_middlewares(State(state): State<AppState>) -> Json<MiddlewareInfo> {
    Json(state.manager.middleware_info())
}

pub async fn get_guards(State(state): State<AppState>) -> Json<GuardsInfo> {
    Json(state.manager.guards_info())
}

pub async fn get_params(State(state): State<AppState>) -> Json<ParamInfo> {
    Json(state.manager.param_info())
}

pub async fn get_performance(State(state): State<AppState>) -> Response {
    match &state.logging {
        Some(logging) => Json(logging.performance_report()).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "logging middleware is not registered" })),
        )
            .into_response(),
    }
}

pub async fn enable_middleware(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Response {
    toggle(&state, name, true)
}

pub async fn disable_middleware(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Response {
    toggle(&state, name, false)
}

fn toggle(state: &AppState, name: String, enabled: bool) -> Response {
    let found = if enabled {
        state.manager.enable_middleware(&name)
    } else {
        state.manager.disable_middleware(&name)
    };

    if found {
        Json(Toggled { name, enabled }).into_response()
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("unknown middleware: {name}") })),
        )
            .into_response()
    }
}
