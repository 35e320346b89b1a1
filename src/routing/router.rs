//! Route registry and the per-request page pipeline.
//!
//! # Responsibilities
//! - Register discovered routes, rejecting duplicates and ambiguous shapes
//! - Own the middleware chain, the guard registry and parameter types
//! - Bind literal routes to Axum directly and dynamic routes through
//!   per-prefix dispatch, for all page methods
//! - Drive each request through the pipeline and into an HTTP response
//!
//! # Request State Machine
//! ```text
//! receive → extract params → before middleware → guards ─┬─ denied → guard page
//!                                                        └─ render ─┬─ ok → after middleware → 200
//!                                                                   ├─ error/panic → 500 page
//!                                                                   └─ deadline → 504 page
//! ```
//!
//! # Design Decisions
//! - Mutable only while being assembled; shared as `Arc<RouterManager>` once
//!   serving starts (enable/disable flags aside)
//! - Dynamic routes are matched with `RouteTemplate::match_path` in
//!   specificity order, since Axum rejects a param and a catch-all at the
//!   same position
//! - The pipeline never branches on method

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{Path, Query, Request};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{on, MethodFilter, MethodRouter};
use serde::Serialize;
use serde_json::{json, Value};

use crate::guards::{Guard, GuardsInfo, RouteGuard};
use crate::http::request::RequestInfo;
use crate::http::response::{apply_context_headers, denied_page, not_found_page, render_error_page};
use crate::middleware::{ContextMap, Middleware, MiddlewareChain, MiddlewareInfo, ResponseData};
use crate::observability::metrics;
use crate::render::Renderer;
use crate::resilience::timeouts::{isolate, Isolated};
use crate::routing::discovery::RouteDiscovery;
use crate::routing::error::{RouterError, RouterResult};
use crate::routing::matcher::{shape_of, Captured};
use crate::routing::model::RouteModel;
use crate::routing::params::{DynamicParams, ParamInfo, ParamValue};

/// One registered route as reported by the operator API.
#[derive(Debug, Clone, Serialize)]
pub struct RouteSummary {
    pub path: String,
    pub component: String,
    pub middlewares: Vec<String>,
    pub guards: Vec<String>,
    pub layout: Option<String>,
    pub specificity: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoutesInfo {
    pub total_routes: usize,
    pub routes: Vec<RouteSummary>,
    pub middlewares: Vec<String>,
    pub guards: Vec<String>,
}

/// Axum catch-all name behind which a dynamic route group is dispatched.
const DISPATCH_TAIL: &str = "tail";

/// Methods every page route answers.
fn page_methods() -> MethodFilter {
    MethodFilter::GET
        .or(MethodFilter::POST)
        .or(MethodFilter::PUT)
        .or(MethodFilter::PATCH)
        .or(MethodFilter::DELETE)
}

pub struct RouterManager {
    routes: Vec<Arc<RouteModel>>,
    /// Shape key → template that claimed it.
    shapes: HashMap<String, String>,
    /// Shapes owned by endpoints outside the page tree.
    reserved: HashMap<String, String>,
    /// Literal prefixes of reserved paths that continue with a parameter.
    reserved_prefixes: HashMap<String, String>,
    middleware: MiddlewareChain,
    guards: RouteGuard,
    params: DynamicParams,
    renderer: Arc<dyn Renderer>,
    pipeline_timeout: Option<Duration>,
}

impl RouterManager {
    pub fn new(renderer: Arc<dyn Renderer>) -> Self {
        Self {
            routes: Vec::new(),
            shapes: HashMap::new(),
            reserved: HashMap::new(),
            reserved_prefixes: HashMap::new(),
            middleware: MiddlewareChain::new(),
            guards: RouteGuard::new(),
            params: DynamicParams::new(),
            renderer,
            pipeline_timeout: None,
        }
    }

    /// Deadline applied to every middleware, guard and render call.
    pub fn with_pipeline_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.pipeline_timeout = timeout;
        self
    }

    pub fn register_middleware(&mut self, middleware: Arc<dyn Middleware>, priority: i32) {
        self.middleware.register(middleware, priority);
    }

    /// Register at the middleware's own priority.
    pub fn add_middleware(&mut self, middleware: Arc<dyn Middleware>) {
        self.middleware.add(middleware);
    }

    pub fn register_guard(&mut self, guard: Arc<dyn Guard>) {
        self.guards.register_guard(guard);
    }

    /// Claim an Axum path (e.g. `/api/routes`) for a non-page endpoint.
    pub fn reserve_path(&mut self, axum_path: &str) {
        if axum_path.contains('{') {
            let literals: Vec<&str> = axum_path
                .split('/')
                .filter(|p| !p.is_empty())
                .take_while(|p| !p.starts_with('{'))
                .collect();
            self.reserved_prefixes
                .insert(format!("/{}", literals.join("/")), axum_path.to_string());
        }
        self.reserved
            .insert(shape_of(axum_path), axum_path.to_string());
    }

    /// Add one route to the registry.
    pub fn register_route(&mut self, route: RouteModel) -> RouterResult<()> {
        if self.routes.iter().any(|r| r.path == route.path) {
            return Err(RouterError::DuplicateRoute(route.path));
        }

        // A dynamic group's catch-all would sit beside the reserved param.
        let template = route.template();
        if template.is_dynamic()
            && self
                .reserved_prefixes
                .contains_key(&template.literal_prefix())
        {
            return Err(RouterError::ReservedPath(route.path));
        }

        let shapes = route.template().shapes();
        for shape in &shapes {
            if self.reserved.contains_key(shape) {
                return Err(RouterError::ReservedPath(route.path));
            }
            if let Some(existing) = self.shapes.get(shape) {
                return Err(RouterError::ConflictingRoute {
                    path: route.path,
                    existing: existing.clone(),
                });
            }
        }

        for name in &route.middlewares {
            if !self.middleware.contains(name) {
                tracing::warn!(route = %route.path, middleware = %name, "Route references unknown middleware");
            }
        }
        for name in &route.guards {
            if !self.guards.contains(name) {
                tracing::warn!(route = %route.path, guard = %name, "Route references unknown guard");
            }
        }

        for shape in shapes {
            self.shapes.insert(shape, route.path.clone());
        }
        self.params
            .register_route_params(&route.path, route.param_types.clone());

        tracing::info!(
            route = %route.path,
            component = %route.component,
            specificity = route.specificity(),
            "Route registered"
        );
        self.routes.push(Arc::new(route));
        metrics::set_routes_registered(self.routes.len());
        Ok(())
    }

    /// Discover the page tree and register every route found.
    ///
    /// Returns the number of routes registered.
    pub fn initialize_routes(&mut self, discovery: &RouteDiscovery) -> RouterResult<usize> {
        tracing::info!(dir = %discovery.pages_dir().display(), "Discovering routes");
        let routes = discovery.discover_routes()?;
        let count = routes.len();
        for route in routes {
            self.register_route(route)?;
        }
        tracing::info!(routes = count, "Routing initialized");
        Ok(count)
    }

    pub fn routes(&self) -> impl Iterator<Item = &RouteModel> {
        self.routes.iter().map(Arc::as_ref)
    }

    pub fn middleware(&self) -> &MiddlewareChain {
        &self.middleware
    }

    pub fn enable_middleware(&self, name: &str) -> bool {
        self.middleware.enable(name)
    }

    pub fn disable_middleware(&self, name: &str) -> bool {
        self.middleware.disable(name)
    }

    pub fn routes_info(&self) -> RoutesInfo {
        RoutesInfo {
            total_routes: self.routes.len(),
            routes: self
                .routes
                .iter()
                .map(|r| RouteSummary {
                    path: r.path.clone(),
                    component: r.component.clone(),
                    middlewares: r.middlewares.clone(),
                    guards: r.guards.clone(),
                    layout: r.layout.clone(),
                    specificity: r.specificity(),
                })
                .collect(),
            middlewares: self.middleware.execution_order().to_vec(),
            guards: self.guards.guards_info().guards,
        }
    }

    pub fn middleware_info(&self) -> MiddlewareInfo {
        self.middleware.middleware_info()
    }

    pub fn guards_info(&self) -> GuardsInfo {
        self.guards.guards_info()
    }

    pub fn param_info(&self) -> ParamInfo {
        self.params.param_info()
    }

    /// Axum router for every registered page.
    ///
    /// Literal pages get their own Axum route. Dynamic pages are grouped by
    /// literal prefix behind one Axum catch-all per group and matched here,
    /// so `[id]` and `[...slug]` siblings never reach Axum as rival params.
    pub fn build_router(self: &Arc<Self>) -> axum::Router {
        let mut router = axum::Router::new();
        let mut groups: BTreeMap<String, Vec<Arc<RouteModel>>> = BTreeMap::new();

        for route in &self.routes {
            let template = route.template();
            if template.is_dynamic() {
                groups
                    .entry(template.literal_prefix())
                    .or_default()
                    .push(Arc::clone(route));
                continue;
            }

            let path = template.as_str().to_string();
            let manager = Arc::clone(self);
            let route = Arc::clone(route);
            let handler = move |query: Result<Query<HashMap<String, String>>, QueryRejection>,
                                request: Request| async move {
                let info = request_info(query, request);
                manager.handle(&route, &HashMap::new(), info).await
            };
            router = router.route(&path, on(page_methods(), handler));
        }

        for (prefix, mut routes) in groups {
            routes.sort_by(|a, b| (a.specificity(), &a.path).cmp(&(b.specificity(), &b.path)));
            let bare = routes
                .iter()
                .any(|r| r.template().match_path(&prefix).is_some());
            let group = Arc::new(routes);

            let tail = format!("{}/{{*{DISPATCH_TAIL}}}", prefix.trim_end_matches('/'));
            router = router.route(&tail, self.dispatcher(&prefix, &group));
            // Optional-only tails also match the prefix itself.
            if bare {
                router = router.route(&prefix, self.dispatcher(&prefix, &group));
            }
            tracing::debug!(prefix = %prefix, routes = group.len(), "Dynamic route group bound");
        }
        router
    }

    /// Handler that picks the first route of `group` matching the request.
    fn dispatcher(
        self: &Arc<Self>,
        prefix: &str,
        group: &Arc<Vec<Arc<RouteModel>>>,
    ) -> MethodRouter {
        let manager = Arc::clone(self);
        let group = Arc::clone(group);
        let prefix = prefix.to_string();
        let handler = move |path: Result<Path<HashMap<String, String>>, PathRejection>,
                            query: Result<Query<HashMap<String, String>>, QueryRejection>,
                            request: Request| async move {
            let started = std::time::Instant::now();
            let target = match path.ok().and_then(|Path(mut p)| p.remove(DISPATCH_TAIL)) {
                Some(tail) => format!(
                    "{}/{}",
                    prefix.trim_end_matches('/'),
                    tail.trim_start_matches('/')
                ),
                None => prefix.clone(),
            };
            let info = request_info(query, request);

            match resolve(&group, &target) {
                Some((route, raw)) => manager.handle(&route, &raw, info).await,
                None => {
                    tracing::debug!(path = %info.path(), "No route matched");
                    metrics::record_request("none", StatusCode::NOT_FOUND.as_u16(), started);
                    not_found_page(info.path())
                }
            }
        };
        on(page_methods(), handler)
    }

    /// Run the page pipeline for one request.
    pub async fn handle(
        &self,
        route: &RouteModel,
        raw_params: &HashMap<String, String>,
        request: RequestInfo,
    ) -> Response {
        let started = std::time::Instant::now();
        let deadline = self
            .pipeline_timeout
            .map(|timeout| tokio::time::Instant::now() + timeout);
        let request = request.with_deadline(deadline).with_route(&route.path);

        tracing::debug!(
            request_id = %request.id,
            method = %request.method,
            path = %request.path(),
            route = %route.path,
            "Handling page request"
        );

        let params = self.params.coerce(route.template(), raw_params);
        let middleware_data = self.middleware.run_before(&request, &route.middlewares).await;

        let decision = self.guards.check_guards(&request, &route.guards).await;
        if !decision.allowed {
            let status = decision.status();
            tracing::info!(
                request_id = %request.id,
                route = %route.path,
                status = status.as_u16(),
                reason = %decision.message,
                "Request denied by guard"
            );
            metrics::record_guard_denial(&route.path, status.as_u16());
            metrics::record_request(&route.path, status.as_u16(), started);
            return denied_page(status, &decision.message);
        }

        let context = render_context(route, &request, &params, middleware_data);
        let rendered = isolate(deadline, self.renderer.render(&route.component, &context)).await;
        let (status, error) = match rendered {
            Isolated::Completed(Ok(html)) => {
                return self.finish(route, &request, html, started).await;
            }
            Isolated::Completed(Err(e)) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            Isolated::Panicked(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("renderer panicked: {msg}"),
            ),
            Isolated::TimedOut => (
                StatusCode::GATEWAY_TIMEOUT,
                "render deadline exceeded".to_string(),
            ),
        };

        tracing::error!(
            request_id = %request.id,
            route = %route.path,
            component = %route.component,
            status = status.as_u16(),
            error = %error,
            "Render failed"
        );
        metrics::record_request(&route.path, status.as_u16(), started);
        render_error_page(status, &route.path, &route.component, &error)
    }

    /// After phase and response assembly for a successful render.
    async fn finish(
        &self,
        route: &RouteModel,
        request: &RequestInfo,
        html: String,
        started: std::time::Instant,
    ) -> Response {
        let response_data = ResponseData {
            status: StatusCode::OK,
            html,
        };
        let after = self
            .middleware
            .run_after(request, &response_data, &route.middlewares)
            .await;

        let mut response = (response_data.status, Html(response_data.html)).into_response();
        apply_context_headers(response.headers_mut(), &after);
        metrics::record_request(&route.path, StatusCode::OK.as_u16(), started);
        response
    }
}

/// First route in `group` whose template matches `path`, with its raw params.
///
/// `group` is in specificity order. Catch-all values are re-joined with `/`.
fn resolve(
    group: &[Arc<RouteModel>],
    path: &str,
) -> Option<(Arc<RouteModel>, HashMap<String, String>)> {
    group.iter().find_map(|route| {
        let captured = route.template().match_path(path)?;
        let raw = captured
            .into_iter()
            .map(|(name, value)| match value {
                Captured::Single(value) => (name, value),
                Captured::Many(values) => (name, values.join("/")),
            })
            .collect();
        Some((Arc::clone(route), raw))
    })
}

fn request_info(
    query: Result<Query<HashMap<String, String>>, QueryRejection>,
    request: Request,
) -> RequestInfo {
    let query = query.map(|Query(q)| q).unwrap_or_default();
    let (parts, _body) = request.into_parts();
    RequestInfo::from_parts(&parts, query)
}

/// Context handed to the renderer.
///
/// Static route values are merged last and may shadow the standard keys.
pub fn render_context(
    route: &RouteModel,
    request: &RequestInfo,
    params: &BTreeMap<String, ParamValue>,
    middleware_data: ContextMap,
) -> Value {
    let mut context = json!({
        "request": request.to_context_value(),
        "params": params,
        "query": request.query,
        "middleware_data": middleware_data,
        "route": {
            "path": route.path,
            "component": route.component,
            "layout": route.layout,
        },
    });
    if let Value::Object(map) = &mut context {
        for (key, value) in &route.static_params {
            map.insert(key.clone(), value.clone());
        }
    }
    context
}
