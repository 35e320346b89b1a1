//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Assemble the route registry from configuration and the page tree
//! - Register built-in middleware and guards per configuration
//! - Merge page routes, operator endpoints and the stylesheet route
//! - Wire up outer layers (timeout, request ID, tracing)
//! - Bind server to listener and drain on shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::State;
use axum::http::{header, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::admin::{self, ADMIN_PATHS};
use crate::config::TagonConfig;
use crate::guards::builtin::{AuthenticatedGuard, RoleGuard};
use crate::guards::Guard;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::http::response::not_found_page;
use crate::lifecycle::Shutdown;
use crate::middleware::{
    AssetProvider, AssetsMiddleware, AuthMiddleware, CorsMiddleware, FileAssets, LoggingMiddleware,
    Middleware,
};
use crate::observability::metrics;
use crate::render::{template::TemplateRenderer, Renderer};
use crate::routing::{RouteDiscovery, RouterManager, RouterResult};
use crate::security::JwtAuthority;

/// Application state injected into non-page handlers.
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<RouterManager>,
    pub assets: Arc<dyn AssetProvider>,
    /// Present when the logging middleware is registered.
    pub logging: Option<Arc<LoggingMiddleware>>,
    pub admin_key: Option<Arc<str>>,
    pub started_at: Instant,
}

/// Assembles an [`HttpServer`].
///
/// Built-ins are registered from configuration up front. Callers may add
/// or replace middleware, guards and the renderer before [`build`](Self::build).
pub struct ServerBuilder {
    config: TagonConfig,
    authority: Arc<JwtAuthority>,
    assets: Arc<dyn AssetProvider>,
    renderer: Arc<dyn Renderer>,
    logging: Option<Arc<LoggingMiddleware>>,
    middlewares: Vec<(Arc<dyn Middleware>, i32)>,
    guards: Vec<Arc<dyn Guard>>,
}

impl ServerBuilder {
    pub fn new(config: TagonConfig) -> Self {
        let authority = Arc::new(JwtAuthority::new(&config.middleware.auth.secret));
        let assets: Arc<dyn AssetProvider> = Arc::new(FileAssets::new(&config.middleware.assets));
        let renderer: Arc<dyn Renderer> = Arc::new(TemplateRenderer::new(
            &config.pages.components_dir,
            &config.pages.extension,
        ));

        let mw = &config.middleware;
        let mut middlewares: Vec<(Arc<dyn Middleware>, i32)> = Vec::new();
        let mut logging = None;
        if mw.logging.enabled {
            let logger = Arc::new(LoggingMiddleware::new(&mw.logging));
            logging = Some(Arc::clone(&logger));
            middlewares.push((logger, mw.logging.priority));
        }
        if mw.cors.enabled {
            middlewares.push((Arc::new(CorsMiddleware::new(&mw.cors)), mw.cors.priority));
        }
        if mw.auth.enabled {
            let auth = AuthMiddleware::new(&mw.auth, Arc::clone(&authority));
            middlewares.push((Arc::new(auth), mw.auth.priority));
        }
        if mw.assets.enabled {
            let assets_mw = AssetsMiddleware::new(Arc::clone(&assets), mw.assets.priority);
            middlewares.push((Arc::new(assets_mw), mw.assets.priority));
        }

        let mut guards: Vec<Arc<dyn Guard>> = Vec::new();
        if config.guards.authenticated {
            guards.push(Arc::new(AuthenticatedGuard::new(Arc::clone(&authority))));
        }
        for role in &config.guards.roles {
            guards.push(Arc::new(RoleGuard::new(
                &role.name,
                &role.role,
                Arc::clone(&authority),
            )));
        }

        Self {
            config,
            authority,
            assets,
            renderer,
            logging,
            middlewares,
            guards,
        }
    }

    /// Token authority shared by the auth middleware and built-in guards.
    pub fn authority(&self) -> Arc<JwtAuthority> {
        Arc::clone(&self.authority)
    }

    /// Register `middleware` at `priority`, replacing a built-in of the same name.
    pub fn middleware(mut self, middleware: Arc<dyn Middleware>, priority: i32) -> Self {
        self.middlewares.push((middleware, priority));
        self
    }

    pub fn guard(mut self, guard: Arc<dyn Guard>) -> Self {
        self.guards.push(guard);
        self
    }

    pub fn renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderer = renderer;
        self
    }

    /// Discover pages, register every route and bind handlers.
    ///
    /// Fails on any route registration error; nothing is served then.
    pub fn build(self) -> RouterResult<HttpServer> {
        let pipeline_timeout = self
            .config
            .server
            .pipeline_timeout_ms
            .map(Duration::from_millis);
        let mut manager = RouterManager::new(self.renderer).with_pipeline_timeout(pipeline_timeout);

        for (middleware, priority) in self.middlewares {
            manager.register_middleware(middleware, priority);
        }
        for guard in self.guards {
            manager.register_guard(guard);
        }

        if self.config.admin.enabled {
            for path in ADMIN_PATHS {
                manager.reserve_path(path);
            }
        }
        let css_url = self.config.middleware.assets.css_url.clone();
        if self.config.middleware.assets.enabled {
            manager.reserve_path(&css_url);
        }

        let discovery = RouteDiscovery::new(&self.config.pages.pages_dir)
            .with_extension(&self.config.pages.extension);
        manager.initialize_routes(&discovery)?;

        let state = AppState {
            manager: Arc::new(manager),
            assets: self.assets,
            logging: self.logging,
            admin_key: self.config.admin.api_key.as_deref().map(Arc::from),
            started_at: Instant::now(),
        };

        let router = HttpServer::build_router(&self.config, &css_url, state.clone());
        Ok(HttpServer {
            router,
            config: self.config,
            state,
        })
    }
}

/// HTTP server for the page tree.
pub struct HttpServer {
    router: Router,
    config: TagonConfig,
    state: AppState,
}

impl HttpServer {
    /// Build a server with the built-in registries only.
    pub fn new(config: TagonConfig) -> RouterResult<Self> {
        ServerBuilder::new(config).build()
    }

    pub fn builder(config: TagonConfig) -> ServerBuilder {
        ServerBuilder::new(config)
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &TagonConfig, css_url: &str, state: AppState) -> Router {
        let mut router = state.manager.build_router();

        if config.admin.enabled {
            router = router.merge(admin::setup_admin_router(state.clone()));
        }
        if config.middleware.assets.enabled {
            router = router.merge(
                Router::new()
                    .route(css_url, get(stylesheet_handler))
                    .with_state(state),
            );
        }

        router
            .fallback(not_found_handler)
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.server.request_timeout_secs,
            )))
            .layer(propagate_request_id_layer())
            .layer(set_request_id_layer())
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server until Ctrl+C.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let shutdown = Shutdown::new();
        crate::lifecycle::trigger_on_ctrl_c(shutdown.clone());
        self.run_until(listener, shutdown).await
    }

    /// Run the server until `shutdown` is triggered, then drain in-flight requests.
    pub async fn run_until(
        self,
        listener: TcpListener,
        shutdown: Shutdown,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            routes = self.state.manager.routes().count(),
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.wait().await })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn config(&self) -> &TagonConfig {
        &self.config
    }

    pub fn manager(&self) -> &Arc<RouterManager> {
        &self.state.manager
    }

    /// The fully layered router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }
}

/// Serves the compiled stylesheet.
async fn stylesheet_handler(State(state): State<AppState>) -> Response {
    match state.assets.stylesheet().await {
        Some(css) => ([(header::CONTENT_TYPE, "text/css; charset=utf-8")], css).into_response(),
        None => (StatusCode::NOT_FOUND, "stylesheet not built").into_response(),
    }
}

async fn not_found_handler(uri: Uri) -> Response {
    let started = Instant::now();
    tracing::debug!(path = %uri.path(), "No route matched");
    metrics::record_request("none", StatusCode::NOT_FOUND.as_u16(), started);
    not_found_page(uri.path())
}
