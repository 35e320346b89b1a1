//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::net::TcpListener;

use tagon_router::guards::{Guard, GuardDecision, GuardError};
use tagon_router::http::RequestInfo;
use tagon_router::middleware::{ContextMap, Middleware, MiddlewareError};
use tagon_router::{ServerBuilder, Shutdown, TagonConfig};

/// A page tree on disk plus a configuration pointing at it.
pub struct Site {
    pub dir: TempDir,
}

impl Site {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("pages")).unwrap();
        std::fs::create_dir_all(dir.path().join("components/layouts")).unwrap();
        Self { dir }
    }

    pub fn page(self, relative: &str, content: &str) -> Self {
        write(&self.dir.path().join("pages").join(relative), content);
        self
    }

    pub fn layout(self, name: &str, content: &str) -> Self {
        write(
            &self.dir.path().join(format!("components/layouts/{name}.tg")),
            content,
        );
        self
    }

    pub fn config(&self) -> TagonConfig {
        let root = self.dir.path();
        let mut config = TagonConfig::default();
        config.server.bind_address = "127.0.0.1:0".into();
        config.pages.pages_dir = root.join("pages").to_string_lossy().into_owned();
        config.pages.components_dir = root.join("components").to_string_lossy().into_owned();
        config.middleware.assets.css_path = root.join("output.css").to_string_lossy().into_owned();
        config
    }
}

fn write(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

/// A server running in the background. Shuts down on drop.
pub struct TestServer {
    pub base: String,
    shutdown: Shutdown,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub async fn spawn(builder: ServerBuilder) -> TestServer {
    let server = builder.build().unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());

    let shutdown = Shutdown::new();
    let handle = shutdown.clone();
    tokio::spawn(async move {
        server.run_until(listener, handle).await.unwrap();
    });

    TestServer { base, shutdown }
}

/// Writes a fixed value under `traceId`.
pub struct TraceMiddleware {
    pub name: &'static str,
    pub value: &'static str,
}

#[async_trait]
impl Middleware for TraceMiddleware {
    fn name(&self) -> &str {
        self.name
    }

    async fn before_request(
        &self,
        _request: &RequestInfo,
    ) -> Result<Option<ContextMap>, MiddlewareError> {
        let mut map = ContextMap::new();
        map.insert("traceId".into(), self.value.into());
        Ok(Some(map))
    }
}

/// Always denies with 403.
pub struct DenyGuard {
    pub name: &'static str,
}

#[async_trait]
impl Guard for DenyGuard {
    fn name(&self) -> &str {
        self.name
    }

    async fn can_activate(&self, _request: &RequestInfo) -> Result<GuardDecision, GuardError> {
        Ok(GuardDecision::deny("forbidden"))
    }
}

pub fn deny_guard(name: &'static str) -> Arc<dyn Guard> {
    Arc::new(DenyGuard { name })
}
