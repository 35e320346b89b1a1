//! File-based route discovery.
//!
//! # Responsibilities
//! - Walk the pages tree and pick up component files
//! - Convert each file path into a route template
//! - Read the file's directive block into a [`RouteModel`]
//! - Sort the result by specificity
//!
//! # Design Decisions
//! - A missing pages root is created and seeded with an index page
//! - Unreadable files and malformed templates are logged and skipped
//! - Walk order is sorted, and ties in specificity fall back to the path,
//!   so repeated scans of the same tree give the same list

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::routing::directives::parse_directives;
use crate::routing::error::{RouterError, RouterResult};
use crate::routing::model::RouteModel;

/// Default component source extension.
pub const COMPONENT_EXTENSION: &str = "tg";

const DEFAULT_INDEX: &str = r#"# @middlewares: logging, assets

Html:
<div class="welcome-page">
    <h1>Welcome</h1>
    <p>This page lives at <code>{{ route.component }}</code>. Edit it to get started.</p>
    <nav>
        <a href="/about">About</a> |
        <a href="/user/123">User 123</a>
    </nav>
</div>

Css:
.welcome-page { max-width: 800px; margin: 0 auto; padding: 2rem; text-align: center; }
.welcome-page h1 { color: #3b82f6; }
"#;

/// Scans a pages directory for routable files.
#[derive(Debug, Clone)]
pub struct RouteDiscovery {
    pages_dir: PathBuf,
    extension: String,
}

impl RouteDiscovery {
    pub fn new(pages_dir: impl Into<PathBuf>) -> Self {
        Self {
            pages_dir: pages_dir.into(),
            extension: COMPONENT_EXTENSION.to_string(),
        }
    }

    /// Use a different component extension (without the leading dot).
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn pages_dir(&self) -> &Path {
        &self.pages_dir
    }

    /// Discover every route under the pages root, most specific first.
    pub fn discover_routes(&self) -> RouterResult<Vec<RouteModel>> {
        if !self.pages_dir.exists() {
            tracing::warn!(dir = %self.pages_dir.display(), "Pages directory not found, creating it");
            self.seed_default_pages()?;
        }

        let mut routes = Vec::new();
        let walker = WalkDir::new(&self.pages_dir).sort_by_file_name();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping unreadable pages entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() || !self.has_component_extension(entry.path()) {
                continue;
            }
            if let Some(route) = self.analyze_file(entry.path()) {
                routes.push(route);
            }
        }

        routes.sort_by(|a, b| {
            a.specificity()
                .cmp(&b.specificity())
                .then_with(|| a.path.cmp(&b.path))
        });

        tracing::info!(
            dir = %self.pages_dir.display(),
            routes = routes.len(),
            "Route discovery complete"
        );
        Ok(routes)
    }

    fn has_component_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext == self.extension)
            .unwrap_or(false)
    }

    fn analyze_file(&self, file: &Path) -> Option<RouteModel> {
        let route_path = self.route_path_for(file)?;

        let content = match fs::read_to_string(file) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(file = %file.display(), error = %e, "Failed to read page, skipping");
                return None;
            }
        };
        let directives = parse_directives(&content);

        let component = file.to_string_lossy().replace('\\', "/");
        let route = match RouteModel::new(&route_path, component) {
            Ok(route) => route,
            Err(e) => {
                tracing::warn!(file = %file.display(), route = %route_path, error = %e, "Invalid route template, skipping");
                return None;
            }
        };

        Some(
            route
                .with_middlewares(directives.middlewares)
                .with_guards(directives.guards)
                .with_layout(directives.layout)
                .with_param_types(directives.param_types)
                .with_static_params(directives.static_params),
        )
    }

    /// `pages/blog/index.tg` → `/blog`, `pages/index.tg` → `/`.
    fn route_path_for(&self, file: &Path) -> Option<String> {
        let relative = file.strip_prefix(&self.pages_dir).ok()?;
        let mut parts: Vec<String> = relative
            .with_extension("")
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        if parts.last().map(|p| p == "index").unwrap_or(false) {
            parts.pop();
        }
        Some(format!("/{}", parts.join("/")))
    }

    fn seed_default_pages(&self) -> RouterResult<()> {
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source| RouterError::Io { path, source }
        };
        fs::create_dir_all(&self.pages_dir).map_err(io_err(&self.pages_dir))?;

        let index = self.pages_dir.join(format!("index.{}", self.extension));
        fs::write(&index, DEFAULT_INDEX).map_err(io_err(&index))?;
        tracing::info!(file = %index.display(), "Default page created");
        Ok(())
    }
}
