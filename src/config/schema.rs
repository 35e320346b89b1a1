//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the page
//! server. All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TagonConfig {
    /// Listener and request limits.
    pub server: ServerConfig,

    /// Where pages and components live.
    pub pages: PagesConfig,

    /// Built-in middleware settings.
    pub middleware: MiddlewareConfig,

    /// Built-in guard settings.
    pub guards: GuardsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Operator endpoints.
    pub admin: AdminConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1:3000").
    pub bind_address: String,

    /// Whole-request timeout in seconds (outer layer).
    pub request_timeout_secs: u64,

    /// Deadline for the page pipeline in milliseconds. Unset means none.
    pub pipeline_timeout_ms: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:3000".to_string(),
            request_timeout_secs: 30,
            pipeline_timeout_ms: None,
        }
    }
}

/// Pages configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PagesConfig {
    /// Root of the page tree.
    pub pages_dir: String,

    /// Root of shared components and layouts.
    pub components_dir: String,

    /// Component source extension, without the dot.
    pub extension: String,
}

impl Default for PagesConfig {
    fn default() -> Self {
        Self {
            pages_dir: "pages".to_string(),
            components_dir: "components".to_string(),
            extension: "tg".to_string(),
        }
    }
}

/// Settings for all built-in middleware.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct MiddlewareConfig {
    pub logging: LoggingMiddlewareConfig,
    pub cors: CorsConfig,
    pub auth: AuthConfig,
    pub assets: AssetsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingMiddlewareConfig {
    pub enabled: bool,
    pub priority: i32,

    /// Requests slower than this are reported.
    pub slow_request_ms: u64,
}

impl Default for LoggingMiddlewareConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            priority: 1,
            slow_request_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    pub enabled: bool,
    pub priority: i32,
    pub allowed_origins: Vec<String>,
    pub allowed_methods: Vec<String>,
    pub allowed_headers: Vec<String>,
    pub allow_credentials: bool,
    pub max_age_secs: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            priority: 5,
            allowed_origins: vec!["*".to_string()],
            allowed_methods: ["GET", "POST", "PUT", "DELETE", "OPTIONS"]
                .into_iter()
                .map(String::from)
                .collect(),
            allowed_headers: vec!["*".to_string()],
            allow_credentials: true,
            max_age_secs: 86_400,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    pub enabled: bool,
    pub priority: i32,

    /// HS256 signing secret.
    pub secret: String,

    /// Paths that skip token verification. A prefix matches whole segments.
    pub excluded_paths: Vec<String>,

    /// Lifetime of issued tokens.
    pub token_ttl_hours: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            priority: 10,
            // WARNING: This is a placeholder! Change this in production.
            secret: "tagon-dev-secret".to_string(),
            excluded_paths: ["/", "/login", "/register", "/public"]
                .into_iter()
                .map(String::from)
                .collect(),
            token_ttl_hours: 24,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AssetsConfig {
    pub enabled: bool,
    pub priority: i32,

    /// Compiled stylesheet on disk.
    pub css_path: String,

    /// Public URL the stylesheet is served at.
    pub css_url: String,

    /// Script injected when the compiled stylesheet is missing.
    pub cdn_url: String,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            priority: 20,
            css_path: "static/css/output.css".to_string(),
            css_url: "/assets/css/output.css".to_string(),
            cdn_url: "https://cdn.tailwindcss.com".to_string(),
        }
    }
}

/// Built-in guard configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GuardsConfig {
    /// Register the `authenticated` guard.
    pub authenticated: bool,

    /// Role guards, one per entry.
    pub roles: Vec<RoleGuardConfig>,
}

impl Default for GuardsConfig {
    fn default() -> Self {
        Self {
            authenticated: true,
            roles: vec![RoleGuardConfig {
                name: "admin".to_string(),
                role: "admin".to_string(),
            }],
        }
    }
}

/// Guard `name` admits tokens carrying `role`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RoleGuardConfig {
    pub name: String,
    pub role: String,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// Operator endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Mount the `/api` endpoints.
    pub enabled: bool,

    /// Bearer key required by the endpoints. Unset leaves them open.
    pub api_key: Option<String>,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: None,
        }
    }
}
