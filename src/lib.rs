//! File-convention page router.
//!
//! Pages under a directory tree become HTTP routes by their file path.
//! Every request runs through an ordered middleware chain and named guards
//! before the page component renders.

// Core subsystems
pub mod config;
pub mod http;
pub mod render;
pub mod routing;

// Request pipeline
pub mod guards;
pub mod middleware;

// Cross-cutting concerns
pub mod admin;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod security;

pub use config::schema::TagonConfig;
pub use http::{HttpServer, ServerBuilder};
pub use lifecycle::Shutdown;
pub use routing::{RouterError, RouterManager};
