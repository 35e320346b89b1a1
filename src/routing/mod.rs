//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Compilation (at startup):
//!     pages/**/*.tg
//!     → discovery.rs (file path → template, directives → RouteModel)
//!     → matcher.rs (tokenize, score specificity, Axum paths)
//!     → router.rs (registry, conflict checks, bind handlers)
//!
//! Incoming Request:
//!     → Axum match (static before dynamic before catch-all)
//!     → params.rs (coerce captured values to declared types)
//!     → router.rs (middleware → guards → render → middleware)
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path
//! - Deterministic: same page tree always yields the same registry

pub mod directives;
pub mod discovery;
pub mod error;
pub mod matcher;
pub mod model;
pub mod params;
pub mod router;

pub use discovery::RouteDiscovery;
pub use error::{RouterError, RouterResult};
pub use matcher::{RouteTemplate, Segment, TemplateError};
pub use model::RouteModel;
pub use params::{DynamicParams, ParamType, ParamValidator, ParamValue};
pub use router::{RouteSummary, RouterManager, RoutesInfo};
