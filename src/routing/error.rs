//! Startup-time routing errors.
//!
//! Everything here aborts startup. Per-request failures never surface as
//! `RouterError`; they are turned into HTTP responses by the router.

use std::path::PathBuf;

use thiserror::Error;

use crate::routing::matcher::TemplateError;

#[derive(Debug, Error)]
pub enum RouterError {
    /// Two page files produced the same route template.
    #[error("duplicate route `{0}`")]
    DuplicateRoute(String),

    /// Two templates differ only in parameter names (`/u/[id]` vs `/u/[name]`).
    #[error("route `{path}` conflicts with already registered `{existing}`")]
    ConflictingRoute { path: String, existing: String },

    /// A page route collides with an operator endpoint.
    #[error("route `{0}` collides with a reserved operator path")]
    ReservedPath(String),

    #[error("invalid route template `{template}`: {source}")]
    InvalidTemplate {
        template: String,
        #[source]
        source: TemplateError,
    },

    /// The pages root could not be created or walked.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for routing setup.
pub type RouterResult<T> = Result<T, RouterError>;
