//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, outer layers)
//!     → request.rs (request ID, request snapshot for the pipeline)
//!     → [routing layer runs the page pipeline]
//!     → response.rs (error pages, contributed headers)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{RequestInfo, X_REQUEST_ID};
pub use server::{AppState, HttpServer, ServerBuilder};
