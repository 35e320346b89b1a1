//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Logging/metrics → Registries → Discover routes → Serve
//!
//! Shutdown (shutdown.rs):
//!     Ctrl+C / trigger → Stop accepting → Drain in-flight requests → Exit
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then registries, then routes, then listener
//! - Route registration errors abort startup before the listener is bound

pub mod shutdown;

pub use shutdown::{trigger_on_ctrl_c, Shutdown};
