//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Middleware / guard / render call:
//!     → timeouts.rs (shared pipeline deadline, panic isolation)
//!     → Completed | TimedOut | Panicked
//! ```
//!
//! # Design Decisions
//! - One deadline per request, shared by every stage
//! - A panicking extension never takes the connection down with it

pub mod timeouts;

pub use timeouts::{isolate, Isolated};
