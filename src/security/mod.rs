//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Authorization: Bearer <jwt>
//!     → jwt.rs (verify signature and expiry)
//!     → auth middleware (context for templates)
//!     → built-in guards (fail closed on missing or invalid token)
//! ```
//!
//! # Design Decisions
//! - One signing authority shared by middleware, guards and the CLI
//! - No trust in client input

pub mod jwt;

pub use jwt::{Claims, JwtAuthority, JwtError, TokenSubject};
