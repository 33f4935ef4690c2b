//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Parse flags → Load config → Validate → Logging/metrics → Bind listener
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Drain sessions → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Fail fast: a bind failure is the only fatal error
//! - Shutdown has timeout: remaining sessions are dropped after the deadline

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
