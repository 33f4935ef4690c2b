//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Every socket wait in a session:
//!     → timeouts.rs (bounded read / bounded connect)
//!     → ReadOutcome (Data | Closed | TimedOut | Failed)
//!     → session decides: continue, abandon round trip, or terminate
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every wait on a peer has a deadline
//! - No automatic retries: a failed backend connect aborts the current step
//!   and the next request tries again

pub mod timeouts;
