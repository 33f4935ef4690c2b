//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop, connection limits)
//!     → connection.rs (session id, active-session tracking)
//!     → Hand off to relay::session
//! ```
//!
//! # Design Decisions
//! - Bounded accept prevents resource exhaustion
//! - Each session tracked for graceful shutdown

pub mod connection;
pub mod listener;
