//! Relay core.
//!
//! # Data Flow
//! ```text
//! client ──▶ server.rs (accept, spawn)
//!              └─▶ session.rs (per-client loop)
//!                    │  lock SharedRemote
//!                    ├─▶ remote.rs  write request ──▶ backend
//!                    ├─▶ remote.rs  read response ◀── backend
//!                    ├─▶ transform.rs (swap trailing bytes)
//!                    └─▶ client ◀── response
//!                       unlock
//! ```
//!
//! # Design Decisions
//! - Exactly one backend connection, shared by all sessions behind a mutex
//! - A whole round trip is one critical section; throughput is traded for
//!   never handing a response to the wrong client
//! - Errors stay inside their session; tearing down the shared connection is
//!   the only cross-session effect

pub mod error;
pub mod remote;
pub mod server;
pub mod session;
pub mod transform;

pub use error::RelayError;
pub use remote::{RemoteConnectionManager, SharedRemote};
pub use server::ProxyServer;
pub use session::{ClientSession, SessionSettings, Termination};
pub use transform::{Passthrough, ResponseTransform, SwapTrailingBytes};
