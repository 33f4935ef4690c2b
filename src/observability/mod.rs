//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Sessions and the remote manager produce:
//!     → logging.rs (structured log events, hex dumps at debug)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → stdout via tracing-subscriber
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - The client's `ip:port` rides on a span, not in each message
//! - Hex dumps are only rendered when debug is enabled
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
