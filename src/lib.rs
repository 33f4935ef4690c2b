//! TCP relay that funnels every client through one shared backend connection.

// Core subsystems
pub mod config;
pub mod net;
pub mod relay;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::schema::ProxyConfig;
pub use lifecycle::Shutdown;
pub use relay::ProxyServer;
