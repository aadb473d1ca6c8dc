//! HTTP API for facegate-node

pub mod handlers;
pub mod health;
pub mod requirements;

pub use handlers::*;
pub use health::health_routes;
