//! Shared types, error taxonomy, and configuration for the gateway.

pub mod config;
pub mod error;
pub mod types;

pub use config::GatewayConfig;
pub use error::{Error, Result};
pub use types::*;
