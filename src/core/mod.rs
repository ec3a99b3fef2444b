//! Core utilities: configuration, errors, logging, metrics and the HTTP front door

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod validation;
pub mod web_server;

// Re-exports for convenience
pub use config::Config;
pub use error::{AppError, AppResult};
pub use logging::{init_logger, log_resolver_configuration};
