//! Core utilities, configuration, and common functionality

pub mod config;
pub mod error;
pub mod logging;
pub mod types;

// Re-exports for convenience
pub use error::{InputField, ShopError, ShopResult};
pub use logging::{init_logger, log_startup_configuration};
pub use types::{OrderStatus, Price};
