//! Configuration validation
//!
//! Validates run specifications before any graph is loaded.

mod error;
mod validator;

pub use error::ValidationError;
pub use validator::validate_config;
