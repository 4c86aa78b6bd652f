//! Common error types for mixdown

use thiserror::Error;

/// Common result type for mixdown operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the mixdown crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// TOML config file could not be parsed
    #[error("Config file parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Invalid user input or option value
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
