//! Daftar error type shared across all crates.

use thiserror::Error;

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, DaftarError>;

#[derive(Debug, Error)]
pub enum DaftarError {
    #[error("store error: {0}")]
    Store(String),

    #[error("bus error: {0}")]
    Bus(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}
