//! # Daftar Core
//!
//! Shared foundation for the Daftar debt reminder scheduler: domain models
//! (debt obligations with embedded reminder sub-state, notification records),
//! the collaborator traits the scheduler is wired against (document store,
//! live-channel bus), the common error type, and configuration.

pub mod config;
pub mod error;
pub mod models;
pub mod traits;

pub use config::DaftarConfig;
pub use error::{DaftarError, Result};
