//! Core types, configuration, and error handling for Preflight.
//!
//! This crate provides the shared foundation used by the other Preflight crates:
//! - [`PreflightError`]: unified error type using `thiserror`
//! - [`PreflightConfig`]: configuration loaded from `.preflight.toml`
//! - Shared types: [`LineRange`], [`Record`], [`SeverityClass`]

mod config;
mod error;
mod types;

pub use config::{LlmConfig, NotifyConfig, PreflightConfig, ReviewConfig, StorageConfig};
pub use error::PreflightError;
pub use types::{LineRange, Record, SeverityClass};

/// A convenience `Result` type for Preflight operations.
pub type Result<T> = std::result::Result<T, PreflightError>;
