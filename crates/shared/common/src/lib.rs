//! Common utilities shared across the workspace.
//!
//! This crate provides:
//! - The normalized error vocabulary and its HTTP mapping
//! - Configuration structures

pub mod config;
pub mod error;

pub use config::*;
pub use error::{AppError, AppResult, OptionExt};
