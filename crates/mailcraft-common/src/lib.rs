//! mailcraft Common - Shared types and configuration
//!
//! This crate provides the plain value objects describing a message to send,
//! the configuration layer and the error type shared by all mailcraft crates.

pub mod config;
pub mod error;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
