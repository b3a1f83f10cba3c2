//! Core types for the encore media service: configuration, error taxonomy,
//! and the domain models shared by the storage, processing, and API crates.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;

pub use config::Config;
pub use error::{AppError, LogLevel};
