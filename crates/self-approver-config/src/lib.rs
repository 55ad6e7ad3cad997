//! Configuration for self-approver
//!
//! This crate provides:
//! - Configuration file lookup (explicit path, then CWD, then home directory)
//! - Application configuration (AppConfig) with environment overrides
//! - GitHub App credential resolution

pub mod app_config;
pub mod config_file;
pub mod error;

pub use app_config::{AppConfig, AppCredentials};
pub use config_file::{load_config_file, load_config_file_with, ConfigSource};
pub use error::ConfigError;
