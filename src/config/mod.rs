//! Configuration module for backup-service
//!
//! This module provides configuration management including:
//! - YAML settings loading and validation
//! - Local state path resolution

pub mod paths;
pub mod settings;

pub use paths::ServicePaths;
pub use settings::Settings;
