//! Display formatting for terminal output
//!
//! Provides utilities for formatting artifacts, chains and retention plans
//! for terminal display.

pub mod artifact;

pub use artifact::{format_artifact_list, format_chain, format_retention_plan};
