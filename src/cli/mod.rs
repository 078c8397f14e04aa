//! CLI command handlers
//!
//! This module contains the implementation of CLI commands,
//! bridging the clap argument parsing with the orchestration layer.

pub mod backup;

pub use backup::{
    handle_backup, handle_chain, handle_config, handle_list, handle_prune, handle_restore,
    ServiceContext,
};
