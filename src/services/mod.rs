//! Decision logic for backup-service
//!
//! Everything here is a function of one [`ArtifactListing`](crate::models::ArtifactListing)
//! snapshot plus configuration. Only the retention engine touches storage,
//! and only to delete what its plan selected.

pub mod chain;
pub mod deadline;
pub mod retention;
pub mod selector;

pub use deadline::Deadline;
pub use retention::{select_for_deletion, RetentionEngine, RetentionPlan, RotationReport};
