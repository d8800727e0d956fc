//! Unified-diff handling: line indexing, change statistics, and git access.

pub mod git;
pub mod index;
pub mod stats;

use thiserror::Error;

pub use index::DiffIndex;
pub use stats::DiffStats;

#[derive(Debug, Error)]
pub enum DiffError {
    #[error("git error: {0}")]
    Git(String),
}
