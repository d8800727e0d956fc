//! Shared data types: findings, review context, and review results.

pub mod context;
pub mod finding;
pub mod result;

pub use context::{BlastFile, ReviewContext, RuleSummary, SpecDoc};
pub use finding::{Finding, FindingCounts, Severity};
pub use result::{ReviewResult, ReviewStats, VerificationStats};
