//! The review result handed from `review` to `post`.

use serde::{Deserialize, Serialize};

use super::finding::Finding;

/// Token, cost, and timing accounting for a review run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReviewStats {
    pub model: String,
    pub rounds: u32,
    pub tool_calls: u32,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub duration_ms: u64,
}

/// What the verification pass did to the finding set.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct VerificationStats {
    pub findings_before: usize,
    pub findings_after: usize,
    pub dropped: usize,
}

/// Output of the review agent, serialized to `review-result.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReviewResult {
    /// Overall assessment in a few sentences.
    #[serde(default)]
    pub summary: String,
    /// Individual findings. The wire name matches the model's output format.
    #[serde(default)]
    pub suggestions: Vec<Finding>,
    /// True when no review ran (no changed files).
    #[serde(default, skip_serializing_if = "is_false")]
    pub skip: bool,
    /// True when the run was a dry run (no API key or explicit flag).
    #[serde(default, skip_serializing_if = "is_false")]
    pub dry_run: bool,
    /// Set when the agent failed; the publisher still posts the summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Raw model text kept for debugging when JSON extraction failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<ReviewStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification: Option<VerificationStats>,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl ReviewResult {
    /// Result for a run where there was nothing to review.
    pub fn skipped(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            skip: true,
            ..Default::default()
        }
    }

    /// Result for a failed run. Carries the error so the posted summary
    /// can say the review did not complete.
    pub fn failed(summary: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Severity;

    #[test]
    fn parses_model_output_shape() {
        let raw = r#"{
            "summary": "Looks solid overall.",
            "suggestions": [
                {"file": "src/db.py", "line": 12, "severity": "critical",
                 "rule": "S-001", "title": "SQL injection", "body": "Use parameters."}
            ]
        }"#;
        let result: ReviewResult = serde_json::from_str(raw).unwrap();
        assert_eq!(result.suggestions.len(), 1);
        assert_eq!(result.suggestions[0].severity, Severity::Critical);
        assert!(!result.skip);
        assert!(!result.dry_run);
    }

    #[test]
    fn flags_are_omitted_when_false() {
        let json = serde_json::to_value(ReviewResult::default()).unwrap();
        assert!(json.get("skip").is_none());
        assert!(json.get("dry_run").is_none());
        assert!(json.get("error").is_none());
    }

    #[test]
    fn skipped_and_failed_constructors() {
        assert!(ReviewResult::skipped("nothing to do").skip);
        let failed = ReviewResult::failed("did not finish", "timeout");
        assert_eq!(failed.error.as_deref(), Some("timeout"));
    }
}
