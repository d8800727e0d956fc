//! The prepared review context handed from `prepare` to `review`.

use serde::{Deserialize, Serialize};

/// A project rule made available to the agent via the `read_rule` tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSummary {
    /// Rule identifier (filename without extension).
    pub name: String,
    /// One-line description from the rule's front matter.
    #[serde(default)]
    pub description: String,
}

/// A design or spec document linked to this change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecDoc {
    /// Path relative to the repo root.
    pub path: String,
    /// How the document was matched (pr_body, fuzzy, directory_map).
    #[serde(default)]
    pub matched_by: String,
}

/// A file outside the diff that imports changed code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlastFile {
    /// Path relative to the repo root.
    pub path: String,
    /// First lines of the file, for prompt context.
    #[serde(default)]
    pub head: String,
}

/// Everything the agent needs to review a pull request.
///
/// Serialized to `review-context.json` in the work directory so the
/// `prepare` and `review` steps can run as separate CI jobs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReviewContext {
    /// True when there is nothing to review (empty diff).
    #[serde(default)]
    pub skip: bool,
    /// Human-readable reason when `skip` is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default)]
    pub pr_title: String,
    #[serde(default)]
    pub pr_body: String,
    #[serde(default)]
    pub branch_name: String,
    #[serde(default)]
    pub changed_files: Vec<String>,
    /// Unified diff, possibly truncated to the configured line cap.
    #[serde(default)]
    pub diff: String,
    /// True when the diff was cut at the line cap.
    #[serde(default)]
    pub diff_truncated: bool,
    #[serde(default)]
    pub rules: Vec<RuleSummary>,
    #[serde(default)]
    pub spec_docs: Vec<SpecDoc>,
    #[serde(default)]
    pub blast_radius: Vec<BlastFile>,
}

impl ReviewContext {
    /// A context that tells downstream steps to do nothing.
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            skip: true,
            reason: Some(reason.into()),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skipped_context_serializes_minimal() {
        let ctx = ReviewContext::skipped("no changed files");
        let json = serde_json::to_value(&ctx).unwrap();
        assert_eq!(json["skip"], true);
        assert_eq!(json["reason"], "no changed files");
    }

    #[test]
    fn context_round_trips() {
        let ctx = ReviewContext {
            pr_title: "Add login".into(),
            changed_files: vec!["src/auth.py".into()],
            diff: "diff --git a/src/auth.py b/src/auth.py".into(),
            ..Default::default()
        };
        let back: ReviewContext =
            serde_json::from_str(&serde_json::to_string(&ctx).unwrap()).unwrap();
        assert!(!back.skip);
        assert_eq!(back.changed_files, vec!["src/auth.py".to_string()]);
    }
}
