//! Finding types representing review results.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity level of a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Must be fixed before merge.
    Critical,
    /// Should be addressed, may block depending on policy.
    Warning,
    /// Optional improvement.
    Suggestion,
    /// Positive reinforcement for good patterns.
    Praise,
}

/// Custom deserializer for Severity that accepts common LLM variations.
///
/// Models sometimes return values like "Consider", "Major", "High", "Note"
/// instead of the expected "critical", "warning", "suggestion", "praise".
/// This is the single normalization point; everything downstream sees only
/// the four canonical levels.
impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        match s.to_lowercase().as_str() {
            "critical" | "error" | "blocker" | "high" | "severe" | "fatal"
                => Ok(Severity::Critical),
            "warning" | "warn" | "consider" | "medium" | "moderate" | "major"
                => Ok(Severity::Warning),
            "suggestion" | "info" | "note" | "low" | "minor" | "trivial" | "style"
                => Ok(Severity::Suggestion),
            "praise" | "kudos" | "positive"
                => Ok(Severity::Praise),
            _ => {
                // Fall back to warning for unrecognised severities rather than failing
                Ok(Severity::Warning)
            }
        }
    }
}

impl Severity {
    /// Icon used in posted review comments.
    pub fn icon(&self) -> &'static str {
        match self {
            Severity::Critical => "\u{1f534}",
            Severity::Warning => "\u{26a0}\u{fe0f}",
            Severity::Suggestion => "\u{1f4a1}",
            Severity::Praise => "\u{2b50}",
        }
    }

    /// Heading label used in posted review comments.
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Critical => "Critical",
            Severity::Warning => "Warning",
            Severity::Suggestion => "Suggestion",
            Severity::Praise => "Praise",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Critical => write!(f, "critical"),
            Severity::Warning => write!(f, "warning"),
            Severity::Suggestion => write!(f, "suggestion"),
            Severity::Praise => write!(f, "praise"),
        }
    }
}

/// A single finding produced by the review agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    /// The file path relative to the repo root.
    #[serde(default)]
    pub file: String,
    /// The line number the finding refers to (1-based, new-file side).
    /// Zero or absent means the finding is file-level.
    #[serde(default)]
    pub line: u32,
    /// The severity of the finding.
    pub severity: Severity,
    /// Identifier of the project rule this finding cites, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
    /// Short title summarizing the issue.
    #[serde(default)]
    pub title: String,
    /// Detailed explanation, including the suggested fix.
    #[serde(default)]
    pub body: String,
}

/// Per-severity counts for a set of findings.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct FindingCounts {
    pub critical: usize,
    pub warning: usize,
    pub suggestion: usize,
    pub praise: usize,
}

impl FindingCounts {
    pub fn from_findings(findings: &[Finding]) -> Self {
        let mut c = FindingCounts::default();
        for f in findings {
            match f.severity {
                Severity::Critical => c.critical += 1,
                Severity::Warning => c.warning += 1,
                Severity::Suggestion => c.suggestion += 1,
                Severity::Praise => c.praise += 1,
            }
        }
        c
    }

    pub fn total(&self) -> usize {
        self.critical + self.warning + self.suggestion + self.praise
    }
}
