//! Markdown rendering for posted comments.

use crate::config::BrandingConfig;
use crate::models::{Finding, FindingCounts, ReviewResult, Severity};
use crate::risk::{ReviewEvent, RiskVerdict};

/// Render one finding as an inline comment body (without the hidden tag).
pub fn format_suggestion_body(finding: &Finding) -> String {
    let icon = finding.severity.icon();
    let title = if finding.title.is_empty() {
        "Suggestion"
    } else {
        &finding.title
    };
    let rule_ref = finding
        .rule
        .as_deref()
        .filter(|r| !r.is_empty())
        .map(|r| format!(" ({r})"))
        .unwrap_or_default();
    format!("{icon} **{title}**{rule_ref}\n\n{}", finding.body)
}

/// Build the summary comment body: verdict heading, severity table, run
/// stats, and any findings that could not be placed inline.
pub fn build_summary_body(
    result: &ReviewResult,
    verdict: &RiskVerdict,
    unplaced: &[Finding],
    branding: &BrandingConfig,
) -> String {
    let suggestions = &result.suggestions;
    let counts = FindingCounts::from_findings(suggestions);
    let mut parts: Vec<String> = vec![branding.review_header.clone(), String::new()];

    match verdict.event {
        ReviewEvent::Approve => {
            parts.push("### \u{2705} Auto-Approved".to_string());
            if suggestions.is_empty() {
                parts.push(format!("No issues found. {}", result.summary));
            } else {
                parts.push(format!(
                    "No critical issues found. {} suggestion{} for improvement.",
                    suggestions.len(),
                    plural(suggestions.len()),
                ));
            }
        }
        ReviewEvent::RequestChanges => {
            parts.push("### \u{1f534} Changes Requested".to_string());
            parts.push(format!(
                "Found {} critical issue{} that must be resolved before merge.",
                counts.critical,
                plural(counts.critical),
            ));
        }
        ReviewEvent::Comment => {
            parts.push("### \u{1f464} Human Review Required".to_string());
            parts.push("This PR requires human review. Reasons:".to_string());
            for reason in &verdict.reasons {
                parts.push(format!("- {reason}"));
            }
            if counts.critical == 0 {
                parts.push("\nNo critical issues found by the agent.".to_string());
            }
        }
    }

    parts.push(String::new());
    parts.push(format!("*{}*", result.summary));
    parts.push(String::new());

    parts.push("| Severity | Count |".to_string());
    parts.push("|----------|-------|".to_string());
    for (severity, count) in [
        (Severity::Critical, counts.critical),
        (Severity::Warning, counts.warning),
        (Severity::Suggestion, counts.suggestion),
        (Severity::Praise, counts.praise),
    ] {
        parts.push(format!(
            "| {} {} | {count} |",
            severity.icon(),
            severity.label(),
        ));
    }
    parts.push(String::new());

    if let Some(stats) = &result.stats {
        if !result.dry_run {
            parts.push(format!(
                "*Reviewed in {}ms, {} tool calls*",
                stats.duration_ms, stats.tool_calls,
            ));
            parts.push(String::new());
        }
    }

    if !unplaced.is_empty() {
        parts.push("---".to_string());
        parts.push(String::new());
        parts.push("### Findings not placed inline".to_string());
        parts.push(String::new());
        for finding in unplaced {
            parts.push(format!(
                "**{}:{}**\n\n{}\n\n---\n",
                finding.file,
                finding.line,
                format_suggestion_body(finding),
            ));
        }
    }

    parts.join("\n")
}

fn plural(count: usize) -> &'static str {
    if count == 1 { "" } else { "s" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReviewStats;

    fn finding(severity: &str, title: &str, rule: Option<&str>) -> Finding {
        serde_json::from_value(serde_json::json!({
            "file": "src/a.py", "line": 10, "severity": severity,
            "rule": rule, "title": title, "body": "Details here."
        }))
        .unwrap()
    }

    fn verdict(event: ReviewEvent, reasons: &[&str]) -> RiskVerdict {
        RiskVerdict {
            event,
            reasons: reasons.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn suggestion_body_includes_icon_and_rule() {
        let body = format_suggestion_body(&finding("warning", "Missing index", Some("B-12")));
        assert!(body.starts_with("\u{26a0}\u{fe0f} **Missing index** (B-12)"));
        assert!(body.ends_with("Details here."));

        let no_rule = format_suggestion_body(&finding("praise", "Nice API", None));
        assert!(no_rule.contains("**Nice API**\n"));
        assert!(!no_rule.contains("()"));
    }

    #[test]
    fn approve_heading_mentions_suggestion_count() {
        let result = ReviewResult {
            summary: "Solid change.".into(),
            suggestions: vec![finding("suggestion", "Rename", None)],
            ..Default::default()
        };
        let body = build_summary_body(
            &result,
            &verdict(ReviewEvent::Approve, &[]),
            &[],
            &BrandingConfig::default(),
        );
        assert!(body.contains("### \u{2705} Auto-Approved"));
        assert!(body.contains("1 suggestion for improvement"));
        assert!(body.contains("*Solid change.*"));
    }

    #[test]
    fn clean_approve_says_no_issues() {
        let result = ReviewResult {
            summary: "Clean PR, ship it!".into(),
            ..Default::default()
        };
        let body = build_summary_body(
            &result,
            &verdict(ReviewEvent::Approve, &[]),
            &[],
            &BrandingConfig::default(),
        );
        assert!(body.contains("No issues found. Clean PR, ship it!"));
    }

    #[test]
    fn request_changes_counts_criticals() {
        let result = ReviewResult {
            summary: "Blocking issues.".into(),
            suggestions: vec![
                finding("critical", "Injection", None),
                finding("critical", "Broken auth", None),
            ],
            ..Default::default()
        };
        let body = build_summary_body(
            &result,
            &verdict(ReviewEvent::RequestChanges, &["Critical: Injection"]),
            &[],
            &BrandingConfig::default(),
        );
        assert!(body.contains("Found 2 critical issues"));
        assert!(body.contains("| \u{1f534} Critical | 2 |"));
    }

    #[test]
    fn comment_lists_reasons() {
        let result = ReviewResult {
            summary: "Needs a look.".into(),
            ..Default::default()
        };
        let body = build_summary_body(
            &result,
            &verdict(
                ReviewEvent::Comment,
                &["Structural risk: file matching 'migrations/' changed"],
            ),
            &[],
            &BrandingConfig::default(),
        );
        assert!(body.contains("### \u{1f464} Human Review Required"));
        assert!(body.contains("- Structural risk"));
        assert!(body.contains("No critical issues found by the agent."));
    }

    #[test]
    fn stats_line_omitted_on_dry_run() {
        let mut result = ReviewResult {
            summary: "s".into(),
            stats: Some(ReviewStats {
                duration_ms: 1234,
                tool_calls: 7,
                ..Default::default()
            }),
            ..Default::default()
        };
        let branding = BrandingConfig::default();
        let live = build_summary_body(&result, &verdict(ReviewEvent::Approve, &[]), &[], &branding);
        assert!(live.contains("Reviewed in 1234ms, 7 tool calls"));

        result.dry_run = true;
        let dry = build_summary_body(&result, &verdict(ReviewEvent::Approve, &[]), &[], &branding);
        assert!(!dry.contains("Reviewed in"));
    }

    #[test]
    fn unplaced_findings_get_their_own_section() {
        let result = ReviewResult {
            summary: "s".into(),
            ..Default::default()
        };
        let unplaced = vec![finding("warning", "Outside diff", None)];
        let body = build_summary_body(
            &result,
            &verdict(ReviewEvent::Approve, &[]),
            &unplaced,
            &BrandingConfig::default(),
        );
        assert!(body.contains("### Findings not placed inline"));
        assert!(body.contains("**src/a.py:10**"));
    }
}
