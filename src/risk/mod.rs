//! Verdict policy: decide APPROVE, REQUEST_CHANGES, or COMMENT.
//!
//! Pure functions over the finding set, changed files, and diff stats.
//! Precedence: critical findings always block, a disabled auto-approve
//! always demotes to COMMENT, then the risk checks run, and only a fully
//! clean result approves.

use serde::{Deserialize, Serialize};
use strum::Display;

use crate::config::{Config, RiskConfig};
use crate::diff::DiffStats;
use crate::models::{Finding, Severity};

/// GitHub review event to submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
pub enum ReviewEvent {
    #[strum(serialize = "APPROVE")]
    #[serde(rename = "APPROVE")]
    Approve,
    #[strum(serialize = "REQUEST_CHANGES")]
    #[serde(rename = "REQUEST_CHANGES")]
    RequestChanges,
    #[strum(serialize = "COMMENT")]
    #[serde(rename = "COMMENT")]
    Comment,
}

/// The decided event plus human-readable reasons for the summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskVerdict {
    pub event: ReviewEvent,
    pub reasons: Vec<String>,
}

/// Everything the risk checks look at.
pub struct RiskInput<'a> {
    pub changed_files: &'a [String],
    pub stats: &'a DiffStats,
    pub findings: &'a [Finding],
    pub config: &'a Config,
}

/// Master decision for the review event.
pub fn determine_review_event(input: &RiskInput) -> RiskVerdict {
    // 1. Critical findings always block.
    let critical_reasons: Vec<String> = input
        .findings
        .iter()
        .filter(|f| f.severity == Severity::Critical)
        .map(|f| format!("Critical: {}", f.title))
        .collect();
    if !critical_reasons.is_empty() {
        return RiskVerdict {
            event: ReviewEvent::RequestChanges,
            reasons: critical_reasons,
        };
    }

    // 2. Auto-approve disabled.
    if !input.config.review.auto_approve_enabled {
        return RiskVerdict {
            event: ReviewEvent::Comment,
            reasons: vec!["Auto-approval disabled".to_string()],
        };
    }

    // 3. Risk assessment.
    let reasons = collect_risk_reasons(input);
    if !reasons.is_empty() {
        return RiskVerdict {
            event: ReviewEvent::Comment,
            reasons,
        };
    }

    // 4. All clear.
    RiskVerdict {
        event: ReviewEvent::Approve,
        reasons: Vec::new(),
    }
}

/// Does this change need a human? One reason per tripped check.
fn collect_risk_reasons(input: &RiskInput) -> Vec<String> {
    [structural_risk, security_risk, complexity_risk]
        .iter()
        .filter_map(|check| check(input))
        .collect()
}

/// Changes that affect foundations.
fn structural_risk(input: &RiskInput) -> Option<String> {
    let risk = &input.config.risk;
    for risk_path in &risk.structural_paths {
        if input
            .changed_files
            .iter()
            .any(|f| f.contains(risk_path.as_str()))
        {
            return Some(format!(
                "Structural risk: file matching '{risk_path}' changed"
            ));
        }
    }
    None
}

/// Changes that could create security vulnerabilities.
fn security_risk(input: &RiskInput) -> Option<String> {
    let risk: &RiskConfig = &input.config.risk;
    let files = input.changed_files;

    if files
        .iter()
        .any(|f| risk.security_paths.iter().any(|p| f.contains(p.as_str())))
    {
        return Some("Security-sensitive file changed".to_string());
    }
    if files.iter().any(|f| {
        f.ends_with(".env") || f.ends_with(".env.example") || f.ends_with(".key")
            || f.contains("credentials")
    }) {
        return Some("Environment/secrets file changed".to_string());
    }
    if files.iter().any(|f| {
        risk.security_dep_files
            .iter()
            .any(|d| f.ends_with(d.as_str()))
    }) {
        return Some("Dependency change: supply chain risk".to_string());
    }
    None
}

/// Changes too complex for automated review alone.
fn complexity_risk(input: &RiskInput) -> Option<String> {
    let risk = &input.config.risk;
    let doc_exts = &input.config.files.doc_extensions;

    let code_file_count = input
        .changed_files
        .iter()
        .filter(|f| !doc_exts.iter().any(|ext| f.ends_with(ext.as_str())))
        .count();
    if code_file_count > risk.max_code_files {
        return Some(format!(
            "Large PR ({code_file_count} code files): suggest decomposition"
        ));
    }

    let code_lines = input.stats.code_churn();
    if code_lines > risk.max_code_lines {
        return Some(format!(
            "Large diff ({code_lines} code lines): suggest decomposition"
        ));
    }

    if !risk.domain_paths.is_empty() {
        let mut domains: Vec<&str> = Vec::new();
        for f in input.changed_files {
            for (path, domain) in &risk.domain_paths {
                if f.contains(path.as_str()) && !domains.contains(&domain.as_str()) {
                    domains.push(domain);
                }
            }
        }
        if domains.len() >= risk.cross_cutting_domains {
            domains.sort_unstable();
            return Some(format!(
                "Cross-cutting change ({}): needs architectural review",
                domains.join(", ")
            ));
        }
    }

    if input.changed_files.iter().any(|f| {
        risk.infrastructure_patterns
            .iter()
            .any(|p| f.contains(p.as_str()))
    }) {
        return Some("Infrastructure change: affects deployment".to_string());
    }

    None
}
