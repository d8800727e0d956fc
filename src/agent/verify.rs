//! Verification pass: re-check findings to filter false positives.
//!
//! Runs only when the first pass produced critical or warning findings.
//! The model gets the findings, a diff excerpt, and the same tools, under
//! a verification-rules system prompt. A successful parse REPLACES the
//! finding set; any failure keeps the original result untouched.

use crate::config::Config;
use crate::models::{ReviewResult, VerificationStats};
use crate::provider::{ContentBlock, Message, ModelClient, ModelRequest, StopReason};
use crate::tools::ToolGateway;

/// The verification conversation gets a short tool budget of its own.
const VERIFY_MAX_ROUNDS: u32 = 5;

/// Bundled verification rules, compiled in so the pass runs even when the
/// reviewed repository carries no rules document of its own.
const BUNDLED_RULES: &str = include_str!("../../defaults/verification-rules.md");

const DIFF_EXCERPT_CHARS: usize = 8000;
const TOOL_RESULT_MAX_CHARS: usize = 5000;

/// Run the verification pass over `result`.
///
/// Returns the verified result, or the original when the API fails or the
/// response cannot be parsed. When findings were dropped, `verification`
/// stats are attached.
pub async fn run_verification(
    model: &dyn ModelClient,
    tools: &ToolGateway,
    config: &Config,
    ctx: &crate::models::ReviewContext,
    result: ReviewResult,
) -> ReviewResult {
    if result.suggestions.is_empty() {
        return result;
    }

    // A rules document in the reviewed repository overrides the bundled one.
    let rules_path = tools.repo_root().join(&config.review.verification_rules);
    let verification_rules = tokio::fs::read_to_string(&rules_path)
        .await
        .unwrap_or_else(|_| BUNDLED_RULES.to_string());

    match verify_inner(model, tools, config, ctx, &result, &verification_rules).await {
        Some(mut verified) => {
            let before = result.suggestions.len();
            let after = verified.suggestions.len();
            if after < before {
                verified.verification = Some(VerificationStats {
                    findings_before: before,
                    findings_after: after,
                    dropped: before - after,
                });
            }
            verified
        }
        None => result,
    }
}

async fn verify_inner(
    model: &dyn ModelClient,
    tools: &ToolGateway,
    config: &Config,
    ctx: &crate::models::ReviewContext,
    result: &ReviewResult,
    verification_rules: &str,
) -> Option<ReviewResult> {
    let findings_json = serde_json::to_string_pretty(result).ok()?;
    let diff_excerpt: String = ctx.diff.chars().take(DIFF_EXCERPT_CHARS).collect();

    let user_content = format!(
        "## Verification Task\n\n\
         Below are the review findings and the diff they were generated from.\n\
         Apply the verification rules to each finding. Drop or fix any finding\n\
         that fails verification.\n\n\
         ## Diff (for reference)\n```diff\n{diff_excerpt}\n```\n\n\
         ## Findings to Verify\n```json\n{findings_json}\n```"
    );

    let mut messages = vec![Message::user_text(user_content)];
    let tool_definitions = ToolGateway::definitions();

    let mut response = None;
    for _ in 0..VERIFY_MAX_ROUNDS {
        let request = ModelRequest {
            model: config.review.model.clone(),
            max_tokens: config.review.max_tokens,
            system: verification_rules.to_string(),
            tools: tool_definitions.clone(),
            messages: messages.clone(),
        };
        let current = model.complete(&request).await.ok()?;

        match current.stop_reason {
            Some(StopReason::ToolUse) => {
                let mut tool_results = Vec::new();
                for block in &current.content {
                    if let ContentBlock::ToolUse { id, name, input } = block {
                        let output = tools.execute(name, input).await;
                        let truncated: String =
                            output.chars().take(TOOL_RESULT_MAX_CHARS).collect();
                        tool_results.push(ContentBlock::ToolResult {
                            tool_use_id: id.clone(),
                            content: truncated,
                        });
                    }
                }
                messages.push(Message::assistant(current.content.clone()));
                messages.push(Message::tool_results(tool_results));
                response = Some(current);
                continue;
            }
            _ => {
                response = Some(current);
                break;
            }
        }
    }

    let text = response?.text();
    let verified = super::extract_result_json(&text)?;
    // A parse without a suggestions array is not a usable verification.
    verified_has_suggestions(&text).then_some(verified)
}

/// The original output contract requires an explicit "suggestions" key;
/// a bare `{"summary": ...}` would silently wipe all findings.
fn verified_has_suggestions(text: &str) -> bool {
    let Some(start) = text.find('{') else {
        return false;
    };
    let Some(end) = text.rfind('}') else {
        return false;
    };
    serde_json::from_str::<serde_json::Value>(&text[start..=end])
        .map(|v| v.get("suggestions").is_some())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggestions_key_is_required() {
        assert!(verified_has_suggestions(
            r#"{"summary": "s", "suggestions": []}"#
        ));
        assert!(!verified_has_suggestions(r#"{"summary": "s"}"#));
        assert!(!verified_has_suggestions("not json"));
    }
}
