//! The agentic review loop.
//!
//! Drives bounded rounds of tool use against a [`ModelClient`]: send the
//! conversation, execute any requested tools, feed results back, and stop
//! when the model answers in text. The round budget scales with PR size,
//! coverage gaps trigger one follow-up, and the last round withholds tools
//! to force a final answer.

pub mod prompt;
pub mod verify;

use std::collections::HashSet;
use std::path::Path;
use std::time::Instant;

use crate::config::Config;
use crate::models::{ReviewContext, ReviewResult, ReviewStats, Severity};
use crate::provider::{ContentBlock, Message, ModelClient, ModelRequest, ModelResponse, StopReason};
use crate::tools::ToolGateway;

/// Extra rounds granted per changed file.
const ROUNDS_PER_FILE: u32 = 2;
/// Hard ceiling regardless of PR size.
const MAX_ROUNDS_CEILING: u32 = 30;

/// Tool results larger than this are cut before hitting the conversation.
const TOOL_RESULT_MAX_CHARS: usize = 5000;

/// Raw model text kept for debugging when JSON extraction fails.
const RAW_RESPONSE_MAX_CHARS: usize = 3000;

/// Scale tool rounds with PR size. More files need more investigation.
///
/// `base_rounds` comes from `review.max_tool_rounds` in the config and is
/// the floor for tiny PRs. The last round is always reserved for the final
/// response (tools are withheld), so the effective tool budget is one less.
pub fn compute_max_rounds(base_rounds: u32, num_changed_files: usize) -> u32 {
    let dynamic = base_rounds.saturating_add((num_changed_files as u32).saturating_mul(ROUNDS_PER_FILE));
    dynamic.clamp(base_rounds, MAX_ROUNDS_CEILING.max(base_rounds))
}

/// Changed files the agent has not reviewed yet.
///
/// A file counts as reviewed if the agent read it with `read_file` or cited
/// it in a finding. Docs and lockfiles are exempt.
pub fn check_file_coverage(
    changed_files: &[String],
    files_read: &HashSet<String>,
    result: &ReviewResult,
    config: &Config,
) -> Vec<String> {
    let cited: HashSet<&str> = result
        .suggestions
        .iter()
        .map(|s| s.file.as_str())
        .collect();

    changed_files
        .iter()
        .filter(|f| {
            if files_read.contains(*f) || cited.contains(f.as_str()) {
                return false;
            }
            let basename = Path::new(f)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            if config.files.lockfile_names.iter().any(|l| l == &basename) {
                return false;
            }
            if config
                .files
                .doc_extensions
                .iter()
                .any(|ext| f.ends_with(ext.as_str()))
            {
                return false;
            }
            true
        })
        .cloned()
        .collect()
}

/// Extract a JSON review object from model output, tolerating markdown
/// fences and prose around the object.
pub fn extract_result_json(raw_text: &str) -> Option<ReviewResult> {
    let mut text = raw_text.trim();
    let defenced;
    if text.starts_with("```") {
        let inner = text.split_once('\n').map(|(_, rest)| rest).unwrap_or("");
        defenced = inner.rsplit_once("```").map(|(body, _)| body).unwrap_or(inner);
        text = defenced.trim();
    }
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        text.chars().take(max).collect()
    }
}

/// Runs the review conversation to completion.
pub struct AgentLoop<'a> {
    model: &'a dyn ModelClient,
    tools: &'a ToolGateway,
    config: &'a Config,
}

impl<'a> AgentLoop<'a> {
    pub fn new(model: &'a dyn ModelClient, tools: &'a ToolGateway, config: &'a Config) -> Self {
        Self {
            model,
            tools,
            config,
        }
    }

    /// Run the full agentic review, returning a result in every case.
    /// Transport failures and unparseable output degrade to a result that
    /// says so, never to an error.
    pub async fn run(&self, ctx: &ReviewContext) -> ReviewResult {
        let system_prompt = prompt::build_system_prompt(ctx, self.config);
        let mut messages = vec![Message::user_text(prompt::build_user_message(ctx))];

        let max_rounds =
            compute_max_rounds(self.config.review.max_tool_rounds, ctx.changed_files.len());
        let tool_definitions = ToolGateway::definitions();

        let mut files_read: HashSet<String> = HashSet::new();
        let mut coverage_followup_sent = false;
        let mut tool_calls: u32 = 0;
        let mut input_tokens: u64 = 0;
        let mut output_tokens: u64 = 0;
        let mut rounds_used: u32 = 0;
        let start = Instant::now();

        let mut last_response: Option<ModelResponse> = None;

        for round in 0..max_rounds {
            rounds_used = round + 1;
            let is_final_round = round == max_rounds - 1;
            if is_final_round {
                messages.push(Message::user_text(prompt::build_final_round_message()));
            }

            let request = ModelRequest {
                model: self.config.review.model.clone(),
                max_tokens: self.config.review.max_tokens,
                system: system_prompt.clone(),
                tools: if is_final_round {
                    Vec::new()
                } else {
                    tool_definitions.clone()
                },
                messages: messages.clone(),
            };

            let response = match self.model.complete(&request).await {
                Ok(r) => r,
                Err(e) => {
                    let mut result = ReviewResult::failed(
                        "Review agent encountered an API error.",
                        e.to_string(),
                    );
                    result.stats = Some(self.stats(
                        rounds_used,
                        tool_calls,
                        input_tokens,
                        output_tokens,
                        start,
                    ));
                    return result;
                }
            };

            input_tokens += response.usage.input_tokens;
            output_tokens += response.usage.output_tokens;

            match response.stop_reason {
                Some(StopReason::ToolUse) => {
                    let mut tool_results = Vec::new();
                    for block in &response.content {
                        if let ContentBlock::ToolUse { id, name, input } = block {
                            tool_calls += 1;
                            if name == "read_file" {
                                if let Some(path) = input.get("path").and_then(|p| p.as_str()) {
                                    files_read.insert(path.to_string());
                                }
                            }
                            let output = self.tools.execute(name, input).await;
                            tool_results.push(ContentBlock::ToolResult {
                                tool_use_id: id.clone(),
                                content: truncate_chars(&output, TOOL_RESULT_MAX_CHARS),
                            });
                        }
                    }
                    messages.push(Message::assistant(response.content.clone()));
                    messages.push(Message::tool_results(tool_results));
                    last_response = Some(response);
                    continue;
                }
                Some(StopReason::EndTurn) => {
                    // Check file coverage before accepting the result.
                    let preliminary = extract_result_json(&response.text());
                    if let Some(preliminary) = &preliminary {
                        if !coverage_followup_sent {
                            let missed = check_file_coverage(
                                &ctx.changed_files,
                                &files_read,
                                preliminary,
                                self.config,
                            );
                            if !missed.is_empty() {
                                coverage_followup_sent = true;
                                messages.push(Message::assistant(response.content.clone()));
                                messages.push(Message::user_text(prompt::build_coverage_followup(
                                    &missed,
                                )));
                                last_response = Some(response);
                                continue;
                            }
                        }
                    }
                    last_response = Some(response);
                    break;
                }
                _ => {
                    last_response = Some(response);
                    break;
                }
            }
        }

        let raw_text = last_response.as_ref().map(|r| r.text()).unwrap_or_default();
        let mut result = match extract_result_json(&raw_text) {
            Some(result) => result,
            None => ReviewResult {
                summary: "Review completed (response format issue; showing raw output)."
                    .to_string(),
                raw_response: Some(truncate_chars(raw_text.trim(), RAW_RESPONSE_MAX_CHARS)),
                ..Default::default()
            },
        };

        result.stats = Some(self.stats(
            rounds_used,
            tool_calls,
            input_tokens,
            output_tokens,
            start,
        ));
        result
    }

    fn stats(
        &self,
        rounds: u32,
        tool_calls: u32,
        input_tokens: u64,
        output_tokens: u64,
        start: Instant,
    ) -> ReviewStats {
        ReviewStats {
            model: self.config.review.model.clone(),
            rounds,
            tool_calls,
            input_tokens,
            output_tokens,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }
}

/// Whether a finding set warrants the verification pass.
pub fn needs_verification(result: &ReviewResult) -> bool {
    result
        .suggestions
        .iter()
        .any(|s| matches!(s.severity, Severity::Critical | Severity::Warning))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn round_budget_scales_and_clamps() {
        assert_eq!(compute_max_rounds(10, 0), 10);
        assert_eq!(compute_max_rounds(10, 5), 20);
        assert_eq!(compute_max_rounds(10, 10), 30);
        assert_eq!(compute_max_rounds(10, 100), 30);
    }

    #[test]
    fn round_budget_honours_configured_base() {
        assert_eq!(compute_max_rounds(4, 0), 4);
        assert_eq!(compute_max_rounds(4, 3), 10);
        // A base above the ceiling wins, but growth past it does not.
        assert_eq!(compute_max_rounds(40, 0), 40);
        assert_eq!(compute_max_rounds(40, 5), 40);
    }

    #[test]
    fn extract_handles_fences_and_prose() {
        let fenced = "```json\n{\"summary\": \"ok\", \"suggestions\": []}\n```";
        assert_eq!(extract_result_json(fenced).unwrap().summary, "ok");

        let prose = "Here is my review:\n{\"summary\": \"fine\", \"suggestions\": []}\nDone.";
        assert_eq!(extract_result_json(prose).unwrap().summary, "fine");

        assert!(extract_result_json("no json here").is_none());
        assert!(extract_result_json("{broken").is_none());
    }

    #[test]
    fn coverage_exempts_docs_lockfiles_and_cited_files() {
        let config = Config::default();
        let changed = vec![
            "src/app.py".to_string(),
            "src/db.py".to_string(),
            "README.md".to_string(),
            "poetry.lock".to_string(),
            "src/api.py".to_string(),
        ];
        let mut files_read = HashSet::new();
        files_read.insert("src/app.py".to_string());

        let result: ReviewResult = serde_json::from_str(
            r#"{"summary": "s", "suggestions": [
                {"file": "src/db.py", "line": 3, "severity": "warning", "title": "t", "body": "b"}
            ]}"#,
        )
        .unwrap();

        let missed = check_file_coverage(&changed, &files_read, &result, &config);
        assert_eq!(missed, vec!["src/api.py".to_string()]);
    }

    #[test]
    fn verification_trigger_requires_critical_or_warning() {
        let praise_only: ReviewResult = serde_json::from_str(
            r#"{"summary": "s", "suggestions": [
                {"file": "a", "line": 1, "severity": "praise", "title": "t", "body": "b"},
                {"file": "a", "line": 2, "severity": "suggestion", "title": "t", "body": "b"}
            ]}"#,
        )
        .unwrap();
        assert!(!needs_verification(&praise_only));

        let with_warning: ReviewResult = serde_json::from_str(
            r#"{"summary": "s", "suggestions": [
                {"file": "a", "line": 1, "severity": "warning", "title": "t", "body": "b"}
            ]}"#,
        )
        .unwrap();
        assert!(needs_verification(&with_warning));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let text = "héllo wörld".repeat(1000);
        let cut = truncate_chars(&text, 50);
        assert_eq!(cut.chars().count(), 50);
    }
}
