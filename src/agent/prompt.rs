//! Prompt assembly for the review agent.
//!
//! The system prompt carries the reviewer persona, severity rubric, rule
//! summaries, and spec links; the user message carries the diff. Full rule
//! bodies and file contents stay behind tools so the initial prompt stays
//! small.

use crate::config::Config;
use crate::models::ReviewContext;

/// PR descriptions can be huge; cap what we inline.
pub const MAX_PR_BODY_CHARS: usize = 2000;

pub fn build_system_prompt(ctx: &ReviewContext, config: &Config) -> String {
    let project = &config.project;
    let mut identity = if !project.name.is_empty() && !project.description.is_empty() {
        format!("a PR for the {} project ({})", project.name, project.description)
    } else if !project.name.is_empty() {
        format!("a PR for the {} project", project.name)
    } else {
        "a PR".to_string()
    };
    if !project.tech_stack.is_empty() {
        identity.push_str(&format!(" [tech stack: {}]", project.tech_stack));
    }

    let rule_list = if ctx.rules.is_empty() {
        "No project-specific rules configured.".to_string()
    } else {
        ctx.rules
            .iter()
            .map(|r| format!("- **{}**: {}", r.name, r.description))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let spec_list = if ctx.spec_docs.is_empty() {
        "No spec/plan linked in the PR description.".to_string()
    } else {
        ctx.spec_docs
            .iter()
            .map(|d| format!("- {}", d.path))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let today = chrono::Utc::now().format("%B %d, %Y");

    format!(
        r#"You are a senior software engineer reviewing {identity}.

Today's date is {today}. Use this when evaluating dates in code or documentation. Do NOT flag dates as "future" if they are on or before today.

You review like a tech lead who cares deeply about code quality. You are helpful and specific. You are NOT a cop: you are the senior colleague everyone wants reviewing their code because you make it better.

## Review Dimensions (in priority order)

1. Correctness: logic errors, off-by-one, inverted conditions, missing null checks, missing await, race conditions, edge cases tests might miss.
2. Security: missing auth on new endpoints, leaked internal fields, injection via raw string interpolation, HTTP calls to user-supplied URLs.
3. Performance: N+1 queries, unbounded fetches without pagination, expensive work in hot paths, missing indexes for new query patterns.
4. Backward compatibility: renamed or removed API fields, schema changes old data lacks, moved modules other files import, DB changes without migration.
5. Completeness: missing error handling for failure paths, critical operations without logging, new behavior without tests, stale docs.
6. Design and patterns: check what patterns exist nearby and follow them, search for duplicate logic, flag excessive coupling and unclear names, then check project rules (see list below).
7. Architecture: is the code in the right module, does it have one clear responsibility, should repeated logic be extracted.

## How to Investigate

1. READ the PR diff carefully and understand what changed and why.
2. Review ALL changed files. Do not submit your final JSON until you have examined every changed file's diff. Use as many tool calls as you need.
3. USE TOOLS to get context:
   - `read_file` to check related files (callers, tests, models, the full file around a change)
   - `search_code` to find callers of changed functions, check for duplicates, verify patterns
   - `read_rule` to read the full rule before citing it in a suggestion
   - `list_directory` to check if tests exist or see module structure
4. Before suggesting a pattern change, SEARCH for how the codebase already handles it. Follow existing patterns.
5. ONLY suggest issues you have verified with context. Never guess or assume.
6. When you have examined every changed file and have enough context, produce your final review.

## Limits
- "critical" and "warning" have NO limit: always report bugs, security issues, data loss risks, and breaking changes.
- "suggestion" is capped at 8: pick the highest-impact improvements.
- "praise" is capped at 2 and reserved for genuinely impressive work.
- If there are no critical/warning issues and fewer than 2 suggestions, just say "Looks good."
- Do not nitpick formatting or style; linters handle that.
- Do not flag things that existing CI already catches.

## Project Rules (summaries; use the read_rule tool for full content)
{rule_list}

## Linked Spec/Plan Documents (use read_file to read relevant sections)
{spec_list}

## Output Format
Return ONLY a JSON object (no text before or after, no markdown fences):
{{
  "summary": "One sentence overall assessment",
  "suggestions": [
    {{
      "file": "path/to/file.py",
      "line": 42,
      "severity": "warning",
      "rule": "B-28",
      "title": "Short title",
      "body": "Detailed explanation with context and a concrete fix suggestion."
    }}
  ]
}}

## Severity Classification Rules

### CRITICAL: must fix before merge. This will BLOCK the PR.
Only for findings that WILL cause a bug, security breach, or data loss in production: hardcoded secrets, injection, missing auth, data-corrupting writes, off-by-one or inverted logic, swallowed exceptions hiding failures, breaking contract changes without compatibility. IF IN DOUBT, use "warning". Aim for 0-1 critical per PR.

### WARNING: should fix, does not block merge.
Suboptimal patterns, missing error context, performance concerns, potential edge cases, missing tests for new behavior.

### SUGGESTION: nice to have. Must name a CONCRETE action.
Naming improvements, code organization, documentation gaps.

### PRAISE: reserved for work you would mention at a team standup. Max 2 per review. Following standard patterns or writing normally clean code is expected, not praiseworthy. Zero praises is fine.

Allowed severity values: "critical", "warning", "suggestion", "praise"

If code is solid: {{"summary": "Clean PR, ship it!", "suggestions": []}}"#
    )
}

pub fn build_user_message(ctx: &ReviewContext) -> String {
    let mut parts: Vec<String> = Vec::new();

    parts.push("## Changed Files".to_string());
    for f in &ctx.changed_files {
        parts.push(format!("- {f}"));
    }
    parts.push(String::new());

    parts.push("## PR Info".to_string());
    parts.push(format!("- Title: {}", or_na(&ctx.pr_title)));
    parts.push(format!("- Branch: {}", or_na(&ctx.branch_name)));
    if !ctx.pr_body.is_empty() {
        parts.push(format!("- Description: {}", clip(&ctx.pr_body, MAX_PR_BODY_CHARS)));
    }
    parts.push(String::new());

    if !ctx.blast_radius.is_empty() {
        parts.push("## Files That Import Changed Code (blast radius)".to_string());
        for file in &ctx.blast_radius {
            parts.push(format!("### {}", file.path));
            if !file.head.is_empty() {
                parts.push(format!("```\n{}\n```", file.head));
            }
        }
        parts.push(String::new());
    }

    parts.push("## PR Diff".to_string());
    parts.push("```diff".to_string());
    parts.push(ctx.diff.clone());
    parts.push("```".to_string());
    if ctx.diff_truncated {
        parts.push("(diff truncated; use read_file for full context)".to_string());
    }

    parts.push(String::new());
    parts.push(
        "Review this diff. Examine every changed file and do not skip any. \
         Use tools to investigate anything that needs context. \
         When you have reviewed all files, return your final JSON review."
            .to_string(),
    );

    parts.join("\n")
}

/// Follow-up injected when the agent's first answer missed files.
pub fn build_coverage_followup(missed_files: &[String]) -> String {
    let file_list = missed_files
        .iter()
        .map(|f| format!("- {f}"))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "You haven't reviewed these changed files yet:\n{file_list}\n\n\
         Please review them now. Read each file's changes in the diff above \
         (or use read_file if you need more context), then return an UPDATED \
         JSON review that includes findings for ALL files: both the ones you \
         already reviewed and these new ones."
    )
}

/// Final-round nudge; sent with the tool list withheld.
pub fn build_final_round_message() -> String {
    "You have used all available tool rounds. \
     Return your final JSON review now. \
     Do not request any more tools. Just output the JSON object."
        .to_string()
}

fn or_na(value: &str) -> &str {
    if value.is_empty() { "N/A" } else { value }
}

fn clip(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max).collect();
        format!("{cut}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BlastFile, RuleSummary, SpecDoc};

    fn sample_context() -> ReviewContext {
        ReviewContext {
            pr_title: "Add rate limiting".into(),
            branch_name: "feat/rate-limit".into(),
            changed_files: vec!["src/api.py".into(), "src/limits.py".into()],
            diff: "diff --git a/src/api.py b/src/api.py".into(),
            rules: vec![RuleSummary {
                name: "S-001".into(),
                description: "No raw SQL".into(),
            }],
            spec_docs: vec![SpecDoc {
                path: "docs/specs/rate-limiting.md".into(),
                matched_by: "pr_body".into(),
            }],
            ..Default::default()
        }
    }

    #[test]
    fn system_prompt_lists_rules_and_specs() {
        let prompt = build_system_prompt(&sample_context(), &Config::default());
        assert!(prompt.contains("**S-001**: No raw SQL"));
        assert!(prompt.contains("docs/specs/rate-limiting.md"));
        assert!(prompt.contains("\"critical\", \"warning\", \"suggestion\", \"praise\""));
    }

    #[test]
    fn system_prompt_uses_project_identity() {
        let mut config = Config::default();
        config.project.name = "acme-api".into();
        config.project.description = "order processing service".into();
        config.project.tech_stack = "Python, FastAPI".into();
        let prompt = build_system_prompt(&sample_context(), &config);
        assert!(prompt.contains("the acme-api project (order processing service)"));
        assert!(prompt.contains("Python, FastAPI"));
    }

    #[test]
    fn user_message_contains_diff_and_files() {
        let message = build_user_message(&sample_context());
        assert!(message.contains("- src/api.py"));
        assert!(message.contains("- src/limits.py"));
        assert!(message.contains("```diff"));
        assert!(message.contains("Title: Add rate limiting"));
    }

    #[test]
    fn user_message_includes_blast_radius_when_present() {
        let mut ctx = sample_context();
        ctx.blast_radius = vec![BlastFile {
            path: "src/worker.py".into(),
            head: "from src.limits import check".into(),
        }];
        let message = build_user_message(&ctx);
        assert!(message.contains("blast radius"));
        assert!(message.contains("src/worker.py"));
    }

    #[test]
    fn followup_lists_missed_files() {
        let followup = build_coverage_followup(&["src/db.py".into(), "src/auth.py".into()]);
        assert!(followup.contains("- src/db.py"));
        assert!(followup.contains("- src/auth.py"));
        assert!(followup.contains("UPDATED"));
    }

    #[test]
    fn long_pr_body_is_clipped() {
        let mut ctx = sample_context();
        ctx.pr_body = "x".repeat(5000);
        let message = build_user_message(&ctx);
        assert!(message.len() < 4000 + ctx.diff.len());
        assert!(message.contains("xxx..."));
    }
}
