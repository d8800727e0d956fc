//! The `read_rule` tool: fetch a project rule's full text by ID.

use std::path::Path;

use serde::Deserialize;

/// Rule bodies longer than this are cut; summaries live in the prompt,
/// the tool exists for detail on demand.
const MAX_RULE_CHARS: usize = 3000;

#[derive(Debug, Deserialize)]
pub struct ReadRuleArgs {
    pub rule_id: String,
}

pub async fn run(root: &Path, rules_dir: &str, extension: &str, args: ReadRuleArgs) -> String {
    let id = &args.rule_id;
    if id.contains('/') || id.contains('\\') || id.contains("..") {
        return "Access denied: invalid rule ID".to_string();
    }

    let dir = root.join(rules_dir);
    let mut rule_path = dir.join(format!("{id}{extension}"));
    if !rule_path.is_file() {
        // Maybe the ID already carries the extension.
        rule_path = dir.join(id);
        if !rule_path.is_file() {
            return format!("Rule not found: {id}");
        }
    }

    let content = match tokio::fs::read_to_string(&rule_path).await {
        Ok(c) => c,
        Err(e) => return format!("Tool error: could not read rule {id}: {e}"),
    };

    let body = strip_front_matter(&content);
    truncate_chars(body, MAX_RULE_CHARS)
}

/// Drop a leading `---` front matter block if present.
fn strip_front_matter(content: &str) -> &str {
    if let Some(rest) = content.strip_prefix("---") {
        if let Some(end) = rest.find("---") {
            return rest[end + 3..].trim();
        }
    }
    content
}

fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max).collect();
    format!("{cut}\n... [truncated]")
}
