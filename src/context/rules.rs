//! Rule selection: match changed files against rule front matter globs.
//!
//! Rules live as markdown files with a YAML-ish front matter block:
//!
//! ```text
//! ---
//! description: "..."
//! globs: "*.py,*.ts"
//! ---
//! Rule content here...
//! ```
//!
//! Only summaries are selected here; the agent pulls full bodies on demand
//! through the `read_rule` tool.

use std::collections::HashSet;
use std::path::Path;

use regex::Regex;

use crate::config::Config;
use crate::models::RuleSummary;

#[derive(Debug, Clone, Default)]
pub struct RuleFrontMatter {
    pub description: String,
    pub globs: String,
}

/// Parse the front matter block; files without one yield empty fields.
pub fn parse_front_matter(content: &str) -> RuleFrontMatter {
    let mut parsed = RuleFrontMatter::default();
    let Some(rest) = content.strip_prefix("---") else {
        return parsed;
    };
    let Some(end) = rest.find("---") else {
        return parsed;
    };
    for line in rest[..end].lines() {
        let line = line.trim();
        if let Some(value) = line.strip_prefix("description:") {
            parsed.description = value.trim().trim_matches('"').to_string();
        } else if let Some(value) = line.strip_prefix("globs:") {
            parsed.globs = value.trim().trim_matches('"').to_string();
        }
    }
    parsed
}

/// Does `filepath` match any pattern in a comma-separated glob list?
/// Glob semantics follow fnmatch: `*` spans path separators.
pub fn matches_globs(filepath: &str, globs: &str) -> bool {
    globs
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .any(|pattern| {
            glob_regex(pattern)
                .map(|re| re.is_match(filepath))
                .unwrap_or(false)
        })
}

fn glob_regex(glob: &str) -> Result<Regex, regex::Error> {
    let mut source = String::from("^");
    for c in glob.chars() {
        match c {
            '*' => source.push_str(".*"),
            '?' => source.push('.'),
            other => source.push_str(&regex::escape(&other.to_string())),
        }
    }
    source.push('$');
    Regex::new(&source)
}

/// Sort order: S-* rules first (shared foundation), then B-*/F-*
/// (area-specific), then everything else.
fn rule_sort_key(stem: &str) -> (u8, String) {
    let tier = if stem.starts_with("S-") {
        0
    } else if stem.starts_with("B-") || stem.starts_with("F-") {
        1
    } else {
        2
    };
    (tier, stem.to_string())
}

/// Match changed files against rule globs and return applicable rules,
/// capped at `review.max_rule_files`.
pub fn select_applicable_rules(
    repo_root: &Path,
    changed_files: &[String],
    config: &Config,
) -> Vec<RuleSummary> {
    if !config.rules.enabled {
        return Vec::new();
    }

    let rules_dir = repo_root.join(&config.rules.directory);
    let Ok(entries) = std::fs::read_dir(&rules_dir) else {
        return Vec::new();
    };

    let Ok(file_re) = glob_regex(&config.rules.file_pattern) else {
        return Vec::new();
    };

    let mut rule_files: Vec<(String, std::path::PathBuf)> = entries
        .flatten()
        .filter_map(|entry| {
            let path = entry.path();
            let name = path.file_name()?.to_string_lossy().into_owned();
            if path.is_file() && file_re.is_match(&name) {
                let stem = path.file_stem()?.to_string_lossy().into_owned();
                Some((stem, path))
            } else {
                None
            }
        })
        .collect();
    rule_files.sort_by_key(|(stem, _)| rule_sort_key(stem));

    let always_include: HashSet<&str> = config
        .rules
        .always_include
        .iter()
        .map(String::as_str)
        .collect();

    let mut rules = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for (name, path) in rule_files {
        let Ok(content) = std::fs::read_to_string(&path) else {
            continue;
        };
        let parsed = parse_front_matter(&content);

        if always_include.contains(name.as_str()) {
            if seen.insert(name.clone()) {
                rules.push(RuleSummary {
                    name,
                    description: parsed.description,
                });
            }
            continue;
        }

        if parsed.globs.is_empty() {
            continue;
        }

        if changed_files
            .iter()
            .any(|cf| matches_globs(cf, &parsed.globs))
            && seen.insert(name.clone())
        {
            rules.push(RuleSummary {
                name,
                description: parsed.description,
            });
        }
    }

    rules.truncate(config.review.max_rule_files);
    rules
}
