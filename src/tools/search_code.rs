//! The `search_code` tool: repo-wide pattern search.
//!
//! Walks the tree with gitignore awareness via the `ignore` crate. Plain
//! text patterns are matched literally; anything containing regex
//! metacharacters is compiled as a regex. The walk runs on a blocking
//! thread with a hard timeout.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ignore::WalkBuilder;
use regex::Regex;
use serde::Deserialize;

use super::confine;

/// Matches shown to the agent per search.
const MAX_MATCHES: usize = 30;

const SEARCH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
pub struct SearchCodeArgs {
    pub pattern: String,
    #[serde(default)]
    pub file_pattern: Option<String>,
    #[serde(default)]
    pub directory: Option<String>,
}

pub async fn run(root: &Path, args: SearchCodeArgs) -> String {
    let file_pattern = args.file_pattern.unwrap_or_default();
    if !file_pattern.is_empty() && !is_valid_glob(&file_pattern) {
        return "Invalid file pattern: only alphanumeric, _, ., *, ?, /, - allowed.".to_string();
    }

    // Literal unless the pattern contains regex metacharacters.
    let source = if regex::escape(&args.pattern) != args.pattern {
        args.pattern.clone()
    } else {
        regex::escape(&args.pattern)
    };
    let matcher = match Regex::new(&source) {
        Ok(re) => re,
        Err(_) => return "Invalid regex pattern.".to_string(),
    };

    let search_dir = match args.directory.as_deref() {
        None | Some("") => root.to_path_buf(),
        Some(dir) => match confine(root, dir) {
            Some(abs) if abs.is_dir() => abs,
            Some(_) => return "No matches found.".to_string(),
            None => return "Access denied: path is outside the repository".to_string(),
        },
    };

    let name_matcher = if file_pattern.is_empty() {
        None
    } else {
        match glob_to_regex(&file_pattern) {
            Ok(re) => Some(re),
            Err(_) => return "Invalid file pattern: could not compile glob.".to_string(),
        }
    };

    let root_owned = root.to_path_buf();
    let task = tokio::task::spawn_blocking(move || {
        search_blocking(&root_owned, &search_dir, &matcher, name_matcher.as_ref())
    });

    let (total, mut lines) = match tokio::time::timeout(SEARCH_TIMEOUT, task).await {
        Ok(Ok(found)) => found,
        Ok(Err(e)) => return format!("Search failed: {e}"),
        Err(_) => return "Search timed out.".to_string(),
    };

    if total == 0 {
        return "No matches found.".to_string();
    }
    if total > MAX_MATCHES {
        lines.push(format!(
            "... [{total} total matches, showing first {MAX_MATCHES}]"
        ));
    }
    lines.join("\n")
}

fn search_blocking(
    root: &Path,
    search_dir: &Path,
    matcher: &Regex,
    name_matcher: Option<&Regex>,
) -> (usize, Vec<String>) {
    let mut total = 0;
    let mut lines = Vec::new();

    for entry in WalkBuilder::new(search_dir).build().flatten() {
        let path = entry.path();
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        if let Some(name_re) = name_matcher {
            if !glob_target_matches(name_re, root, path) {
                continue;
            }
        }
        // Binary and non-UTF-8 files are silently skipped.
        let Ok(content) = std::fs::read_to_string(path) else {
            continue;
        };
        let display = path
            .strip_prefix(root)
            .map(PathBuf::from)
            .unwrap_or_else(|_| path.to_path_buf());
        for (idx, line) in content.lines().enumerate() {
            if matcher.is_match(line) {
                total += 1;
                if lines.len() < MAX_MATCHES {
                    lines.push(format!("{}:{}: {}", display.display(), idx + 1, line));
                }
            }
        }
    }

    (total, lines)
}

fn is_valid_glob(pattern: &str) -> bool {
    pattern
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "_.*?/-".contains(c))
}

/// Translate a shell glob into an anchored regex (`*` spans anything,
/// `?` matches one character).
fn glob_to_regex(glob: &str) -> Result<Regex, regex::Error> {
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

/// Globs with a `/` match against the repo-relative path, bare globs
/// against the file name only.
fn glob_target_matches(name_re: &Regex, root: &Path, path: &Path) -> bool {
    let wants_path = name_re.as_str().contains('/');
    if wants_path {
        let rel = path.strip_prefix(root).unwrap_or(path);
        name_re.is_match(&rel.to_string_lossy())
    } else {
        path.file_name()
            .map(|n| name_re.is_match(&n.to_string_lossy()))
            .unwrap_or(false)
    }
}
