//! The `read_file` tool: numbered file contents with optional line ranges.

use std::path::Path;

use serde::Deserialize;

use super::{confine, resolves_inside};

/// Hard cap on lines returned per call. The agent can page with
/// `start_line` if it needs more.
const MAX_LINES: usize = 200;

#[derive(Debug, Deserialize)]
pub struct ReadFileArgs {
    pub path: String,
    #[serde(default)]
    pub start_line: Option<usize>,
    #[serde(default)]
    pub end_line: Option<usize>,
}

pub async fn run(root: &Path, args: ReadFileArgs) -> String {
    let Some(abs) = confine(root, &args.path) else {
        return "Access denied: path is outside the repository".to_string();
    };

    let meta = match tokio::fs::metadata(&abs).await {
        Ok(m) => m,
        Err(_) => return format!("File not found: {}", args.path),
    };
    if !meta.is_file() {
        return format!("Not a file: {}", args.path);
    }
    if !resolves_inside(root, &abs) {
        return "Access denied: path is outside the repository".to_string();
    }

    let bytes = match tokio::fs::read(&abs).await {
        Ok(b) => b,
        Err(e) => return format!("Tool error: could not read {}: {e}", args.path),
    };
    let content = String::from_utf8_lossy(&bytes);

    // start is 0-based internally; the API is 1-indexed.
    let start = args.start_line.unwrap_or(1).saturating_sub(1);
    let take = match args.end_line {
        Some(end) => end.saturating_sub(start).min(MAX_LINES),
        None => MAX_LINES,
    };

    // Read one line past the window so the marker only appears when the
    // file actually continues.
    let mut selected: Vec<&str> = content.lines().skip(start).take(take + 1).collect();
    let has_more = selected.len() > take;
    selected.truncate(take);

    let mut numbered: Vec<String> = selected
        .iter()
        .enumerate()
        .map(|(i, line)| format!("{:4} | {line}", i + start + 1))
        .collect();

    if has_more && selected.len() >= MAX_LINES {
        let last = start + selected.len();
        numbered.push(format!(
            "... [truncated at {MAX_LINES} lines - file continues beyond line {last}]"
        ));
    }

    numbered.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, content: &str) {
        let mut f = std::fs::File::create(dir.join(name)).unwrap();
        f.write_all(content.as_bytes()).unwrap();
    }

    #[tokio::test]
    async fn numbers_lines_one_indexed() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "a.py", "first\nsecond\nthird\n");
        let out = run(
            dir.path(),
            ReadFileArgs { path: "a.py".into(), start_line: None, end_line: None },
        )
        .await;
        assert_eq!(out, "   1 | first\n   2 | second\n   3 | third");
    }

    #[tokio::test]
    async fn honours_line_range() {
        let dir = tempfile::tempdir().unwrap();
        let body: String = (1..=10).map(|i| format!("line{i}\n")).collect();
        write_file(dir.path(), "a.py", &body);
        let out = run(
            dir.path(),
            ReadFileArgs { path: "a.py".into(), start_line: Some(3), end_line: Some(5) },
        )
        .await;
        assert_eq!(out, "   3 | line3\n   4 | line4\n   5 | line5");
    }

    #[tokio::test]
    async fn truncates_at_cap_with_marker() {
        let dir = tempfile::tempdir().unwrap();
        let body: String = (1..=250).map(|i| format!("line{i}\n")).collect();
        write_file(dir.path(), "big.py", &body);
        let out = run(
            dir.path(),
            ReadFileArgs { path: "big.py".into(), start_line: None, end_line: None },
        )
        .await;
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 201);
        assert!(lines[200].contains("truncated at 200 lines"));
        assert!(lines[200].contains("beyond line 200"));
    }

    #[tokio::test]
    async fn file_at_exactly_the_cap_gets_no_marker() {
        let dir = tempfile::tempdir().unwrap();
        let body: String = (1..=200).map(|i| format!("line{i}\n")).collect();
        write_file(dir.path(), "exact.py", &body);
        let out = run(
            dir.path(),
            ReadFileArgs { path: "exact.py".into(), start_line: None, end_line: None },
        )
        .await;
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 200);
        assert!(!out.contains("truncated"));
    }

    #[tokio::test]
    async fn missing_file_and_escape_report_text() {
        let dir = tempfile::tempdir().unwrap();
        let missing = run(
            dir.path(),
            ReadFileArgs { path: "nope.py".into(), start_line: None, end_line: None },
        )
        .await;
        assert_eq!(missing, "File not found: nope.py");

        let escape = run(
            dir.path(),
            ReadFileArgs { path: "../outside".into(), start_line: None, end_line: None },
        )
        .await;
        assert_eq!(escape, "Access denied: path is outside the repository");
    }

    #[tokio::test]
    async fn directory_is_not_a_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        let out = run(
            dir.path(),
            ReadFileArgs { path: "sub".into(), start_line: None, end_line: None },
        )
        .await;
        assert_eq!(out, "Not a file: sub");
    }
}
