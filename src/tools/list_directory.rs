//! The `list_directory` tool: shallow directory listings.

use std::path::Path;

use serde::Deserialize;

use super::{confine, resolves_inside};

const MAX_ENTRIES: usize = 50;

#[derive(Debug, Deserialize)]
pub struct ListDirectoryArgs {
    pub path: String,
}

pub async fn run(root: &Path, args: ListDirectoryArgs) -> String {
    let Some(abs) = confine(root, &args.path) else {
        return "Access denied: path is outside the repository".to_string();
    };

    let meta = match tokio::fs::metadata(&abs).await {
        Ok(m) => m,
        Err(_) => return format!("Directory not found: {}", args.path),
    };
    if !meta.is_dir() {
        return format!("Not a directory: {}", args.path);
    }
    if !resolves_inside(root, &abs) {
        return "Access denied: path is outside the repository".to_string();
    }

    let mut reader = match tokio::fs::read_dir(&abs).await {
        Ok(r) => r,
        Err(e) => return format!("Tool error: could not list {}: {e}", args.path),
    };

    let mut entries: Vec<(String, bool)> = Vec::new();
    while let Ok(Some(entry)) = reader.next_entry().await {
        let is_dir = entry
            .file_type()
            .await
            .map(|t| t.is_dir())
            .unwrap_or(false);
        entries.push((entry.file_name().to_string_lossy().into_owned(), is_dir));
    }
    entries.sort();

    let mut lines: Vec<String> = entries
        .iter()
        .take(MAX_ENTRIES)
        .map(|(name, is_dir)| {
            let prefix = if *is_dir { "d " } else { "  " };
            format!("{prefix}{name}")
        })
        .collect();

    if entries.len() > MAX_ENTRIES {
        lines.push(format!(
            "... [{} total entries, showing first {MAX_ENTRIES}]",
            entries.len()
        ));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[tokio::test]
    async fn lists_sorted_with_dir_prefix() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("README.md"), "").unwrap();
        fs::write(dir.path().join("setup.py"), "").unwrap();
        let out = run(dir.path(), ListDirectoryArgs { path: ".".into() }).await;
        assert_eq!(out, "  README.md\n  setup.py\nd src");
    }

    #[tokio::test]
    async fn caps_entries_with_count() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..60 {
            fs::write(dir.path().join(format!("f{i:03}")), "").unwrap();
        }
        let out = run(dir.path(), ListDirectoryArgs { path: ".".into() }).await;
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 51);
        assert!(lines[50].contains("60 total entries, showing first 50"));
    }

    #[tokio::test]
    async fn missing_directory_reports_text() {
        let dir = tempfile::tempdir().unwrap();
        let out = run(dir.path(), ListDirectoryArgs { path: "ghost".into() }).await;
        assert_eq!(out, "Directory not found: ghost");
    }
}
