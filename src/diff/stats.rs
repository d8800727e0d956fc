//! Aggregate counts over a unified diff.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Line and file counts for a diff, split into all lines and code lines.
///
/// Doc files (by extension) are excluded from the code counts so a large
/// README rewrite does not trip the complexity thresholds.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct DiffStats {
    pub files_changed: usize,
    pub lines_added: usize,
    pub lines_removed: usize,
    pub code_lines_added: usize,
    pub code_lines_removed: usize,
}

impl DiffStats {
    pub fn compute(diff_text: &str, doc_extensions: &[String]) -> Self {
        let mut stats = DiffStats::default();
        let mut files: HashSet<&str> = HashSet::new();
        let mut current_is_doc = false;

        for line in diff_text.lines() {
            if let Some(path) = line.strip_prefix("+++ b/") {
                files.insert(path);
                current_is_doc = doc_extensions.iter().any(|ext| path.ends_with(ext.as_str()));
            } else if line.starts_with('+') && !line.starts_with("+++") {
                stats.lines_added += 1;
                if !current_is_doc {
                    stats.code_lines_added += 1;
                }
            } else if line.starts_with('-') && !line.starts_with("---") {
                stats.lines_removed += 1;
                if !current_is_doc {
                    stats.code_lines_removed += 1;
                }
            }
        }

        stats.files_changed = files.len();
        stats
    }

    /// Code-line churn, falling back to total churn when the diff had no
    /// recognisable code files.
    pub fn code_churn(&self) -> usize {
        let code = self.code_lines_added + self.code_lines_removed;
        if code > 0 {
            code
        } else {
            self.lines_added + self.lines_removed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn doc_exts() -> Vec<String> {
        vec![".md".into(), ".txt".into()]
    }

    #[test]
    fn counts_split_docs_from_code() {
        let diff = "\
+++ b/src/main.py
@@ -1,2 +1,3 @@
+import os
-old_line
+++ b/README.md
@@ -1,1 +1,2 @@
+New docs line
";
        let stats = DiffStats::compute(diff, &doc_exts());
        assert_eq!(stats.files_changed, 2);
        assert_eq!(stats.lines_added, 2);
        assert_eq!(stats.lines_removed, 1);
        assert_eq!(stats.code_lines_added, 1);
        assert_eq!(stats.code_lines_removed, 1);
    }

    #[test]
    fn churn_falls_back_to_total_for_doc_only_diffs() {
        let diff = "\
+++ b/README.md
@@ -1,1 +1,3 @@
+one
+two
";
        let stats = DiffStats::compute(diff, &doc_exts());
        assert_eq!(stats.code_lines_added, 0);
        assert_eq!(stats.code_churn(), 2);
    }
}
