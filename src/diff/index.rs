//! Line index over a unified diff.
//!
//! GitHub only accepts inline review comments on lines that appear in the
//! diff hunks. [`DiffIndex`] maps each file to its commentable lines
//! (added and context) and its changed lines (added only), both on the
//! new-file side, so the publisher can anchor findings safely.

use std::collections::BTreeSet;

use indexmap::IndexMap;

/// How far a finding's line may drift from a diff line and still be anchored.
pub const MAX_LINE_SEARCH_OFFSET: u32 = 5;

/// Proximity window for deciding whether an old comment refers to a line
/// touched by the current diff.
pub const COMMENT_PROXIMITY_THRESHOLD: u32 = 5;

#[derive(Debug, Clone, Default)]
pub struct DiffIndex {
    /// New-side lines present in hunks (added + context), per file.
    commentable: IndexMap<String, BTreeSet<u32>>,
    /// New-side lines actually added, per file.
    changed: IndexMap<String, BTreeSet<u32>>,
}

impl DiffIndex {
    /// Build the index by walking hunk headers and counting new-side lines.
    ///
    /// Deleted lines carry no new-side number and are skipped. Files with a
    /// `diff --git` header but no `+++ b/` line (binary, deletions) never
    /// become current and contribute nothing.
    pub fn parse(diff: &str) -> Self {
        let mut index = DiffIndex::default();
        let mut current_file: Option<String> = None;
        let mut current_line: u32 = 0;

        for line in diff.lines() {
            if line.starts_with("diff --git") {
                current_file = None;
                continue;
            }
            if let Some(path) = line.strip_prefix("+++ b/") {
                current_file = Some(path.trim().to_string());
                continue;
            }
            if line.starts_with("@@") {
                current_line = parse_new_start(line).map(|n| n.saturating_sub(1)).unwrap_or(0);
                continue;
            }
            let Some(file) = &current_file else { continue };
            if line.starts_with('+') && !line.starts_with("+++") {
                current_line += 1;
                index
                    .commentable
                    .entry(file.clone())
                    .or_default()
                    .insert(current_line);
                index
                    .changed
                    .entry(file.clone())
                    .or_default()
                    .insert(current_line);
            } else if line.starts_with(' ') {
                current_line += 1;
                index
                    .commentable
                    .entry(file.clone())
                    .or_default()
                    .insert(current_line);
            }
        }

        index
    }

    pub fn commentable_lines(&self, file: &str) -> Option<&BTreeSet<u32>> {
        self.commentable.get(file)
    }

    pub fn changed_lines(&self, file: &str) -> Option<&BTreeSet<u32>> {
        self.changed.get(file)
    }

    pub fn files(&self) -> impl Iterator<Item = &str> {
        self.commentable.keys().map(String::as_str)
    }

    /// Find the diff line closest to `target` in `file`, within the search
    /// offset. An exact hit wins; otherwise nearer lines win, with the later
    /// line preferred on ties. Idempotent: feeding the result back returns
    /// the same line.
    pub fn closest_commentable_line(&self, file: &str, target: u32) -> Option<u32> {
        let lines = self.commentable.get(file)?;
        if lines.contains(&target) {
            return Some(target);
        }
        for offset in 1..=MAX_LINE_SEARCH_OFFSET {
            if lines.contains(&(target + offset)) {
                return Some(target + offset);
            }
            if target > offset && lines.contains(&(target - offset)) {
                return Some(target - offset);
            }
        }
        None
    }

    /// Whether a comment anchored at `line` is near a line this diff adds,
    /// meaning the comment likely refers to code the new push touched.
    pub fn is_near_changed_line(&self, file: &str, line: u32) -> bool {
        let Some(changed) = self.changed.get(file) else {
            return false;
        };
        changed
            .iter()
            .any(|&l| l.abs_diff(line) <= COMMENT_PROXIMITY_THRESHOLD)
    }
}

/// Extract the new-side start line from a hunk header like `@@ -3,4 +10,6 @@`.
fn parse_new_start(header: &str) -> Option<u32> {
    let plus = header.find('+')?;
    let rest = &header[plus + 1..];
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = "\
diff --git a/src/a.py b/src/a.py
index 111..222 100644
--- a/src/a.py
+++ b/src/a.py
@@ -1,4 +1,6 @@
 import os
+import sys
+import json

 def main():
@@ -38,3 +40,5 @@ def helper():
     return 1
+
+def extra():
";

    #[test]
    fn commentable_includes_context_changed_does_not() {
        let index = DiffIndex::parse(SAMPLE);
        let commentable = index.commentable_lines("src/a.py").unwrap();
        let changed = index.changed_lines("src/a.py").unwrap();

        // 6 lines in the first hunk, lines 1..=6 on the new side.
        assert!(commentable.contains(&1)); // context "import os"
        assert!(commentable.contains(&2)); // added "import sys"
        assert!(!changed.contains(&1));
        assert!(changed.contains(&2));
        assert!(changed.contains(&3));
    }

    #[test]
    fn second_hunk_resumes_at_header_line() {
        let index = DiffIndex::parse(SAMPLE);
        let commentable = index.commentable_lines("src/a.py").unwrap();
        // Hunk starts at +40: context line 40, then additions 41 and 42.
        assert!(commentable.contains(&40));
        assert!(commentable.contains(&42));
        assert!(!commentable.contains(&39));
    }

    #[test]
    fn diff_git_resets_current_file() {
        let diff = "\
diff --git a/gone.py b/gone.py
deleted file mode 100644
--- a/gone.py
+++ /dev/null
@@ -1,2 +0,0 @@
-old
-stuff
diff --git a/new.py b/new.py
--- /dev/null
+++ b/new.py
@@ -0,0 +1,2 @@
+fresh
+code
";
        let index = DiffIndex::parse(diff);
        assert!(index.commentable_lines("gone.py").is_none());
        let new = index.changed_lines("new.py").unwrap();
        assert_eq!(new.iter().copied().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn closest_line_prefers_exact_then_nearest() {
        let index = DiffIndex::parse(SAMPLE);
        assert_eq!(index.closest_commentable_line("src/a.py", 2), Some(2));
        // 44 is not in the diff; 42 is within the offset window.
        assert_eq!(index.closest_commentable_line("src/a.py", 44), Some(42));
        // Too far from any hunk.
        assert_eq!(index.closest_commentable_line("src/a.py", 100), None);
        assert_eq!(index.closest_commentable_line("other.py", 1), None);
    }

    #[test]
    fn closest_line_is_idempotent() {
        let index = DiffIndex::parse(SAMPLE);
        for target in [1u32, 7, 39, 44, 45] {
            if let Some(anchored) = index.closest_commentable_line("src/a.py", target) {
                assert_eq!(
                    index.closest_commentable_line("src/a.py", anchored),
                    Some(anchored)
                );
            }
        }
    }

    #[test]
    fn proximity_uses_changed_lines_only() {
        let index = DiffIndex::parse(SAMPLE);
        // Line 1 is context only; nearest added line is 2, within the window.
        assert!(index.is_near_changed_line("src/a.py", 1));
        assert!(index.is_near_changed_line("src/a.py", 46));
        assert!(!index.is_near_changed_line("src/a.py", 60));
        assert!(!index.is_near_changed_line("other.py", 2));
    }

    #[test]
    fn malformed_hunk_header_defaults_to_zero() {
        let diff = "\
diff --git a/x.py b/x.py
+++ b/x.py
@@ garbage @@
+first
";
        let index = DiffIndex::parse(diff);
        let changed = index.changed_lines("x.py").unwrap();
        assert!(changed.contains(&1));
    }
}
