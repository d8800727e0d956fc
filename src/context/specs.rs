//! Spec/plan document discovery, three levels deep.
//!
//! Level 1 parses explicit paths out of the PR description. Level 2 fuzzy
//! matches branch/title keywords against spec filenames. Level 3 falls back
//! to the configured directory-to-doc map. The first level that produces
//! results wins.

use std::collections::HashSet;
use std::path::Path;

use regex::Regex;

use crate::config::Config;
use crate::models::SpecDoc;

const FUZZY_CAP: usize = 3;
const DIRECTORY_MAP_CAP: usize = 5;

/// Run the three discovery levels in order.
pub fn discover_spec_docs(
    repo_root: &Path,
    pr_body: &str,
    pr_title: &str,
    branch_name: &str,
    changed_files: &[String],
    config: &Config,
) -> Vec<SpecDoc> {
    let from_pr = discover_from_pr_body(repo_root, pr_body, config);
    if !from_pr.is_empty() {
        return from_pr;
    }
    let fuzzy = discover_fuzzy(repo_root, branch_name, pr_title, config);
    if !fuzzy.is_empty() {
        return fuzzy;
    }
    discover_from_directory_map(repo_root, changed_files, config)
}

/// Level 1: explicit spec paths mentioned in the PR description.
pub fn discover_from_pr_body(repo_root: &Path, pr_body: &str, config: &Config) -> Vec<SpecDoc> {
    if pr_body.is_empty() {
        return Vec::new();
    }

    let dir_alternation = config
        .docs
        .spec_dirs
        .iter()
        .map(|d| regex::escape(d))
        .collect::<Vec<_>>()
        .join("|");
    if dir_alternation.is_empty() {
        return Vec::new();
    }
    let Ok(re) = Regex::new(&format!(r#"(?:{dir_alternation})/[^\s)"]+\.md"#)) else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    re.find_iter(pr_body)
        .map(|m| m.as_str().to_string())
        .filter(|path| seen.insert(path.clone()) && repo_root.join(path).is_file())
        .map(|path| SpecDoc {
            path,
            matched_by: "pr_body".to_string(),
        })
        .collect()
}

/// Level 2: fuzzy match branch name and PR title against spec filenames.
/// A filename qualifies when at least two keywords appear in it.
pub fn discover_fuzzy(
    repo_root: &Path,
    branch_name: &str,
    pr_title: &str,
    config: &Config,
) -> Vec<SpecDoc> {
    let text = format!("{branch_name} {pr_title}").to_lowercase();
    let text = Regex::new(r"^(feature|fix|refactor|chore|docs|test)/")
        .map(|re| re.replace(&text, "").into_owned())
        .unwrap_or(text);

    let stopwords: HashSet<&str> = ["the", "and", "for", "from", "with", "this", "that", "feat", "fix"]
        .into_iter()
        .collect();
    let Ok(word_re) = Regex::new(r"[a-z]{3,}") else {
        return Vec::new();
    };
    let keywords: HashSet<String> = word_re
        .find_iter(&text)
        .map(|m| m.as_str().to_string())
        .filter(|w| !stopwords.contains(w.as_str()))
        .collect();
    if keywords.is_empty() {
        return Vec::new();
    }

    let mut docs = Vec::new();
    for spec_dir in &config.docs.spec_dirs {
        let Ok(entries) = std::fs::read_dir(repo_root.join(spec_dir)) else {
            continue;
        };
        let mut names: Vec<String> = entries
            .flatten()
            .filter_map(|e| {
                let name = e.file_name().to_string_lossy().into_owned();
                name.ends_with(".md").then_some(name)
            })
            .collect();
        names.sort();

        for name in names {
            let stem = name.trim_end_matches(".md");
            let normalized = stem.to_lowercase().replace(['_', '-'], " ");
            let hits = keywords.iter().filter(|kw| normalized.contains(kw.as_str())).count();
            if hits >= 2 {
                docs.push(SpecDoc {
                    path: format!("{spec_dir}/{name}"),
                    matched_by: "fuzzy".to_string(),
                });
            }
        }
    }

    docs.truncate(FUZZY_CAP);
    docs
}

/// Level 3: configured directory-to-documentation map.
pub fn discover_from_directory_map(
    repo_root: &Path,
    changed_files: &[String],
    config: &Config,
) -> Vec<SpecDoc> {
    let doc_map = &config.docs.directory_doc_map;
    if doc_map.is_empty() {
        return Vec::new();
    }

    let mut docs = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    for cf in changed_files {
        for (directory, doc_paths) in doc_map {
            if !cf.contains(directory.as_str()) {
                continue;
            }
            for doc_path in doc_paths {
                if seen.insert(doc_path) && repo_root.join(doc_path).is_file() {
                    docs.push(SpecDoc {
                        path: doc_path.clone(),
                        matched_by: "directory_map".to_string(),
                    });
                }
            }
        }
    }

    docs.truncate(DIRECTORY_MAP_CAP);
    docs
}
