//! Blast radius tracing: find files that import changed modules.
//!
//! Gives the reviewer the callers of changed code without waiting for it
//! to ask. Python modules are matched by `import x` / `from x import`;
//! TypeScript by `from ... <basename>`. Capped hard, this is context, not
//! a dependency graph.

use std::collections::HashSet;
use std::path::Path;

use ignore::WalkBuilder;
use regex::Regex;

use crate::config::Config;
use crate::models::BlastFile;

/// Only the first few changed modules are traced; huge PRs get their
/// context from the diff itself.
const MAX_TRACED_MODULES: usize = 5;
const HEAD_LINES: usize = 50;
const HEAD_CHARS: usize = 2000;

fn detect_language(changed_files: &[String]) -> &'static str {
    let py = changed_files.iter().filter(|f| f.ends_with(".py")).count();
    let ts = changed_files
        .iter()
        .filter(|f| {
            f.ends_with(".ts") || f.ends_with(".tsx") || f.ends_with(".js") || f.ends_with(".jsx")
        })
        .count();
    if py >= ts { "python" } else { "typescript" }
}

/// Trace importers of the changed files. Blocking; callers run this off
/// the async executor.
pub fn trace_blast_radius(
    repo_root: &Path,
    changed_files: &[String],
    config: &Config,
) -> Vec<BlastFile> {
    let br = &config.blast_radius;
    if !br.enabled {
        return Vec::new();
    }

    let language = if br.language == "auto" {
        detect_language(changed_files)
    } else {
        br.language.as_str()
    };

    let search_roots: Vec<std::path::PathBuf> = if br.source_dirs.is_empty() {
        vec![repo_root.to_path_buf()]
    } else {
        br.source_dirs.iter().map(|d| repo_root.join(d)).collect()
    };

    let mut blast = match language {
        "python" => trace_python(repo_root, changed_files, br, &search_roots),
        _ => trace_typescript(repo_root, changed_files, &search_roots),
    };
    blast.truncate(br.max_files);
    blast
}

fn trace_python(
    repo_root: &Path,
    changed_files: &[String],
    br: &crate::config::BlastRadiusConfig,
    search_roots: &[std::path::PathBuf],
) -> Vec<BlastFile> {
    let changed_set: HashSet<&str> = changed_files.iter().map(String::as_str).collect();
    let mut seen_modules: HashSet<String> = HashSet::new();
    let mut seen_paths: HashSet<String> = HashSet::new();
    let mut blast = Vec::new();

    let py_files: Vec<&String> = changed_files
        .iter()
        .filter(|f| f.ends_with(".py"))
        .collect();

    for cf in py_files.into_iter().take(MAX_TRACED_MODULES) {
        let mut rel = cf.as_str();
        if !br.module_prefix_strip.is_empty() {
            rel = rel.strip_prefix(&br.module_prefix_strip).unwrap_or(rel);
        }
        let module = rel.trim_end_matches(".py").replace('/', ".");
        if module.is_empty() || !seen_modules.insert(module.clone()) {
            continue;
        }

        let from_import = format!("from {module} import");
        let plain_import = format!("import {module}");

        for root in search_roots {
            for entry in WalkBuilder::new(root).build().flatten() {
                let path = entry.path();
                if !entry.file_type().is_some_and(|t| t.is_file())
                    || path.extension().is_none_or(|e| e != "py")
                {
                    continue;
                }
                let Ok(content) = std::fs::read_to_string(path) else {
                    continue;
                };
                if !content.contains(&from_import) && !content.contains(&plain_import) {
                    continue;
                }
                let rel_path = path
                    .strip_prefix(repo_root)
                    .unwrap_or(path)
                    .to_string_lossy()
                    .into_owned();
                if changed_set.contains(rel_path.as_str()) || !seen_paths.insert(rel_path.clone())
                {
                    continue;
                }
                let head: String = content
                    .lines()
                    .take(HEAD_LINES)
                    .collect::<Vec<_>>()
                    .join("\n")
                    .chars()
                    .take(HEAD_CHARS)
                    .collect();
                blast.push(BlastFile {
                    path: rel_path,
                    head,
                });
            }
        }
    }

    blast
}

fn trace_typescript(
    repo_root: &Path,
    changed_files: &[String],
    search_roots: &[std::path::PathBuf],
) -> Vec<BlastFile> {
    let changed_set: HashSet<&str> = changed_files.iter().map(String::as_str).collect();
    let mut seen_basenames: HashSet<String> = HashSet::new();
    let mut seen_paths: HashSet<String> = HashSet::new();
    let mut blast = Vec::new();

    let ts_files: Vec<&String> = changed_files
        .iter()
        .filter(|f| {
            f.ends_with(".ts") || f.ends_with(".tsx") || f.ends_with(".js") || f.ends_with(".jsx")
        })
        .collect();

    for cf in ts_files.into_iter().take(MAX_TRACED_MODULES) {
        let Some(basename) = Path::new(cf).file_stem().map(|s| s.to_string_lossy().into_owned())
        else {
            continue;
        };
        if !seen_basenames.insert(basename.clone()) {
            continue;
        }
        let Ok(import_re) = Regex::new(&format!("from.*{}", regex::escape(&basename))) else {
            continue;
        };

        for root in search_roots {
            for entry in WalkBuilder::new(root).build().flatten() {
                let path = entry.path();
                let is_ts = path.extension().is_some_and(|e| {
                    e == "ts" || e == "tsx" || e == "js" || e == "jsx"
                });
                if !entry.file_type().is_some_and(|t| t.is_file()) || !is_ts {
                    continue;
                }
                let Ok(content) = std::fs::read_to_string(path) else {
                    continue;
                };
                if !import_re.is_match(&content) {
                    continue;
                }
                let rel_path = path
                    .strip_prefix(repo_root)
                    .unwrap_or(path)
                    .to_string_lossy()
                    .into_owned();
                if changed_set.contains(rel_path.as_str()) || !seen_paths.insert(rel_path.clone())
                {
                    continue;
                }
                blast.push(BlastFile {
                    path: rel_path,
                    head: String::new(),
                });
            }
        }
    }

    blast
}
