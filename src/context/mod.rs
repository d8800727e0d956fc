//! Context preparation: everything the review agent sees up front.
//!
//! Gathers the diff and changed files (from work-dir artifacts when a CI
//! step already produced them, otherwise straight from git), selects
//! applicable rules, discovers linked spec documents, and traces the
//! blast radius of changed modules.

pub mod blast;
pub mod rules;
pub mod specs;

use std::path::Path;

use thiserror::Error;

use crate::config::Config;
use crate::constants;
use crate::diff::{git, DiffError};
use crate::env::Env;
use crate::models::ReviewContext;

/// PR bodies can be essays; the agent only needs the intent.
const MAX_PR_BODY_CHARS: usize = 2000;

#[derive(Error, Debug)]
pub enum ContextError {
    #[error(transparent)]
    Diff(#[from] DiffError),

    #[error("failed to read artifact {path}: {source}")]
    Artifact {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[error("blast radius task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Build the full review context for a checked-out PR.
///
/// `work_dir` may hold pre-produced artifacts (`pr.diff`,
/// `changed-files.txt`); when present they win over invoking git, which
/// lets workflows compute the diff once and share it across jobs.
pub async fn prepare_context(
    repo_root: &Path,
    work_dir: &Path,
    config: &Config,
    env: &Env,
) -> Result<ReviewContext, ContextError> {
    let base_ref = format!("origin/{}", env.var_or(constants::ENV_BASE_REF, "main"));

    let changed_files = match read_artifact(work_dir, constants::CHANGED_FILES_FILE)? {
        Some(text) => text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect(),
        None => git::changed_files(repo_root, &base_ref).await?,
    };

    if changed_files.is_empty() {
        return Ok(ReviewContext::skipped("No changed files"));
    }

    let raw_diff = match read_artifact(work_dir, constants::DIFF_FILE)? {
        Some(text) => text,
        None => git::diff_against(repo_root, &base_ref).await?,
    };
    let (diff, diff_truncated) = truncate_diff(&raw_diff, config.review.max_diff_lines);

    let rules = rules::select_applicable_rules(repo_root, &changed_files, config);

    let pr_body = clip_chars(&env.var_or(constants::ENV_PR_BODY, ""), MAX_PR_BODY_CHARS);
    let branch_name = env.var_or(constants::ENV_BRANCH_NAME, "");
    let pr_title = env.var_or(constants::ENV_PR_TITLE, "");

    let spec_docs =
        specs::discover_spec_docs(repo_root, &pr_body, &pr_title, &branch_name, &changed_files, config);

    // File-system walk, so off the executor.
    let blast_radius = {
        let root = repo_root.to_path_buf();
        let files = changed_files.clone();
        let cfg = config.clone();
        tokio::task::spawn_blocking(move || blast::trace_blast_radius(&root, &files, &cfg)).await?
    };

    Ok(ReviewContext {
        skip: false,
        reason: None,
        pr_title,
        pr_body,
        branch_name,
        changed_files,
        diff,
        diff_truncated,
        rules,
        spec_docs,
        blast_radius,
    })
}

fn read_artifact(work_dir: &Path, name: &str) -> Result<Option<String>, ContextError> {
    let path = work_dir.join(name);
    if !path.is_file() {
        return Ok(None);
    }
    std::fs::read_to_string(&path)
        .map(Some)
        .map_err(|e| ContextError::Artifact { path, source: e })
}

/// Cut the diff at the line cap, appending a marker so the agent knows
/// it is looking at a prefix.
fn truncate_diff(diff: &str, max_lines: usize) -> (String, bool) {
    let lines: Vec<&str> = diff.lines().collect();
    if lines.len() <= max_lines {
        return (diff.to_string(), false);
    }
    let hidden = lines.len() - max_lines;
    let mut out = lines[..max_lines].join("\n");
    out.push_str(&format!(
        "\n[... truncated - {hidden} additional lines not shown ...]"
    ));
    (out, true)
}

fn clip_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
