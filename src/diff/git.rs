//! Git CLI wrapper for producing diffs.
//!
//! Shells out to `git` via `tokio::process::Command`. CI checkouts are
//! expected to have the base branch fetched; the three-dot range compares
//! against the merge base so unrelated base commits don't leak in.

use std::path::Path;

use super::DiffError;

async fn run_git(repo_root: &Path, args: &[&str]) -> Result<String, DiffError> {
    let output = tokio::process::Command::new("git")
        .args(args)
        .current_dir(repo_root)
        .output()
        .await
        .map_err(|e| DiffError::Git(format!("failed to run git: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(DiffError::Git(format!(
            "git {} failed (exit {}): {stderr}",
            args.first().unwrap_or(&""),
            output.status
        )));
    }

    String::from_utf8(output.stdout)
        .map_err(|e| DiffError::Git(format!("git output is not valid UTF-8: {e}")))
}

/// Unified diff of the PR head against the merge base.
pub async fn diff_against(repo_root: &Path, base_ref: &str) -> Result<String, DiffError> {
    let range = format!("{base_ref}...HEAD");
    run_git(
        repo_root,
        &["diff", "--src-prefix=a/", "--dst-prefix=b/", &range],
    )
    .await
}

/// Paths changed relative to the merge base, one per line from git.
pub async fn changed_files(repo_root: &Path, base_ref: &str) -> Result<Vec<String>, DiffError> {
    let range = format!("{base_ref}...HEAD");
    let out = run_git(repo_root, &["diff", "--name-only", &range]).await?;
    Ok(out
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect())
}
