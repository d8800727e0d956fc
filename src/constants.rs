//! App-wide constants.
//!
//! Centralises the tool name, artifact filenames, and environment variable
//! names so a rename only requires changing this file.

/// Display name of the tool (lowercase).
pub const APP_NAME: &str = "pullcheck";

/// Project config path, relative to the repository root.
pub const CONFIG_PATH: &str = ".github/pullcheck/config.yaml";

// ── Artifact filenames (written under the work directory) ───────────

pub const CONTEXT_FILE: &str = "review-context.json";
pub const RESULT_FILE: &str = "review-result.json";
pub const DIFF_FILE: &str = "pr.diff";
pub const CHANGED_FILES_FILE: &str = "changed-files.txt";

// ── Environment variable names ──────────────────────────────────────

pub const ENV_CONFIG: &str = "PULLCHECK_CONFIG";
pub const ENV_MODEL: &str = "PULLCHECK_MODEL";
pub const ENV_MAX_TOKENS: &str = "PULLCHECK_MAX_TOKENS";
pub const ENV_AUTO_APPROVE: &str = "PULLCHECK_AUTO_APPROVE";
pub const ENV_DRY_RUN: &str = "PULLCHECK_DRY_RUN";

pub const ENV_API_KEY: &str = "ANTHROPIC_API_KEY";
pub const ENV_GITHUB_TOKEN: &str = "GITHUB_TOKEN";
pub const ENV_REPOSITORY: &str = "GITHUB_REPOSITORY";
pub const ENV_BASE_REF: &str = "GITHUB_BASE_REF";
pub const ENV_PR_NUMBER: &str = "PR_NUMBER";
pub const ENV_PR_TITLE: &str = "PR_TITLE";
pub const ENV_PR_BODY: &str = "PR_BODY";
pub const ENV_BRANCH_NAME: &str = "BRANCH_NAME";
