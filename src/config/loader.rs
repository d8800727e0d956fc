//! Config struct and loading logic.
//!
//! Priority (highest to lowest):
//! 1. Environment variables
//! 2. `.github/pullcheck/config.yaml` in the repo (path overridable via
//!    `PULLCHECK_CONFIG`)
//! 3. Built-in defaults
//!
//! Every struct carries `#[serde(default)]`, so a project file that sets
//! one field in a section inherits the built-in values for the rest.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::constants;
use crate::env::Env;

/// Errors during config loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    ParseFile {
        path: PathBuf,
        source: serde_yaml_ng::Error,
    },
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub project: ProjectConfig,
    pub review: ReviewSettings,
    pub rules: RulesConfig,
    pub docs: DocsConfig,
    pub blast_radius: BlastRadiusConfig,
    pub risk: RiskConfig,
    pub branding: BrandingConfig,
    pub files: FilesConfig,
}

/// Who the project is, for the reviewer persona.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub name: String,
    pub description: String,
    pub tech_stack: String,
}

/// Core review knobs: model, budgets, auto-approval.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewSettings {
    pub model: String,
    pub max_tokens: u32,
    pub auto_approve_enabled: bool,
    pub max_diff_lines: usize,
    pub max_rule_files: usize,
    /// Base tool-round budget for the agent loop; grows with PR size.
    pub max_tool_rounds: u32,
    /// Path to a verification rules document in the reviewed repository,
    /// overriding the bundled one when present.
    pub verification_rules: PathBuf,
}

impl Default for ReviewSettings {
    fn default() -> Self {
        Self {
            model: "claude-sonnet-4-20250514".to_string(),
            max_tokens: 8192,
            auto_approve_enabled: true,
            max_diff_lines: 1500,
            max_rule_files: 25,
            max_tool_rounds: 10,
            verification_rules: PathBuf::from("defaults/verification-rules.md"),
        }
    }
}

/// Where project rules live and which ones always ride along.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    pub enabled: bool,
    pub directory: String,
    pub file_pattern: String,
    pub always_include: Vec<String>,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: ".cursor/rules".to_string(),
            file_pattern: "*.mdc".to_string(),
            always_include: Vec::new(),
        }
    }
}

/// Spec/plan document discovery.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DocsConfig {
    pub spec_dirs: Vec<String>,
    /// Maps source directory fragments to documentation paths.
    pub directory_doc_map: IndexMap<String, Vec<String>>,
}

impl Default for DocsConfig {
    fn default() -> Self {
        Self {
            spec_dirs: vec!["docs/specs".to_string(), "docs/plans".to_string()],
            directory_doc_map: IndexMap::new(),
        }
    }
}

/// Importer tracing for changed modules.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BlastRadiusConfig {
    pub enabled: bool,
    pub max_files: usize,
    /// "python", "typescript", or "auto" (detect from changed files).
    pub language: String,
    pub source_dirs: Vec<String>,
    /// Prefix removed from paths before deriving module names,
    /// e.g. "src/" so `src/app/db.py` imports as `app.db`.
    pub module_prefix_strip: String,
}

impl Default for BlastRadiusConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_files: 10,
            language: "auto".to_string(),
            source_dirs: Vec::new(),
            module_prefix_strip: String::new(),
        }
    }
}

/// Risk policy: which changes always need a human.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    pub structural_paths: Vec<String>,
    pub security_paths: Vec<String>,
    pub security_dep_files: Vec<String>,
    pub max_code_files: usize,
    pub max_code_lines: usize,
    pub cross_cutting_domains: usize,
    /// Maps path fragments to domain names for cross-cutting detection.
    pub domain_paths: IndexMap<String, String>,
    pub infrastructure_patterns: Vec<String>,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            structural_paths: vec!["migrations/".to_string(), "alembic/".to_string()],
            security_paths: vec![
                "auth/".to_string(),
                "security/".to_string(),
                "middleware/".to_string(),
            ],
            security_dep_files: vec![
                "requirements.txt".to_string(),
                "pyproject.toml".to_string(),
                "package.json".to_string(),
                "package-lock.json".to_string(),
                "pnpm-lock.yaml".to_string(),
            ],
            max_code_files: 15,
            max_code_lines: 1000,
            cross_cutting_domains: 3,
            domain_paths: IndexMap::new(),
            infrastructure_patterns: vec![
                "docker-compose".to_string(),
                "Dockerfile".to_string(),
                ".github/workflows/".to_string(),
            ],
        }
    }
}

/// Markers and headers used in posted comments.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrandingConfig {
    pub review_header: String,
    /// Hidden marker identifying inline comments we posted.
    pub comment_tag: String,
    /// Hidden marker identifying the summary comment for upserts.
    pub summary_tag: String,
}

impl Default for BrandingConfig {
    fn default() -> Self {
        Self {
            review_header: "## Code Review".to_string(),
            comment_tag: "<!-- pullcheck -->".to_string(),
            summary_tag: "<!-- pullcheck-summary -->".to_string(),
        }
    }
}

/// File classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilesConfig {
    /// Extensions treated as documentation (excluded from code counts
    /// and coverage requirements).
    pub doc_extensions: Vec<String>,
    /// Basenames of generated lockfiles exempt from review coverage.
    pub lockfile_names: Vec<String>,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            doc_extensions: vec![
                ".md".to_string(),
                ".mdc".to_string(),
                ".txt".to_string(),
                ".rst".to_string(),
                ".mdx".to_string(),
            ],
            lockfile_names: vec![
                "pnpm-lock.yaml".to_string(),
                "package-lock.json".to_string(),
                "yarn.lock".to_string(),
                "poetry.lock".to_string(),
                "Pipfile.lock".to_string(),
                "Cargo.lock".to_string(),
            ],
        }
    }
}

impl Config {
    /// Load configuration with proper layering.
    pub fn load(repo_root: &Path, env: &Env) -> Result<Self, ConfigError> {
        let rel_path = env.var_or(constants::ENV_CONFIG, constants::CONFIG_PATH);
        let path = repo_root.join(rel_path);

        let mut config = if path.exists() {
            Self::load_file(&path)?
        } else {
            Config::default()
        };

        config.apply_env_vars(env);
        Ok(config)
    }

    /// Load a config from a specific file.
    fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_yaml_ng::from_str(&content).map_err(|e| ConfigError::ParseFile {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Apply environment variable overrides (highest priority).
    fn apply_env_vars(&mut self, env: &Env) {
        if let Ok(model) = env.var(constants::ENV_MODEL) {
            if !model.is_empty() {
                self.review.model = model;
            }
        }
        if let Ok(raw) = env.var(constants::ENV_MAX_TOKENS) {
            if let Ok(tokens) = raw.parse() {
                self.review.max_tokens = tokens;
            }
        }
        if let Ok(raw) = env.var(constants::ENV_AUTO_APPROVE) {
            if !raw.is_empty() {
                self.review.auto_approve_enabled = raw.eq_ignore_ascii_case("true");
            }
        }
    }
}
