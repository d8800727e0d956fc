//! Read-only investigation tools exposed to the review agent.
//!
//! Four tools: `read_file`, `search_code`, `read_rule`, `list_directory`.
//! Every failure is reported as descriptive text in the tool result rather
//! than an error, so the agent can react (try another path, give up) instead
//! of aborting the review.

pub mod list_directory;
pub mod read_file;
pub mod read_rule;
pub mod search_code;

use std::path::{Component, Path, PathBuf};

use serde_json::{Value, json};
use strum::{Display, EnumString};

use crate::config::RulesConfig;

/// The closed set of tools the agent may call. Unknown names never reach
/// a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum ToolKind {
    ReadFile,
    SearchCode,
    ReadRule,
    ListDirectory,
}

/// Executes tool calls against a repository checkout.
///
/// All paths are confined to `repo_root`; escapes via absolute paths,
/// `..` components, or symlinks produce an "Access denied" result.
#[derive(Debug, Clone)]
pub struct ToolGateway {
    repo_root: PathBuf,
    rules_dir: String,
    rule_extension: String,
}

impl ToolGateway {
    pub fn new(repo_root: impl Into<PathBuf>, rules: &RulesConfig) -> Self {
        Self {
            repo_root: repo_root.into(),
            rules_dir: rules.directory.clone(),
            // "*.mdc" -> ".mdc"
            rule_extension: rules.file_pattern.replace('*', ""),
        }
    }

    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }

    /// Run one tool call. Never fails; problems come back as text.
    pub async fn execute(&self, name: &str, input: &Value) -> String {
        let Ok(kind) = name.parse::<ToolKind>() else {
            return format!("Unknown tool: {name}");
        };
        match kind {
            ToolKind::ReadFile => match serde_json::from_value(input.clone()) {
                Ok(args) => read_file::run(&self.repo_root, args).await,
                Err(e) => format!("Tool error: invalid arguments for {kind}: {e}"),
            },
            ToolKind::SearchCode => match serde_json::from_value(input.clone()) {
                Ok(args) => search_code::run(&self.repo_root, args).await,
                Err(e) => format!("Tool error: invalid arguments for {kind}: {e}"),
            },
            ToolKind::ReadRule => match serde_json::from_value(input.clone()) {
                Ok(args) => {
                    read_rule::run(&self.repo_root, &self.rules_dir, &self.rule_extension, args)
                        .await
                }
                Err(e) => format!("Tool error: invalid arguments for {kind}: {e}"),
            },
            ToolKind::ListDirectory => match serde_json::from_value(input.clone()) {
                Ok(args) => list_directory::run(&self.repo_root, args).await,
                Err(e) => format!("Tool error: invalid arguments for {kind}: {e}"),
            },
        }
    }

    /// Tool schemas in the Messages API format.
    pub fn definitions() -> Vec<Value> {
        vec![
            json!({
                "name": "read_file",
                "description": "Read a file from the repository. You can specify line ranges to read just the relevant section. Use this to check related files, test files, callers, or any code you need context on.",
                "input_schema": {
                    "type": "object",
                    "properties": {
                        "path": {
                            "type": "string",
                            "description": "File path relative to repo root"
                        },
                        "start_line": {
                            "type": "integer",
                            "description": "Start line (1-indexed). Omit to read from beginning."
                        },
                        "end_line": {
                            "type": "integer",
                            "description": "End line (1-indexed). Omit to read to end. Use with start_line to read a specific section."
                        }
                    },
                    "required": ["path"]
                }
            }),
            json!({
                "name": "search_code",
                "description": "Search the codebase for a pattern. Returns matching files and lines. Use this to find callers of a function, usages of a class, or check if a pattern exists elsewhere.",
                "input_schema": {
                    "type": "object",
                    "properties": {
                        "pattern": {
                            "type": "string",
                            "description": "Search pattern. Plain text is matched literally; regex syntax is detected and honoured."
                        },
                        "file_pattern": {
                            "type": "string",
                            "description": "File glob to restrict search. E.g., '*.py', '*.tsx'. Omit to search all files."
                        },
                        "directory": {
                            "type": "string",
                            "description": "Directory to search in, relative to repo root. Omit to search entire repo."
                        }
                    },
                    "required": ["pattern"]
                }
            }),
            json!({
                "name": "read_rule",
                "description": "Read the full content of a specific project rule by its ID. Use this when you see a potential violation and want to check the exact rule before making a suggestion.",
                "input_schema": {
                    "type": "object",
                    "properties": {
                        "rule_id": {
                            "type": "string",
                            "description": "Rule ID (filename without extension)"
                        }
                    },
                    "required": ["rule_id"]
                }
            }),
            json!({
                "name": "list_directory",
                "description": "List the contents of a directory in the repository. Use this to check if tests exist or to see how a module is organised.",
                "input_schema": {
                    "type": "object",
                    "properties": {
                        "path": {
                            "type": "string",
                            "description": "Directory path relative to repo root"
                        }
                    },
                    "required": ["path"]
                }
            }),
        ]
    }
}

/// Lexically confine a user-supplied relative path to `root`.
///
/// Rejects absolute paths and any `..` component. Symlink escapes are
/// caught separately by [`resolves_inside`] once the path is known to exist.
pub(crate) fn confine(root: &Path, user_path: &str) -> Option<PathBuf> {
    let path = Path::new(user_path);
    if path.is_absolute() {
        return None;
    }
    for component in path.components() {
        if matches!(component, Component::ParentDir) {
            return None;
        }
    }
    Some(root.join(path))
}

/// Verify that an existing path canonicalizes to somewhere under `root`.
pub(crate) fn resolves_inside(root: &Path, candidate: &Path) -> bool {
    match (candidate.canonicalize(), root.canonicalize()) {
        (Ok(resolved), Ok(root_resolved)) => resolved.starts_with(&root_resolved),
        _ => false,
    }
}
