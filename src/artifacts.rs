//! Reading and writing the JSON artifacts passed between CI steps.
//!
//! `prepare` writes `review-context.json`, `review` reads it and writes
//! `review-result.json`, `post` reads both. All files live in a single
//! work directory so a workflow can upload it as one artifact.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::constants;
use crate::models::{ReviewContext, ReviewResult};

#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

pub fn context_path(work_dir: &Path) -> PathBuf {
    work_dir.join(constants::CONTEXT_FILE)
}

pub fn result_path(work_dir: &Path) -> PathBuf {
    work_dir.join(constants::RESULT_FILE)
}

pub fn load_context(work_dir: &Path) -> Result<ReviewContext, ArtifactError> {
    load_json(&context_path(work_dir))
}

pub fn save_context(work_dir: &Path, ctx: &ReviewContext) -> Result<(), ArtifactError> {
    save_json(&context_path(work_dir), ctx)
}

pub fn load_result(work_dir: &Path) -> Result<ReviewResult, ArtifactError> {
    load_json(&result_path(work_dir))
}

pub fn save_result(work_dir: &Path, result: &ReviewResult) -> Result<(), ArtifactError> {
    save_json(&result_path(work_dir), result)
}

fn load_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ArtifactError> {
    let content = std::fs::read_to_string(path).map_err(|e| ArtifactError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;
    serde_json::from_str(&content).map_err(|e| ArtifactError::Parse {
        path: path.to_path_buf(),
        source: e,
    })
}

fn save_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), ArtifactError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ArtifactError::Write {
            path: path.to_path_buf(),
            source: e,
        })?;
    }
    // Pretty-printed so failed runs can be debugged from the uploaded
    // artifact without tooling.
    let json = serde_json::to_string_pretty(value).map_err(|e| ArtifactError::Parse {
        path: path.to_path_buf(),
        source: e,
    })?;
    std::fs::write(path, json).map_err(|e| ArtifactError::Write {
        path: path.to_path_buf(),
        source: e,
    })
}
