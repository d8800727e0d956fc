//! Thin GitHub API client behind the [`HostApi`] trait.
//!
//! The publisher only needs five verbs; keeping the trait narrow makes the
//! whole posting flow testable with a recording mock.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::time::Duration;
use thiserror::Error;

const DEFAULT_BASE_URL: &str = "https://api.github.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Error, Debug)]
pub enum HostError {
    #[error("GitHub API error (HTTP {status}): {body}")]
    Status { status: u16, body: String },

    #[error("request failed: {0}")]
    Transport(String),
}

impl HostError {
    pub fn is_client_error(&self) -> bool {
        matches!(self, HostError::Status { status, .. } if (400..500).contains(status))
    }
}

/// REST and GraphQL operations the publisher needs.
#[async_trait]
pub trait HostApi: Send + Sync {
    async fn get_json(&self, path: &str) -> Result<Value, HostError>;
    async fn post_json(&self, path: &str, body: &Value) -> Result<Value, HostError>;
    async fn patch_json(&self, path: &str, body: &Value) -> Result<Value, HostError>;
    async fn delete(&self, path: &str) -> Result<(), HostError>;
    async fn graphql(&self, query: &str) -> Result<Value, HostError>;
}

pub struct GithubClient {
    http: reqwest::Client,
    token: String,
    base_url: String,
}

impl std::fmt::Debug for GithubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GithubClient")
            .field("base_url", &self.base_url)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl GithubClient {
    pub fn new(token: impl Into<String>) -> Result<Self, HostError> {
        Self::with_base_url(token, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(
        token: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, HostError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| HostError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            token: token.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, format!("{}/{}", self.base_url, path))
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
            .header("User-Agent", crate::constants::APP_NAME)
    }

    async fn decode(response: reqwest::Response) -> Result<Value, HostError> {
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| HostError::Transport(e.to_string()))?;
        if !status.is_success() {
            return Err(HostError::Status {
                status: status.as_u16(),
                body: text.chars().take(500).collect(),
            });
        }
        if text.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| HostError::Transport(e.to_string()))
    }
}

#[async_trait]
impl HostApi for GithubClient {
    async fn get_json(&self, path: &str) -> Result<Value, HostError> {
        let response = self
            .request(reqwest::Method::GET, path)
            .send()
            .await
            .map_err(|e| HostError::Transport(e.to_string()))?;
        Self::decode(response).await
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<Value, HostError> {
        let response = self
            .request(reqwest::Method::POST, path)
            .json(body)
            .send()
            .await
            .map_err(|e| HostError::Transport(e.to_string()))?;
        Self::decode(response).await
    }

    async fn patch_json(&self, path: &str, body: &Value) -> Result<Value, HostError> {
        let response = self
            .request(reqwest::Method::PATCH, path)
            .json(body)
            .send()
            .await
            .map_err(|e| HostError::Transport(e.to_string()))?;
        Self::decode(response).await
    }

    async fn delete(&self, path: &str) -> Result<(), HostError> {
        let response = self
            .request(reqwest::Method::DELETE, path)
            .send()
            .await
            .map_err(|e| HostError::Transport(e.to_string()))?;
        let status = response.status();
        if status.is_success() || status.as_u16() == 404 {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(HostError::Status {
                status: status.as_u16(),
                body: body.chars().take(500).collect(),
            })
        }
    }

    async fn graphql(&self, query: &str) -> Result<Value, HostError> {
        self.post_json("graphql", &json!({ "query": query })).await
    }
}
