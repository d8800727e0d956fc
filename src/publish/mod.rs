//! Review publishing: idempotent posting of the review to the PR.
//!
//! Eight ordered steps, repeat-safe so re-running on a new push converges
//! instead of piling up comments: anchor findings to diff lines, minimize
//! superseded reviews, upsert the single summary comment, delete our old
//! inline comments, clear pending reviews, then post the inline-comment
//! review and a separate verdict review. The verdict review NEVER carries
//! inline comments, so resolving threads cannot invalidate an approval.

pub mod format;
pub mod github;

use serde_json::json;

use crate::config::Config;
use crate::diff::DiffIndex;
use crate::models::{Finding, ReviewResult};
use crate::risk::{ReviewEvent, RiskVerdict};

pub use github::{GithubClient, HostApi, HostError};

/// Cap on minimize mutations per run; old PRs can have dozens of
/// superseded reviews and we refuse to spend the rate limit on them.
pub const MAX_CLEANUP_OPS: usize = 20;

/// An inline comment ready for the reviews API.
#[derive(Debug, Clone)]
struct InlineComment {
    path: String,
    line: u32,
    body: String,
}

/// What the publisher did, for logging and tests.
#[derive(Debug, Clone, Default)]
pub struct PublishReport {
    pub inline_posted: usize,
    pub unplaced: usize,
    pub minimized: usize,
    pub deleted_comments: usize,
    pub summary_updated: bool,
    pub fallback_used: bool,
    pub verdict_posted: bool,
    pub warnings: Vec<String>,
}

pub struct ReviewPublisher<'a> {
    host: &'a dyn HostApi,
    config: &'a Config,
    repo: &'a str,
    pr_number: &'a str,
}

impl<'a> ReviewPublisher<'a> {
    pub fn new(
        host: &'a dyn HostApi,
        config: &'a Config,
        repo: &'a str,
        pr_number: &'a str,
    ) -> Self {
        Self {
            host,
            config,
            repo,
            pr_number,
        }
    }

    /// Run the full posting flow. Individual API failures degrade the
    /// review (recorded in the report) rather than aborting it.
    pub async fn publish(
        &self,
        result: &ReviewResult,
        verdict: &RiskVerdict,
        index: &DiffIndex,
    ) -> PublishReport {
        let mut report = PublishReport::default();
        let branding = &self.config.branding;

        // Step 1: anchor findings to commentable diff lines.
        let mut inline_comments: Vec<InlineComment> = Vec::new();
        let mut unplaced: Vec<Finding> = Vec::new();
        for finding in &result.suggestions {
            let anchored = if finding.line > 0 && !finding.file.is_empty() {
                index.closest_commentable_line(&finding.file, finding.line)
            } else {
                None
            };
            match anchored {
                Some(line) => inline_comments.push(InlineComment {
                    path: finding.file.clone(),
                    line,
                    body: format!(
                        "{}\n{}",
                        branding.comment_tag,
                        format::format_suggestion_body(finding)
                    ),
                }),
                None => unplaced.push(finding.clone()),
            }
        }
        report.unplaced = unplaced.len();

        // Step 2: minimize superseded reviews in the timeline.
        report.minimized = self.minimize_old_reviews(&mut report).await;

        // Step 3: upsert the summary comment.
        let summary_body = format::build_summary_body(result, verdict, &unplaced, branding);
        report.summary_updated = self.upsert_summary(&summary_body, &mut report).await;

        // Step 4: delete our old inline comments.
        report.deleted_comments = self.delete_old_inline_comments().await;

        // Step 5: clear any leftover pending review.
        self.delete_pending_review().await;

        // Step 6: resolve the head commit.
        let head_sha = self.head_commit().await;
        if head_sha.is_none() {
            report
                .warnings
                .push("could not resolve HEAD commit SHA".to_string());
        }

        // Step 7: inline comments as a COMMENT review (never the verdict).
        if !inline_comments.is_empty() {
            self.post_inline_review(&inline_comments, head_sha.as_deref(), &mut report)
                .await;
        }

        // Step 8: the verdict as its own review with no comments field.
        self.post_verdict_review(
            verdict.event,
            inline_comments.len(),
            head_sha.as_deref(),
            &mut report,
        )
        .await;

        report
    }

    async fn minimize_old_reviews(&self, report: &mut PublishReport) -> usize {
        let path = format!("repos/{}/pulls/{}/reviews", self.repo, self.pr_number);
        let Ok(reviews) = self.host.get_json(&path).await else {
            return 0;
        };
        let header = &self.config.branding.review_header;
        let node_ids: Vec<String> = reviews
            .as_array()
            .map(|list| {
                list.iter()
                    .filter(|r| {
                        r["body"]
                            .as_str()
                            .is_some_and(|b| b.contains(header.as_str()))
                    })
                    .filter_map(|r| r["node_id"].as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default();

        let mut minimized = 0;
        for node_id in node_ids.iter().take(MAX_CLEANUP_OPS) {
            let mutation = format!(
                "mutation {{ minimizeComment(input: {{subjectId: \"{node_id}\", classifier: OUTDATED}}) {{ minimizedComment {{ isMinimized }} }} }}"
            );
            match self.host.graphql(&mutation).await {
                Ok(_) => minimized += 1,
                Err(e) => report
                    .warnings
                    .push(format!("minimize failed for {node_id}: {e}")),
            }
        }
        minimized
    }

    async fn upsert_summary(&self, body: &str, report: &mut PublishReport) -> bool {
        let tag = &self.config.branding.summary_tag;
        let marked = json!({ "body": format!("{tag}\n{body}") });

        let list_path = format!("repos/{}/issues/{}/comments", self.repo, self.pr_number);
        let existing_id = match self.host.get_json(&list_path).await {
            Ok(comments) => comments.as_array().and_then(|list| {
                list.iter()
                    .find(|c| c["body"].as_str().is_some_and(|b| b.contains(tag.as_str())))
                    .and_then(|c| c["id"].as_u64())
            }),
            Err(_) => None,
        };

        let outcome = match existing_id {
            Some(id) => {
                let path = format!("repos/{}/issues/comments/{id}", self.repo);
                self.host.patch_json(&path, &marked).await
            }
            None => self.host.post_json(&list_path, &marked).await,
        };
        match outcome {
            Ok(_) => true,
            Err(e) => {
                report.warnings.push(format!("summary upsert failed: {e}"));
                false
            }
        }
    }

    async fn delete_old_inline_comments(&self) -> usize {
        let tag = &self.config.branding.comment_tag;
        let list_path = format!("repos/{}/pulls/{}/comments", self.repo, self.pr_number);
        let Ok(comments) = self.host.get_json(&list_path).await else {
            return 0;
        };
        let ids: Vec<u64> = comments
            .as_array()
            .map(|list| {
                list.iter()
                    .filter(|c| c["body"].as_str().is_some_and(|b| b.contains(tag.as_str())))
                    .filter_map(|c| c["id"].as_u64())
                    .collect()
            })
            .unwrap_or_default();

        let mut deleted = 0;
        for id in ids {
            let path = format!("repos/{}/pulls/comments/{id}", self.repo);
            if self.host.delete(&path).await.is_ok() {
                deleted += 1;
            }
        }
        deleted
    }

    async fn delete_pending_review(&self) {
        let path = format!("repos/{}/pulls/{}/reviews", self.repo, self.pr_number);
        let Ok(reviews) = self.host.get_json(&path).await else {
            return;
        };
        let pending_id = reviews.as_array().and_then(|list| {
            list.iter()
                .find(|r| r["state"].as_str() == Some("PENDING"))
                .and_then(|r| r["id"].as_u64())
        });
        if let Some(id) = pending_id {
            let delete_path = format!(
                "repos/{}/pulls/{}/reviews/{id}",
                self.repo, self.pr_number
            );
            let _ = self.host.delete(&delete_path).await;
        }
    }

    async fn head_commit(&self) -> Option<String> {
        let path = format!("repos/{}/pulls/{}", self.repo, self.pr_number);
        let pr = self.host.get_json(&path).await.ok()?;
        pr["head"]["sha"].as_str().map(String::from)
    }

    async fn post_inline_review(
        &self,
        comments: &[InlineComment],
        head_sha: Option<&str>,
        report: &mut PublishReport,
    ) {
        let header = &self.config.branding.review_header;
        let api_comments: Vec<serde_json::Value> = comments
            .iter()
            .map(|c| json!({"path": c.path, "line": c.line, "side": "RIGHT", "body": c.body}))
            .collect();

        let mut payload = json!({
            "body": format!("{header}\nInline comments from automated review."),
            "event": "COMMENT",
            "comments": api_comments,
        });
        if let Some(sha) = head_sha {
            payload["commit_id"] = json!(sha);
        }

        let path = format!("repos/{}/pulls/{}/reviews", self.repo, self.pr_number);
        match self.host.post_json(&path, &payload).await {
            Ok(_) => {
                report.inline_posted = comments.len();
            }
            Err(e) => {
                report
                    .warnings
                    .push(format!("batch comment review failed: {e}"));
                if !e.is_client_error() {
                    // Transport or server failure; retrying comment by
                    // comment would hit the same wall.
                    return;
                }
                // A rejected batch can leave a pending review behind; clear
                // it before retrying comment by comment.
                report.fallback_used = true;
                self.delete_pending_review().await;
                let Some(sha) = head_sha else {
                    report
                        .warnings
                        .push("no HEAD commit SHA; cannot post individual comments".to_string());
                    return;
                };
                for comment in comments {
                    let payload = json!({
                        "commit_id": sha,
                        "path": comment.path,
                        "line": comment.line,
                        "side": "RIGHT",
                        "body": comment.body,
                    });
                    let path =
                        format!("repos/{}/pulls/{}/comments", self.repo, self.pr_number);
                    match self.host.post_json(&path, &payload).await {
                        Ok(_) => report.inline_posted += 1,
                        Err(e) => report.warnings.push(format!(
                            "skipped comment on {}:{}: {e}",
                            comment.path, comment.line
                        )),
                    }
                }
            }
        }
    }

    async fn post_verdict_review(
        &self,
        event: ReviewEvent,
        inline_count: usize,
        head_sha: Option<&str>,
        report: &mut PublishReport,
    ) {
        let header = &self.config.branding.review_header;
        let detail = if inline_count > 0 {
            format!(
                "{inline_count} inline comment{}",
                if inline_count == 1 { "" } else { "s" }
            )
        } else {
            "no inline comments".to_string()
        };

        let mut payload = json!({
            "body": format!("{header}\nSee summary above for details. ({detail})"),
            "event": event.to_string(),
        });
        if let Some(sha) = head_sha {
            payload["commit_id"] = json!(sha);
        }

        let path = format!("repos/{}/pulls/{}/reviews", self.repo, self.pr_number);
        match self.host.post_json(&path, &payload).await {
            Ok(_) => report.verdict_posted = true,
            Err(e) => report
                .warnings
                .push(format!("failed to post verdict review: {e}")),
        }
    }
}
