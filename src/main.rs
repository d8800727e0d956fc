//! pullcheck: agentic pull-request reviewer.
//!
//! Entry point and error handling boundary. Uses `anyhow` for
//! ergonomic error propagation and user-facing messages.

mod cli;

use pullcheck::agent;
use pullcheck::artifacts;
use pullcheck::config::Config;
use pullcheck::constants;
use pullcheck::context;
use pullcheck::diff::{DiffIndex, DiffStats};
use pullcheck::env::Env;
use pullcheck::models::ReviewResult;
use pullcheck::provider::AnthropicClient;
use pullcheck::publish::{GithubClient, ReviewPublisher};
use pullcheck::risk;
use pullcheck::tools::ToolGateway;

use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;

use cli::args::{Cli, Command, StepArgs};

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("Error: {err:#}");
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Prepare(args) => run_prepare(args).await,
        Command::Review(args) => run_review(args).await,
        Command::Post(args) => run_post(args).await,
        Command::Version => run_version(),
    }
}

fn run_version() -> Result<()> {
    println!(
        "{} {}",
        constants::APP_NAME.bold(),
        env!("CARGO_PKG_VERSION").green().bold()
    );
    Ok(())
}

fn resolve_repo(args: &StepArgs) -> Result<PathBuf> {
    std::fs::canonicalize(&args.repo)
        .with_context(|| format!("--repo directory not found: {}", args.repo.display()))
}

/// Gather context and write `review-context.json`.
async fn run_prepare(args: StepArgs) -> Result<()> {
    let repo_root = resolve_repo(&args)?;
    let work_dir = args.work_dir();
    let env = Env::real();
    let config = Config::load(&repo_root, &env).context("failed to load configuration")?;

    let ctx = context::prepare_context(&repo_root, &work_dir, &config, &env)
        .await
        .context("failed to prepare review context")?;
    artifacts::save_context(&work_dir, &ctx).context("failed to write context artifact")?;

    if ctx.skip {
        println!(
            "{} {}",
            "Skipping review:".yellow(),
            ctx.reason.as_deref().unwrap_or("nothing to review"),
        );
        return Ok(());
    }

    println!(
        "Prepared context: {} changed file(s), {} rule(s), {} spec doc(s), {} blast file(s)",
        ctx.changed_files.len().to_string().bold(),
        ctx.rules.len(),
        ctx.spec_docs.len(),
        ctx.blast_radius.len(),
    );
    if ctx.diff_truncated {
        eprintln!(
            "{}",
            format!(
                "Warning: diff truncated to {} lines",
                config.review.max_diff_lines
            )
            .yellow()
        );
    }
    Ok(())
}

/// Run the review agent and write `review-result.json`.
async fn run_review(args: StepArgs) -> Result<()> {
    let repo_root = resolve_repo(&args)?;
    let work_dir = args.work_dir();
    let env = Env::real();
    let config = Config::load(&repo_root, &env).context("failed to load configuration")?;

    let ctx = artifacts::load_context(&work_dir)
        .context("failed to load review context; run `pullcheck prepare` first")?;

    if ctx.skip {
        let reason = ctx.reason.as_deref().unwrap_or("nothing to review");
        let result = ReviewResult::skipped(format!("Review skipped: {reason}"));
        artifacts::save_result(&work_dir, &result)?;
        println!("{} {}", "Skipping review:".yellow(), reason);
        return Ok(());
    }

    let dry_run = env.flag(constants::ENV_DRY_RUN) || !env.is_set(constants::ENV_API_KEY);
    if dry_run {
        let system = agent::prompt::build_system_prompt(&ctx, &config);
        let user = agent::prompt::build_user_message(&ctx);
        let result = ReviewResult {
            summary: format!(
                "Dry run: no model call made. System prompt {} chars, user message {} chars.",
                system.chars().count(),
                user.chars().count(),
            ),
            dry_run: true,
            ..Default::default()
        };
        artifacts::save_result(&work_dir, &result)?;
        println!("{} {}", "Dry run:".yellow(), result.summary);
        return Ok(());
    }

    let api_key = env
        .var(constants::ENV_API_KEY)
        .context("ANTHROPIC_API_KEY is not set")?;
    let model = AnthropicClient::new(api_key).context("failed to build API client")?;
    let tools = ToolGateway::new(&repo_root, &config.rules);

    println!(
        "Reviewing {} changed file(s) with {}",
        ctx.changed_files.len().to_string().bold(),
        config.review.model,
    );

    let agent_loop = agent::AgentLoop::new(&model, &tools, &config);
    let mut result = agent_loop.run(&ctx).await;

    if result.error.is_none() && agent::needs_verification(&result) {
        result = agent::verify::run_verification(&model, &tools, &config, &ctx, result).await;
    }

    artifacts::save_result(&work_dir, &result)?;
    print_review_outcome(&result);
    Ok(())
}

fn print_review_outcome(result: &ReviewResult) {
    if let Some(error) = &result.error {
        eprintln!("{} {}", "Review failed:".red(), error);
        return;
    }
    println!(
        "Review complete: {} finding(s)",
        result.suggestions.len().to_string().bold(),
    );
    if let Some(stats) = &result.stats {
        println!(
            "  {} {} round(s), {} tool call(s), {} in / {} out tokens, {} ms",
            "stats:".dimmed(),
            stats.rounds,
            stats.tool_calls,
            stats.input_tokens,
            stats.output_tokens,
            stats.duration_ms,
        );
    }
    if let Some(v) = &result.verification {
        println!(
            "  {} dropped {} of {} finding(s)",
            "verification:".dimmed(),
            v.dropped,
            v.findings_before,
        );
    }
}

/// Publish the result to the pull request.
async fn run_post(args: StepArgs) -> Result<()> {
    let repo_root = resolve_repo(&args)?;
    let work_dir = args.work_dir();
    let env = Env::real();
    let config = Config::load(&repo_root, &env).context("failed to load configuration")?;

    let result = artifacts::load_result(&work_dir)
        .context("failed to load review result; run `pullcheck review` first")?;
    let ctx = artifacts::load_context(&work_dir)
        .context("failed to load review context; run `pullcheck prepare` first")?;

    if result.skip || ctx.skip {
        println!("{} {}", "Nothing to post:".yellow(), result.summary);
        return Ok(());
    }

    let stats = DiffStats::compute(&ctx.diff, &config.files.doc_extensions);
    let verdict = risk::determine_review_event(&risk::RiskInput {
        changed_files: &ctx.changed_files,
        stats: &stats,
        findings: &result.suggestions,
        config: &config,
    });
    let index = DiffIndex::parse(&ctx.diff);

    if result.dry_run || env.flag(constants::ENV_DRY_RUN) {
        println!(
            "{} would post {} with {} finding(s)",
            "Dry run:".yellow(),
            verdict.event.to_string().bold(),
            result.suggestions.len(),
        );
        return Ok(());
    }

    let repo = env.var_or(constants::ENV_REPOSITORY, "");
    let pr_number = env.var_or(constants::ENV_PR_NUMBER, "");
    let token = env.var_or(constants::ENV_GITHUB_TOKEN, "");
    if repo.is_empty() || pr_number.is_empty() || token.is_empty() {
        // Local runs without CI env still get the review on stdout.
        eprintln!(
            "{}",
            "Warning: GITHUB_REPOSITORY, PR_NUMBER, or GITHUB_TOKEN not set; printing instead"
                .yellow()
        );
        let body = pullcheck::publish::format::build_summary_body(
            &result,
            &verdict,
            &[],
            &config.branding,
        );
        println!("{body}");
        return Ok(());
    }

    let client = GithubClient::new(token).context("failed to build GitHub client")?;
    let publisher = ReviewPublisher::new(&client, &config, &repo, &pr_number);
    let report = publisher.publish(&result, &verdict, &index).await;

    for warning in &report.warnings {
        eprintln!("{} {}", "Warning:".yellow(), warning);
    }
    println!(
        "Posted {}: {} inline comment(s), {} unplaced, summary {}",
        verdict.event.to_string().bold(),
        report.inline_posted,
        report.unplaced,
        if report.summary_updated {
            "updated"
        } else {
            "skipped"
        },
    );
    if report.fallback_used {
        println!("  {} batch review rejected, posted comments individually", "note:".dimmed());
    }
    Ok(())
}
