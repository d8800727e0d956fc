//! Clap argument types for the pipeline subcommands.

use clap::Parser;
use std::path::PathBuf;

/// Agentic pull-request reviewer for GitHub Actions.
#[derive(Parser, Debug)]
#[command(name = "pullcheck", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands, in pipeline order.
#[derive(clap::Subcommand, Debug)]
pub enum Command {
    /// Gather the diff, rules, spec docs, and blast radius into
    /// review-context.json.
    Prepare(StepArgs),

    /// Run the review agent over the prepared context and write
    /// review-result.json.
    Review(StepArgs),

    /// Publish the review result to the pull request.
    Post(StepArgs),

    /// Print version information.
    Version,
}

/// Arguments shared by every pipeline step.
#[derive(Parser, Debug)]
pub struct StepArgs {
    /// Path to the checked-out repository (default: current directory).
    #[arg(long, default_value = ".")]
    pub repo: PathBuf,

    /// Directory for intermediate artifacts shared between steps.
    /// Defaults to `pullcheck` under the OS temp directory.
    #[arg(long, env = "PULLCHECK_WORK_DIR")]
    pub work_dir: Option<PathBuf>,
}

impl StepArgs {
    /// Resolve the work directory, falling back to the OS temp dir.
    pub fn work_dir(&self) -> PathBuf {
        match &self.work_dir {
            Some(dir) => dir.clone(),
            None => std::env::temp_dir().join(pullcheck::constants::APP_NAME),
        }
    }
}
