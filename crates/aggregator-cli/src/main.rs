//! Build Aggregator CLI
//!
//! `build-aggregator` triggers the CI build of every step in a step library
//! whose source repository belongs to one of the given GitHub organizations,
//! a few builds at a time, then exports a summary report through `envman`.
//!
//! Every flag can also be given through the environment variable named in
//! its help text.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::watch;
use tracing::{info, warn, Level};

use aggregator_core::{
    collect_projects, export_report, init_tracing, BuildAggregator, BuildTrigger,
    CompletionPoller, EndpointResolver, PollConfig, ReportStyle, WorkflowSelector,
    DEFAULT_BATCH_SIZE, DEFAULT_REPORT_COLOR, DEFAULT_SOURCE_HOST,
};
use aggregator_services::config::{
    DEFAULT_BITRISE_API_URL, DEFAULT_BITRISE_APP_URL, DEFAULT_GITHUB_API_URL,
};
use aggregator_services::{
    BitriseCli, BitriseClient, EnvmanExporter, GithubClient, ServiceConfig, SteplibClient,
};

#[derive(Parser, Debug)]
#[command(name = "build-aggregator")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Trigger and aggregate CI builds of a step library", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    json: bool,

    /// URL of the step library spec.json
    #[arg(long, env = "STEPLIB_SPEC_URL")]
    steplib_spec_url: String,

    /// Comma separated GitHub organizations whose steps are built
    #[arg(long, env = "GITHUB_ORGS", value_delimiter = ',', required = true)]
    github_orgs: Vec<String>,

    /// Builds triggered and awaited together
    #[arg(long, env = "BATCH_SIZE", default_value_t = DEFAULT_BATCH_SIZE, value_parser = parse_batch_size)]
    batch_size: usize,

    /// Seconds between two status sweeps
    #[arg(long, env = "POLL_INTERVAL_SECS", default_value_t = 10)]
    poll_interval_secs: u64,

    /// Give up waiting for a batch after this many seconds
    #[arg(long, env = "MAX_WAIT_SECS")]
    max_wait_secs: Option<u64>,

    /// Seconds a bitrise or envman invocation may take
    #[arg(long, env = "COMMAND_TIMEOUT_SECS", default_value_t = 60)]
    command_timeout_secs: u64,

    #[arg(long, env = "GITHUB_ACCESS_TOKEN", hide_env_values = true)]
    github_token: String,

    #[arg(long, env = "BITRISE_API_TOKEN", hide_env_values = true)]
    bitrise_token: String,

    #[arg(long, env = "GITHUB_API_URL", default_value = DEFAULT_GITHUB_API_URL)]
    github_api_url: String,

    #[arg(long, env = "BITRISE_API_URL", default_value = DEFAULT_BITRISE_API_URL)]
    bitrise_api_url: String,

    /// Host of the build trigger endpoint
    #[arg(long, env = "BITRISE_APP_URL", default_value = DEFAULT_BITRISE_APP_URL)]
    bitrise_app_url: String,

    #[arg(long, env = "BITRISE_BIN", default_value = "bitrise")]
    bitrise_bin: String,

    #[arg(long, env = "ENVMAN_BIN", default_value = "envman")]
    envman_bin: String,

    /// Report color when nothing failed
    #[arg(long, env = "REPORT_SUCCESS_COLOR", default_value = DEFAULT_REPORT_COLOR)]
    report_success_color: String,

    /// Report color when builds failed or were skipped
    #[arg(long, env = "REPORT_FAILURE_COLOR", default_value = DEFAULT_REPORT_COLOR)]
    report_failure_color: String,
}

fn parse_batch_size(value: &str) -> std::result::Result<usize, String> {
    match value.trim().parse::<usize>() {
        Ok(0) => Err("batch size must be at least 1".to_string()),
        Ok(size) => Ok(size),
        Err(e) => Err(format!("invalid batch size '{value}': {e}")),
    }
}

impl Cli {
    fn service_config(&self) -> ServiceConfig {
        ServiceConfig::new(&self.github_token, &self.bitrise_token)
            .with_github_api_url(&self.github_api_url)
            .with_bitrise_api_url(&self.bitrise_api_url)
            .with_bitrise_app_url(&self.bitrise_app_url)
            .with_steplib_spec_url(&self.steplib_spec_url)
            .with_bitrise_program(&self.bitrise_bin)
            .with_envman_program(&self.envman_bin)
            .with_command_timeout(Duration::from_secs(self.command_timeout_secs))
    }

    fn poll_config(&self) -> PollConfig {
        PollConfig {
            interval: Duration::from_secs(self.poll_interval_secs),
            max_wait: self.max_wait_secs.map(Duration::from_secs),
        }
    }

    fn report_style(&self) -> ReportStyle {
        ReportStyle {
            success_color: self.report_success_color.clone(),
            failure_color: self.report_failure_color.clone(),
        }
    }

    fn orgs(&self) -> Vec<String> {
        self.github_orgs
            .iter()
            .map(|org| org.trim().to_string())
            .filter(|org| !org.is_empty())
            .collect()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    init_tracing(cli.json, level);

    // anyhow prints the error chain to stderr and exits nonzero.
    run(&cli).await
}

async fn run(cli: &Cli) -> Result<()> {
    let config = cli.service_config();
    config.validate().context("Invalid configuration")?;

    let orgs = cli.orgs();
    anyhow::ensure!(!orgs.is_empty(), "No GitHub organization given");

    let steplib = SteplibClient::new(&config).context("Failed to create step library client")?;
    let github = Arc::new(GithubClient::new(&config).context("Failed to create GitHub client")?);
    let bitrise = Arc::new(BitriseClient::new(&config).context("Failed to create Bitrise client")?);

    let projects = collect_projects(&steplib, &orgs, DEFAULT_SOURCE_HOST)
        .await
        .context("Failed to load the step library")?;
    info!(projects = projects.len(), batch_size = cli.batch_size, "projects selected");

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, no further builds are triggered or awaited");
            let _ = cancel_tx.send(true);
        }
    });

    let trigger = BuildTrigger::new(
        EndpointResolver::new(github),
        WorkflowSelector::new(Arc::new(BitriseCli::new(&config))),
        bitrise.clone(),
    );
    let poller = CompletionPoller::new(bitrise, cli.poll_config());
    let aggregator = BuildAggregator::new(trigger, poller, cli.batch_size).with_cancellation(cancel_rx);

    let outcome = aggregator
        .run(&projects)
        .await
        .context("Build aggregation aborted")?;
    outcome.log_summary();

    let report = outcome.report(&cli.report_style());
    export_report(&EnvmanExporter::new(&config), &report)
        .await
        .context("Failed to export the report")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const REQUIRED: &[&str] = &[
        "build-aggregator",
        "--steplib-spec-url",
        "http://localhost:8088/spec.json",
        "--github-orgs",
        "bitrise-io, bitrise-steplib",
        "--github-token",
        "gh",
        "--bitrise-token",
        "br",
    ];

    fn parse(extra: &[&str]) -> Cli {
        let args: Vec<&str> = REQUIRED.iter().chain(extra).copied().collect();
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_orgs_are_split_and_trimmed() {
        let cli = parse(&["--batch-size", "5"]);
        assert_eq!(cli.orgs(), vec!["bitrise-io", "bitrise-steplib"]);
    }

    #[test]
    fn test_zero_batch_size_is_rejected() {
        let args: Vec<&str> = REQUIRED.iter().chain(&["--batch-size", "0"]).copied().collect();
        assert!(Cli::try_parse_from(args).is_err());
        assert_eq!(parse_batch_size("12").unwrap(), 12);
    }

    #[test]
    fn test_poll_and_report_settings() {
        let cli = parse(&[
            "--poll-interval-secs",
            "3",
            "--max-wait-secs",
            "600",
            "--report-failure-color",
            "#ff0000",
        ]);
        let poll = cli.poll_config();
        assert_eq!(poll.interval, Duration::from_secs(3));
        assert_eq!(poll.max_wait, Some(Duration::from_secs(600)));

        let style = cli.report_style();
        assert_eq!(style.failure_color, "#ff0000");
        assert_ne!(style.success_color, style.failure_color);
    }

    #[test]
    fn test_service_config_carries_overrides() {
        let cli = parse(&["--github-api-url", "http://127.0.0.1:1/", "--bitrise-bin", "/opt/bitrise"]);
        let config = cli.service_config();
        assert_eq!(config.github_api_url, "http://127.0.0.1:1");
        assert_eq!(config.bitrise_program, std::path::PathBuf::from("/opt/bitrise"));
        assert!(config.validate().is_ok());
    }

    #[tokio::test]
    async fn test_run_error_keeps_context_chain() {
        let mut cli = parse(&[]);
        cli.github_token = "  ".to_string();

        let err = run(&cli).await.unwrap_err();
        let chain = format!("{err:#}");
        assert!(chain.starts_with("Invalid configuration"), "{chain}");
        assert!(chain.contains("GITHUB_ACCESS_TOKEN"), "{chain}");
    }
}
