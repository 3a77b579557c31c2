use crate::cancel::{self, CancelToken};
use crate::config::Config;
use crate::github::{GithubClient, DEFAULT_API_URL};
use crate::stats::{DEFAULT_BAR_WIDTH, DEFAULT_TIME_ZONE, DEFAULT_TOP_LANGUAGES};
use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "readme-stats")]
#[command(about = "Update a README with when you code and which languages you code in")]
#[command(version)]
pub struct Cli {
    #[arg(
        long = "include",
        value_name = "KIND",
        value_delimiter = ',',
        help = "Ordered list of stats to include (DAY_STATS, WEEK_STATS, LANGUAGE_STATS)"
    )]
    pub include: Vec<String>,

    #[arg(long, help = "Path to the README to update", default_value = "README.md")]
    pub readme: PathBuf,

    #[clap(flatten)]
    pub github: GithubArgs,

    #[clap(flatten)]
    pub render: RenderArgs,

    #[arg(long, help = "Print computed statistics as JSON instead of updating the README", conflicts_with = "dry_run")]
    pub json: bool,

    #[arg(long, help = "Print the rendered block instead of updating the README")]
    pub dry_run: bool,

    #[arg(long, help = "Disable progress indicators")]
    pub no_progress: bool,

    #[arg(short, long, action = ArgAction::Count, help = "Increase log verbosity")]
    pub verbose: u8,
}

#[derive(Args, Clone, Debug)]
pub struct GithubArgs {
    #[arg(long, env = "GITHUB_API_URL", default_value = DEFAULT_API_URL, help = "GitHub API base URL")]
    pub api_url: String,

    #[arg(long, default_value_t = 3, help = "Retries for transient API failures")]
    pub max_retries: u32,
}

#[derive(Args, Clone, Debug)]
pub struct RenderArgs {
    #[arg(long, env = "TIME_ZONE", default_value = DEFAULT_TIME_ZONE, help = "IANA time zone used to bucket commits")]
    pub time_zone: String,

    #[arg(long, default_value_t = DEFAULT_BAR_WIDTH, help = "Width of rendered bars")]
    pub bar_width: usize,

    #[arg(long, default_value_t = DEFAULT_TOP_LANGUAGES, help = "Languages shown before folding into Other")]
    pub top_languages: usize,
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub fn execute(self) -> Result<()> {
        let config = Config::from_env(&self).context("Invalid configuration")?;

        cancel::install_interrupt_handler().context("Failed to install interrupt handler")?;
        let cancel = CancelToken::with_interrupts();

        let client = GithubClient::new(
            &config.api_url,
            &config.token,
            config.policy.clone(),
            cancel.clone(),
        )
        .context("Failed to create GitHub client")?;
        debug!(endpoint = client.endpoint(), "using GitHub GraphQL endpoint");

        crate::digest::exec(&config, &client, &cancel)
    }
}

fn log_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    }
}

/// Log to stderr, honouring `RUST_LOG` when set.
pub fn init_tracing(verbose: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("readme_stats={}", log_level(verbose))));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
