use crate::cli::Cli;
use crate::error::{Result, StatsError};
use crate::github::RetryPolicy;
use crate::model::StatKind;
use crate::stats::{resolve_time_zone, StatsConfig};
use std::path::PathBuf;

pub const TOKEN_VAR: &str = "GITHUB_TOKEN";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Readme,
    DryRun,
    Json,
}

/// Everything one run needs, validated before any network activity.
#[derive(Debug, Clone)]
pub struct Config {
    pub token: String,
    pub api_url: String,
    pub readme: PathBuf,
    pub includes: Vec<StatKind>,
    pub stats: StatsConfig,
    pub policy: RetryPolicy,
    pub output: OutputMode,
    pub show_progress: bool,
}

impl Config {
    pub fn from_env(cli: &Cli) -> Result<Self> {
        Self::resolve(cli, std::env::var(TOKEN_VAR).ok())
    }

    pub fn resolve(cli: &Cli, token: Option<String>) -> Result<Self> {
        let token = token
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| StatsError::Configuration(format!("{TOKEN_VAR} not provided")))?;

        if cli.include.is_empty() {
            return Err(StatsError::Configuration(
                "no statistics requested; pass --include DAY_STATS, WEEK_STATS or LANGUAGE_STATS"
                    .to_string(),
            ));
        }
        let includes: Vec<StatKind> = cli
            .include
            .iter()
            .filter_map(|raw| raw.parse::<StatKind>().ok())
            .collect();

        resolve_time_zone(&cli.render.time_zone)?;
        if cli.render.bar_width == 0 {
            return Err(StatsError::Configuration("--bar-width must be positive".to_string()));
        }
        if cli.render.top_languages == 0 {
            return Err(StatsError::Configuration(
                "--top-languages must be positive".to_string(),
            ));
        }

        let output = if cli.json {
            OutputMode::Json
        } else if cli.dry_run {
            OutputMode::DryRun
        } else {
            OutputMode::Readme
        };

        Ok(Self {
            token,
            api_url: cli.github.api_url.clone(),
            readme: cli.readme.clone(),
            includes,
            stats: StatsConfig {
                time_zone: cli.render.time_zone.trim().to_string(),
                bar_width: cli.render.bar_width,
                top_languages: cli.render.top_languages,
            },
            policy: RetryPolicy::default().with_max_retries(cli.github.max_retries),
            output,
            show_progress: !cli.no_progress && output != OutputMode::Json,
        })
    }
}
