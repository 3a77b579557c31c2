use crate::cancel::CancelToken;
use crate::config::{Config, OutputMode};
use crate::error::{Result, StatsError};
use crate::github::{fetch_commits, fetch_languages, list_repositories, RemoteSource};
use crate::model::{Commit, DigestOutput, LanguageBytes, StatKind, SCHEMA_VERSION};
use crate::readme;
use crate::stats::{
    self, day_buckets, hour_buckets, rank_languages, resolve_time_zone, StatsConfig,
};
use anyhow::Context;
use chrono::Utc;
use console::style;
use tracing::{info, warn};

/// Remote data for one run; each part is fetched only if some kind needs it.
#[derive(Debug, Default, Clone)]
pub struct Dataset {
    pub commits: Option<Vec<Commit>>,
    pub languages: Option<LanguageBytes>,
}

impl Dataset {
    pub fn commits(&self) -> &[Commit] {
        self.commits.as_deref().unwrap_or(&[])
    }

    pub fn languages(&self) -> LanguageBytes {
        self.languages.clone().unwrap_or_default()
    }
}

pub fn exec<S: RemoteSource>(config: &Config, source: &S, cancel: &CancelToken) -> anyhow::Result<()> {
    cancel.check()?;
    let data = collect(source, &config.includes, config.show_progress).map_err(labelled)?;

    match config.output {
        OutputMode::Json => {
            let output =
                build_output(&config.includes, &config.stats, &data, cancel).map_err(labelled)?;
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputMode::DryRun => {
            let blob = render(&config.includes, &config.stats, &data, cancel).map_err(labelled)?;
            eprintln!("{}", style("Dry run: README not modified").dim());
            print!("{blob}");
        }
        OutputMode::Readme => {
            let blob = render(&config.includes, &config.stats, &data, cancel).map_err(labelled)?;
            cancel.check()?;
            readme::update_readme(&config.readme, &blob)
                .with_context(|| format!("Failed to update {}", config.readme.display()))?;
            println!(
                "{} Updated {}",
                style("✓").green(),
                style(config.readme.display()).bold()
            );
        }
    }

    Ok(())
}

fn context_for(err: &StatsError) -> &'static str {
    if err.is_configuration() {
        "Invalid configuration"
    } else if err.is_remote() {
        "GitHub rejected the request"
    } else {
        "Failed to fetch data from GitHub"
    }
}

fn labelled(err: StatsError) -> anyhow::Error {
    let context = context_for(&err);
    anyhow::Error::new(err).context(context)
}

pub fn collect<S: RemoteSource>(source: &S, kinds: &[StatKind], show_progress: bool) -> Result<Dataset> {
    let need_commits = kinds.iter().any(StatKind::needs_commits);
    let need_languages = kinds.iter().any(StatKind::needs_languages);
    if !need_commits && !need_languages {
        return Ok(Dataset::default());
    }

    let repos = list_repositories(source)?;

    let commits = if need_commits {
        let viewer = source.viewer()?;
        Some(fetch_commits(source, &repos, Some(&viewer.id), show_progress)?)
    } else {
        None
    };

    let languages = if need_languages {
        Some(fetch_languages(source, &repos, show_progress)?)
    } else {
        None
    };

    Ok(Dataset { commits, languages })
}

fn code_block(content: &str) -> String {
    format!("\n```\n{content}\n```\n")
}

/// Render the requested kinds in order into one README block.
pub fn render(
    kinds: &[StatKind],
    config: &StatsConfig,
    data: &Dataset,
    cancel: &CancelToken,
) -> Result<String> {
    let mut out = String::new();

    for kind in kinds {
        cancel.check()?;
        match kind {
            StatKind::Daily => {
                info!("Calculating commit statistics based on time of day");
                let table = stats::daily_commit_table(config, data.commits())?;
                out.push_str(&code_block(&table));
            }
            StatKind::Weekly => {
                info!("Calculating commit statistics based on day of week");
                let table = stats::weekly_commit_table(config, data.commits())?;
                out.push_str(&code_block(&table));
            }
            StatKind::Languages => {
                info!("Calculating language statistics");
                let table = stats::language_table(config, &data.languages());
                out.push_str(&code_block(&table));
            }
            StatKind::Unknown(name) => {
                warn!(item = %name, "unknown statistic requested");
                out.push_str(&format!("\n\nUnknown item: {name}\n"));
            }
        }
    }

    out.push('\n');
    Ok(out)
}

pub fn build_output(
    kinds: &[StatKind],
    config: &StatsConfig,
    data: &Dataset,
    cancel: &CancelToken,
) -> Result<DigestOutput> {
    cancel.check()?;
    let tz = resolve_time_zone(&config.time_zone)?;
    let wants = |k: StatKind| kinds.contains(&k);

    Ok(DigestOutput {
        version: SCHEMA_VERSION,
        generated_at: Utc::now(),
        time_zone: config.time_zone.clone(),
        total_commits: data.commits().len() as u64,
        daily: wants(StatKind::Daily).then(|| hour_buckets(data.commits(), tz)),
        weekly: wants(StatKind::Weekly).then(|| day_buckets(data.commits(), tz)),
        languages: wants(StatKind::Languages)
            .then(|| rank_languages(&data.languages(), config.top_languages)),
        unknown: kinds
            .iter()
            .filter_map(|k| match k {
                StatKind::Unknown(name) => Some(name.clone()),
                _ => None,
            })
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StatsError;
    use crate::github::fetch::testing::{repos, FakeSource};
    use pretty_assertions::assert_eq;

    fn source() -> FakeSource {
        let mut source = FakeSource {
            repos: repos(&["a", "b"]),
            ..Default::default()
        };
        source.commits.insert(
            "a".into(),
            vec!["2024-01-01T09:00:00Z", "2024-01-02T09:30:00Z"],
        );
        source.commits.insert("b".into(), vec!["2024-01-06T22:00:00Z"]);
        source.languages.insert("a".into(), vec![("Rust", 900)]);
        source.languages.insert("b".into(), vec![("Shell", 100)]);
        source
    }

    #[test]
    fn blocks_follow_requested_order() {
        let kinds = vec![StatKind::Languages, StatKind::Unknown("NOPE".into()), StatKind::Daily];
        let data = collect(&source(), &kinds, false).unwrap();
        let blob = render(&kinds, &StatsConfig::default(), &data, &CancelToken::new()).unwrap();

        let lang = blob.find("Languages by bytes").unwrap();
        let unknown = blob.find("Unknown item: NOPE").unwrap();
        let daily = blob.find("Commits by hour of day").unwrap();
        assert!(lang < unknown && unknown < daily);
        assert!(blob.starts_with("\n```\n"));
        assert!(blob.ends_with("```\n\n"));
    }

    #[test]
    fn only_needed_data_is_fetched() {
        let data = collect(&source(), &[StatKind::Weekly], false).unwrap();
        assert_eq!(data.commits().len(), 3);
        assert!(data.languages.is_none());

        let data = collect(&source(), &[StatKind::Unknown("x".into())], false).unwrap();
        assert!(data.commits.is_none() && data.languages.is_none());
    }

    #[test]
    fn failing_repository_aborts_collection() {
        let mut failing = source();
        failing.failing = Some("b".into());
        assert!(collect(&failing, &[StatKind::Daily], false).is_err());
    }

    #[test]
    fn cancellation_stops_rendering() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let err = render(&[StatKind::Daily], &StatsConfig::default(), &Dataset::default(), &cancel)
            .unwrap_err();
        assert!(matches!(err, StatsError::Cancelled));
    }

    #[test]
    fn json_output_contains_requested_sections() {
        let kinds = vec![StatKind::Daily, StatKind::Languages];
        let data = collect(&source(), &kinds, false).unwrap();
        let output = build_output(&kinds, &StatsConfig::default(), &data, &CancelToken::new()).unwrap();

        assert_eq!(output.total_commits, 3);
        let daily = output.daily.unwrap();
        assert_eq!(daily.len(), 24);
        assert_eq!(daily[9].commit_count, 2);
        assert!(output.weekly.is_none());
        let languages = output.languages.unwrap();
        assert_eq!(languages[0].name, "Rust");
        assert!((languages[0].percent - 90.0).abs() < 1e-9);
        assert!(output.unknown.is_empty());
    }

    #[test]
    fn json_output_lists_unknown_items() {
        let kinds = vec![
            StatKind::Unknown("MOON_STATS".into()),
            StatKind::Weekly,
            StatKind::Unknown("x".into()),
        ];
        let data = collect(&source(), &kinds, false).unwrap();
        let output = build_output(&kinds, &StatsConfig::default(), &data, &CancelToken::new()).unwrap();

        assert_eq!(output.unknown, vec!["MOON_STATS", "x"]);
        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json["unknown"], serde_json::json!(["MOON_STATS", "x"]));
    }

    #[test]
    fn errors_are_labelled_by_origin() {
        assert_eq!(
            context_for(&StatsError::InvalidTimeZone("Mars/Olympus".into())),
            "Invalid configuration"
        );
        assert_eq!(
            context_for(&StatsError::Unauthorized("bad credentials".into())),
            "GitHub rejected the request"
        );
        assert_eq!(context_for(&StatsError::Cancelled), "Failed to fetch data from GitHub");

        let err = labelled(StatsError::Remote("boom".into()));
        assert_eq!(err.to_string(), "GitHub rejected the request");
        assert!(format!("{err:#}").contains("boom"));
    }

    #[test]
    fn rendering_is_byte_identical_across_runs() {
        let kinds = vec![StatKind::Daily, StatKind::Weekly, StatKind::Languages];
        let data = collect(&source(), &kinds, false).unwrap();
        let config = StatsConfig::default().with_time_zone("America/Los_Angeles");
        let first = render(&kinds, &config, &data, &CancelToken::new()).unwrap();
        let second = render(&kinds, &config, &data, &CancelToken::new()).unwrap();
        assert_eq!(first, second);
    }
}
