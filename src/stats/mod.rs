//! Commit timing and language statistics.
//!
//! Every function here is pure and total over its data; the only failure is
//! a time zone name that does not resolve.

pub mod aggregate;
pub mod render;

pub use aggregate::{
    day_buckets, hour_buckets, language_shares, rank_languages, resolve_time_zone, OTHER_LANGUAGES,
    WEEKDAYS,
};
pub use render::{bar, render_days, render_hours, render_languages};

use crate::error::Result;
use crate::model::{Commit, LanguageBytes};

pub const DEFAULT_TIME_ZONE: &str = "UTC";
pub const DEFAULT_BAR_WIDTH: usize = 25;
pub const DEFAULT_TOP_LANGUAGES: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsConfig {
    pub time_zone: String,
    pub bar_width: usize,
    pub top_languages: usize,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            time_zone: DEFAULT_TIME_ZONE.to_string(),
            bar_width: DEFAULT_BAR_WIDTH,
            top_languages: DEFAULT_TOP_LANGUAGES,
        }
    }
}

impl StatsConfig {
    pub fn with_time_zone(mut self, time_zone: impl Into<String>) -> Self {
        self.time_zone = time_zone.into();
        self
    }
}

/// Hour-of-day histogram table.
pub fn daily_commit_table(config: &StatsConfig, commits: &[Commit]) -> Result<String> {
    let tz = resolve_time_zone(&config.time_zone)?;
    let buckets = hour_buckets(commits, tz);
    Ok(render_hours(&buckets, &config.time_zone, config.bar_width))
}

/// Day-of-week histogram table, Monday first.
pub fn weekly_commit_table(config: &StatsConfig, commits: &[Commit]) -> Result<String> {
    let tz = resolve_time_zone(&config.time_zone)?;
    let buckets = day_buckets(commits, tz);
    Ok(render_days(&buckets, &config.time_zone, config.bar_width))
}

/// Language ranking table.
pub fn language_table(config: &StatsConfig, languages: &LanguageBytes) -> String {
    let ranked = rank_languages(languages, config.top_languages);
    render_languages(&ranked, config.bar_width)
}
