use crate::error::{Result, StatsError};
use crate::model::{Commit, DayBucket, HourBucket, LanguageBytes, LanguageShare};
use chrono::{Datelike, Timelike, Weekday};
use chrono_tz::Tz;
use std::cmp::Ordering;

pub const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

pub const OTHER_LANGUAGES: &str = "Other";

pub fn resolve_time_zone(name: &str) -> Result<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| StatsError::InvalidTimeZone(name.to_string()))
}

/// Commit counts for each hour 0..24 of local wall-clock time.
pub fn hour_buckets(commits: &[Commit], tz: Tz) -> Vec<HourBucket> {
    let mut counts = [0u64; 24];
    for commit in commits {
        let local = commit.authored_at.with_timezone(&tz);
        counts[local.hour() as usize] += 1;
    }
    counts
        .iter()
        .enumerate()
        .map(|(hour, &commit_count)| HourBucket {
            hour: hour as u32,
            commit_count,
        })
        .collect()
}

/// Commit counts for each weekday, Monday first.
pub fn day_buckets(commits: &[Commit], tz: Tz) -> Vec<DayBucket> {
    let mut counts = [0u64; 7];
    for commit in commits {
        let local = commit.authored_at.with_timezone(&tz);
        counts[local.weekday().num_days_from_monday() as usize] += 1;
    }
    WEEKDAYS
        .iter()
        .zip(counts)
        .map(|(&weekday, commit_count)| DayBucket {
            weekday,
            commit_count,
        })
        .collect()
}

/// Every observed language with its share of total bytes, largest first.
///
/// Ties on byte count are ordered by name so output is stable.
pub fn language_shares(languages: &LanguageBytes) -> Vec<LanguageShare> {
    let total: u64 = languages.values().sum();
    if total == 0 {
        return Vec::new();
    }

    let mut shares: Vec<LanguageShare> = languages
        .iter()
        .map(|(name, &bytes)| LanguageShare {
            name: name.clone(),
            bytes,
            percent: percent_of(bytes, total),
        })
        .collect();
    shares.sort_by(|a, b| match b.bytes.cmp(&a.bytes) {
        Ordering::Equal => a.name.cmp(&b.name),
        other => other,
    });
    shares
}

/// The top `top_n` languages, with the remainder folded into one `Other` row.
pub fn rank_languages(languages: &LanguageBytes, top_n: usize) -> Vec<LanguageShare> {
    let mut shares = language_shares(languages);
    if shares.len() <= top_n {
        return shares;
    }

    let total: u64 = languages.values().sum();
    let rest = shares.split_off(top_n);
    let other_bytes: u64 = rest.iter().map(|s| s.bytes).sum();
    shares.push(LanguageShare {
        name: OTHER_LANGUAGES.to_string(),
        bytes: other_bytes,
        percent: percent_of(other_bytes, total),
    });
    shares
}

fn percent_of(bytes: u64, total: u64) -> f64 {
    bytes as f64 / total as f64 * 100.0
}
