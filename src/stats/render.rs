use crate::model::{DayBucket, HourBucket, LanguageShare};

const FILLED: char = '█';
const EMPTY: char = '░';
const LABEL_WIDTH: usize = 10;

/// Fixed-width bar with `round(fraction * width)` filled cells.
pub fn bar(fraction: f64, width: usize) -> String {
    let fraction = if fraction.is_finite() { fraction.clamp(0.0, 1.0) } else { 0.0 };
    let filled = ((fraction * width as f64).round() as usize).min(width);
    let mut out = String::with_capacity(width * FILLED.len_utf8());
    out.extend(std::iter::repeat(FILLED).take(filled));
    out.extend(std::iter::repeat(EMPTY).take(width - filled));
    out
}

fn scaled(count: u64, max: u64) -> f64 {
    if max == 0 {
        0.0
    } else {
        count as f64 / max as f64
    }
}

fn count_rows(rows: impl Iterator<Item = (String, u64)> + Clone, width: usize) -> Vec<String> {
    let max = rows.clone().map(|(_, c)| c).max().unwrap_or(0);
    rows.map(|(label, count)| {
        let noun = if count == 1 { "commit " } else { "commits" };
        format!(
            "{label:<w$}{count:>6} {noun}  {}",
            bar(scaled(count, max), width),
            w = LABEL_WIDTH
        )
    })
    .collect()
}

pub fn render_hours(buckets: &[HourBucket], time_zone: &str, width: usize) -> String {
    let total: u64 = buckets.iter().map(|b| b.commit_count).sum();
    let mut lines = vec![format!("Commits by hour of day ({time_zone})"), String::new()];
    lines.extend(count_rows(
        buckets
            .iter()
            .map(|b| (format!("{:02}:00", b.hour), b.commit_count)),
        width,
    ));
    lines.push(String::new());
    lines.push(format!("Total: {total} commits"));
    lines.join("\n")
}

pub fn render_days(buckets: &[DayBucket], time_zone: &str, width: usize) -> String {
    let total: u64 = buckets.iter().map(|b| b.commit_count).sum();
    let mut lines = vec![format!("Commits by day of week ({time_zone})"), String::new()];
    lines.extend(count_rows(
        buckets
            .iter()
            .map(|b| (weekday_name(b.weekday).to_string(), b.commit_count)),
        width,
    ));
    lines.push(String::new());
    lines.push(format!("Total: {total} commits"));
    lines.join("\n")
}

/// Language table; empty input renders as an empty string.
pub fn render_languages(shares: &[LanguageShare], width: usize) -> String {
    if shares.is_empty() {
        return String::new();
    }

    let name_width = shares
        .iter()
        .map(|s| s.name.chars().count())
        .max()
        .unwrap_or(0)
        .max(LABEL_WIDTH);

    let mut lines = vec!["Languages by bytes of code".to_string(), String::new()];
    for share in shares {
        lines.push(format!(
            "{:<name_width$}  {:>6.2}%  {}",
            share.name,
            share.percent,
            bar(share.percent / 100.0, width)
        ));
    }
    lines.join("\n")
}

fn weekday_name(day: chrono::Weekday) -> &'static str {
    use chrono::Weekday::*;
    match day {
        Mon => "Monday",
        Tue => "Tuesday",
        Wed => "Wednesday",
        Thu => "Thursday",
        Fri => "Friday",
        Sat => "Saturday",
        Sun => "Sunday",
    }
}
