use chrono::{DateTime, Duration, FixedOffset};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use readme_stats::model::{Commit, LanguageBytes};
use readme_stats::stats::{daily_commit_table, language_table, weekly_commit_table, StatsConfig};

fn sample_commits(n: usize) -> Vec<Commit> {
    let start: DateTime<FixedOffset> = DateTime::parse_from_rfc3339("2023-01-01T00:00:00+01:00").unwrap();
    (0..n)
        .map(|i| Commit::new(start + Duration::minutes(i as i64 * 37)))
        .collect()
}

fn sample_languages() -> LanguageBytes {
    (0..40).map(|i| (format!("Lang{i:02}"), (i as u64 + 1) * 1_000)).collect()
}

fn bench_render(c: &mut Criterion) {
    let config = StatsConfig::default().with_time_zone("America/Toronto");
    let commits = sample_commits(50_000);
    let languages = sample_languages();

    c.bench_function("daily_table_50k", |b| {
        b.iter(|| daily_commit_table(black_box(&config), black_box(&commits)).unwrap())
    });
    c.bench_function("weekly_table_50k", |b| {
        b.iter(|| weekly_commit_table(black_box(&config), black_box(&commits)).unwrap())
    });
    c.bench_function("language_table_40", |b| {
        b.iter(|| language_table(black_box(&config), black_box(&languages)))
    });
}

criterion_group!(benches, bench_render);
criterion_main!(benches);
