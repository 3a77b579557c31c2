use super::RemoteSource;
use crate::error::Result;
use crate::model::{Commit, LanguageBytes, Repository};
use indicatif::{ParallelProgressIterator, ProgressBar, ProgressStyle};
use rayon::prelude::*;
use tracing::info;

fn progress(len: usize, message: &'static str, show: bool) -> ProgressBar {
    if !show {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} {msg} [{bar:30}] {pos}/{len}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    pb.set_message(message);
    pb
}

pub fn list_repositories<S: RemoteSource>(source: &S) -> Result<Vec<Repository>> {
    let repos = source.list_repositories()?;
    info!(count = repos.len(), "found repositories");
    Ok(repos)
}

/// Fetch commits for every repository in parallel.
///
/// Each repository's commits are gathered in isolation and flattened in
/// repository order once all fetches succeed. Any failure aborts the whole
/// collection.
pub fn fetch_commits<S: RemoteSource>(
    source: &S,
    repos: &[Repository],
    author_id: Option<&str>,
    show_progress: bool,
) -> Result<Vec<Commit>> {
    let pb = progress(repos.len(), "Fetching commits", show_progress);
    let per_repo: Result<Vec<Vec<Commit>>> = repos
        .par_iter()
        .progress_with(pb.clone())
        .map(|repo| source.list_commits(repo, author_id))
        .collect();
    pb.finish_and_clear();
    let per_repo = per_repo?;

    let commits: Vec<Commit> = per_repo.into_iter().flatten().collect();
    info!(count = commits.len(), repositories = repos.len(), "fetched commits");
    Ok(commits)
}

/// Fetch and sum language byte counts across repositories.
pub fn fetch_languages<S: RemoteSource>(
    source: &S,
    repos: &[Repository],
    show_progress: bool,
) -> Result<LanguageBytes> {
    let pb = progress(repos.len(), "Fetching languages", show_progress);
    let per_repo: Result<Vec<LanguageBytes>> = repos
        .par_iter()
        .progress_with(pb.clone())
        .map(|repo| source.list_languages(repo))
        .collect();
    pb.finish_and_clear();
    let per_repo = per_repo?;

    let mut totals = LanguageBytes::new();
    for languages in per_repo {
        for (name, bytes) in languages {
            *totals.entry(name).or_insert(0) += bytes;
        }
    }
    info!(count = totals.len(), "aggregated languages");
    Ok(totals)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::cancel::CancelToken;
    use crate::error::StatsError;
    use crate::github::Viewer;
    use chrono::DateTime;
    use std::collections::HashMap;

    /// In-memory source keyed by repository name.
    #[derive(Default)]
    pub struct FakeSource {
        pub repos: Vec<Repository>,
        pub commits: HashMap<String, Vec<&'static str>>,
        pub languages: HashMap<String, Vec<(&'static str, u64)>>,
        pub failing: Option<String>,
        pub cancel: CancelToken,
        /// Repository whose fetch trips `cancel`, as an interrupt would.
        pub cancel_during: Option<String>,
    }

    impl FakeSource {
        fn fail_on(&self, repo: &Repository) -> Result<()> {
            if self.cancel_during.as_deref() == Some(repo.name.as_str()) {
                self.cancel.cancel();
            }
            self.cancel.check()?;
            if self.failing.as_deref() == Some(repo.name.as_str()) {
                return Err(StatsError::Remote(format!("boom in {repo}")));
            }
            Ok(())
        }
    }

    impl RemoteSource for FakeSource {
        fn viewer(&self) -> Result<Viewer> {
            Ok(Viewer {
                id: "U_1".to_string(),
                login: "octo".to_string(),
            })
        }

        fn list_repositories(&self) -> Result<Vec<Repository>> {
            Ok(self.repos.clone())
        }

        fn list_commits(&self, repo: &Repository, _author_id: Option<&str>) -> Result<Vec<Commit>> {
            self.fail_on(repo)?;
            Ok(self
                .commits
                .get(&repo.name)
                .into_iter()
                .flatten()
                .map(|ts| Commit::new(DateTime::parse_from_rfc3339(ts).unwrap()))
                .collect())
        }

        fn list_languages(&self, repo: &Repository) -> Result<LanguageBytes> {
            self.fail_on(repo)?;
            Ok(self
                .languages
                .get(&repo.name)
                .into_iter()
                .flatten()
                .map(|(name, bytes)| (name.to_string(), *bytes))
                .collect())
        }
    }

    pub fn repos(names: &[&str]) -> Vec<Repository> {
        names.iter().map(|n| Repository::new("octo", *n)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::error::StatsError;

    #[test]
    fn commits_are_flattened_across_repositories() {
        let mut source = FakeSource {
            repos: repos(&["a", "b", "c"]),
            ..Default::default()
        };
        source.commits.insert("a".into(), vec!["2024-01-01T10:00:00Z"]);
        source.commits.insert(
            "c".into(),
            vec!["2024-01-02T11:00:00Z", "2024-01-03T12:00:00Z"],
        );

        let commits = fetch_commits(&source, &source.repos, None, false).unwrap();
        assert_eq!(commits.len(), 3);
    }

    #[test]
    fn one_failing_repository_fails_the_whole_fetch() {
        let mut source = FakeSource {
            repos: repos(&["r1", "r2", "r3", "r4", "r5"]),
            failing: Some("r3".to_string()),
            ..Default::default()
        };
        for name in ["r1", "r2", "r4", "r5"] {
            source.commits.insert(name.into(), vec!["2024-01-01T10:00:00Z"]);
        }

        let result = fetch_commits(&source, &source.repos, None, false);
        assert!(matches!(result, Err(StatsError::Remote(_))));
    }

    #[test]
    fn languages_are_summed_per_name() {
        let mut source = FakeSource {
            repos: repos(&["a", "b"]),
            ..Default::default()
        };
        source
            .languages
            .insert("a".into(), vec![("Rust", 100), ("Go", 10)]);
        source
            .languages
            .insert("b".into(), vec![("Rust", 50), ("Shell", 1)]);

        let totals = fetch_languages(&source, &source.repos, false).unwrap();
        assert_eq!(totals.len(), 3);
        assert_eq!(totals["Rust"], 150);
        assert_eq!(totals["Go"], 10);
        assert_eq!(totals["Shell"], 1);
    }

    #[test]
    fn language_failure_is_fail_fast() {
        let source = FakeSource {
            repos: repos(&["a", "b"]),
            failing: Some("b".to_string()),
            ..Default::default()
        };
        assert!(fetch_languages(&source, &source.repos, false).is_err());
    }

    #[test]
    fn cancellation_mid_fetch_yields_no_commits() {
        let mut source = FakeSource {
            repos: repos(&["r1", "r2", "r3", "r4", "r5"]),
            cancel_during: Some("r3".to_string()),
            ..Default::default()
        };
        for name in ["r1", "r2", "r3", "r4", "r5"] {
            source.commits.insert(name.into(), vec!["2024-01-01T10:00:00Z"]);
        }

        let result = fetch_commits(&source, &source.repos, None, false);
        assert!(matches!(result, Err(StatsError::Cancelled)));
        assert!(source.cancel.is_cancelled());
    }
}
