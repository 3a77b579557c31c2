use super::policy::{Clock, RetryPolicy, SystemClock};
use super::queries::{
    CommitsData, GraphQlResponse, LanguagesData, PageInfo, RepositoriesData, Viewer, ViewerData,
    COMMITS_QUERY, LANGUAGES_QUERY, PAGE_SIZE, REPOSITORIES_QUERY, VIEWER_QUERY,
};
use super::transport::{HttpTransport, RateLimit, RawResponse, Transport};
use super::RemoteSource;
use crate::cancel::CancelToken;
use crate::error::{Result, StatsError};
use crate::model::{Commit, LanguageBytes, Repository};
use chrono::{DateTime, TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// One page of a cursor-paginated connection.
pub struct Page<T> {
    pub items: Vec<T>,
    pub page_info: PageInfo,
}

enum Outcome {
    Done(Value),
    Fail(StatsError),
    Retry(String),
    RateLimited(String),
}

/// GraphQL client for the GitHub API.
///
/// Every call is retried on transient failures according to its
/// [`RetryPolicy`], and waits out an exhausted rate-limit quota before
/// issuing the next request.
pub struct GithubClient {
    transport: Arc<dyn Transport>,
    clock: Arc<dyn Clock>,
    policy: RetryPolicy,
    endpoint: String,
    token: String,
    cancel: CancelToken,
    paused_until: Mutex<Option<DateTime<Utc>>>,
}

impl GithubClient {
    pub fn new(api_url: &str, token: &str, policy: RetryPolicy, cancel: CancelToken) -> Result<Self> {
        let transport = HttpTransport::new().map_err(|e| StatsError::Transport {
            attempts: 0,
            message: e.to_string(),
        })?;
        Ok(Self::with_transport(
            Arc::new(transport),
            Arc::new(SystemClock),
            api_url,
            token,
            policy,
            cancel,
        ))
    }

    pub fn with_transport(
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
        api_url: &str,
        token: &str,
        policy: RetryPolicy,
        cancel: CancelToken,
    ) -> Self {
        Self {
            transport,
            clock,
            policy,
            endpoint: format!("{}/graphql", api_url.trim_end_matches('/')),
            token: token.to_string(),
            cancel,
            paused_until: Mutex::new(None),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn execute(&self, query: &str, variables: Value) -> Result<Value> {
        let body = json!({ "query": query, "variables": variables });
        let mut attempt: u32 = 0;
        let mut pauses: u32 = 0;

        loop {
            self.cancel.check()?;
            self.wait_for_quota()?;
            self.cancel.check()?;

            debug!(endpoint = %self.endpoint, attempt, "POST graphql");
            let outcome = match self.transport.post_json(&self.endpoint, &self.token, &body) {
                Ok(resp) => self.interpret(resp),
                Err(err) => Outcome::Retry(format!("network error: {err}")),
            };

            match outcome {
                Outcome::Done(data) => return Ok(data),
                Outcome::Fail(err) => return Err(err),
                Outcome::Retry(message) => {
                    if attempt >= self.policy.max_retries {
                        return Err(StatsError::Transport {
                            attempts: attempt + 1,
                            message,
                        });
                    }
                    let delay = self.policy.backoff(attempt);
                    warn!(attempt = attempt + 1, delay_ms = delay.as_millis() as u64, %message, "request failed, retrying");
                    self.clock.sleep(delay, &self.cancel)?;
                }
                // A known reset time is waited out by `wait_for_quota` and
                // does not count against the transient retry budget.
                Outcome::RateLimited(message) if self.is_paused() => {
                    pauses += 1;
                    if pauses > self.policy.max_rate_limit_pauses {
                        return Err(StatsError::Remote(format!("rate limit exhausted: {message}")));
                    }
                    warn!(pause = pauses, %message, "rate limited, waiting for quota");
                    continue;
                }
                Outcome::RateLimited(message) => {
                    if attempt >= self.policy.max_retries {
                        return Err(StatsError::Remote(format!("rate limit exhausted: {message}")));
                    }
                    let delay = self.policy.backoff(attempt);
                    warn!(attempt = attempt + 1, delay_ms = delay.as_millis() as u64, %message, "rate limited, backing off");
                    self.clock.sleep(delay, &self.cancel)?;
                }
            }
            attempt += 1;
        }
    }

    fn interpret(&self, resp: RawResponse) -> Outcome {
        self.record_rate_limit(&resp.rate_limit);

        match resp.status {
            200..=299 => {}
            401 => return Outcome::Fail(StatsError::Unauthorized(summarize(&resp.body))),
            403 | 429 if resp.rate_limit.exhausted() => {
                return Outcome::RateLimited(format!("HTTP {}", resp.status))
            }
            429 => return Outcome::RateLimited("HTTP 429".to_string()),
            403 => return Outcome::Fail(StatsError::Unauthorized(summarize(&resp.body))),
            500..=599 => return Outcome::Retry(format!("server returned HTTP {}", resp.status)),
            status => {
                return Outcome::Fail(StatsError::Remote(format!(
                    "HTTP {status}: {}",
                    summarize(&resp.body)
                )))
            }
        }

        let parsed: GraphQlResponse = match serde_json::from_str(&resp.body) {
            Ok(parsed) => parsed,
            Err(e) => return Outcome::Fail(StatsError::Remote(format!("malformed response: {e}"))),
        };

        if !parsed.errors.is_empty() {
            let message = parsed
                .errors
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            if parsed.errors.iter().any(|e| e.is_rate_limited()) {
                return Outcome::RateLimited(message);
            }
            return Outcome::Fail(StatsError::Remote(message));
        }

        match parsed.data {
            Some(data) => Outcome::Done(data),
            None => Outcome::Fail(StatsError::Remote("response carried no data".to_string())),
        }
    }

    fn record_rate_limit(&self, rate_limit: &RateLimit) {
        let now = self.clock.now();
        let until = if let Some(secs) = rate_limit.retry_after {
            Some(now + chrono::Duration::seconds(secs as i64))
        } else if rate_limit.remaining == Some(0) {
            rate_limit
                .reset_at
                .and_then(|ts| Utc.timestamp_opt(ts, 0).single())
        } else {
            None
        };

        if let Some(until) = until.filter(|u| *u > now) {
            let mut paused = self.paused_until.lock().unwrap_or_else(|e| e.into_inner());
            if paused.map_or(true, |p| p < until) {
                *paused = Some(until);
            }
        }
    }

    fn is_paused(&self) -> bool {
        let paused = *self.paused_until.lock().unwrap_or_else(|e| e.into_inner());
        paused.is_some_and(|until| until > self.clock.now())
    }

    fn wait_for_quota(&self) -> Result<()> {
        let paused = *self.paused_until.lock().unwrap_or_else(|e| e.into_inner());
        let Some(until) = paused else { return Ok(()) };
        if let Some(wait) = self.policy.rate_limit_wait(self.clock.now(), until) {
            warn!(resume_at = %until, wait_secs = wait.as_secs(), "rate limit quota exhausted, pausing");
            self.clock.sleep(wait, &self.cancel)?;
        }
        Ok(())
    }

    /// Follow `endCursor` until the server reports no further pages.
    ///
    /// `extract` returns `None` when the connection does not exist at all
    /// (for example an empty repository without a default branch).
    pub fn paginate<T, F>(&self, query: &str, variables: Value, mut extract: F) -> Result<Vec<T>>
    where
        F: FnMut(Value) -> Result<Option<Page<T>>>,
    {
        let mut items = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut vars = variables.clone();
            vars["first"] = json!(PAGE_SIZE);
            vars["cursor"] = json!(cursor);

            let data = self.execute(query, vars)?;
            let Some(page) = extract(data)? else { break };
            items.extend(page.items);

            if !page.page_info.has_next_page {
                break;
            }
            match page.page_info.end_cursor {
                Some(next) if cursor.as_deref() != Some(next.as_str()) => cursor = Some(next),
                _ => {
                    return Err(StatsError::Remote(
                        "pagination cursor missing or did not advance".to_string(),
                    ))
                }
            }
        }

        Ok(items)
    }
}

fn decode<T: DeserializeOwned>(data: Value) -> Result<T> {
    serde_json::from_value(data)
        .map_err(|e| StatsError::Remote(format!("unexpected response shape: {e}")))
}

fn summarize(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "empty response body".to_string();
    }
    trimmed.chars().take(200).collect()
}

impl RemoteSource for GithubClient {
    fn viewer(&self) -> Result<Viewer> {
        let data: ViewerData = decode(self.execute(VIEWER_QUERY, json!({}))?)?;
        debug!(login = %data.viewer.login, "authenticated");
        Ok(data.viewer)
    }

    fn list_repositories(&self) -> Result<Vec<Repository>> {
        let repos = self.paginate(REPOSITORIES_QUERY, json!({}), |data| {
            let data: RepositoriesData = decode(data)?;
            let connection = data.viewer.repositories;
            let items = connection
                .nodes
                .into_iter()
                .map(|node| {
                    Repository::from_name_with_owner(&node.name_with_owner).ok_or_else(|| {
                        StatsError::Remote(format!(
                            "malformed repository name: {}",
                            node.name_with_owner
                        ))
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(Some(Page {
                items,
                page_info: connection.page_info,
            }))
        })?;

        let mut seen = HashSet::new();
        let unique: Vec<Repository> = repos
            .into_iter()
            .filter(|repo| seen.insert(repo.full_name()))
            .collect();
        debug!(count = unique.len(), "listed repositories");
        Ok(unique)
    }

    fn list_commits(&self, repo: &Repository, author_id: Option<&str>) -> Result<Vec<Commit>> {
        let variables = json!({
            "owner": repo.owner,
            "name": repo.name,
            "author": author_id.map(|id| json!({ "id": id })),
        });
        let commits = self.paginate(COMMITS_QUERY, variables, |data| {
            let data: CommitsData = decode(data)?;
            let repository = data
                .repository
                .ok_or_else(|| StatsError::Remote(format!("repository {repo} not found")))?;
            let Some(history) = repository
                .default_branch_ref
                .and_then(|r| r.target)
                .and_then(|t| t.history)
            else {
                return Ok(None);
            };

            let items = history
                .nodes
                .into_iter()
                .map(|node| {
                    DateTime::parse_from_rfc3339(&node.authored_date)
                        .map(Commit::new)
                        .map_err(|e| {
                            StatsError::Remote(format!(
                                "invalid authoredDate '{}' in {repo}: {e}",
                                node.authored_date
                            ))
                        })
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(Some(Page {
                items,
                page_info: history.page_info,
            }))
        })?;
        debug!(repository = %repo, count = commits.len(), "fetched commits");
        Ok(commits)
    }

    fn list_languages(&self, repo: &Repository) -> Result<LanguageBytes> {
        let variables = json!({ "owner": repo.owner, "name": repo.name });
        let edges = self.paginate(LANGUAGES_QUERY, variables, |data| {
            let data: LanguagesData = decode(data)?;
            let repository = data
                .repository
                .ok_or_else(|| StatsError::Remote(format!("repository {repo} not found")))?;
            Ok(repository.languages.map(|conn| Page {
                items: conn
                    .edges
                    .into_iter()
                    .map(|edge| (edge.node.name, edge.size))
                    .collect(),
                page_info: conn.page_info,
            }))
        })?;

        let mut languages = LanguageBytes::new();
        for (name, size) in edges {
            *languages.entry(name).or_insert(0) += size;
        }
        debug!(repository = %repo, count = languages.len(), "fetched languages");
        Ok(languages)
    }
}
