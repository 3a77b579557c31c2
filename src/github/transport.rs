use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, ACCEPT, RETRY_AFTER};
use std::fmt;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Rate-limit state reported alongside a response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateLimit {
    pub remaining: Option<u64>,
    /// Unix seconds at which the quota resets.
    pub reset_at: Option<i64>,
    /// Seconds from `Retry-After`, if the server sent one.
    pub retry_after: Option<u64>,
}

impl RateLimit {
    pub fn exhausted(&self) -> bool {
        self.remaining == Some(0) || self.retry_after.is_some()
    }

    pub fn from_headers(headers: &HeaderMap) -> Self {
        let number = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<i64>().ok())
        };
        Self {
            remaining: number("x-ratelimit-remaining").and_then(|v| u64::try_from(v).ok()),
            reset_at: number("x-ratelimit-reset"),
            retry_after: headers
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub rate_limit: RateLimit,
    pub body: String,
}

/// Network-level failure: the request never produced an HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkError(pub String);

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for NetworkError {}

/// One request/response exchange with the API endpoint.
pub trait Transport: Send + Sync {
    fn post_json(
        &self,
        url: &str,
        token: &str,
        body: &serde_json::Value,
    ) -> Result<RawResponse, NetworkError>;
}

pub struct HttpTransport {
    http: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, NetworkError> {
        let http = Client::builder()
            .user_agent(concat!("readme-stats/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| NetworkError(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http })
    }
}

impl Transport for HttpTransport {
    fn post_json(
        &self,
        url: &str,
        token: &str,
        body: &serde_json::Value,
    ) -> Result<RawResponse, NetworkError> {
        let resp = self
            .http
            .post(url)
            .bearer_auth(token)
            .header(ACCEPT, "application/json")
            .json(body)
            .send()
            .map_err(|e| NetworkError(e.to_string()))?;

        let status = resp.status().as_u16();
        let rate_limit = RateLimit::from_headers(resp.headers());
        let body = resp.text().map_err(|e| NetworkError(e.to_string()))?;
        Ok(RawResponse {
            status,
            rate_limit,
            body,
        })
    }
}
