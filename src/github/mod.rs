pub mod client;
pub mod fetch;
pub mod policy;
pub mod queries;
pub mod transport;

pub use client::{GithubClient, DEFAULT_API_URL};
pub use fetch::{fetch_commits, fetch_languages, list_repositories};
pub use policy::{Clock, RetryPolicy, SystemClock};
pub use queries::Viewer;
pub use transport::{HttpTransport, RateLimit, RawResponse, Transport};

use crate::error::Result;
use crate::model::{Commit, LanguageBytes, Repository};

/// The three paginated listings the digest is built from, plus identity.
///
/// Every method returns a fully materialised collection.
pub trait RemoteSource: Sync {
    fn viewer(&self) -> Result<Viewer>;
    fn list_repositories(&self) -> Result<Vec<Repository>>;
    fn list_commits(&self, repo: &Repository, author_id: Option<&str>) -> Result<Vec<Commit>>;
    fn list_languages(&self, repo: &Repository) -> Result<LanguageBytes>;
}
