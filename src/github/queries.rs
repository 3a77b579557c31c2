//! GraphQL documents and the response shapes they decode into.

use serde::Deserialize;

pub const PAGE_SIZE: u32 = 100;

pub const VIEWER_QUERY: &str = "query { viewer { id login } }";

pub const REPOSITORIES_QUERY: &str = r#"
query($first: Int!, $cursor: String) {
  viewer {
    repositories(first: $first, after: $cursor, ownerAffiliations: [OWNER, COLLABORATOR, ORGANIZATION_MEMBER]) {
      pageInfo { hasNextPage endCursor }
      nodes { nameWithOwner }
    }
  }
}
"#;

pub const COMMITS_QUERY: &str = r#"
query($owner: String!, $name: String!, $author: CommitAuthor, $first: Int!, $cursor: String) {
  repository(owner: $owner, name: $name) {
    defaultBranchRef {
      target {
        ... on Commit {
          history(first: $first, after: $cursor, author: $author) {
            pageInfo { hasNextPage endCursor }
            nodes { authoredDate }
          }
        }
      }
    }
  }
}
"#;

pub const LANGUAGES_QUERY: &str = r#"
query($owner: String!, $name: String!, $first: Int!, $cursor: String) {
  repository(owner: $owner, name: $name) {
    languages(first: $first, after: $cursor) {
      pageInfo { hasNextPage endCursor }
      edges { size node { name } }
    }
  }
}
"#;

#[derive(Debug, Deserialize)]
pub struct GraphQlResponse {
    pub data: Option<serde_json::Value>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
pub struct GraphQlError {
    pub message: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

impl GraphQlError {
    pub fn is_rate_limited(&self) -> bool {
        self.kind.as_deref() == Some("RATE_LIMITED")
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

/// Viewer identity, used to restrict history to the viewer's own commits.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Viewer {
    pub id: String,
    pub login: String,
}

#[derive(Debug, Deserialize)]
pub struct ViewerData {
    pub viewer: Viewer,
}

#[derive(Debug, Deserialize)]
pub struct RepositoriesData {
    pub viewer: RepositoriesViewer,
}

#[derive(Debug, Deserialize)]
pub struct RepositoriesViewer {
    pub repositories: RepositoryConnection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryConnection {
    pub page_info: PageInfo,
    #[serde(default)]
    pub nodes: Vec<RepositoryNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryNode {
    pub name_with_owner: String,
}

#[derive(Debug, Deserialize)]
pub struct CommitsData {
    pub repository: Option<CommitsRepository>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitsRepository {
    pub default_branch_ref: Option<BranchRef>,
}

#[derive(Debug, Deserialize)]
pub struct BranchRef {
    pub target: Option<BranchTarget>,
}

#[derive(Debug, Deserialize)]
pub struct BranchTarget {
    pub history: Option<CommitConnection>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitConnection {
    pub page_info: PageInfo,
    #[serde(default)]
    pub nodes: Vec<CommitNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitNode {
    pub authored_date: String,
}

#[derive(Debug, Deserialize)]
pub struct LanguagesData {
    pub repository: Option<LanguagesRepository>,
}

#[derive(Debug, Deserialize)]
pub struct LanguagesRepository {
    pub languages: Option<LanguageConnection>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageConnection {
    pub page_info: PageInfo,
    #[serde(default)]
    pub edges: Vec<LanguageEdge>,
}

#[derive(Debug, Deserialize)]
pub struct LanguageEdge {
    pub size: u64,
    pub node: LanguageNode,
}

#[derive(Debug, Deserialize)]
pub struct LanguageNode {
    pub name: String,
}
