use thiserror::Error;

pub type Result<T> = std::result::Result<T, StatsError>;

#[derive(Error, Debug)]
pub enum StatsError {
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Invalid time zone: {0}")]
    InvalidTimeZone(String),
    #[error("GitHub API error: {0}")]
    Remote(String),
    #[error("GitHub authorization rejected: {0}")]
    Unauthorized(String),
    #[error("Transport error after {attempts} attempt(s): {message}")]
    Transport { attempts: u32, message: String },
    #[error("Cancelled")]
    Cancelled,
    #[error("README splice error: {0}")]
    Splice(String),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StatsError {
    /// True for failures that stop the run before any network call is made.
    pub fn is_configuration(&self) -> bool {
        matches!(self, StatsError::Configuration(_) | StatsError::InvalidTimeZone(_))
    }

    /// True for failures reported by the API itself, including auth rejection.
    pub fn is_remote(&self) -> bool {
        matches!(self, StatsError::Remote(_) | StatsError::Unauthorized(_))
    }
}

impl From<tempfile::PersistError> for StatsError {
    fn from(err: tempfile::PersistError) -> Self {
        StatsError::Io(err.error)
    }
}
