use thiserror::Error;

use crate::domain::CommitRecord;

/// Unified error type for tag-promote operations
#[derive(Error, Debug)]
pub enum PromoteError {
    #[error("Tag parsing error: {0}")]
    Parse(String),

    #[error("Manifest error: {0}")]
    Manifest(String),

    #[error("Repository operation failed: {0}")]
    Repo(String),

    #[error("Merge proposal failed: {0}")]
    Proposal(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results in tag-promote
pub type Result<T> = std::result::Result<T, PromoteError>;

impl PromoteError {
    /// Create a tag parsing error with context
    pub fn parse(msg: impl Into<String>) -> Self {
        PromoteError::Parse(msg.into())
    }

    /// Create a manifest error with context
    pub fn manifest(msg: impl Into<String>) -> Self {
        PromoteError::Manifest(msg.into())
    }

    /// Create a repository error with context
    pub fn repo(msg: impl Into<String>) -> Self {
        PromoteError::Repo(msg.into())
    }

    /// Create a merge proposal error with context
    pub fn proposal(msg: impl Into<String>) -> Self {
        PromoteError::Proposal(msg.into())
    }

    /// Create a configuration error with context
    pub fn config(msg: impl Into<String>) -> Self {
        PromoteError::Config(msg.into())
    }
}

impl From<git2::Error> for PromoteError {
    fn from(e: git2::Error) -> Self {
        PromoteError::Repo(e.message().to_string())
    }
}

/// A publishing run that stopped early.
///
/// Commits pushed before the failing step are not rolled back, so the
/// caller gets the baseline that was actually reached alongside the cause.
#[derive(Error, Debug)]
#[error(
    "publish stopped at baseline '{}': {}",
    .baseline.as_deref().unwrap_or("<none>"),
    .source
)]
pub struct PublishFailure {
    /// Raw tag of the last candidate applied before the failure, or the
    /// incoming baseline when nothing was applied
    pub baseline: Option<String>,
    /// Commits that were pushed before the failure
    pub commits: Vec<CommitRecord>,
    #[source]
    pub source: PromoteError,
}
