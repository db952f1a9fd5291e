use crate::error::{PromoteError, Result};
use regex::Regex;
use std::fmt;

/// Host, owner and name of a hosted git repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryLocator {
    pub host: String,
    pub owner: String,
    pub repo_name: String,
}

impl RepositoryLocator {
    /// Parse a repository URL.
    ///
    /// Accepts `https://<host>/<owner>/<repo>.git` and the scp-like
    /// `git@<host>:<owner>/<repo>.git`. The `.git` suffix is required and is
    /// stripped from the repository name.
    pub fn parse(url: &str) -> Result<Self> {
        let captures = Regex::new(r"^https://([^/]+)/([^/]+)/([^/]+)$")
            .ok()
            .and_then(|re| re.captures(url))
            .or_else(|| {
                Regex::new(r"^git@([^:@/]+):([^/:]+)/([^/:]+)$")
                    .ok()
                    .and_then(|re| re.captures(url))
            })
            .ok_or_else(|| invalid(url, "expected https://host/owner/repo.git or git@host:owner/repo.git"))?;

        let host = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
        let owner = captures.get(2).map(|m| m.as_str()).unwrap_or_default();
        let repo = captures.get(3).map(|m| m.as_str()).unwrap_or_default();

        let repo_name = repo
            .strip_suffix(".git")
            .ok_or_else(|| invalid(url, "repository name must end with .git"))?;

        if host.is_empty() || owner.is_empty() || repo_name.is_empty() {
            return Err(invalid(url, "host, owner and repository name are required"));
        }

        Ok(RepositoryLocator {
            host: host.to_string(),
            owner: owner.to_string(),
            repo_name: repo_name.to_string(),
        })
    }
}

fn invalid(url: &str, reason: &str) -> PromoteError {
    PromoteError::config(format!("Invalid repository URL '{}': {}", url, reason))
}

impl fmt::Display for RepositoryLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.host, self.owner, self.repo_name)
    }
}
