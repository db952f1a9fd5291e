use super::{MergeProposal, ProposalSettings};
use crate::config::Credentials;
use crate::domain::RepositoryLocator;
use crate::error::{PromoteError, Result};
use serde::Serialize;
use std::time::Duration;
use tracing::info;

/// Host name served by [GitHubProvider]
pub const HOST: &str = "github.com";

pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";

/// Body of `POST /repos/{owner}/{repo}/pulls`
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct NewPullRequest {
    pub title: String,
    pub head: String,
    pub base: String,
    pub body: String,
    pub maintainer_can_modify: bool,
}

/// Pull requests through the GitHub REST API
pub struct GitHubProvider {
    locator: RepositoryLocator,
    base_branch: String,
    credentials: Option<Credentials>,
    api_base_url: String,
    http_client: reqwest::blocking::Client,
}

/// [super::ProviderConstructor] for github.com
pub fn construct(
    locator: &RepositoryLocator,
    settings: &ProposalSettings,
) -> Result<Box<dyn MergeProposal>> {
    GitHubProvider::new(locator.clone(), settings).map(|p| Box::new(p) as Box<dyn MergeProposal>)
}

impl GitHubProvider {
    pub fn new(locator: RepositoryLocator, settings: &ProposalSettings) -> Result<Self> {
        let api_base_url = settings
            .api_base_url
            .clone()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());

        let http_client = reqwest::blocking::Client::builder()
            .connect_timeout(Duration::from_secs(15))
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| PromoteError::proposal(format!("Cannot build HTTP client: {}", e)))?;

        Ok(GitHubProvider {
            locator,
            base_branch: settings.target_branch.clone(),
            credentials: settings.credentials.clone(),
            api_base_url,
            http_client,
        })
    }

    pub fn endpoint(&self) -> String {
        format!(
            "{}/repos/{}/{}/pulls",
            self.api_base_url.trim_end_matches('/'),
            self.locator.owner,
            self.locator.repo_name
        )
    }

    /// Request body proposing `branch` for `tag`
    pub fn pull_request(&self, tag: &str, branch: &str) -> NewPullRequest {
        NewPullRequest {
            title: format!("Release Candidate: {}", tag),
            head: branch.to_string(),
            base: self.base_branch.clone(),
            body: format!("If you want to deploy version {}, please merge this PR", tag),
            maintainer_can_modify: true,
        }
    }
}

impl MergeProposal for GitHubProvider {
    fn provider_name(&self) -> &'static str {
        "github"
    }

    fn create_pr(&self, tag: &str, branch: &str) -> Result<()> {
        let payload = self.pull_request(tag, branch);

        let mut request = self
            .http_client
            .post(self.endpoint())
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", concat!("tag-promote/", env!("CARGO_PKG_VERSION")))
            .json(&payload);
        if let Some(credentials) = &self.credentials {
            request = request.basic_auth(&credentials.username, Some(&credentials.password));
        }

        let response = request
            .send()
            .map_err(|e| PromoteError::proposal(format!("Request to GitHub failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .unwrap_or_else(|_| "unable to read response body".to_string());
            return Err(PromoteError::proposal(format!(
                "GitHub returned {} for {}: {}",
                status.as_u16(),
                branch,
                body
            )));
        }

        info!(repository = %self.locator, head = branch, base = %self.base_branch, "pull request created");
        Ok(())
    }
}
