//! Merge proposals on the code host of the manifest repository
//!
//! Providers are looked up by the host part of the repository URL in a
//! [ProviderRegistry]. Hosts without a registered provider simply get no
//! merge proposal.

pub mod github;

use crate::config::Credentials;
use crate::domain::RepositoryLocator;
use crate::error::Result;
use std::collections::HashMap;
use tracing::{debug, warn};

pub use github::GitHubProvider;

/// Opens merge proposals on one code host
pub trait MergeProposal: Send {
    /// Short name used in log lines
    fn provider_name(&self) -> &'static str;

    /// Propose merging `branch` for `tag` into the run's base branch
    fn create_pr(&self, tag: &str, branch: &str) -> Result<()>;
}

/// Host-independent settings handed to provider constructors
#[derive(Debug, Clone, Default)]
pub struct ProposalSettings {
    pub credentials: Option<Credentials>,
    /// Branch proposals are merged into
    pub target_branch: String,
    /// Overrides the provider's default API endpoint
    pub api_base_url: Option<String>,
}

/// Builds a provider for a parsed repository locator
pub type ProviderConstructor =
    fn(&RepositoryLocator, &ProposalSettings) -> Result<Box<dyn MergeProposal>>;

/// Maps code host names to provider constructors
pub struct ProviderRegistry {
    providers: HashMap<String, ProviderConstructor>,
}

impl ProviderRegistry {
    /// A registry without any provider
    pub fn empty() -> Self {
        ProviderRegistry {
            providers: HashMap::new(),
        }
    }

    /// A registry with the providers shipped with tag-promote
    pub fn with_builtin_providers() -> Self {
        let mut registry = Self::empty();
        registry.register(github::HOST, github::construct);
        registry
    }

    /// Register or replace the provider for `host`
    pub fn register(&mut self, host: impl Into<String>, constructor: ProviderConstructor) {
        self.providers.insert(host.into(), constructor);
    }

    pub fn hosts(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(String::as_str)
    }

    /// Provider for the repository at `url`.
    ///
    /// Returns `Ok(None)` when the URL cannot be parsed or its host has no
    /// provider. Errors only come from a provider failing to initialise.
    pub fn resolve(
        &self,
        url: &str,
        settings: &ProposalSettings,
    ) -> Result<Option<Box<dyn MergeProposal>>> {
        let locator = match RepositoryLocator::parse(url) {
            Ok(locator) => locator,
            Err(e) => {
                warn!(url, error = %e, "cannot parse repository URL, merge proposals disabled");
                return Ok(None);
            }
        };

        match self.providers.get(&locator.host) {
            Some(constructor) => {
                debug!(repository = %locator, "merge proposal provider found");
                constructor(&locator, settings).map(Some)
            }
            None => {
                let mut known: Vec<&str> = self.hosts().collect();
                known.sort_unstable();
                warn!(host = %locator.host, known = ?known, "no merge proposal provider for host");
                Ok(None)
            }
        }
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::with_builtin_providers()
    }
}
