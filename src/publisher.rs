//! Applies candidate tags to the manifest repository, oldest first
//!
//! Each candidate that changes at least one manifest becomes one commit on
//! the promotion branch. When the promotion branch is not the base branch
//! the commit is also pushed to a per-tag branch and a merge proposal is
//! opened for it.

use crate::config::{Config, Credentials};
use crate::domain::commit::promotion_message;
use crate::domain::{Author, CommitRecord, ImageVersion};
use crate::error::{PromoteError, PublishFailure, Result};
use crate::git::Repository;
use crate::proposal::{MergeProposal, ProposalSettings, ProviderRegistry};
use crate::workspace::Workspace;
use tracing::{debug, info};

/// Outcome of a publishing run that finished every candidate
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PublishReport {
    /// Tag of the last candidate that produced a commit, or the incoming
    /// baseline when none did
    pub baseline: Option<String>,
    pub commits: Vec<CommitRecord>,
    /// Branches a merge proposal was opened for
    pub proposals: Vec<String>,
}

impl PublishReport {
    /// True when the run moved the baseline
    pub fn advanced_from(&self, previous: Option<&str>) -> bool {
        self.baseline.as_deref() != previous
    }
}

pub struct TagPublisher {
    image: String,
    paths: Vec<String>,
    author: Author,
    proposal: Option<Box<dyn MergeProposal>>,
}

impl TagPublisher {
    pub fn new(image: impl Into<String>, paths: Vec<String>, author: Author) -> Self {
        TagPublisher {
            image: image.into(),
            paths,
            author,
            proposal: None,
        }
    }

    /// Use `proposal` for derived branches
    pub fn with_proposal(mut self, proposal: Option<Box<dyn MergeProposal>>) -> Self {
        self.proposal = proposal;
        self
    }

    /// Build a publisher for a configured run.
    ///
    /// A merge proposal provider is only looked up when the configuration
    /// uses a separate promotion branch.
    pub fn from_config(
        config: &Config,
        credentials: Option<Credentials>,
        registry: &ProviderRegistry,
    ) -> Result<Self> {
        let policy = config.repository.branch_policy();

        let proposal = if policy.is_distinct() {
            let settings = ProposalSettings {
                credentials,
                target_branch: policy.base.clone(),
                api_base_url: config.proposal.api_base_url.clone(),
            };
            registry.resolve(&config.repository.url, &settings)?
        } else {
            None
        };

        Ok(TagPublisher::new(
            config.image.name.clone(),
            config.repository.paths.clone(),
            config.author(),
        )
        .with_proposal(proposal))
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    /// Apply `candidates` in the given order.
    ///
    /// Candidates must already be ascending and newer than `baseline`. The
    /// first manifest, repository or proposal error stops the run; commits
    /// pushed before it stay pushed and are reported in the failure together
    /// with the baseline reached so far.
    pub fn publish<R: Repository>(
        &self,
        workspace: &mut Workspace<R>,
        baseline: Option<&str>,
        candidates: &[ImageVersion],
    ) -> std::result::Result<PublishReport, PublishFailure> {
        let mut report = PublishReport {
            baseline: baseline.map(str::to_string),
            ..Default::default()
        };

        for candidate in candidates {
            let tag = candidate.tag();

            let committed = match self.apply(workspace, candidate) {
                Ok(committed) => committed,
                Err(source) => return Err(failure(report, source)),
            };

            let Some((record, derived)) = committed else {
                debug!(tag, "no manifest needed this tag");
                continue;
            };

            report.baseline = Some(tag.to_string());
            report.commits.push(record);

            let Some(branch) = derived else {
                continue;
            };

            match &self.proposal {
                Some(proposal) => {
                    if let Err(source) = proposal.create_pr(tag, &branch) {
                        return Err(failure(report, source));
                    }
                    info!(tag, branch = %branch, provider = proposal.provider_name(), "merge proposal opened");
                    report.proposals.push(branch);
                }
                None => info!(tag, branch = %branch, "no merge proposal provider, branch pushed only"),
            }
        }

        Ok(report)
    }

    /// Patch every path for one candidate and commit when anything changed
    fn apply<R: Repository>(
        &self,
        workspace: &mut Workspace<R>,
        candidate: &ImageVersion,
    ) -> Result<Option<(CommitRecord, Option<String>)>> {
        let mut changed = false;
        for path in &self.paths {
            changed |= workspace.patch(path, |doc| doc.promote(&self.image, candidate))?;
        }

        if !changed {
            return Ok(None);
        }

        let message = promotion_message(candidate.tag(), &self.image);
        workspace
            .commit_and_push(candidate.tag(), &message, &self.author)
            .map(Some)
    }
}

fn failure(report: PublishReport, source: PromoteError) -> PublishFailure {
    PublishFailure {
        baseline: report.baseline,
        commits: report.commits,
        source,
    }
}
