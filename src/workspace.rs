//! Working copy of the manifest repository for one publishing run
//!
//! A [Workspace] owns a [Repository] checked out on the promotion branch,
//! the manifests decoded so far, and the set of paths staged since the last
//! commit. Each manifest path is decoded at most once per run; later patches
//! operate on the same in-memory document and rewrite the staged file.

use crate::config::{Credentials, RepositoryConfig};
use crate::domain::{Author, BranchPolicy, CommitRecord};
use crate::error::{PromoteError, Result};
use crate::git::{Git2Repository, Repository};
use crate::manifest::{self, ManifestDocument};
use std::collections::{BTreeSet, HashMap};
use std::path::{Component, Path};
use tracing::{debug, info};

pub struct Workspace<R: Repository> {
    repo: R,
    policy: BranchPolicy,
    // `None` marks a path without an image tag list
    documents: HashMap<String, Option<ManifestDocument>>,
    staged: BTreeSet<String>,
}

impl Workspace<Git2Repository> {
    /// Clone the configured repository and check out its promotion branch
    pub fn open(config: &RepositoryConfig, credentials: Option<Credentials>) -> Result<Self> {
        let policy = config.branch_policy();
        let repo = Git2Repository::clone_remote(&config.url, &policy, credentials)?;
        Ok(Workspace::new(repo, policy))
    }
}

impl<R: Repository> Workspace<R> {
    /// Wrap a repository that is already checked out on `policy.promotion`
    pub fn new(repo: R, policy: BranchPolicy) -> Self {
        Workspace {
            repo,
            policy,
            documents: HashMap::new(),
            staged: BTreeSet::new(),
        }
    }

    pub fn policy(&self) -> &BranchPolicy {
        &self.policy
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Paths changed since the last commit
    pub fn staged_paths(&self) -> impl Iterator<Item = &str> {
        self.staged.iter().map(String::as_str)
    }

    /// Raw contents of a repository-relative file
    pub fn read(&self, path: &str) -> Result<Vec<u8>> {
        let path = normalize_path(path)?;
        self.repo.read_file(&path)
    }

    /// Apply `mutator` to the manifest at `path`.
    ///
    /// Documents without an image tag list are skipped and the mutator is
    /// not called. When the mutator reports a change the whole document is
    /// re-encoded and staged. Returns whether the document changed.
    pub fn patch<F>(&mut self, path: &str, mutator: F) -> Result<bool>
    where
        F: FnOnce(&mut ManifestDocument) -> bool,
    {
        let path = normalize_path(path)?;

        if !self.documents.contains_key(&path) {
            let bytes = self.repo.read_file(&path)?;
            let document = manifest::decode(&path, &bytes)?;
            if document.is_none() {
                info!(path = %path, "no {} list, ignored", manifest::IMAGE_TAGS_KEY);
            }
            self.documents.insert(path.clone(), document);
        }

        let Some(document) = self.documents.get_mut(&path).and_then(Option::as_mut) else {
            return Ok(false);
        };

        if !mutator(document) {
            return Ok(false);
        }

        let encoded = manifest::encode(&path, document)?;
        self.repo.write_file(&path, &encoded)?;
        self.staged.insert(path.clone());

        debug!(path = %path, "manifest updated");
        Ok(true)
    }

    /// Commit the staged manifests and push them.
    ///
    /// The commit always goes to the promotion branch. When the promotion
    /// branch differs from the base branch the same commit is also pushed to
    /// `{promotion}-{tag}`, and that branch name is returned for the merge
    /// proposal.
    pub fn commit_and_push(
        &mut self,
        tag: &str,
        message: &str,
        author: &Author,
    ) -> Result<(CommitRecord, Option<String>)> {
        if self.staged.is_empty() {
            return Err(PromoteError::repo("Nothing staged to commit"));
        }

        let record = self.repo.commit(&self.policy.promotion, message, author)?;
        self.staged.clear();
        info!(tag, hash = %record.hash, branch = %self.policy.promotion, "new commit created");

        let derived = self.policy.derived_branch(tag);
        let mut targets = vec![self.policy.promotion.clone()];
        targets.extend(derived.iter().cloned());

        self.repo.push(&self.policy.promotion, &targets)?;

        Ok((record, derived))
    }
}

/// Reject paths that would escape the checked-out tree
fn validate_path(path: &str) -> Result<()> {
    let candidate = Path::new(path);
    if path.is_empty() || candidate.is_absolute() {
        return Err(PromoteError::manifest(format!(
            "Manifest path '{}' must be relative to the repository root",
            path
        )));
    }

    if candidate
        .components()
        .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_) | Component::RootDir))
    {
        return Err(PromoteError::manifest(format!(
            "Manifest path '{}' must stay inside the repository",
            path
        )));
    }

    Ok(())
}

/// Validated path with `.` segments and repeated separators removed, so
/// spellings of the same file share one key
fn normalize_path(path: &str) -> Result<String> {
    validate_path(path)?;

    let parts: Vec<&str> = Path::new(path)
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .collect();

    if parts.is_empty() {
        return Err(PromoteError::manifest(format!(
            "Manifest path '{}' does not name a file",
            path
        )));
    }
    Ok(parts.join("/"))
}
