use crate::config::Credentials;
use crate::domain::{Author, BranchPolicy, CommitRecord};
use crate::error::{PromoteError, Result};
use git2::build::{CheckoutBuilder, RepoBuilder};
use git2::{BranchType, Cred, CredentialType, ErrorCode, FetchOptions, Oid, PushOptions, RemoteCallbacks, Signature};
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use tracing::{debug, info};

const REMOTE_NAME: &str = "origin";

/// Temporary clone of a remote repository driven by git2
///
/// The clone lives in a temporary directory that is removed when the value
/// is dropped; nothing is reused between runs.
pub struct Git2Repository {
    repo: git2::Repository,
    credentials: Option<Credentials>,
    // Dropped after `repo`
    _checkout: TempDir,
}

impl Git2Repository {
    /// Clone `url` and check out the promotion branch of `policy`.
    ///
    /// If the promotion branch does not exist upstream yet, the base branch
    /// is checked out under the promotion branch's name so that the first
    /// push creates it. Any other failure aborts the clone.
    pub fn clone_remote(
        url: &str,
        policy: &BranchPolicy,
        credentials: Option<Credentials>,
    ) -> Result<Self> {
        let checkout = tempfile::Builder::new()
            .prefix("tag-promote-")
            .tempdir()?;

        info!(url, path = %checkout.path().display(), "cloning manifest repository");

        let mut fetch_options = FetchOptions::new();
        fetch_options.remote_callbacks(remote_callbacks(credentials.clone()));

        let repo = RepoBuilder::new()
            .fetch_options(fetch_options)
            .clone(url, checkout.path())
            .map_err(|e| PromoteError::repo(format!("Failed to clone '{}': {}", url, e)))?;

        let start = resolve_start_point(&repo, policy)?;
        check_out_branch(&repo, &policy.promotion, start)?;

        Ok(Git2Repository {
            repo,
            credentials,
            _checkout: checkout,
        })
    }

    /// Root of the checked-out tree
    pub fn workdir(&self) -> Result<&Path> {
        self.repo
            .workdir()
            .ok_or_else(|| PromoteError::repo("Repository has no working directory"))
    }
}

/// Tip of `origin/<branch>`, or `None` when the branch does not exist upstream
fn remote_branch_tip(repo: &git2::Repository, branch: &str) -> Result<Option<Oid>> {
    let name = format!("{}/{}", REMOTE_NAME, branch);
    match repo.find_branch(&name, BranchType::Remote) {
        Ok(found) => Ok(Some(found.get().peel_to_commit()?.id())),
        Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
        Err(e) => Err(PromoteError::repo(format!(
            "Cannot resolve remote branch '{}': {}",
            name, e
        ))),
    }
}

fn resolve_start_point(repo: &git2::Repository, policy: &BranchPolicy) -> Result<Oid> {
    if policy.is_distinct() {
        if let Some(oid) = remote_branch_tip(repo, &policy.promotion)? {
            return Ok(oid);
        }
        info!(
            promotion_branch = %policy.promotion,
            base_branch = %policy.base,
            "promotion branch not found upstream, starting from base branch"
        );
    }

    remote_branch_tip(repo, &policy.base)?.ok_or_else(|| {
        PromoteError::repo(format!(
            "Branch '{}' not found on remote '{}'",
            policy.base, REMOTE_NAME
        ))
    })
}

fn check_out_branch(repo: &git2::Repository, branch: &str, start: Oid) -> Result<()> {
    let commit = repo.find_commit(start)?;

    // A branch that is the current HEAD cannot be force-moved
    repo.set_head_detached(start)?;
    repo.branch(branch, &commit, true)?;
    repo.set_head(&format!("refs/heads/{}", branch))?;
    repo.checkout_head(Some(CheckoutBuilder::new().force()))?;

    debug!(branch, commit = %start, "checked out promotion branch");
    Ok(())
}

/// Credential and push-status callbacks shared by fetch and push
fn remote_callbacks<'a>(credentials: Option<Credentials>) -> RemoteCallbacks<'a> {
    let mut callbacks = RemoteCallbacks::new();
    let mut attempts = 0;

    callbacks.credentials(move |_url, username_from_url, allowed_types| {
        // libgit2 calls back again after a rejected credential
        attempts += 1;
        if attempts > 3 {
            return Err(git2::Error::from_str("authentication failed"));
        }

        if let Some(credentials) = &credentials {
            if allowed_types.contains(CredentialType::USER_PASS_PLAINTEXT) {
                return Cred::userpass_plaintext(&credentials.username, &credentials.password);
            }
        }

        if allowed_types.contains(CredentialType::SSH_KEY) {
            let username = username_from_url.unwrap_or("git");

            if let Ok(cred) = Cred::ssh_key_from_agent(username) {
                return Ok(cred);
            }

            if let Some(home) = dirs::home_dir() {
                for key in ["id_ed25519", "id_rsa", "id_ecdsa"] {
                    let path = home.join(".ssh").join(key);
                    if path.exists() {
                        if let Ok(cred) = Cred::ssh_key(username, None, &path, None) {
                            return Ok(cred);
                        }
                    }
                }
            }
        }

        Cred::default()
    });

    callbacks.push_update_reference(|refname, status| match status {
        Some(status) => Err(git2::Error::from_str(&format!(
            "remote rejected {}: {}",
            refname, status
        ))),
        None => Ok(()),
    });

    callbacks
}

impl super::Repository for Git2Repository {
    fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let full_path = self.workdir()?.join(path);
        fs::read(&full_path)
            .map_err(|e| PromoteError::manifest(format!("Cannot read '{}': {}", path, e)))
    }

    fn write_file(&mut self, path: &str, contents: &[u8]) -> Result<()> {
        let full_path = self.workdir()?.join(path);
        fs::write(&full_path, contents)
            .map_err(|e| PromoteError::manifest(format!("Cannot write '{}': {}", path, e)))?;

        let mut index = self.repo.index()?;
        index.add_path(Path::new(path))?;
        index.write()?;

        Ok(())
    }

    fn commit(&mut self, branch: &str, message: &str, author: &Author) -> Result<CommitRecord> {
        let signature = Signature::now(&author.name, &author.email)?;

        let mut index = self.repo.index()?;
        let tree_id = index.write_tree()?;
        let tree = self.repo.find_tree(tree_id)?;

        let reference = format!("refs/heads/{}", branch);
        let parent = self
            .repo
            .find_reference(&reference)
            .and_then(|r| r.peel_to_commit())
            .map_err(|e| PromoteError::repo(format!("Cannot find branch '{}': {}", branch, e)))?;

        let oid = self.repo.commit(
            Some(&reference),
            &signature,
            &signature,
            message,
            &tree,
            &[&parent],
        )?;

        Ok(CommitRecord {
            hash: oid.to_string(),
            author: author.clone(),
            message: message.to_string(),
            timestamp: signature.when().seconds(),
        })
    }

    fn push(&mut self, branch: &str, targets: &[String]) -> Result<()> {
        let mut remote = self
            .repo
            .find_remote(REMOTE_NAME)
            .map_err(|e| PromoteError::repo(format!("Cannot find remote: {}", e)))?;

        for target in targets {
            let refspec = format!("refs/heads/{}:refs/heads/{}", branch, target);

            let mut push_options = PushOptions::new();
            push_options.remote_callbacks(remote_callbacks(self.credentials.clone()));

            remote
                .push(&[refspec.as_str()], Some(&mut push_options))
                .map_err(|e| {
                    if e.class() == git2::ErrorClass::Net {
                        PromoteError::repo(format!("Network error pushing '{}': {}", target, e))
                    } else {
                        PromoteError::repo(format!("Failed to push '{}': {}", target, e))
                    }
                })?;

            info!(branch, target = %target, "pushed branch");
        }

        Ok(())
    }
}
