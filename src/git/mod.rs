//! Git operations abstraction layer
//!
//! The publishing workflow only needs a handful of operations on the
//! manifest repository: read a file, overwrite and stage a file, commit the
//! staged changes onto a branch, and push that branch to the remote. They
//! are captured by the [Repository] trait so the workflow can run against a
//! real clone or an in-memory stand-in.
//!
//! - [repository::Git2Repository]: a temporary clone driven by the `git2` crate
//! - [mock::MockRepository]: in-memory files and recorded commits/pushes for tests
//!
//! ```rust
//! # use tag_promote::git::Repository;
//! # use tag_promote::domain::Author;
//! # fn example<R: Repository>(repo: &mut R) -> tag_promote::Result<()> {
//! let bytes = repo.read_file("overlays/prod/kustomization.yaml")?;
//! repo.write_file("overlays/prod/kustomization.yaml", &bytes)?;
//! let record = repo.commit("release", "bump", &Author::new("bot", "bot@example.com"))?;
//! repo.push("release", &["release".to_string()])?;
//! # let _ = record;
//! # Ok(())
//! # }
//! ```

pub mod mock;
pub mod repository;

pub use mock::MockRepository;
pub use repository::Git2Repository;

use crate::domain::{Author, CommitRecord};
use crate::error::Result;

/// Common git operation trait for abstraction
///
/// Paths are repository-relative and have already been validated by the
/// caller. Implementations map their underlying failures onto
/// [crate::error::PromoteError]: unreadable files become `Manifest` errors,
/// everything else becomes `Repo` errors.
pub trait Repository: Send {
    /// Read a file from the checked-out tree
    ///
    /// # Returns
    /// * `Ok(Vec<u8>)` - File contents
    /// * `Err` - If the file does not exist or cannot be read
    fn read_file(&self, path: &str) -> Result<Vec<u8>>;

    /// Overwrite an existing file in the checked-out tree and stage it
    fn write_file(&mut self, path: &str, contents: &[u8]) -> Result<()>;

    /// Commit everything staged onto the tip of a local branch
    ///
    /// The branch reference is advanced to the new commit.
    ///
    /// # Arguments
    /// * `branch` - Local branch the commit is appended to
    /// * `message` - Commit message
    /// * `author` - Author and committer identity; the time is "now"
    fn commit(&mut self, branch: &str, message: &str, author: &Author) -> Result<CommitRecord>;

    /// Push a local branch to one or more remote branch names
    ///
    /// Targets are pushed in order and the first failure stops the push.
    ///
    /// # Arguments
    /// * `branch` - Local branch to push
    /// * `targets` - Remote branch names that should point at `branch`
    fn push(&mut self, branch: &str, targets: &[String]) -> Result<()>;
}
