use crate::domain::{Author, CommitRecord};
use crate::error::{PromoteError, Result};
use crate::git::Repository;
use std::collections::{BTreeSet, HashMap};

/// A push recorded by [MockRepository]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedPush {
    pub branch: String,
    pub target: String,
    /// Hash of the branch tip at push time
    pub hash: String,
}

/// Mock repository for testing without actual git operations
pub struct MockRepository {
    files: HashMap<String, Vec<u8>>,
    staged: BTreeSet<String>,
    branch_heads: HashMap<String, String>,
    commits: Vec<CommitRecord>,
    pushes: Vec<RecordedPush>,
    // Push calls left before pushes start failing
    pushes_allowed: Option<usize>,
}

impl MockRepository {
    /// Create a new empty mock repository
    pub fn new() -> Self {
        MockRepository {
            files: HashMap::new(),
            staged: BTreeSet::new(),
            branch_heads: HashMap::new(),
            commits: Vec::new(),
            pushes: Vec::new(),
            pushes_allowed: None,
        }
    }

    /// Add or replace a file in the tree
    pub fn add_file(&mut self, path: impl Into<String>, contents: impl Into<Vec<u8>>) {
        self.files.insert(path.into(), contents.into());
    }

    /// Make every subsequent push fail
    pub fn fail_pushes(&mut self) {
        self.pushes_allowed = Some(0);
    }

    /// Let `successful` more push calls through, then fail the rest
    pub fn fail_pushes_after(&mut self, successful: usize) {
        self.pushes_allowed = Some(successful);
    }

    /// Current contents of a file
    pub fn file(&self, path: &str) -> Option<&[u8]> {
        self.files.get(path).map(Vec::as_slice)
    }

    /// Current contents of a file as UTF-8
    pub fn file_text(&self, path: &str) -> Option<String> {
        self.file(path)
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    pub fn commits(&self) -> &[CommitRecord] {
        &self.commits
    }

    pub fn pushes(&self) -> &[RecordedPush] {
        &self.pushes
    }

    /// Paths written since the last commit
    pub fn staged(&self) -> Vec<String> {
        self.staged.iter().cloned().collect()
    }
}

impl Default for MockRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl Repository for MockRepository {
    fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| PromoteError::manifest(format!("Cannot read '{}': not found", path)))
    }

    fn write_file(&mut self, path: &str, contents: &[u8]) -> Result<()> {
        if !self.files.contains_key(path) {
            return Err(PromoteError::manifest(format!(
                "Cannot write '{}': not found",
                path
            )));
        }
        self.files.insert(path.to_string(), contents.to_vec());
        self.staged.insert(path.to_string());
        Ok(())
    }

    fn commit(&mut self, branch: &str, message: &str, author: &Author) -> Result<CommitRecord> {
        if self.staged.is_empty() {
            return Err(PromoteError::repo("Nothing staged to commit"));
        }

        let record = CommitRecord {
            hash: format!("{:040x}", self.commits.len() + 1),
            author: author.clone(),
            message: message.to_string(),
            timestamp: 1_700_000_000 + self.commits.len() as i64,
        };

        self.staged.clear();
        self.branch_heads
            .insert(branch.to_string(), record.hash.clone());
        self.commits.push(record.clone());
        Ok(record)
    }

    fn push(&mut self, branch: &str, targets: &[String]) -> Result<()> {
        match self.pushes_allowed {
            Some(0) => return Err(PromoteError::repo("Failed to push: connection refused")),
            Some(remaining) => self.pushes_allowed = Some(remaining - 1),
            None => {}
        }

        let hash = self
            .branch_heads
            .get(branch)
            .cloned()
            .ok_or_else(|| PromoteError::repo(format!("Cannot find branch '{}'", branch)))?;

        for target in targets {
            self.pushes.push(RecordedPush {
                branch: branch.to_string(),
                target: target.clone(),
                hash: hash.clone(),
            });
        }
        Ok(())
    }
}
