/// Identity used to author manifest commits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    pub name: String,
    pub email: String,
}

impl Author {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Author {
            name: name.into(),
            email: email.into(),
        }
    }
}

/// A commit created by a publishing run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRecord {
    /// Full commit hash
    pub hash: String,
    pub author: Author,
    pub message: String,
    /// Commit time in seconds since the Unix epoch
    pub timestamp: i64,
}

impl CommitRecord {
    /// First seven characters of the hash, for log lines
    pub fn short_hash(&self) -> &str {
        if self.hash.len() > 7 {
            &self.hash[..7]
        } else {
            &self.hash
        }
    }
}

/// Commit message recorded for a tag promotion
pub fn promotion_message(tag: &str, image: &str) -> String {
    format!("update imageTags to {} for {} by tag-promote", tag, image)
}
