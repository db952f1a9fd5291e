use crate::domain::branch::DEFAULT_BASE_BRANCH;
use crate::domain::{Author, BranchPolicy, TagScheme};
use crate::error::{PromoteError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// File name looked up in the current directory and the user config directory
pub const CONFIG_FILE_NAME: &str = "tagpromote.toml";

/// Environment variable holding the git/API username
pub const USERNAME_ENV: &str = "TAG_PROMOTE_GIT_USERNAME";

/// Environment variable holding the git/API password or token
pub const PASSWORD_ENV: &str = "TAG_PROMOTE_GIT_PASSWORD";

/// Represents the complete configuration for tag-promote.
///
/// Describes which image to watch, which repository and manifests to
/// update, who authors the commits, and where merge proposals are opened.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    pub image: ImageConfig,

    pub repository: RepositoryConfig,

    #[serde(default)]
    pub commit: CommitConfig,

    #[serde(default)]
    pub proposal: ProposalConfig,
}

/// The container image whose tags are promoted.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ImageConfig {
    /// Image identifier as it appears in manifest `name` fields
    pub name: String,

    /// Tag naming scheme, `serial` or `semantic`
    pub tag_format: TagScheme,
}

/// The manifest repository and the files to update inside it.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RepositoryConfig {
    pub url: String,

    #[serde(default = "default_base_branch")]
    pub base_branch: String,

    /// Branch commits go to; the base branch when unset
    #[serde(default)]
    pub promotion_branch: Option<String>,

    /// Repository-relative manifest paths, processed in order
    #[serde(default)]
    pub paths: Vec<String>,
}

impl RepositoryConfig {
    pub fn branch_policy(&self) -> BranchPolicy {
        BranchPolicy::new(self.base_branch.clone(), self.promotion_branch.as_deref())
    }
}

/// Returns the default base branch name.
fn default_base_branch() -> String {
    DEFAULT_BASE_BRANCH.to_string()
}

/// Returns the default commit author name.
fn default_commit_name() -> String {
    "tag-promote".to_string()
}

/// Returns the default commit author email.
fn default_commit_email() -> String {
    "tag-promote@localhost".to_string()
}

/// Identity used for manifest commits.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CommitConfig {
    #[serde(default = "default_commit_name")]
    pub name: String,

    #[serde(default = "default_commit_email")]
    pub email: String,
}

impl Default for CommitConfig {
    fn default() -> Self {
        CommitConfig {
            name: default_commit_name(),
            email: default_commit_email(),
        }
    }
}

/// Merge proposal settings.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct ProposalConfig {
    /// Override for the code host's API endpoint
    #[serde(default)]
    pub api_base_url: Option<String>,
}

impl Config {
    /// Parse and validate a TOML configuration document
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| PromoteError::config(format!("Invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the fields a publishing run cannot do without
    pub fn validate(&self) -> Result<()> {
        if self.image.name.trim().is_empty() {
            return Err(PromoteError::config("image.name must not be empty"));
        }
        if self.repository.url.trim().is_empty() {
            return Err(PromoteError::config("repository.url must not be empty"));
        }
        if self.repository.paths.is_empty() {
            return Err(PromoteError::config(
                "repository.paths must list at least one manifest",
            ));
        }
        if self.commit.name.trim().is_empty() || self.commit.email.trim().is_empty() {
            return Err(PromoteError::config(
                "commit.name and commit.email must not be empty",
            ));
        }
        Ok(())
    }

    pub fn author(&self) -> Author {
        Author::new(self.commit.name.clone(), self.commit.email.clone())
    }
}

/// Username/password pair for git transport and the code host API
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Credentials {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Read credentials from [USERNAME_ENV] and [PASSWORD_ENV].
    ///
    /// Both must be set and non-empty.
    pub fn from_env() -> Option<Self> {
        let username = std::env::var(USERNAME_ENV).ok()?;
        let password = std::env::var(PASSWORD_ENV).ok()?;
        if username.is_empty() || password.is_empty() {
            return None;
        }
        Some(Credentials { username, password })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Where the configuration is looked up, in order
fn candidate_paths(config_path: Option<&str>) -> Vec<PathBuf> {
    if let Some(path) = config_path {
        return vec![PathBuf::from(path)];
    }

    let mut paths = vec![Path::new(".").join(CONFIG_FILE_NAME)];
    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join(CONFIG_FILE_NAME));
    }
    paths
}

/// Loads configuration from file.
///
/// Attempts to load configuration in the following order:
/// 1. Custom path provided as parameter
/// 2. `tagpromote.toml` in current directory
/// 3. `tagpromote.toml` in user config directory
///
/// There are no usable defaults for the image or the repository, so finding
/// no file at all is an error.
///
/// # Arguments
/// * `config_path` - Optional path to custom configuration file
///
/// # Returns
/// * `Ok(Config)` - Loaded and validated configuration
/// * `Err` - If no file is found, or it cannot be read, parsed or validated
pub fn load_config(config_path: Option<&str>) -> Result<Config> {
    let explicit = config_path.is_some();

    for path in candidate_paths(config_path) {
        if !explicit && !path.exists() {
            continue;
        }

        let content = fs::read_to_string(&path).map_err(|e| {
            PromoteError::config(format!("Cannot read '{}': {}", path.display(), e))
        })?;
        return Config::from_toml(&content);
    }

    Err(PromoteError::config(format!(
        "No {} found in the current directory or the user config directory",
        CONFIG_FILE_NAME
    )))
}
