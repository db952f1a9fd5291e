//! Baseline persisted between runs
//!
//! The state file is a small TOML document:
//!
//! ```toml
//! current_tag = "v1.4.2"
//! ```

use crate::error::{PromoteError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromotionState {
    /// Tag of the last promoted image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_tag: Option<String>,
}

impl PromotionState {
    pub fn new(current_tag: Option<String>) -> Self {
        PromotionState { current_tag }
    }

    /// Read the state at `path`. A missing file is an empty state.
    pub fn load(path: &Path) -> Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "no state file yet");
                return Ok(PromotionState::default());
            }
            Err(e) => return Err(e.into()),
        };

        toml::from_str(&content).map_err(|e| {
            PromoteError::config(format!("Invalid state file '{}': {}", path.display(), e))
        })
    }

    /// Write the state to `path`, creating parent directories as needed
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string(self).map_err(|e| {
            PromoteError::config(format!("Cannot encode state for '{}': {}", path.display(), e))
        })?;
        fs::write(path, content)?;

        debug!(path = %path.display(), current_tag = ?self.current_tag, "state saved");
        Ok(())
    }
}
