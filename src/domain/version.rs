//! Image tag versions and their ordering schemes
//!
//! A run picks one [TagScheme] from configuration and every tag in that run
//! is parsed and ordered under it.

use crate::error::{PromoteError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Tag naming scheme used by an image repository
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagScheme {
    /// `dev-<build number>-<suffix>`, ordered by build number
    Serial,
    /// `v<semver>`, ordered by semantic-versioning precedence
    Semantic,
}

impl TagScheme {
    /// Configuration name of the scheme
    pub fn as_str(self) -> &'static str {
        match self {
            TagScheme::Serial => "serial",
            TagScheme::Semantic => "semantic",
        }
    }
}

impl fmt::Display for TagScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TagScheme {
    type Err = PromoteError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "serial" => Ok(TagScheme::Serial),
            "semantic" => Ok(TagScheme::Semantic),
            other => Err(PromoteError::config(format!(
                "Unknown tag format '{}' - expected 'serial' or 'semantic'",
                other
            ))),
        }
    }
}

/// Parsed ordering key of a tag
#[derive(Debug, Clone, PartialEq, Eq)]
enum VersionKey {
    Serial(u64),
    Semantic(semver::Version),
}

impl VersionKey {
    fn parse(tag: &str, scheme: TagScheme) -> Result<Self> {
        match scheme {
            TagScheme::Serial => parse_serial(tag).map(VersionKey::Serial),
            TagScheme::Semantic => parse_semantic(tag).map(VersionKey::Semantic),
        }
    }

    fn cmp_precedence(&self, other: &VersionKey) -> Ordering {
        match (self, other) {
            (VersionKey::Serial(a), VersionKey::Serial(b)) => a.cmp(b),
            // Build metadata does not take part in precedence
            (VersionKey::Semantic(a), VersionKey::Semantic(b)) => (a.major, a.minor, a.patch, &a.pre)
                .cmp(&(b.major, b.minor, b.patch, &b.pre)),
            // Keys are always parsed under the receiver's scheme
            _ => Ordering::Equal,
        }
    }
}

fn parse_serial(tag: &str) -> Result<u64> {
    let parts: Vec<&str> = tag.split('-').collect();
    if parts.len() != 3 || parts[0] != "dev" {
        return Err(PromoteError::parse(format!(
            "Invalid tag format for serial: '{}' - expected dev-<number>-<suffix>",
            tag
        )));
    }

    parts[1].parse::<u64>().map_err(|_| {
        PromoteError::parse(format!(
            "Invalid build number '{}' in serial tag '{}'",
            parts[1], tag
        ))
    })
}

fn parse_semantic(tag: &str) -> Result<semver::Version> {
    let version = tag.strip_prefix('v').ok_or_else(|| {
        PromoteError::parse(format!(
            "Invalid tag format for semantic: '{}' - expected leading 'v'",
            tag
        ))
    })?;

    semver::Version::parse(version)
        .map_err(|e| PromoteError::parse(format!("Invalid semantic tag '{}': {}", tag, e)))
}

/// An image tag parsed under a [TagScheme]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageVersion {
    tag: String,
    scheme: TagScheme,
    key: VersionKey,
}

impl ImageVersion {
    /// Parse a raw tag under the given scheme
    pub fn parse(tag: impl Into<String>, scheme: TagScheme) -> Result<Self> {
        let tag = tag.into();
        let key = VersionKey::parse(&tag, scheme)?;
        Ok(ImageVersion { tag, scheme, key })
    }

    /// The raw tag string as published to the registry
    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn scheme(&self) -> TagScheme {
        self.scheme
    }

    /// Compare this version against another raw tag.
    ///
    /// `Greater` means this version is newer than `other`. The other tag is
    /// parsed under this version's scheme, so a tag from a different scheme
    /// is a parse error rather than an ordering.
    pub fn compare(&self, other: &str) -> Result<Ordering> {
        let other_key = VersionKey::parse(other, self.scheme)?;
        Ok(self.key.cmp_precedence(&other_key))
    }

    /// Compare two already-parsed versions of the same scheme
    pub fn cmp_precedence(&self, other: &ImageVersion) -> Ordering {
        self.key.cmp_precedence(&other.key)
    }

    /// True when this version is strictly newer than `other`
    pub fn is_newer_than(&self, other: &str) -> Result<bool> {
        Ok(self.compare(other)? == Ordering::Greater)
    }
}

impl fmt::Display for ImageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tag)
    }
}
