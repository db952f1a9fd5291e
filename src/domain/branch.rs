/// Branch layout of a publishing run
///
/// `base` is where deployments are merged; `promotion` is the branch
/// manifests are committed to. The two may be the same branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchPolicy {
    pub base: String,
    pub promotion: String,
}

/// Branch used when the configuration leaves the base branch empty
pub const DEFAULT_BASE_BRANCH: &str = "master";

impl BranchPolicy {
    /// Build a policy from configured branch names.
    ///
    /// An empty base falls back to [DEFAULT_BASE_BRANCH]; a missing or empty
    /// promotion branch means commits go straight to the base branch.
    pub fn new(base: impl Into<String>, promotion: Option<&str>) -> Self {
        let base = base.into();
        let base = if base.trim().is_empty() {
            DEFAULT_BASE_BRANCH.to_string()
        } else {
            base
        };

        let promotion = match promotion.map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => base.clone(),
        };

        BranchPolicy { base, promotion }
    }

    /// True when commits land on a branch other than the base branch
    pub fn is_distinct(&self) -> bool {
        self.base != self.promotion
    }

    /// Name of the per-tag branch a merge proposal is opened from.
    ///
    /// Only exists when the promotion branch differs from the base branch.
    pub fn derived_branch(&self, tag: &str) -> Option<String> {
        if self.is_distinct() {
            Some(format!("{}-{}", self.promotion, tag))
        } else {
            None
        }
    }
}
