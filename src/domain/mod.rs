//! Domain logic - pure rules for versions, branches, commits and repository URLs

pub mod branch;
pub mod commit;
pub mod locator;
pub mod version;

pub use branch::BranchPolicy;
pub use commit::{Author, CommitRecord};
pub use locator::RepositoryLocator;
pub use version::{ImageVersion, TagScheme};
