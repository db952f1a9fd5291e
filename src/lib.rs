pub mod candidates;
pub mod config;
pub mod domain;
pub mod error;
pub mod git;
pub mod manifest;
pub mod proposal;
pub mod publisher;
pub mod state;
pub mod telemetry;
pub mod ui;
pub mod workspace;

pub use error::{PromoteError, PublishFailure, Result};
