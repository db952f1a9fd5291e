//! User interface module - terminal output for the command-line host.
//!
//! Runs are unattended, so there are no prompts; everything here is in
//! `formatter`.

pub mod formatter;

// Re-export formatter functions for convenience
pub use formatter::{
    display_candidates, display_error, display_publish_failure, display_publish_report,
    display_status, display_success,
};
