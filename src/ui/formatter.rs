//! Pure formatting functions for UI output.
//!
//! The `format_*` functions build the text; the `display_*` functions print
//! it. Colour is applied with `console`, which drops styling when the output
//! is not a terminal.

use crate::domain::ImageVersion;
use crate::error::PublishFailure;
use crate::publisher::PublishReport;
use console::style;

/// Format and print an error message in red.
pub fn display_error(message: &str) {
    eprintln!("{} {}", style("ERROR:").red(), message);
}

/// Format and print a success message with green checkmark.
pub fn display_success(message: &str) {
    println!("{} {}", style("✓").green(), message);
}

/// Format and print a status message with yellow arrow.
pub fn display_status(message: &str) {
    println!("{} {}", style("→").yellow(), message);
}

/// One line listing the tags about to be published
pub fn format_candidates(image: &str, candidates: &[ImageVersion]) -> String {
    let tags: Vec<&str> = candidates.iter().map(ImageVersion::tag).collect();
    format!(
        "{} new tag(s) for {}: {}",
        candidates.len(),
        image,
        tags.join(", ")
    )
}

/// Display the candidates selected for this run.
pub fn display_candidates(image: &str, candidates: &[ImageVersion]) {
    display_status(&format_candidates(image, candidates));
}

/// Summary lines for a finished run
pub fn format_publish_report(report: &PublishReport) -> Vec<String> {
    let mut lines: Vec<String> = report
        .commits
        .iter()
        .map(|c| format!("{} {}", style(c.short_hash()).cyan(), c.message))
        .collect();

    for branch in &report.proposals {
        lines.push(format!("merge proposal opened for {}", style(branch).bold()));
    }

    lines.push(match (&report.baseline, report.commits.is_empty()) {
        (_, true) => "manifests already up to date".to_string(),
        (Some(tag), false) => format!("baseline is now {}", style(tag).green()),
        (None, false) => "no baseline".to_string(),
    });
    lines
}

/// Display the commits and proposals of a finished run.
pub fn display_publish_report(report: &PublishReport) {
    for line in format_publish_report(report) {
        display_success(&line);
    }
}

/// Explanation of a run that stopped early
pub fn format_publish_failure(failure: &PublishFailure) -> String {
    let reached = failure.baseline.as_deref().unwrap_or("<none>");
    format!(
        "{} ({} commit(s) pushed, baseline reached: {})",
        failure.source,
        failure.commits.len(),
        reached
    )
}

/// Display a failed run with the baseline it reached.
pub fn display_publish_failure(failure: &PublishFailure) {
    display_error(&format_publish_failure(failure));
}
