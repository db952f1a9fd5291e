use anyhow::Result;
use clap::Parser;
use std::path::Path;
use tracing::Level;

use tag_promote::candidates::select_candidates;
use tag_promote::config::{self, Credentials};
use tag_promote::proposal::ProviderRegistry;
use tag_promote::publisher::TagPublisher;
use tag_promote::state::PromotionState;
use tag_promote::telemetry;
use tag_promote::ui;
use tag_promote::workspace::Workspace;

#[derive(clap::Parser)]
#[command(
    name = "tag-promote",
    version,
    about = "Promote new container image tags into a GitOps manifest repository"
)]
struct Args {
    #[arg(short, long, help = "Custom configuration file path")]
    config: Option<String>,

    #[arg(short, long, help = "Last promoted tag; overrides the state file")]
    baseline: Option<String>,

    #[arg(short, long, help = "File the promoted baseline is read from and saved to")]
    state: Option<String>,

    #[arg(long, help = "Emit log lines as JSON")]
    json_logs: bool,

    #[arg(long, default_value = "info", help = "Log level when RUST_LOG is not set")]
    log_level: Level,

    #[arg(help = "Image tags published to the registry, in any order")]
    tags: Vec<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    telemetry::init_tracing(args.json_logs, args.log_level);

    // Load configuration
    let config = match config::load_config(args.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            ui::display_error(&format!("Error loading config: {}", e));
            std::process::exit(1);
        }
    };

    let state_path = args.state.as_deref().map(Path::new);
    let stored = match state_path {
        Some(path) => PromotionState::load(path)?.current_tag,
        None => None,
    };
    let baseline = args.baseline.or(stored);

    let candidates = select_candidates(&args.tags, baseline.as_deref(), config.image.tag_format);
    if candidates.is_empty() {
        ui::display_success(&format!(
            "No tags newer than {} for {}",
            baseline.as_deref().unwrap_or("<none>"),
            config.image.name
        ));
        return Ok(());
    }
    ui::display_candidates(&config.image.name, &candidates);

    let credentials = Credentials::from_env();
    let publisher =
        TagPublisher::from_config(&config, credentials.clone(), &ProviderRegistry::default())?;

    ui::display_status(&format!("Cloning {}", config.repository.url));
    let mut workspace = match Workspace::open(&config.repository, credentials) {
        Ok(workspace) => workspace,
        Err(e) => {
            ui::display_error(&e.to_string());
            std::process::exit(1);
        }
    };

    ui::display_status(&format!(
        "Publishing {} on branch {}",
        publisher.image(),
        workspace.policy().promotion
    ));
    let outcome = publisher.publish(&mut workspace, baseline.as_deref(), &candidates);
    // Removes the temporary clone before any early exit
    drop(workspace);

    match outcome {
        Ok(report) => {
            ui::display_publish_report(&report);
            save_baseline(state_path, baseline.as_deref(), report.baseline.as_deref())?;
            Ok(())
        }
        Err(failure) => {
            ui::display_publish_failure(&failure);
            save_baseline(state_path, baseline.as_deref(), failure.baseline.as_deref())?;
            std::process::exit(1);
        }
    }
}

/// Persist `reached` when a state file is in use and the baseline moved
fn save_baseline(path: Option<&Path>, previous: Option<&str>, reached: Option<&str>) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    if reached == previous {
        return Ok(());
    }

    PromotionState::new(reached.map(str::to_string)).save(path)?;
    ui::display_status(&format!("Saved baseline to {}", path.display()));
    Ok(())
}
