//! careline-view - derive and print the dashboard view model
//!
//! Runs one derivation pass over the tagged message file and prints either
//! the full view model as JSON or a short terminal summary.

use anyhow::{Context, Result};
use careline_core::{build_view, Config, DashboardView, VisualClass};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "careline-view")]
#[command(about = "Print the member-journey dashboard for a tagged transcript")]
#[command(version)]
struct Args {
    /// Tagged message file (default: enriched_chat_log.json in the data dir)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Text)]
    format: Format,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load().context("failed to load configuration")?;
    let _log_guard =
        careline_core::logging::init(&config.logging).context("failed to initialize logging")?;

    let input = args.input.unwrap_or_else(Config::enriched_log_path);
    tracing::info!(path = %input.display(), "careline-view starting");

    let view = build_view(&input, &config.derivation);

    match args.format {
        Format::Json => {
            let json = serde_json::to_string_pretty(&view).context("failed to serialize view")?;
            println!("{}", json);
        }
        Format::Text => print_summary(&view),
    }

    Ok(())
}

fn print_summary(view: &DashboardView) {
    println!("Timeline events: {}", view.events.len());
    for class in VisualClass::ALL {
        let count = view.events.iter().filter(|e| e.group == class).count();
        if count > 0 {
            println!("  {:<18} {}", class.lane_label(), count);
        }
    }

    println!();
    println!("Latest KPIs:");
    println!("  ApoB:           {}", view.kpis.apob);
    println!("  HRV trend:      {}", view.kpis.hrv_trend);
    println!("  Exercise focus: {}", view.kpis.exercise_focus);
    println!("  Days recorded:  {}", view.timeline_kpis.len());

    println!();
    println!("Workload (hours):");
    if view.analytics.labels.is_empty() {
        println!("  (none)");
    }
    for (role, hours) in view.analytics.labels.iter().zip(&view.analytics.values) {
        println!("  {:<24} {:.2}", role, hours);
    }

    if !view.stories.is_empty() {
        println!();
        println!("Decision traces: {}", view.stories.len());
    }
}
