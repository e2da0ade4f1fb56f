//! careline-parse - split a raw chat export into a JSON message list
//!
//! Uses XDG Base Directory specification for file locations:
//! - Output: $XDG_DATA_HOME/careline/parsed_chat_log.json (~/.local/share/careline/parsed_chat_log.json)
//! - Logs: $XDG_STATE_HOME/careline/careline.YYYY-MM-DD.log (~/.local/state/careline/), one per day
//! - Config: $XDG_CONFIG_HOME/careline/config.toml (~/.config/careline/config.toml)

use anyhow::{Context, Result};
use careline_core::ingest;
use careline_core::Config;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "careline-parse")]
#[command(about = "Parse a raw chat transcript into a JSON message list")]
#[command(version)]
struct Args {
    /// Raw transcript file
    #[arg(short, long)]
    input: PathBuf,

    /// Output JSON file (default: parsed_chat_log.json in the data dir)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load().context("failed to load configuration")?;
    let _log_guard =
        careline_core::logging::init(&config.logging).context("failed to initialize logging")?;

    tracing::info!("careline-parse starting");

    let output = args.output.unwrap_or_else(Config::parsed_log_path);
    let count = ingest::parse_file(&args.input, &output)
        .with_context(|| format!("failed to parse {}", args.input.display()))?;

    println!("Parsed {} messages", count);
    println!("Output: {}", output.display());

    Ok(())
}
