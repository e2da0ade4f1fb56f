//! careline-annotate - tag parsed messages with an LLM
//!
//! Reads the parser output, asks the configured annotator for each untagged
//! message's topic and causal link, and writes the tagged list. Rerunning
//! resumes from the existing output file. Ctrl+C stops after the current
//! message and saves progress.
//!
//! The API key is read from `annotator.api_key` in the config file or from
//! the `GOOGLE_API_KEY` environment variable.

use anyhow::{Context, Result};
use careline_core::annotate::{self, AnnotateOptions, GeminiAnnotator};
use careline_core::config::AnnotatorConfig;
use careline_core::Config;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "careline-annotate")]
#[command(about = "Tag parsed chat messages with topics and causal links")]
#[command(version)]
struct Args {
    /// Parsed message file (default: parsed_chat_log.json in the data dir)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Tagged output file (default: enriched_chat_log.json in the data dir)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Annotate at most N messages this run
    #[arg(short, long)]
    limit: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load().context("failed to load configuration")?;
    let _log_guard =
        careline_core::logging::init(&config.logging).context("failed to initialize logging")?;

    tracing::info!("careline-annotate starting");

    let input = args.input.unwrap_or_else(Config::parsed_log_path);
    let output = args.output.unwrap_or_else(Config::enriched_log_path);

    let annotator = GeminiAnnotator::new(&config.annotator).with_context(|| {
        format!(
            "failed to create annotator (set {} or annotator.api_key)",
            AnnotatorConfig::API_KEY_ENV
        )
    })?;

    let store = annotate::load_for_resume(&input, &output)
        .with_context(|| format!("failed to load {}", input.display()))?;
    let mut messages = store.into_messages();

    let mut options = AnnotateOptions::from(&config.annotator);
    options.limit = args.limit;
    let pending = annotate::pending_indices(&messages, options.limit).len();

    if pending == 0 {
        println!("All {} messages are already tagged", messages.len());
    }

    let cancel = Arc::new(AtomicBool::new(false));
    let c = cancel.clone();
    ctrlc::set_handler(move || {
        eprintln!("\nStopping after the current message...");
        c.store(true, Ordering::SeqCst);
    })
    .context("failed to set Ctrl+C handler")?;

    let pb = ProgressBar::new(pending as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .context("invalid progress template")?
            .progress_chars("#>-"),
    );

    let stats = annotate::annotate_messages(
        &mut messages,
        &annotator,
        &options,
        &output,
        &cancel,
        |msg| {
            pb.inc(1);
            pb.set_message(format!("message {}", msg.id));
        },
    )
    .await
    .context("annotation failed")?;

    pb.finish_and_clear();

    println!(
        "Annotated {} messages ({} failed, {} already tagged)",
        stats.annotated, stats.failed, stats.already_tagged
    );
    if stats.cancelled {
        println!("Cancelled; rerun to resume");
    }
    println!("Output: {}", output.display());

    Ok(())
}
