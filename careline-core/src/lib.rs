//! # careline-core
//!
//! Core library for careline - a member-journey timeline builder for
//! care-team chat transcripts.
//!
//! This library provides:
//! - Domain types for messages, timeline events, KPIs and trace stories
//! - Transcript ingestion and the LLM annotation pass
//! - The dashboard derivation pass (events, KPI timeline, workload)
//! - Configuration management
//! - Logging infrastructure
//!
//! ## Architecture
//!
//! Data flows through three layers:
//! - **Layer 0 (Raw):** The free-form chat export on disk
//! - **Layer 1 (Tagged):** A JSON message array, tagged by the annotator
//! - **Layer 2 (Derived):** The [`DashboardView`], recomputed on every pass
//!
//! ## Example
//!
//! ```rust,no_run
//! use careline_core::{build_view, Config};
//!
//! let config = Config::load().expect("failed to load config");
//! let view = build_view(&Config::enriched_log_path(), &config.derivation);
//! println!("{} timeline events", view.events.len());
//! ```

// Re-export commonly used items at the crate root
pub use config::Config;
pub use derive::{build_view, derive, derive_with_stats, DeriveStats};
pub use error::{Error, Result};
pub use store::MessageStore;
pub use types::*;

// Public modules
pub mod analytics;
pub mod annotate;
pub mod classify;
pub mod config;
pub mod context;
pub mod derive;
pub mod enrich;
pub mod error;
pub mod extract;
pub mod ingest;
pub mod kpi;
pub mod logging;
pub mod store;
pub mod thread;
pub mod types;
