//! Ingestion layer for raw chat exports
//!
//! Converts a free-form transcript (Layer 0) into the untagged message list
//! (Layer 1) that the annotation pass and the dashboard read.
//!
//! ```text
//! ┌────────────────┐     ┌──────────────┐     ┌──────────────────────┐
//! │ chat_log.txt   │ ──► │  transcript  │ ──► │ parsed_chat_log.json │
//! └────────────────┘     └──────────────┘     └──────────────────────┘
//! ```

pub mod transcript;

use crate::error::Result;
use crate::store::MessageStore;
use std::path::Path;

/// Parse `input` and write the message list to `output`.
///
/// Returns the number of messages written.
pub fn parse_file(input: &Path, output: &Path) -> Result<usize> {
    let raw = std::fs::read_to_string(input)?;
    let messages = transcript::parse(&raw)?;
    MessageStore::save(&messages, output)?;
    tracing::info!(
        input = %input.display(),
        output = %output.display(),
        messages = messages.len(),
        "Wrote parsed transcript"
    );
    Ok(messages.len())
}
