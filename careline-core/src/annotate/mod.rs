//! Annotation pass
//!
//! Fills in the tag fields (`topic`, `initiator`, `event_link_rationale`,
//! `linked_event_id`) on parsed messages by asking an [`Annotator`] about one
//! message at a time, with the preceding conversation as context.
//!
//! The pass is resumable:
//! - messages that already carry a complete tag set are skipped
//! - the output file is checkpointed every `checkpoint_every` messages
//! - a cancellation flag stops the pass after the current message
//!
//! A failed call never aborts the pass; the message gets [`Tags::fallback`]
//! and is retried on the next run.

mod gemini;

pub use gemini::GeminiAnnotator;

use crate::config::AnnotatorConfig;
use crate::error::{Error, Result};
use crate::store::MessageStore;
use crate::types::{lenient, Message, Topic};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Tag set returned by the annotator for one message.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Tags {
    #[serde(default, deserialize_with = "lenient::string")]
    pub topic: Option<String>,
    #[serde(default, deserialize_with = "lenient::boolean")]
    pub initiator: Option<bool>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub event_link_rationale: Option<String>,
    #[serde(default, deserialize_with = "lenient::id")]
    pub linked_event_id: Option<i64>,
}

impl Tags {
    /// Tags applied when annotation fails.
    pub fn fallback() -> Self {
        Self {
            topic: Some(Topic::Uncategorized.to_string()),
            initiator: Some(false),
            event_link_rationale: None,
            linked_event_id: None,
        }
    }

    /// Parse a raw model reply, tolerating Markdown code fences.
    pub fn parse(reply: &str) -> Result<Self> {
        let cleaned = clean_reply(reply);
        serde_json::from_str(&cleaned)
            .map_err(|e| Error::Annotator(format!("reply is not a tag object: {}", e)))
    }

    /// Overwrite the tag fields of `msg`.
    pub fn apply_to(self, msg: &mut Message) {
        msg.topic = self.topic;
        msg.initiator = self.initiator;
        msg.event_link_rationale = self.event_link_rationale;
        msg.linked_event_id = self.linked_event_id;
    }
}

/// Strip ```` ```json ```` / ```` ``` ```` fences and surrounding whitespace.
pub fn clean_reply(reply: &str) -> String {
    reply
        .trim()
        .replace("```json", "")
        .replace("```", "")
        .trim()
        .to_string()
}

/// Everything the annotator sees for one message.
#[derive(Debug, Clone)]
pub struct AnnotationRequest<'a> {
    /// Preceding messages, most recent first
    pub history: Vec<&'a Message>,
    pub current: &'a Message,
}

impl<'a> AnnotationRequest<'a> {
    /// Request for `messages[index]` with up to `window` messages of history.
    pub fn new(messages: &'a [Message], index: usize, window: usize) -> Self {
        let start = index.saturating_sub(window);
        Self {
            history: messages[start..index].iter().rev().collect(),
            current: &messages[index],
        }
    }

    /// Render the model prompt.
    pub fn prompt(&self) -> Result<String> {
        let topics: Vec<&str> = Topic::ALL
            .iter()
            .filter(|t| **t != Topic::Uncategorized)
            .map(|t| t.as_str())
            .collect();

        Ok(format!(
            "You tag entries in a care-team conversation log for a preventative health service. \
Return a JSON object describing the current message.\n\
\n\
Instructions:\n\
1. Read the current message in the context of the conversation history.\n\
2. Set `topic` to exactly one of the allowed topics.\n\
3. Set `initiator` to true if the message opens a new subject not prompted by the messages just before it.\n\
4. If the message is a direct consequence of an earlier message in the history, set `linked_event_id` to that message's id and explain the connection in `event_link_rationale`. Otherwise set both to null.\n\
5. Reply with the JSON object only.\n\
\n\
Allowed topics:\n{topics}\n\
\n\
Conversation history (most recent first):\n{history}\n\
\n\
Current message:\n{current}\n",
            topics = serde_json::to_string(&topics)?,
            history = serde_json::to_string_pretty(&self.history)?,
            current = serde_json::to_string_pretty(self.current)?,
        ))
    }
}

/// Source of message tags.
#[async_trait]
pub trait Annotator: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &str;

    async fn annotate(&self, request: &AnnotationRequest<'_>) -> Result<Tags>;
}

/// Knobs for one annotation pass.
#[derive(Debug, Clone)]
pub struct AnnotateOptions {
    pub history_window: usize,
    pub request_interval: Duration,
    pub checkpoint_every: usize,
    /// Annotate at most this many pending messages
    pub limit: Option<usize>,
}

impl From<&AnnotatorConfig> for AnnotateOptions {
    fn from(config: &AnnotatorConfig) -> Self {
        Self {
            history_window: config.history_window,
            request_interval: config.request_interval(),
            checkpoint_every: config.checkpoint_every.max(1),
            limit: None,
        }
    }
}

/// Counters for one annotation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnnotateStats {
    /// Messages that already had tags
    pub already_tagged: usize,
    /// Messages selected for this pass
    pub pending: usize,
    pub annotated: usize,
    /// Calls that failed and received fallback tags
    pub failed: usize,
    pub cancelled: bool,
}

/// Load the pass input, preferring an existing `output` so a rerun resumes.
pub fn load_for_resume(input: &Path, output: &Path) -> Result<MessageStore> {
    if output.exists() {
        tracing::info!(path = %output.display(), "Resuming from existing output");
        MessageStore::load(output)
    } else {
        MessageStore::load(input)
    }
}

/// Indices of messages that still need tags, capped at `limit`.
pub fn pending_indices(messages: &[Message], limit: Option<usize>) -> Vec<usize> {
    let pending = messages
        .iter()
        .enumerate()
        .filter(|(_, msg)| !msg.is_tagged())
        .map(|(i, _)| i);
    match limit {
        Some(limit) => pending.take(limit).collect(),
        None => pending.collect(),
    }
}

/// Annotate every untagged message in place and write them to `output`.
///
/// `on_progress` is called after each message. The output file is written
/// on every checkpoint and once more at the end, including after
/// cancellation.
pub async fn annotate_messages<A, F>(
    messages: &mut [Message],
    annotator: &A,
    options: &AnnotateOptions,
    output: &Path,
    cancel: &AtomicBool,
    mut on_progress: F,
) -> Result<AnnotateStats>
where
    A: Annotator + ?Sized,
    F: FnMut(&Message),
{
    let pending = pending_indices(messages, options.limit);
    let mut stats = AnnotateStats {
        already_tagged: messages.iter().filter(|m| m.is_tagged()).count(),
        pending: pending.len(),
        ..Default::default()
    };
    tracing::info!(
        annotator = annotator.name(),
        pending = stats.pending,
        already_tagged = stats.already_tagged,
        "Starting annotation pass"
    );

    let checkpoint_every = options.checkpoint_every.max(1);
    for (count, &index) in pending.iter().enumerate() {
        if cancel.load(Ordering::SeqCst) {
            tracing::info!(done = count, "Annotation cancelled");
            stats.cancelled = true;
            break;
        }
        if count > 0 && !options.request_interval.is_zero() {
            tokio::time::sleep(options.request_interval).await;
        }

        let result = {
            let request = AnnotationRequest::new(messages, index, options.history_window);
            annotator.annotate(&request).await
        };
        let msg = &mut messages[index];
        match result {
            Ok(tags) => {
                tracing::debug!(message_id = msg.id, topic = ?tags.topic, "Annotated message");
                tags.apply_to(msg);
                stats.annotated += 1;
            }
            Err(e) => {
                tracing::warn!(message_id = msg.id, error = %e, "Annotation failed, applying fallback tags");
                Tags::fallback().apply_to(msg);
                stats.failed += 1;
            }
        }
        on_progress(msg);

        if (count + 1) % checkpoint_every == 0 {
            MessageStore::save(messages, output)?;
            tracing::debug!(done = count + 1, "Checkpoint written");
        }
    }

    MessageStore::save(messages, output)?;
    tracing::info!(
        annotated = stats.annotated,
        failed = stats.failed,
        cancelled = stats.cancelled,
        output = %output.display(),
        "Annotation pass finished"
    );
    Ok(stats)
}
