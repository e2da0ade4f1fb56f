//! Conversation thread tracing
//!
//! Follows `linked_event_id` backward from a message to rebuild the chain
//! of messages that led to it. Links come from the annotator and may form
//! cycles or dangle, so traversal is bounded by `max_depth` and stops at the
//! first id that does not resolve.

use crate::types::Message;
use std::collections::HashMap;

/// Id lookup over a message slice, built once per derivation pass.
pub struct ThreadTracer<'a> {
    by_id: HashMap<i64, &'a Message>,
}

impl<'a> ThreadTracer<'a> {
    pub fn new(messages: &'a [Message]) -> Self {
        let mut by_id = HashMap::with_capacity(messages.len());
        for msg in messages {
            by_id.entry(msg.id).or_insert(msg);
        }
        Self { by_id }
    }

    /// Chain ending at `start_id`, oldest first, at most `max_depth` long.
    ///
    /// An unknown `start_id` yields an empty chain.
    pub fn trace(&self, start_id: i64, max_depth: usize) -> Vec<&'a Message> {
        let mut chain = Vec::new();
        let mut current = Some(start_id);

        while chain.len() < max_depth {
            let Some(msg) = current.and_then(|id| self.by_id.get(&id).copied()) else {
                break;
            };
            chain.push(msg);
            current = msg.linked_event_id;
        }

        chain.reverse();
        chain
    }
}

/// One-shot form of [`ThreadTracer::trace`].
pub fn trace(messages: &[Message], start_id: i64, max_depth: usize) -> Vec<&Message> {
    ThreadTracer::new(messages).trace(start_id, max_depth)
}
