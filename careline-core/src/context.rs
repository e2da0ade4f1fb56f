//! Context window search
//!
//! Associates an event with supporting messages nearby. The search walks
//! backward from the anchor (inclusive) to the start of the transcript, then
//! forward from just after the anchor to the end. Recent causes are the
//! likelier explanation; the forward pass catches facts logged slightly
//! after the event they explain.

use crate::extract::Extraction;
use crate::types::{Message, Topic};
use regex::Regex;

/// Find the nearest message with `topic` whose body matches `pattern`.
///
/// Returns `None` when nothing matches in either direction, including when
/// `anchor` is past the end of `messages`.
pub fn find<'a>(
    messages: &'a [Message],
    anchor: usize,
    topic: Topic,
    pattern: &Regex,
) -> Option<&'a Message> {
    if anchor >= messages.len() {
        return None;
    }

    let matches = |msg: &&Message| msg.topic() == Some(topic) && pattern.is_match(&msg.message);

    messages[..=anchor]
        .iter()
        .rev()
        .find(matches)
        .or_else(|| messages[anchor + 1..].iter().find(matches))
}

/// Like [`find`], but returns the matched fragment of the found message.
pub fn find_fragment(
    messages: &[Message],
    anchor: usize,
    topic: Topic,
    pattern: &Regex,
) -> Extraction {
    find(messages, anchor, topic, pattern)
        .and_then(|msg| pattern.find(&msg.message))
        .map(|m| Extraction::Found(m.as_str().trim().to_string()))
        .unwrap_or(Extraction::NoMatch)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(id: i64, topic: &str, text: &str) -> Message {
        Message {
            id,
            timestamp: Some("2025-02-01, 10:00 AM".to_string()),
            sender_name: "Sam".to_string(),
            sender_role: "Coach".to_string(),
            message: text.to_string(),
            topic: Some(topic.to_string()),
            initiator: None,
            event_link_rationale: None,
            linked_event_id: None,
        }
    }

    fn hrv() -> Regex {
        Regex::new(r"(?i)hrv\D*\d+%").unwrap()
    }

    #[test]
    fn test_prefers_backward_match() {
        let messages = vec![
            msg(1, "Data Analysis", "HRV down 12%"),
            msg(2, "Travel", "Flying to Tokyo"),
            msg(3, "Data Analysis", "HRV down 20%"),
        ];
        let found = find(&messages, 1, Topic::DataAnalysis, &hrv()).unwrap();
        assert_eq!(found.id, 1);
    }

    #[test]
    fn test_nearest_backward_wins() {
        let messages = vec![
            msg(1, "Data Analysis", "HRV down 12%"),
            msg(2, "Data Analysis", "HRV down 8%"),
            msg(3, "Travel", "Flying to Tokyo"),
        ];
        let found = find(&messages, 2, Topic::DataAnalysis, &hrv()).unwrap();
        assert_eq!(found.id, 2);
    }

    #[test]
    fn test_falls_back_to_forward_search() {
        let messages = vec![
            msg(1, "Travel", "Flying to Tokyo"),
            msg(2, "Nutrition", "HRV down 5% but that's diet"),
            msg(3, "Data Analysis", "HRV down 20%"),
        ];
        let found = find(&messages, 0, Topic::DataAnalysis, &hrv()).unwrap();
        assert_eq!(found.id, 3);
    }

    #[test]
    fn test_anchor_itself_is_searched() {
        let messages = vec![msg(1, "Data Analysis", "HRV down 12%")];
        assert_eq!(find(&messages, 0, Topic::DataAnalysis, &hrv()).map(|m| m.id), Some(1));
    }

    #[test]
    fn test_not_found() {
        let messages = vec![
            msg(1, "Travel", "Flying to Tokyo"),
            msg(2, "Data Analysis", "Sleep looked fine"),
        ];
        assert!(find(&messages, 0, Topic::DataAnalysis, &hrv()).is_none());
        assert!(find(&messages, 9, Topic::DataAnalysis, &hrv()).is_none());
        assert!(find(&[], 0, Topic::DataAnalysis, &hrv()).is_none());
    }

    #[test]
    fn test_find_fragment() {
        let messages = vec![
            msg(1, "Travel", "Flying to Tokyo"),
            msg(2, "Data Analysis", "Post-trip, HRV down 12% vs baseline."),
        ];
        assert_eq!(
            find_fragment(&messages, 0, Topic::DataAnalysis, &hrv()),
            Extraction::Found("HRV down 12%".to_string())
        );
        assert_eq!(
            find_fragment(&messages, 0, Topic::Setback, &hrv()),
            Extraction::NoMatch
        );
    }
}
