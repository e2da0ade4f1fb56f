//! Raw transcript parser
//!
//! Turns a free-form chat export into untagged [`Message`]s. The export is
//! line oriented:
//!
//! ```text
//! Month 1: Onboarding
//! [2025-01-13, 09:00 AM] Ruby (Concierge): Welcome aboard!
//! Let me know when you're free.
//! * [2025-01-13, 09:05 AM] Rohan: Thanks Ruby
//! ```
//!
//! A message runs from its `[timestamp] sender:` header to the next header.
//! Section headings and dividers are dropped before splitting, and a bullet
//! (`* [`) that starts a new message mid-line is moved onto its own line.

use crate::error::{Error, Result};
use crate::types::{Message, DEFAULT_SENDER_ROLE};
use regex::Regex;
use std::sync::LazyLock;

/// Lines starting with any of these are not chat.
const SKIPPED_PREFIXES: [&str; 5] = ["Month", "Week", "____", "Of course.", "Here is the detailed"];

static HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*\[([^\]\n]*)\] ([^:\n]*?):[ \t]*").expect("valid header regex")
});

static ROLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(([^)]*)\)").expect("valid role regex"));

/// Drop non-chat lines, split inline bullets, strip asterisks.
pub fn clean(raw: &str) -> String {
    let kept: Vec<&str> = raw
        .lines()
        .filter(|line| {
            let trimmed = line.trim();
            !SKIPPED_PREFIXES.iter().any(|p| trimmed.starts_with(p))
        })
        .collect();

    kept.join("\n").replace("* [", "\n[").replace('*', "")
}

/// Split `sender` into `(name, role)`.
///
/// `Dr. Warren (Medical Strategist)` gives `("Dr. Warren", "Medical Strategist")`;
/// a sender with no parenthesised role is a member.
pub fn split_sender(sender: &str) -> (String, String) {
    let sender = sender.trim();
    match ROLE.captures(sender) {
        Some(caps) => {
            let name = sender.split('(').next().unwrap_or_default().trim();
            (name.to_string(), caps[1].trim().to_string())
        }
        None => (sender.to_string(), DEFAULT_SENDER_ROLE.to_string()),
    }
}

/// Parse a raw transcript into messages with sequential ids from 1.
///
/// Fails when the text contains no message headers at all.
pub fn parse(raw: &str) -> Result<Vec<Message>> {
    let cleaned = clean(raw);
    let headers: Vec<_> = HEADER.captures_iter(&cleaned).collect();
    if headers.is_empty() {
        return Err(Error::Transcript("no `[timestamp] sender:` headers found".to_string()));
    }

    let mut messages = Vec::with_capacity(headers.len());
    for (i, caps) in headers.iter().enumerate() {
        let whole = caps.get(0).ok_or_else(|| Error::Transcript("empty header match".to_string()))?;
        let body_end = headers
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map(|m| m.start())
            .unwrap_or(cleaned.len());
        let body = cleaned[whole.end()..body_end].trim();

        if body.is_empty() {
            tracing::debug!(timestamp = &caps[1], "Dropping empty message");
            continue;
        }

        let (sender_name, sender_role) = split_sender(&caps[2]);
        messages.push(Message {
            id: messages.len() as i64 + 1,
            timestamp: Some(caps[1].trim().to_string()),
            sender_name,
            sender_role,
            message: body.to_string(),
            topic: None,
            initiator: None,
            event_link_rationale: None,
            linked_event_id: None,
        });
    }

    tracing::info!(messages = messages.len(), "Parsed transcript");
    Ok(messages)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Here is the detailed 8-month log:
Month 1: Onboarding
Week 1
[2025-01-13, 09:00 AM] Ruby (Concierge): Welcome aboard, Rohan!
We'll start with a full **blood panel**.
[2025-01-13, 09:10 AM] Rohan: Thanks. When is the draw? * [2025-01-13, 09:12 AM] Ruby (Concierge): Thursday 8am.
____________
[2025-01-13, 09:20 AM] Dr. Warren (Medical Strategist):
[2025-01-14, 07:45 AM] Dr. Warren (Medical Strategist): Fasting from 10pm please.
";

    #[test]
    fn test_parse_sample() {
        let messages = parse(SAMPLE).unwrap();
        assert_eq!(messages.len(), 4);
        assert_eq!(
            messages.iter().map(|m| m.id).collect::<Vec<_>>(),
            vec![1, 2, 3, 4]
        );

        assert_eq!(messages[0].sender_name, "Ruby");
        assert_eq!(messages[0].sender_role, "Concierge");
        assert_eq!(
            messages[0].message,
            "Welcome aboard, Rohan!\nWe'll start with a full blood panel."
        );

        assert_eq!(messages[1].sender_name, "Rohan");
        assert_eq!(messages[1].sender_role, "Member");
        assert_eq!(messages[1].message, "Thanks. When is the draw?");

        assert_eq!(messages[2].message, "Thursday 8am.");
        assert_eq!(messages[3].sender_name, "Dr. Warren");
        assert_eq!(messages[3].sender_role, "Medical Strategist");
        assert_eq!(messages[3].timestamp.as_deref(), Some("2025-01-14, 07:45 AM"));
        assert!(messages[3].parsed_timestamp().is_ok());
        assert!(messages.iter().all(|m| m.topic.is_none()));
    }

    #[test]
    fn test_no_headers_is_error() {
        assert!(matches!(
            parse("Month 1\njust some notes"),
            Err(Error::Transcript(_))
        ));
    }

    #[test]
    fn test_split_sender() {
        assert_eq!(
            split_sender(" Advik (Performance Scientist) "),
            ("Advik".to_string(), "Performance Scientist".to_string())
        );
        assert_eq!(
            split_sender("Rohan"),
            ("Rohan".to_string(), "Member".to_string())
        );
    }
}
