//! Per-topic event enrichment
//!
//! Builds the [`ModalData`] payload for a classified message. Each topic has
//! its own shape:
//!
//! | Topic | Payload |
//! |-------|---------|
//! | Onboarding | fixed baseline KPIs and member goals |
//! | Medical Decision | trace chain and key data point |
//! | Nutrition, Exercise | rationale and a before/after pair |
//! | Travel | HRV and sleep impact found nearby, travel protocol |
//! | Setback | problem, resolution found nearby, internal cost |
//! | everything else | message text with sender attribution |
//!
//! Enrichment fails only when the message itself is unusable (blank body,
//! unresolvable id). Facts missing from the surrounding text are not
//! failures; they render as `"N/A"` or a fixed fallback.

use crate::context;
use crate::error::{Error, Result};
use crate::extract::{Extraction, KEY_DATA_POINT};
use crate::thread::ThreadTracer;
use crate::types::{BeforeAfter, KpiSnapshot, Message, ModalData, Topic, TraceStep};
use regex::Regex;
use std::sync::LazyLock;

/// Member goals recorded at onboarding
pub const MEMBER_GOALS: &str = "Reduce cardiovascular risk by lowering ApoB, \
     improve sleep and HRV, and build a strength routine that survives a heavy travel schedule.";

/// Solution shown when no resolution message is found near a setback
pub const SETBACK_FALLBACK: &str = "Team acknowledged the issue.";

/// Summary shown when no protocol message is found near a trip
pub const TRAVEL_PROTOCOL_FALLBACK: &str =
    "Standard travel protocol: hold sleep times, hydrate, keep light daily movement.";

static TRAVEL_HRV: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bhrv\b\D{0,40}?[+-]?\d+(?:\.\d+)?\s*%").expect("valid hrv regex")
});

static TRAVEL_SLEEP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\bsleep\b[^.!?\n]{0,60}?\b(?:drop(?:ped|s)?|fell|decreased|down|reduced|lost)\b[^.!?\n]{0,40}?\d+(?:\.\d+)?\s*(?:hours?|hrs?|minutes?|mins?|%)",
    )
    .expect("valid sleep regex")
});

static TRAVEL_PROTOCOL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bprotocol\b").expect("valid protocol regex"));

static SETBACK_RESOLUTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:resolv\w*|solution|fix(?:ed)?|adjust\w*|recommend\w*|switch\w*)\b")
        .expect("valid resolution regex")
});

static NUTRITION_FEEDBACK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bfeedback\b").expect("valid feedback regex"));

static INTERNAL_HOURS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*hours?\b").expect("valid hours regex")
});

/// Enrichment over one loaded message sequence.
pub struct Enricher<'a> {
    messages: &'a [Message],
    tracer: ThreadTracer<'a>,
    max_trace_depth: usize,
}

impl<'a> Enricher<'a> {
    pub fn new(messages: &'a [Message], max_trace_depth: usize) -> Self {
        Self {
            messages,
            tracer: ThreadTracer::new(messages),
            max_trace_depth,
        }
    }

    /// Build the payload for the message at `index`, classified as `topic`.
    pub fn enrich(&self, index: usize, topic: Topic) -> Result<ModalData> {
        let msg = self.messages.get(index).ok_or(Error::MessagePosition {
            index,
            len: self.messages.len(),
        })?;

        match topic {
            Topic::Onboarding => Ok(ModalData::Onboarding {
                baseline: KpiSnapshot::baseline(),
                member_goals: MEMBER_GOALS.to_string(),
            }),
            Topic::MedicalDecision => self.medical_decision(msg),
            Topic::Nutrition | Topic::Exercise => plan_change(msg),
            Topic::Travel => Ok(self.travel(index)),
            Topic::Setback => self.setback(msg, index),
            Topic::Logistics
            | Topic::MemberQuery
            | Topic::InternalMetrics
            | Topic::DataAnalysis
            | Topic::FollowUp
            | Topic::Uncategorized => Ok(note(msg)),
        }
    }

    fn medical_decision(&self, msg: &Message) -> Result<ModalData> {
        require_body(msg)?;

        let chain = self.tracer.trace(msg.id, self.max_trace_depth);
        match chain.last() {
            Some(last) if std::ptr::eq(*last, msg) => {}
            Some(_) => {
                return Err(Error::Enrichment {
                    id: msg.id,
                    message: "message id is shared with an earlier message".to_string(),
                })
            }
            None => {
                return Err(Error::Enrichment {
                    id: msg.id,
                    message: "message id does not resolve".to_string(),
                })
            }
        }

        Ok(ModalData::MedicalDecision {
            trace_chain: chain.into_iter().map(TraceStep::from).collect(),
            key_data_point: KEY_DATA_POINT.extract(&msg.message).or_not_available(),
        })
    }

    fn travel(&self, index: usize) -> ModalData {
        let hrv_impact =
            context::find_fragment(self.messages, index, Topic::DataAnalysis, &TRAVEL_HRV);
        let sleep_impact =
            context::find_fragment(self.messages, index, Topic::DataAnalysis, &TRAVEL_SLEEP);
        let protocol_summary = context::find(self.messages, index, Topic::Travel, &TRAVEL_PROTOCOL)
            .map(|m| m.message.clone())
            .unwrap_or_else(|| TRAVEL_PROTOCOL_FALLBACK.to_string());

        ModalData::Travel {
            hrv_impact: hrv_impact.or_not_available(),
            sleep_impact: sleep_impact.or_not_available(),
            protocol_summary,
        }
    }

    fn setback(&self, msg: &Message, index: usize) -> Result<ModalData> {
        require_body(msg)?;

        let solution = context::find(self.messages, index, Topic::FollowUp, &SETBACK_RESOLUTION)
            .or_else(|| context::find(self.messages, index, Topic::Nutrition, &NUTRITION_FEEDBACK))
            .map(|m| m.message.clone())
            .unwrap_or_else(|| SETBACK_FALLBACK.to_string());

        let internal_cost =
            context::find(self.messages, index, Topic::InternalMetrics, &INTERNAL_HOURS)
                .and_then(|m| INTERNAL_HOURS.captures(&m.message))
                .map(|caps| Extraction::Found(format!("{} Hours", &caps[1])))
                .unwrap_or(Extraction::NoMatch);

        Ok(ModalData::Setback {
            problem: msg.message.clone(),
            solution,
            internal_cost: internal_cost.or_not_available(),
        })
    }
}

fn plan_change(msg: &Message) -> Result<ModalData> {
    require_body(msg)?;

    // Two-bucket heuristic, not general extraction
    let before_after = if msg.message.to_lowercase().contains("hiit") {
        BeforeAfter {
            before: "Steady-state cardio".to_string(),
            after: "Strength & HIIT".to_string(),
        }
    } else {
        BeforeAfter {
            before: "Previous plan".to_string(),
            after: "Adjusted plan".to_string(),
        }
    };

    Ok(ModalData::PlanChange {
        rationale: msg.message.clone(),
        before_after,
    })
}

fn note(msg: &Message) -> ModalData {
    ModalData::Note {
        message: msg.message.clone(),
        sender_name: msg.sender_name.clone(),
        sender_role: msg.sender_role.clone(),
    }
}

fn require_body(msg: &Message) -> Result<()> {
    if msg.message.trim().is_empty() {
        return Err(Error::Enrichment {
            id: msg.id,
            message: "empty message body".to_string(),
        });
    }
    Ok(())
}
