//! KPI timeline
//!
//! A single forward scan over the transcript, in input order, that turns
//! biomarker mentions into a sparse per-day snapshot history. A day's first
//! snapshot starts as a copy of the most recent one, so every field carries
//! forward until new evidence overwrites it. Later evidence on the same day
//! updates that day's snapshot.
//!
//! Onboarding messages contribute the fixed baseline instead of extracted
//! values, and only to fields that have no value yet. Numbers quoted at
//! intake are self-reported, not lab results, and never displace one.

use crate::extract::{APOB, EXERCISE_FOCUS, HRV_TREND};
use crate::types::{KpiSnapshot, Message, OrderedMap, Topic, DATE_KEY_FORMAT};

/// KPI facts found in one message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KpiEvidence {
    pub apob: Option<String>,
    pub hrv_trend: Option<String>,
    pub exercise_focus: Option<String>,
}

impl KpiEvidence {
    /// Run the three extractors over a message body.
    pub fn from_text(text: &str) -> Self {
        Self {
            apob: APOB.extract(text).found(),
            hrv_trend: HRV_TREND.extract(text).found(),
            exercise_focus: EXERCISE_FOCUS.extract(text).found(),
        }
    }

    /// Evidence carried by a message given the snapshot it would update.
    ///
    /// Onboarding seeds the baseline into fields of `current` that are
    /// still unset and carries nothing else.
    pub fn from_message(msg: &Message, current: &KpiSnapshot) -> Self {
        if msg.topic() == Some(Topic::Onboarding) {
            let baseline = KpiSnapshot::baseline();
            let unset = |value: &str| value == KpiSnapshot::NOT_AVAILABLE;
            return Self {
                apob: unset(&current.apob).then_some(baseline.apob),
                hrv_trend: unset(&current.hrv_trend).then_some(baseline.hrv_trend),
                exercise_focus: unset(&current.exercise_focus).then_some(baseline.exercise_focus),
            };
        }
        Self::from_text(&msg.message)
    }

    pub fn is_empty(&self) -> bool {
        self.apob.is_none() && self.hrv_trend.is_none() && self.exercise_focus.is_none()
    }

    /// `base` with every field this evidence supplies overwritten
    pub fn apply_to(&self, base: &KpiSnapshot) -> KpiSnapshot {
        KpiSnapshot {
            apob: self.apob.clone().unwrap_or_else(|| base.apob.clone()),
            hrv_trend: self.hrv_trend.clone().unwrap_or_else(|| base.hrv_trend.clone()),
            exercise_focus: self
                .exercise_focus
                .clone()
                .unwrap_or_else(|| base.exercise_focus.clone()),
        }
    }
}

/// Date-keyed snapshot history in scan order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KpiTimeline {
    snapshots: OrderedMap<KpiSnapshot>,
}

impl KpiTimeline {
    /// Scan `messages` in order. No re-sort is performed.
    pub fn build(messages: &[Message]) -> Self {
        messages.iter().fold(Self::default(), |mut timeline, msg| {
            let date = match msg.parsed_timestamp() {
                Ok(ts) => ts.format(DATE_KEY_FORMAT).to_string(),
                Err(e) => {
                    tracing::warn!(message_id = msg.id, error = %e, "Skipping message for KPIs");
                    return timeline;
                }
            };

            let base = timeline.base_for(&date);
            let evidence = KpiEvidence::from_message(msg, &base);
            if !evidence.is_empty() {
                tracing::debug!(message_id = msg.id, date = %date, ?evidence, "KPI evidence");
                timeline.snapshots.insert(date, evidence.apply_to(&base));
            }
            timeline
        })
    }

    /// Snapshot a message on `date` updates: that day's, else the latest.
    fn base_for(&self, date: &str) -> KpiSnapshot {
        match self.snapshots.get(date) {
            Some(existing) => existing.clone(),
            None => self.latest(),
        }
    }

    /// Most recently inserted snapshot, or all-`N/A` when empty
    pub fn latest(&self) -> KpiSnapshot {
        self.snapshots.last().cloned().unwrap_or_default()
    }

    pub fn snapshots(&self) -> &OrderedMap<KpiSnapshot> {
        &self.snapshots
    }

    pub fn into_snapshots(self) -> OrderedMap<KpiSnapshot> {
        self.snapshots
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}
