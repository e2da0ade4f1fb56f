//! Core domain types for careline
//!
//! These types describe the tagged chat transcript (input) and the
//! dashboard view model derived from it (output).
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Message** | One chat line between a member and the care team, with upstream tags |
//! | **Topic** | Fixed category tag on a message; drives classification and enrichment |
//! | **Lane** | A timeline row; one per [`VisualClass`] |
//! | **Trace chain** | Messages causally preceding a decision, oldest first |
//! | **KPI snapshot** | Point-in-time bundle of ApoB, HRV trend and exercise focus |
//!
//! Tags on a [`Message`] come from an AI annotator and are not trusted to be
//! well formed. Deserialization coerces or drops malformed tag values instead
//! of rejecting the message.

use chrono::NaiveDateTime;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

/// Timestamp format used by the transcript, e.g. `2025-01-13, 09:00 AM`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d, %I:%M %p";

/// Format of [`TimelineEvent::start`].
pub const EVENT_START_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Format of KPI date keys.
pub const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

/// Role assigned when the transcript does not name one.
pub const DEFAULT_SENDER_ROLE: &str = "Member";

// ============================================
// Message
// ============================================

/// A single tagged chat message.
///
/// Read-only once loaded. `linked_event_id` points backward at the message
/// that caused this one; the links are not guaranteed acyclic and may dangle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Sequential id assigned by the transcript parser
    pub id: i64,
    /// Raw timestamp string (see [`TIMESTAMP_FORMAT`])
    #[serde(default, deserialize_with = "lenient::string")]
    pub timestamp: Option<String>,
    /// Display name of the sender
    #[serde(default)]
    pub sender_name: String,
    /// Sender category; also the analytics grouping key
    pub sender_role: String,
    /// Message body
    pub message: String,

    // Upstream annotator tags
    /// Topic tag (see [`Topic`])
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::string"
    )]
    pub topic: Option<String>,
    /// Whether this message opens a new thread
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::boolean"
    )]
    pub initiator: Option<bool>,
    /// Why this message is linked to `linked_event_id`
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::string"
    )]
    pub event_link_rationale: Option<String>,
    /// Id of the message that caused this one
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::id"
    )]
    pub linked_event_id: Option<i64>,
}

impl Message {
    /// Resolve the topic tag.
    ///
    /// An absent tag reads as [`Topic::Uncategorized`]. A tag outside the
    /// fixed enumeration returns `None`.
    pub fn topic(&self) -> Option<Topic> {
        match self.topic.as_deref() {
            None => Some(Topic::Uncategorized),
            Some(raw) => raw.parse().ok(),
        }
    }

    /// Parse the timestamp.
    pub fn parsed_timestamp(&self) -> Result<NaiveDateTime> {
        let raw = self.timestamp.as_deref().ok_or_else(|| Error::Timestamp {
            value: String::new(),
            message: "missing timestamp".to_string(),
        })?;
        NaiveDateTime::parse_from_str(raw.trim(), TIMESTAMP_FORMAT).map_err(|e| {
            Error::Timestamp {
                value: raw.to_string(),
                message: e.to_string(),
            }
        })
    }

    /// True when the annotator has fully tagged this message.
    ///
    /// Uncategorized counts as untagged since it is also the fallback set.
    pub fn is_tagged(&self) -> bool {
        self.initiator.is_some()
            && matches!(self.topic(), Some(topic) if topic != Topic::Uncategorized)
    }
}

/// Coercions for tag fields written by the upstream annotator.
pub(crate) mod lenient {
    use super::*;
    use serde_json::Value;

    pub fn string<'de, D: Deserializer<'de>>(de: D) -> std::result::Result<Option<String>, D::Error> {
        Ok(match Option::<Value>::deserialize(de)? {
            Some(Value::String(s)) => Some(s),
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(Value::Bool(b)) => Some(b.to_string()),
            _ => None,
        })
    }

    pub fn boolean<'de, D: Deserializer<'de>>(de: D) -> std::result::Result<Option<bool>, D::Error> {
        Ok(match Option::<Value>::deserialize(de)? {
            Some(Value::Bool(b)) => Some(b),
            Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" => Some(true),
                "false" | "no" => Some(false),
                _ => None,
            },
            Some(Value::Number(n)) => n.as_i64().map(|v| v != 0),
            _ => None,
        })
    }

    pub fn id<'de, D: Deserializer<'de>>(de: D) -> std::result::Result<Option<i64>, D::Error> {
        Ok(match Option::<Value>::deserialize(de)? {
            Some(Value::Number(n)) => n.as_i64(),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        })
    }
}

// ============================================
// Topic
// ============================================

/// Fixed topic enumeration assigned by the annotator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Topic {
    Onboarding,
    #[serde(rename = "Medical Decision")]
    MedicalDecision,
    Nutrition,
    Exercise,
    Travel,
    Logistics,
    #[serde(rename = "Member Query")]
    MemberQuery,
    Setback,
    #[serde(rename = "Internal Metrics")]
    InternalMetrics,
    #[serde(rename = "Data Analysis")]
    DataAnalysis,
    #[serde(rename = "Follow-up")]
    FollowUp,
    Uncategorized,
}

impl Topic {
    /// Every topic, in prompt order.
    pub const ALL: [Topic; 12] = [
        Topic::Onboarding,
        Topic::MedicalDecision,
        Topic::Nutrition,
        Topic::Exercise,
        Topic::Travel,
        Topic::Logistics,
        Topic::MemberQuery,
        Topic::Setback,
        Topic::InternalMetrics,
        Topic::DataAnalysis,
        Topic::FollowUp,
        Topic::Uncategorized,
    ];

    /// Tag string as written in the transcript
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::Onboarding => "Onboarding",
            Topic::MedicalDecision => "Medical Decision",
            Topic::Nutrition => "Nutrition",
            Topic::Exercise => "Exercise",
            Topic::Travel => "Travel",
            Topic::Logistics => "Logistics",
            Topic::MemberQuery => "Member Query",
            Topic::Setback => "Setback",
            Topic::InternalMetrics => "Internal Metrics",
            Topic::DataAnalysis => "Data Analysis",
            Topic::FollowUp => "Follow-up",
            Topic::Uncategorized => "Uncategorized",
        }
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Topic {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let trimmed = s.trim();
        Topic::ALL
            .into_iter()
            .find(|topic| topic.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| format!("unknown topic: {}", trimmed))
    }
}

// ============================================
// Timeline presentation
// ============================================

/// Visual class of a timeline event; also selects its lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VisualClass {
    BloodTest,
    Medication,
    PlanChange,
    Travel,
    Setback,
    Metrics,
    DataAnalysis,
    Other,
}

impl VisualClass {
    /// Lane order on the timeline.
    pub const ALL: [VisualClass; 8] = [
        VisualClass::BloodTest,
        VisualClass::Medication,
        VisualClass::PlanChange,
        VisualClass::Travel,
        VisualClass::Setback,
        VisualClass::Metrics,
        VisualClass::DataAnalysis,
        VisualClass::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VisualClass::BloodTest => "blood-test",
            VisualClass::Medication => "medication",
            VisualClass::PlanChange => "plan-change",
            VisualClass::Travel => "travel",
            VisualClass::Setback => "setback",
            VisualClass::Metrics => "metrics",
            VisualClass::DataAnalysis => "data-analysis",
            VisualClass::Other => "other",
        }
    }

    /// Lane heading shown next to the timeline row
    pub fn lane_label(&self) -> &'static str {
        match self {
            VisualClass::BloodTest => "Blood Tests",
            VisualClass::Medication => "Medications",
            VisualClass::PlanChange => "Plan Changes",
            VisualClass::Travel => "Travel",
            VisualClass::Setback => "Setbacks",
            VisualClass::Metrics => "Internal Metrics",
            VisualClass::DataAnalysis => "Data Analysis",
            VisualClass::Other => "Other",
        }
    }
}

impl std::fmt::Display for VisualClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Static lane metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Group {
    pub id: VisualClass,
    pub label: String,
}

impl Group {
    /// One lane per visual class, in [`VisualClass::ALL`] order.
    pub fn all() -> Vec<Group> {
        VisualClass::ALL
            .iter()
            .map(|class| Group {
                id: *class,
                label: class.lane_label().to_string(),
            })
            .collect()
    }
}

/// A classified, enriched message placed on the timeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineEvent {
    /// Source message id
    pub id: i64,
    pub display_label: String,
    pub visual_class: VisualClass,
    /// Lane id
    pub group: VisualClass,
    /// Normalized timestamp (see [`EVENT_START_FORMAT`])
    pub start: String,
    /// Key into [`DashboardView::stories`] for medical decisions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    pub modal_data: ModalData,
}

/// Topic-specific detail shown when an event is opened.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModalData {
    /// Fixed baseline; not derived from the message
    Onboarding {
        baseline: KpiSnapshot,
        member_goals: String,
    },
    MedicalDecision {
        trace_chain: Vec<TraceStep>,
        key_data_point: String,
    },
    /// Nutrition and exercise updates
    PlanChange {
        rationale: String,
        before_after: BeforeAfter,
    },
    Travel {
        hrv_impact: String,
        sleep_impact: String,
        protocol_summary: String,
    },
    Setback {
        problem: String,
        solution: String,
        internal_cost: String,
    },
    /// Pass-through text with sender attribution
    Note {
        message: String,
        sender_name: String,
        sender_role: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BeforeAfter {
    pub before: String,
    pub after: String,
}

/// One message of a trace chain, flattened for presentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceStep {
    pub id: i64,
    pub sender_name: String,
    pub sender_role: String,
    pub message: String,
    pub rationale: Option<String>,
}

impl From<&Message> for TraceStep {
    fn from(msg: &Message) -> Self {
        Self {
            id: msg.id,
            sender_name: msg.sender_name.clone(),
            sender_role: msg.sender_role.clone(),
            message: msg.message.clone(),
            rationale: msg.event_link_rationale.clone(),
        }
    }
}

impl TraceStep {
    /// Sender attribution, e.g. `Ruby (Concierge)`.
    pub fn speaker(&self) -> String {
        format!("{} ({})", self.sender_name, self.sender_role)
    }
}

/// Narrated trace chain for a medical decision.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceStory {
    pub title: String,
    pub steps: Vec<StoryStep>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoryStep {
    pub icon: String,
    pub speaker: String,
    pub text: String,
    pub rationale: String,
}

impl TraceStory {
    pub const TITLE: &'static str = "Tracing the 'Why' for this Decision";

    pub fn from_chain(chain: &[TraceStep]) -> Self {
        Self {
            title: Self::TITLE.to_string(),
            steps: chain
                .iter()
                .map(|step| StoryStep {
                    icon: "question_answer".to_string(),
                    speaker: step.speaker(),
                    text: step.message.clone(),
                    rationale: step.rationale.clone().unwrap_or_default(),
                })
                .collect(),
        }
    }
}

// ============================================
// KPIs and analytics
// ============================================

/// Point-in-time KPI bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KpiSnapshot {
    /// ApoB lab value (e.g. `102 mg/dL`) or status
    pub apob: String,
    /// HRV percentage change (e.g. `+10%`)
    pub hrv_trend: String,
    /// Current training emphasis
    pub exercise_focus: String,
}

impl KpiSnapshot {
    /// Placeholder shown for a field with no evidence yet
    pub const NOT_AVAILABLE: &'static str = "N/A";

    /// Snapshot with no evidence for any field.
    pub fn unknown() -> Self {
        Self {
            apob: Self::NOT_AVAILABLE.to_string(),
            hrv_trend: Self::NOT_AVAILABLE.to_string(),
            exercise_focus: Self::NOT_AVAILABLE.to_string(),
        }
    }

    /// Fixed state recorded at onboarding, before any lab work.
    pub fn baseline() -> Self {
        Self {
            apob: "Not tested".to_string(),
            hrv_trend: "Baseline".to_string(),
            exercise_focus: "Assessment".to_string(),
        }
    }
}

impl Default for KpiSnapshot {
    fn default() -> Self {
        Self::unknown()
    }
}

/// Workload per sender role, index-aligned.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Analytics {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

/// String-keyed map that serializes in insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedMap<V> {
    entries: Vec<(String, V)>,
}

impl<V> OrderedMap<V> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Insert or replace; a replaced key keeps its original position.
    pub fn insert(&mut self, key: impl Into<String>, value: V) {
        let key = key.into();
        match self.get_mut(&key) {
            Some(slot) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn last(&self) -> Option<&V> {
        self.entries.last().map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Serialize> Serialize for OrderedMap<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

// ============================================
// View model
// ============================================

/// Everything the dashboard renders, produced by one derivation pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub events: Vec<TimelineEvent>,
    /// Latest KPI snapshot
    pub kpis: KpiSnapshot,
    /// Full snapshot history keyed by date
    pub timeline_kpis: OrderedMap<KpiSnapshot>,
    pub analytics: Analytics,
    pub groups: Vec<Group>,
    /// Trace stories keyed by [`TimelineEvent::trace_id`]
    pub stories: OrderedMap<TraceStory>,
}

impl DashboardView {
    /// View returned when the message source cannot be loaded.
    ///
    /// Lane metadata is static and stays populated.
    pub fn empty() -> Self {
        Self {
            events: Vec::new(),
            kpis: KpiSnapshot::unknown(),
            timeline_kpis: OrderedMap::new(),
            analytics: Analytics::default(),
            groups: Group::all(),
            stories: OrderedMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> Message {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_topic_round_trip_and_trim() {
        for topic in Topic::ALL {
            assert_eq!(topic.as_str().parse::<Topic>().unwrap(), topic);
        }
        assert_eq!(
            " Medical Decision ".parse::<Topic>().unwrap(),
            Topic::MedicalDecision
        );
        assert!("Gardening".parse::<Topic>().is_err());
    }

    #[test]
    fn test_missing_topic_is_uncategorized() {
        let msg = parse(json!({"id": 1, "sender_role": "Member", "message": "hi"}));
        assert_eq!(msg.topic(), Some(Topic::Uncategorized));
    }

    #[test]
    fn test_sender_role_is_required() {
        let result = serde_json::from_value::<Message>(json!({"id": 1, "message": "hi"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_topic_is_none() {
        let msg = parse(json!({"id": 1, "sender_role": "Member", "message": "hi", "topic": "Gardening"}));
        assert_eq!(msg.topic(), None);
    }

    #[test]
    fn test_malformed_tags_are_coerced() {
        let msg = parse(json!({
            "id": 7,
            "sender_role": "Member",
            "message": "hi",
            "initiator": "yes",
            "linked_event_id": "3",
            "event_link_rationale": null
        }));
        assert_eq!(msg.initiator, Some(true));
        assert_eq!(msg.linked_event_id, Some(3));
        assert_eq!(msg.event_link_rationale, None);

        let msg = parse(json!({
            "id": 8,
            "sender_role": "Member",
            "message": "hi",
            "initiator": {"nested": true},
            "linked_event_id": "abc"
        }));
        assert_eq!(msg.initiator, None);
        assert_eq!(msg.linked_event_id, None);
    }

    #[test]
    fn test_parsed_timestamp() {
        let msg = parse(json!({"id": 1, "sender_role": "Member", "message": "x", "timestamp": "2025-01-13, 09:00 PM"}));
        let ts = msg.parsed_timestamp().unwrap();
        assert_eq!(ts.format(EVENT_START_FORMAT).to_string(), "2025-01-13T21:00:00");

        let msg = parse(json!({"id": 2, "sender_role": "Member", "message": "x", "timestamp": "13/01/2025"}));
        assert!(matches!(msg.parsed_timestamp(), Err(Error::Timestamp { .. })));

        let msg = parse(json!({"id": 3, "sender_role": "Member", "message": "x"}));
        assert!(msg.parsed_timestamp().is_err());
    }

    #[test]
    fn test_is_tagged() {
        let tagged = parse(json!({"id": 1, "sender_role": "Member", "message": "x", "topic": "Travel", "initiator": false}));
        assert!(tagged.is_tagged());
        let fallback = parse(json!({"id": 2, "sender_role": "Member", "message": "x", "topic": "Uncategorized", "initiator": false}));
        assert!(!fallback.is_tagged());
        let untagged = parse(json!({"id": 3, "sender_role": "Member", "message": "x"}));
        assert!(!untagged.is_tagged());
    }

    #[test]
    fn test_ordered_map_keeps_insertion_order() {
        let mut map = OrderedMap::new();
        map.insert("2025-03-01", 1);
        map.insert("2025-01-01", 2);
        map.insert("2025-03-01", 3);
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["2025-03-01", "2025-01-01"]);
        assert_eq!(map.get("2025-03-01"), Some(&3));
        assert_eq!(
            serde_json::to_string(&map).unwrap(),
            r#"{"2025-03-01":3,"2025-01-01":2}"#
        );
    }

    #[test]
    fn test_trace_story_speakers() {
        let msg = parse(json!({
            "id": 4,
            "sender_name": "Dr. Warren",
            "sender_role": "Medical Strategist",
            "message": "Starting statin",
            "event_link_rationale": "Answers ApoB question"
        }));
        let story = TraceStory::from_chain(&[TraceStep::from(&msg)]);
        assert_eq!(story.steps[0].speaker, "Dr. Warren (Medical Strategist)");
        assert_eq!(story.steps[0].rationale, "Answers ApoB question");
    }

    #[test]
    fn test_modal_data_is_tagged_by_kind() {
        let data = ModalData::Setback {
            problem: "p".to_string(),
            solution: "s".to_string(),
            internal_cost: "N/A".to_string(),
        };
        let value = serde_json::to_value(&data).unwrap();
        assert_eq!(value["kind"], "setback");
        assert_eq!(value["internal_cost"], "N/A");
    }

    #[test]
    fn test_groups_cover_every_class() {
        let groups = Group::all();
        assert_eq!(groups.len(), VisualClass::ALL.len());
        assert_eq!(serde_json::to_value(&groups[0]).unwrap()["id"], "blood-test");
    }
}
