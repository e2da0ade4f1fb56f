//! Topic classification
//!
//! Maps a message's topic tag to its timeline presentation. A topic with no
//! mapping, or a tag outside the fixed enumeration, excludes the message
//! from the timeline. Exclusion is a filter, not an error.

use crate::types::{Message, Topic, VisualClass};
use serde::Deserialize;

/// Presentation for one topic.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TopicMapping {
    pub topic: Topic,
    /// Event label shown on the timeline
    pub label: String,
    /// Visual class, which also selects the lane
    pub class: VisualClass,
}

impl TopicMapping {
    fn new(topic: Topic, label: &str, class: VisualClass) -> Self {
        Self {
            topic,
            label: label.to_string(),
            class,
        }
    }
}

/// Result of classifying a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification<'a> {
    Mapped {
        topic: Topic,
        mapping: &'a TopicMapping,
    },
    Excluded,
}

/// Static topic lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicTable {
    mappings: Vec<TopicMapping>,
}

impl TopicTable {
    pub fn new(mappings: Vec<TopicMapping>) -> Self {
        Self { mappings }
    }

    /// The default table covering every topic.
    pub fn builtin() -> Self {
        use Topic::*;
        use VisualClass as V;

        Self::new(vec![
            TopicMapping::new(Onboarding, "Onboarding & Blood Panel", V::BloodTest),
            TopicMapping::new(MedicalDecision, "Medical Decision", V::Medication),
            TopicMapping::new(Nutrition, "Nutrition Plan Update", V::PlanChange),
            TopicMapping::new(Exercise, "Exercise Plan Update", V::PlanChange),
            TopicMapping::new(Travel, "Travel Period", V::Travel),
            TopicMapping::new(Logistics, "Logistics Handled", V::Travel),
            TopicMapping::new(MemberQuery, "Member Question", V::PlanChange),
            TopicMapping::new(Setback, "Setback Encountered", V::Setback),
            TopicMapping::new(InternalMetrics, "Internal Metrics Review", V::Metrics),
            TopicMapping::new(DataAnalysis, "Data Analysis", V::DataAnalysis),
            TopicMapping::new(FollowUp, "Team Follow-up", V::PlanChange),
            TopicMapping::new(Uncategorized, "General Message", V::Other),
        ])
    }

    pub fn get(&self, topic: Topic) -> Option<&TopicMapping> {
        self.mappings.iter().find(|m| m.topic == topic)
    }

    /// Classify by topic alone
    pub fn classify(&self, topic: Topic) -> Classification<'_> {
        match self.get(topic) {
            Some(mapping) => Classification::Mapped { topic, mapping },
            None => Classification::Excluded,
        }
    }

    /// Classify a message by its (possibly malformed) topic tag
    pub fn classify_message(&self, msg: &Message) -> Classification<'_> {
        match msg.topic() {
            Some(topic) => self.classify(topic),
            None => Classification::Excluded,
        }
    }

    pub fn into_mappings(self) -> Vec<TopicMapping> {
        self.mappings
    }
}

impl Default for TopicTable {
    fn default() -> Self {
        Self::builtin()
    }
}
