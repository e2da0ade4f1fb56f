//! Care-team workload analytics
//!
//! Every message credits a fixed time cost to its sender role. The tally is
//! a workload proxy, not measured time.

use crate::types::{Analytics, Message};

/// Accumulated workload per sender role, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkloadTally {
    per_message_cost: f64,
    entries: Vec<(String, f64)>,
}

impl WorkloadTally {
    pub fn new(per_message_cost: f64) -> Self {
        Self {
            per_message_cost,
            entries: Vec::new(),
        }
    }

    /// Tally every message in one pass.
    pub fn from_messages(messages: &[Message], per_message_cost: f64) -> Self {
        let mut tally = Self::new(per_message_cost);
        for msg in messages {
            tally.add(&msg.sender_role);
        }
        tally
    }

    pub fn add(&mut self, role: &str) {
        match self.entries.iter_mut().find(|(r, _)| r == role) {
            Some((_, units)) => *units += self.per_message_cost,
            None => self.entries.push((role.to_string(), self.per_message_cost)),
        }
    }

    /// Units for one role, unrounded
    pub fn get(&self, role: &str) -> Option<f64> {
        self.entries.iter().find(|(r, _)| r == role).map(|(_, v)| *v)
    }

    /// Labels and values rounded to 2 decimals, index-aligned.
    pub fn to_analytics(&self) -> Analytics {
        Analytics {
            labels: self.entries.iter().map(|(role, _)| role.clone()).collect(),
            values: self.entries.iter().map(|(_, units)| round2(*units)).collect(),
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
