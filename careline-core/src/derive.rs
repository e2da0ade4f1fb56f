//! Dashboard derivation
//!
//! One pass turns a loaded [`MessageStore`] into a [`DashboardView`]:
//!
//! 1. KPI timeline scan
//! 2. Event loop: classify, then enrich each qualifying message
//! 3. Workload analytics
//! 4. Assemble the view model
//!
//! Every pass recomputes from scratch; nothing is cached between passes and
//! the store is never mutated. [`build_view`] is the presentation boundary:
//! it never returns an error, falling back to [`DashboardView::empty`] when
//! the source cannot be loaded.

use crate::analytics::WorkloadTally;
use crate::classify::{Classification, TopicTable};
use crate::config::DerivationConfig;
use crate::enrich::Enricher;
use crate::kpi::KpiTimeline;
use crate::store::MessageStore;
use crate::types::{
    DashboardView, Group, ModalData, OrderedMap, TimelineEvent, TraceStory, EVENT_START_FORMAT,
};
use std::path::Path;

/// Counters for one derivation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeriveStats {
    pub messages: usize,
    pub events: usize,
    /// Topic unmapped or unrecognised
    pub excluded: usize,
    /// Missing or unparsable timestamp
    pub skipped: usize,
    /// Enrichment failed
    pub dropped: usize,
}

/// Derive the view model from a loaded store.
pub fn derive(store: &MessageStore, config: &DerivationConfig) -> DashboardView {
    derive_with_stats(store, config).0
}

/// [`derive`], also returning pass counters.
pub fn derive_with_stats(
    store: &MessageStore,
    config: &DerivationConfig,
) -> (DashboardView, DeriveStats) {
    let messages = store.messages();
    let table = config.topic_table();

    let kpi_timeline = KpiTimeline::build(messages);
    let (events, stories, mut stats) = build_events(store, &table, config.max_trace_depth);
    let analytics = WorkloadTally::from_messages(messages, config.per_message_cost).to_analytics();

    stats.messages = messages.len();
    tracing::info!(
        messages = stats.messages,
        events = stats.events,
        excluded = stats.excluded,
        skipped = stats.skipped,
        dropped = stats.dropped,
        kpi_days = kpi_timeline.snapshots().len(),
        "Derivation complete"
    );

    let view = DashboardView {
        events,
        kpis: kpi_timeline.latest(),
        timeline_kpis: kpi_timeline.into_snapshots(),
        analytics,
        groups: Group::all(),
        stories,
    };
    (view, stats)
}

fn build_events(
    store: &MessageStore,
    table: &TopicTable,
    max_trace_depth: usize,
) -> (Vec<TimelineEvent>, OrderedMap<TraceStory>, DeriveStats) {
    let messages = store.messages();
    let enricher = Enricher::new(messages, max_trace_depth);
    let mut events = Vec::new();
    let mut stories = OrderedMap::new();
    let mut stats = DeriveStats::default();

    for (index, msg) in messages.iter().enumerate() {
        let Classification::Mapped { topic, mapping } = table.classify_message(msg) else {
            tracing::debug!(message_id = msg.id, topic = ?msg.topic, "Topic excluded from timeline");
            stats.excluded += 1;
            continue;
        };

        let start = match msg.parsed_timestamp() {
            Ok(ts) => ts.format(EVENT_START_FORMAT).to_string(),
            Err(e) => {
                tracing::warn!(message_id = msg.id, error = %e, "Skipping timeline event");
                stats.skipped += 1;
                continue;
            }
        };

        let modal_data = match enricher.enrich(index, topic) {
            Ok(data) => data,
            Err(e) => {
                tracing::error!(message_id = msg.id, %topic, error = %e, "Dropping timeline event");
                stats.dropped += 1;
                continue;
            }
        };

        let trace_id = match &modal_data {
            ModalData::MedicalDecision { trace_chain, .. } => {
                let trace_id = format!("trace_{}", msg.id);
                stories.insert(trace_id.clone(), TraceStory::from_chain(trace_chain));
                Some(trace_id)
            }
            _ => None,
        };

        events.push(TimelineEvent {
            id: msg.id,
            display_label: mapping.label.clone(),
            visual_class: mapping.class,
            group: mapping.class,
            start,
            trace_id,
            modal_data,
        });
        stats.events += 1;
    }

    (events, stories, stats)
}

/// Load `path` and derive its view model.
///
/// Load failures are logged and produce [`DashboardView::empty`].
pub fn build_view(path: &Path, config: &DerivationConfig) -> DashboardView {
    match MessageStore::load(path) {
        Ok(store) => derive(&store, config),
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "Failed to load messages");
            DashboardView::empty()
        }
    }
}
