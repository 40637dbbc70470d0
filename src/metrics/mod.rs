use crate::logging::{LogEvent, LogFields, LogLevel};
use serde_json::json;
use std::time::Duration;

/// Counters describing the work done by a masonry layout.
#[derive(Debug, Default, Clone)]
pub struct LayoutMetrics {
    refreshes: u64,
    rebuilds: u64,
    cards_placed: u64,
    skipped_passes: u64,
    aborted_passes: u64,
    width_signals: u64,
    suppressed_width_changes: u64,
}

impl LayoutMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_refresh(&mut self, placed: usize) {
        self.refreshes = self.refreshes.saturating_add(1);
        self.record_placements(placed);
    }

    pub fn record_placements(&mut self, placed: usize) {
        self.cards_placed = self.cards_placed.saturating_add(placed as u64);
    }

    pub fn record_rebuild(&mut self) {
        self.rebuilds = self.rebuilds.saturating_add(1);
    }

    pub fn record_skip(&mut self) {
        self.skipped_passes = self.skipped_passes.saturating_add(1);
    }

    pub fn record_abort(&mut self) {
        self.aborted_passes = self.aborted_passes.saturating_add(1);
    }

    pub fn record_width_signal(&mut self) {
        self.width_signals = self.width_signals.saturating_add(1);
    }

    pub fn record_suppressed_width(&mut self) {
        self.suppressed_width_changes = self.suppressed_width_changes.saturating_add(1);
    }

    pub fn snapshot(&self, uptime: Duration) -> MetricSnapshot {
        MetricSnapshot {
            uptime_ms: uptime.as_millis() as u64,
            refreshes: self.refreshes,
            rebuilds: self.rebuilds,
            cards_placed: self.cards_placed,
            skipped_passes: self.skipped_passes,
            aborted_passes: self.aborted_passes,
            width_signals: self.width_signals,
            suppressed_width_changes: self.suppressed_width_changes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricSnapshot {
    pub uptime_ms: u64,
    pub refreshes: u64,
    pub rebuilds: u64,
    pub cards_placed: u64,
    pub skipped_passes: u64,
    pub aborted_passes: u64,
    pub width_signals: u64,
    pub suppressed_width_changes: u64,
}

impl MetricSnapshot {
    pub fn to_log_event(&self, target: &str) -> LogEvent {
        LogEvent::with_fields(LogLevel::Info, target, "layout_metrics", self.as_fields())
    }

    pub fn as_fields(&self) -> LogFields {
        let mut map = LogFields::new();
        map.insert("uptime_ms".to_string(), json!(self.uptime_ms));
        map.insert("refreshes".to_string(), json!(self.refreshes));
        map.insert("rebuilds".to_string(), json!(self.rebuilds));
        map.insert("cards_placed".to_string(), json!(self.cards_placed));
        map.insert("skipped_passes".to_string(), json!(self.skipped_passes));
        map.insert("aborted_passes".to_string(), json!(self.aborted_passes));
        map.insert("width_signals".to_string(), json!(self.width_signals));
        map.insert(
            "suppressed_width_changes".to_string(),
            json!(self.suppressed_width_changes),
        );
        map
    }
}
