//! Lifecycle audit hooks for [`MasonryLayout`](crate::MasonryLayout).
//!
//! Records capture a stage plus structured details so callers can buffer or
//! assert on the layout's progression without scraping log output.

use std::sync::Mutex;
use std::time::SystemTime;

use serde_json::Value;

/// Checkpoints emitted by the layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutAuditStage {
    /// Wrapper and columns were built and the width listener registered.
    Constructed,
    /// A leftover wrapper from an earlier instance was dissolved.
    StaleWrapperCleared,
    /// A debounced width change was applied.
    ColumnsUpdated,
    /// Columns were torn down and rebuilt at a new count.
    ColumnsRebuilt,
    /// A refresh pass placed every eligible card.
    RefreshCompleted,
    /// A single card was appended to the shortest column.
    CardAdded,
    /// A card was taken out of the layout.
    CardRemoved,
    /// A pass gave up after the host tree changed underneath it.
    PassAborted,
    /// Layout dissolved and listener released.
    Destroyed,
}

#[derive(Debug, Clone)]
pub struct LayoutAuditEvent {
    pub timestamp: SystemTime,
    pub stage: LayoutAuditStage,
    pub details: Vec<(String, Value)>,
}

impl LayoutAuditEvent {
    pub fn new(stage: LayoutAuditStage) -> Self {
        Self {
            timestamp: SystemTime::now(),
            stage,
            details: Vec::new(),
        }
    }

    pub fn detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.push((key.into(), value.into()));
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.details
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, value)| value)
    }
}

pub trait LayoutAudit: Send + Sync {
    fn record(&self, event: LayoutAuditEvent);
}

/// Default sink used when auditing is disabled.
#[derive(Debug, Default)]
pub struct NullLayoutAudit;

impl LayoutAudit for NullLayoutAudit {
    fn record(&self, _event: LayoutAuditEvent) {}
}

/// Buffers every event in memory.
#[derive(Debug, Default)]
pub struct RecordingAudit {
    events: Mutex<Vec<LayoutAuditEvent>>,
}

impl RecordingAudit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<LayoutAuditEvent> {
        self.events
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    pub fn stages(&self) -> Vec<LayoutAuditStage> {
        self.events().into_iter().map(|event| event.stage).collect()
    }

    pub fn count(&self, stage: LayoutAuditStage) -> usize {
        self.events()
            .iter()
            .filter(|event| event.stage == stage)
            .count()
    }
}

impl LayoutAudit for RecordingAudit {
    fn record(&self, event: LayoutAuditEvent) {
        if let Ok(mut guard) = self.events.lock() {
            guard.push(event);
        }
    }
}
