//! Masonry column balancing for card dashboards.
//!
//! [`MasonryLayout`] deals cards out to the shortest of N columns and keeps
//! N in step with the container width. It works against any tree that
//! implements [`LayoutHost`]; [`DocumentTree`] is the in-memory one.
//! [`Dashboard`] sits on top and turns data snapshots into cards.

pub mod audit;
pub mod dashboard;
pub mod eligibility;
pub mod error;
pub mod geometry;
pub mod host;
pub mod layout;
pub mod logging;
pub mod metrics;
pub mod preferences;
pub mod registry;
pub mod render;

pub use audit::{LayoutAudit, LayoutAuditEvent, LayoutAuditStage, NullLayoutAudit, RecordingAudit};
pub use dashboard::{Dashboard, DashboardUpdate};
pub use eligibility::{CardFilter, CardPredicate};
pub use error::{LayoutError, Result};
pub use geometry::{Size, column_width};
pub use host::{DocumentTree, LayoutHost, ListenerId, NodeId};
pub use layout::{
    Breakpoint, BreakpointSettings, BreakpointTable, Debouncer, LayoutSettings, LayoutState,
    MasonryConfig, MasonryLayout, PassOutcome, SkipReason,
};
pub use logging::{
    FileSink, LogEvent, LogFields, LogLevel, LogSink, Logger, LoggingError, LoggingResult,
    MemorySink,
};
pub use metrics::{LayoutMetrics, MetricSnapshot};
pub use preferences::{JsonFileStore, MemoryStore, PreferenceStore, UiPreferences};
pub use registry::{CardRegistry, CategoryId};
pub use render::{
    CardContent, HeightMetrics, RendererRegistry, display_width, summary_renderer, wrap_to_width,
};
