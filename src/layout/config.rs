use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Deserialize;

use crate::audit::{LayoutAudit, NullLayoutAudit};
use crate::eligibility::CardFilter;
use crate::error::{LayoutError, Result};
use crate::logging::Logger;
use crate::metrics::LayoutMetrics;

use super::breakpoints::{Breakpoint, BreakpointTable};

pub const DEFAULT_COLUMNS: usize = 5;
pub const DEFAULT_GAP_PX: u32 = 24;
pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(250);
pub const DEFAULT_WIDTH_THRESHOLD_PX: u32 = 50;
pub const WRAPPER_CLASS: &str = "masonry-wrapper";
pub const COLUMN_CLASS: &str = "masonry-column";
pub const WORLD_CYCLES_CLASS: &str = "world-cycles-container";

/// Configuration knobs for a [`MasonryLayout`](crate::MasonryLayout).
#[derive(Clone)]
pub struct MasonryConfig {
    /// Initial column count. Later driven by `breakpoints`.
    pub column_count: usize,
    /// Vertical gap counted once per card when measuring a column.
    pub gap_px: u32,
    /// Width signals are coalesced until quiet for this long.
    pub quiet_period: Duration,
    /// Width changes smaller than this are ignored.
    pub width_threshold_px: u32,
    pub breakpoints: BreakpointTable,
    pub filter: CardFilter,
    /// The wrapper is inserted after the first container child carrying this class.
    pub anchor_class: Option<String>,
    pub wrapper_class: String,
    pub column_class: String,
    /// Optional structured logger used by the layout.
    pub logger: Option<Logger>,
    pub metrics: Option<Arc<Mutex<LayoutMetrics>>>,
    pub metrics_target: String,
    pub audit: Arc<dyn LayoutAudit>,
}

impl Default for MasonryConfig {
    fn default() -> Self {
        Self {
            column_count: DEFAULT_COLUMNS,
            gap_px: DEFAULT_GAP_PX,
            quiet_period: DEFAULT_QUIET_PERIOD,
            width_threshold_px: DEFAULT_WIDTH_THRESHOLD_PX,
            breakpoints: BreakpointTable::default(),
            filter: CardFilter::default(),
            anchor_class: Some(WORLD_CYCLES_CLASS.to_string()),
            wrapper_class: WRAPPER_CLASS.to_string(),
            column_class: COLUMN_CLASS.to_string(),
            logger: None,
            metrics: None,
            metrics_target: "card_masonry::layout.metrics".to_string(),
            audit: Arc::new(NullLayoutAudit),
        }
    }
}

impl fmt::Debug for MasonryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MasonryConfig")
            .field("column_count", &self.column_count)
            .field("gap_px", &self.gap_px)
            .field("quiet_period", &self.quiet_period)
            .field("width_threshold_px", &self.width_threshold_px)
            .field("breakpoints", &self.breakpoints)
            .field("filter", &self.filter)
            .field("anchor_class", &self.anchor_class)
            .field("wrapper_class", &self.wrapper_class)
            .field("column_class", &self.column_class)
            .field("logging", &self.logger.is_some())
            .field("metrics", &self.metrics.is_some())
            .finish_non_exhaustive()
    }
}

impl MasonryConfig {
    pub fn with_columns(mut self, column_count: usize) -> Self {
        self.column_count = column_count;
        self
    }

    pub fn with_gap(mut self, gap_px: u32) -> Self {
        self.gap_px = gap_px;
        self
    }

    pub fn with_quiet_period(mut self, quiet_period: Duration) -> Self {
        self.quiet_period = quiet_period;
        self
    }

    pub fn with_width_threshold(mut self, threshold_px: u32) -> Self {
        self.width_threshold_px = threshold_px;
        self
    }

    pub fn with_breakpoints(mut self, breakpoints: BreakpointTable) -> Self {
        self.breakpoints = breakpoints;
        self
    }

    pub fn with_filter(mut self, filter: CardFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_anchor(mut self, anchor_class: Option<&str>) -> Self {
        self.anchor_class = anchor_class.map(str::to_string);
        self
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn with_audit(mut self, audit: Arc<dyn LayoutAudit>) -> Self {
        self.audit = audit;
        self
    }

    /// Enable metrics collection if it has not already been configured.
    pub fn enable_metrics(&mut self) {
        if self.metrics.is_none() {
            self.metrics = Some(Arc::new(Mutex::new(LayoutMetrics::new())));
        }
    }

    pub fn metrics_handle(&self) -> Option<Arc<Mutex<LayoutMetrics>>> {
        self.metrics.as_ref().map(Arc::clone)
    }

    pub fn validate(&self) -> Result<()> {
        if self.column_count == 0 {
            return Err(LayoutError::InvalidConfig(
                "column count must be at least 1".into(),
            ));
        }
        if self.wrapper_class.trim().is_empty() || self.column_class.trim().is_empty() {
            return Err(LayoutError::InvalidConfig(
                "wrapper and column classes must not be empty".into(),
            ));
        }
        if self.wrapper_class == self.column_class {
            return Err(LayoutError::InvalidConfig(
                "wrapper and column classes must differ".into(),
            ));
        }
        Ok(())
    }
}

/// Serializable breakpoint policy as it appears in settings files.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum BreakpointSettings {
    Fixed {
        thresholds: Vec<Breakpoint>,
        fallback: usize,
    },
    MinColumnWidth {
        min_px: u32,
        max_columns: usize,
    },
}

/// File-loadable subset of [`MasonryConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LayoutSettings {
    pub column_count: usize,
    pub gap_px: u32,
    pub quiet_period_ms: u64,
    pub width_threshold_px: u32,
    pub breakpoints: Option<BreakpointSettings>,
    pub card_class: String,
    pub excluded_region_class: Option<String>,
    pub anchor_class: Option<String>,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            column_count: DEFAULT_COLUMNS,
            gap_px: DEFAULT_GAP_PX,
            quiet_period_ms: DEFAULT_QUIET_PERIOD.as_millis() as u64,
            width_threshold_px: DEFAULT_WIDTH_THRESHOLD_PX,
            breakpoints: None,
            card_class: "card".to_string(),
            excluded_region_class: Some(WORLD_CYCLES_CLASS.to_string()),
            anchor_class: Some(WORLD_CYCLES_CLASS.to_string()),
        }
    }
}

impl LayoutSettings {
    pub fn from_json_str(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Build a validated runtime config. Logger, metrics and audit keep their defaults.
    pub fn into_config(self) -> Result<MasonryConfig> {
        let breakpoints = match self.breakpoints {
            None => BreakpointTable::default(),
            Some(BreakpointSettings::Fixed {
                thresholds,
                fallback,
            }) => BreakpointTable::fixed(thresholds, fallback)?,
            Some(BreakpointSettings::MinColumnWidth {
                min_px,
                max_columns,
            }) => BreakpointTable::min_column_width(min_px, self.gap_px, max_columns)?,
        };

        let config = MasonryConfig {
            column_count: self.column_count,
            gap_px: self.gap_px,
            quiet_period: Duration::from_millis(self.quiet_period_ms),
            width_threshold_px: self.width_threshold_px,
            breakpoints,
            filter: CardFilter::new(self.card_class, self.excluded_region_class.as_deref()),
            anchor_class: self.anchor_class,
            ..MasonryConfig::default()
        };
        config.validate()?;
        Ok(config)
    }
}
