//! Width to column-count policies.
//!
//! Two policies are supported:
//! - fixed thresholds (`< 600px → 1`, `< 900px → 2`, …), the default
//! - minimum column width, capped at a maximum number of columns
//!
//! Both are guaranteed to return at least one column and never to return
//! fewer columns for a wider container.

use serde::Deserialize;

use crate::error::{LayoutError, Result};

/// Upper width bound (exclusive) and the column count used below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Breakpoint {
    pub max_width: u32,
    pub columns: usize,
}

impl Breakpoint {
    pub const fn new(max_width: u32, columns: usize) -> Self {
        Self { max_width, columns }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Policy {
    Fixed {
        thresholds: Vec<Breakpoint>,
        fallback: usize,
    },
    MinColumnWidth {
        min_px: u32,
        gap_px: u32,
        max_columns: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakpointTable {
    policy: Policy,
}

impl Default for BreakpointTable {
    fn default() -> Self {
        Self {
            policy: Policy::Fixed {
                thresholds: vec![
                    Breakpoint::new(600, 1),
                    Breakpoint::new(900, 2),
                    Breakpoint::new(1200, 3),
                    Breakpoint::new(1600, 4),
                ],
                fallback: 5,
            },
        }
    }
}

impl BreakpointTable {
    /// Fixed threshold table. Widths must strictly increase and column counts
    /// must never decrease, ending at `fallback` for anything wider.
    pub fn fixed(thresholds: Vec<Breakpoint>, fallback: usize) -> Result<Self> {
        if fallback == 0 {
            return Err(LayoutError::InvalidConfig(
                "fallback column count must be at least 1".into(),
            ));
        }

        let mut previous: Option<Breakpoint> = None;
        for bp in &thresholds {
            if bp.columns == 0 {
                return Err(LayoutError::InvalidConfig(format!(
                    "breakpoint below {}px maps to zero columns",
                    bp.max_width
                )));
            }
            if let Some(prev) = previous {
                if bp.max_width <= prev.max_width {
                    return Err(LayoutError::InvalidConfig(format!(
                        "breakpoint widths must increase ({} after {})",
                        bp.max_width, prev.max_width
                    )));
                }
                if bp.columns < prev.columns {
                    return Err(LayoutError::InvalidConfig(format!(
                        "breakpoint below {}px has fewer columns than the one before it",
                        bp.max_width
                    )));
                }
            }
            previous = Some(*bp);
        }

        if let Some(last) = previous {
            if fallback < last.columns {
                return Err(LayoutError::InvalidConfig(format!(
                    "fallback of {fallback} columns is below the last breakpoint's {}",
                    last.columns
                )));
            }
        }

        Ok(Self {
            policy: Policy::Fixed {
                thresholds,
                fallback,
            },
        })
    }

    /// As many columns of at least `min_px` as fit, up to `max_columns`.
    pub fn min_column_width(min_px: u32, gap_px: u32, max_columns: usize) -> Result<Self> {
        if min_px == 0 {
            return Err(LayoutError::InvalidConfig(
                "minimum column width must be positive".into(),
            ));
        }
        if max_columns == 0 {
            return Err(LayoutError::InvalidConfig(
                "maximum column count must be at least 1".into(),
            ));
        }
        Ok(Self {
            policy: Policy::MinColumnWidth {
                min_px,
                gap_px,
                max_columns,
            },
        })
    }

    pub fn columns_for(&self, width: u32) -> usize {
        match &self.policy {
            Policy::Fixed {
                thresholds,
                fallback,
            } => thresholds
                .iter()
                .find(|bp| width < bp.max_width)
                .map(|bp| bp.columns)
                .unwrap_or(*fallback),
            Policy::MinColumnWidth {
                min_px,
                gap_px,
                max_columns,
            } => {
                let fitting = (width as u64 + *gap_px as u64) / (*min_px as u64 + *gap_px as u64);
                (fitting as usize).clamp(1, *max_columns)
            }
        }
    }

    /// Largest column count this table can produce.
    pub fn max_columns(&self) -> usize {
        match &self.policy {
            Policy::Fixed { fallback, .. } => *fallback,
            Policy::MinColumnWidth { max_columns, .. } => *max_columns,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_matches_dashboard_thresholds() {
        let table = BreakpointTable::default();
        assert_eq!(table.columns_for(0), 1);
        assert_eq!(table.columns_for(500), 1);
        assert_eq!(table.columns_for(600), 2);
        assert_eq!(table.columns_for(1000), 3);
        assert_eq!(table.columns_for(1599), 4);
        assert_eq!(table.columns_for(1600), 5);
        assert_eq!(table.columns_for(4000), 5);
        assert_eq!(table.max_columns(), 5);
    }

    #[test]
    fn wider_never_means_fewer_columns() {
        let fixed = BreakpointTable::default();
        let fluid = BreakpointTable::min_column_width(280, 24, 6).unwrap();
        for table in [fixed, fluid] {
            let mut previous = table.columns_for(0);
            for width in (0..5000).step_by(7) {
                let columns = table.columns_for(width);
                assert!(columns >= previous, "width {width} dropped columns");
                assert!(columns >= 1);
                previous = columns;
            }
        }
    }

    #[test]
    fn min_column_width_counts_gaps() {
        let table = BreakpointTable::min_column_width(300, 20, 4).unwrap();
        assert_eq!(table.columns_for(299), 1);
        assert_eq!(table.columns_for(620), 2);
        assert_eq!(table.columns_for(619), 1);
        assert_eq!(table.columns_for(10_000), 4);
    }

    #[test]
    fn fixed_rejects_non_monotonic_tables() {
        let shrinking = vec![Breakpoint::new(600, 3), Breakpoint::new(900, 2)];
        assert!(matches!(
            BreakpointTable::fixed(shrinking, 4),
            Err(LayoutError::InvalidConfig(_))
        ));

        let unordered = vec![Breakpoint::new(900, 1), Breakpoint::new(600, 2)];
        assert!(BreakpointTable::fixed(unordered, 3).is_err());

        let low_fallback = vec![Breakpoint::new(600, 3)];
        assert!(BreakpointTable::fixed(low_fallback, 2).is_err());

        assert!(BreakpointTable::fixed(vec![Breakpoint::new(600, 0)], 1).is_err());
        assert!(BreakpointTable::fixed(Vec::new(), 0).is_err());
        assert!(BreakpointTable::min_column_width(0, 10, 3).is_err());
    }

    #[test]
    fn empty_fixed_table_uses_fallback() {
        let table = BreakpointTable::fixed(Vec::new(), 2).unwrap();
        assert_eq!(table.columns_for(10), 2);
    }
}
