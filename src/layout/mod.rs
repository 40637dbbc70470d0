//! Masonry layout module orchestrator.
//!
//! Downstream code imports layout types from here while the balancer itself
//! lives in the private `masonry` module.

pub mod breakpoints;
pub mod config;
pub mod debounce;
mod masonry;

pub use breakpoints::{Breakpoint, BreakpointTable};
pub use config::{BreakpointSettings, LayoutSettings, MasonryConfig};
pub use debounce::Debouncer;
pub use masonry::{LayoutState, MasonryLayout, PassOutcome, SkipReason};
