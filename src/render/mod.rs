//! Card rendering collaborators: pure per-category renderers and the text
//! measurement that turns their output into a card height.

mod cards;
mod text;

pub use cards::{CardContent, CardRenderer, RendererRegistry, summary_renderer};
pub use text::{HeightMetrics, display_width, wrap_to_width};
