//! Snapshot driven card board.
//!
//! A [`Dashboard`] turns each data snapshot into one card per category,
//! keeps the card text and estimated height current, and hands placement to
//! the [`MasonryLayout`] it owns.

use std::collections::HashMap;
use std::time::Instant;

use serde_json::Value;

use crate::error::{LayoutError, Result};
use crate::geometry::Size;
use crate::host::{DocumentTree, LayoutHost, NodeId};
use crate::layout::{MasonryConfig, MasonryLayout, PassOutcome};
use crate::logging::{LogLevel, Logger, event_with_fields, json_kv, json_str};
use crate::registry::{CardRegistry, CategoryId};
use crate::render::{CardContent, HeightMetrics, RendererRegistry};

const LOG_TARGET: &str = "card_masonry::dashboard";

/// What one snapshot changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DashboardUpdate {
    pub created: Vec<CategoryId>,
    pub updated: Vec<CategoryId>,
    pub removed: Vec<CategoryId>,
    /// Cards whose height was re-estimated for a new column width.
    pub rescaled: usize,
    /// Layout pass triggered by the changes, if any.
    pub outcome: Option<PassOutcome>,
}

impl DashboardUpdate {
    pub fn is_empty(&self) -> bool {
        self.created.is_empty()
            && self.updated.is_empty()
            && self.removed.is_empty()
            && self.rescaled == 0
    }
}

pub struct Dashboard {
    layout: MasonryLayout<DocumentTree>,
    renderers: RendererRegistry,
    cards: CardRegistry<NodeId>,
    /// Last rendered body per category, kept for re-estimating heights.
    bodies: HashMap<CategoryId, String>,
    metrics: HeightMetrics,
    /// Column width the current heights were estimated for.
    estimated_px: u32,
    logger: Option<Logger>,
    laid_out: bool,
}

impl Dashboard {
    /// Build an empty board over a fresh document of `viewport` size.
    pub fn new(viewport: Size, config: MasonryConfig, renderers: RendererRegistry) -> Result<Self> {
        let logger = config.logger.clone();
        let layout = MasonryLayout::new(DocumentTree::new(viewport), config)?;
        let estimated_px = layout.column_width();
        Ok(Self {
            layout,
            renderers,
            cards: CardRegistry::new(),
            bodies: HashMap::new(),
            metrics: HeightMetrics::default(),
            estimated_px,
            logger,
            laid_out: false,
        })
    }

    pub fn with_height_metrics(mut self, metrics: HeightMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    /// Render `snapshot` and reconcile the cards with it.
    ///
    /// A lone new card arriving after the first layout is appended to the
    /// shortest column; any other change triggers a full refresh.
    pub fn apply_snapshot(&mut self, snapshot: &Value) -> Result<DashboardUpdate> {
        if !snapshot.is_object() {
            return Err(LayoutError::InvalidSnapshot);
        }

        let rendered = self.renderers.render_all(snapshot);
        let present: Vec<&str> = rendered.iter().map(|(id, _)| id.as_str()).collect();
        let mut update = DashboardUpdate::default();

        for (category, node) in self.cards.retain(&present) {
            if !self.layout.remove_card(node) {
                self.layout.host_mut().detach(node)?;
            }
            self.bodies.remove(&category);
            update.removed.push(category);
        }

        let column_px = self.layout.column_width();
        if column_px != self.estimated_px {
            update.rescaled = self.reestimate()?;
        }

        let mut fresh = Vec::new();
        for (category, content) in &rendered {
            let height = self.metrics.estimate(&content.body, column_px);
            match self.cards.node_of(category) {
                Some(node) => {
                    if self.cards.sync(category, node, &content.as_text()) {
                        self.write_card(node, content, height)?;
                    }
                }
                None => {
                    let node = self.create_card(content, height)?;
                    self.cards.sync(category, node, &content.as_text());
                    update.created.push(category.clone());
                    fresh.push(node);
                }
            }
            self.bodies.insert(category.clone(), content.body.clone());
        }
        update.updated = self
            .cards
            .take_dirty()
            .into_iter()
            .filter(|id| !update.created.contains(id))
            .collect();

        update.outcome = match fresh.as_slice() {
            _ if update.is_empty() => None,
            [only]
                if self.laid_out
                    && update.updated.is_empty()
                    && update.removed.is_empty()
                    && update.rescaled == 0 =>
            {
                Some(self.layout.add_card(*only))
            }
            _ => Some(self.layout.refresh()),
        };
        if update.outcome.as_ref().is_some_and(PassOutcome::is_completed) {
            self.laid_out = true;
        }

        self.log(
            LogLevel::Debug,
            "snapshot_applied",
            [
                json_kv("created", update.created.len()),
                json_kv("updated", update.updated.len()),
                json_kv("removed", update.removed.len()),
                json_kv("rescaled", update.rescaled),
            ],
        );
        Ok(update)
    }

    /// Resize the viewport and queue a width change for the balancer.
    /// Height-only changes are not forwarded.
    pub fn resize(&mut self, viewport: Size, now: Instant) -> Result<()> {
        self.layout.ensure_active()?;
        self.layout.host_mut().set_viewport(viewport);
        self.layout.sync_viewport(now);
        Ok(())
    }

    /// Drive pending work. Returns the pass run, if one was due.
    ///
    /// When the pass changed the column width, card heights are estimated
    /// again and the cards are placed once more with the new heights.
    pub fn tick(&mut self, now: Instant) -> Option<PassOutcome> {
        let mut outcome = self.layout.poll(now)?;
        if outcome.is_completed() && self.layout.column_width() != self.estimated_px {
            match self.reestimate() {
                Ok(0) => {}
                Ok(rescaled) => {
                    self.log(LogLevel::Debug, "heights_rescaled", [json_kv("rescaled", rescaled)]);
                    outcome = self.layout.refresh();
                }
                Err(err) => self.log(
                    LogLevel::Warn,
                    "rescale_failed",
                    [json_str("error", err.to_string())],
                ),
            }
        }
        if let PassOutcome::Aborted(reason) = &outcome {
            self.log(
                LogLevel::Warn,
                "tick_aborted",
                [json_str("reason", reason.as_str())],
            );
        }
        Some(outcome)
    }

    pub fn card_for(&self, category: &str) -> Option<NodeId> {
        self.cards.node_of(category)
    }

    pub fn card_count(&self) -> usize {
        self.cards.len()
    }

    pub fn layout(&self) -> &MasonryLayout<DocumentTree> {
        &self.layout
    }

    pub fn layout_mut(&mut self) -> &mut MasonryLayout<DocumentTree> {
        &mut self.layout
    }

    /// Estimate every card's height again for the current column width.
    /// Returns how many heights changed.
    fn reestimate(&mut self) -> Result<usize> {
        let column_px = self.layout.column_width();
        let mut rescaled = 0;
        for (category, body) in &self.bodies {
            let Some(node) = self.cards.node_of(category) else {
                continue;
            };
            let height = self.metrics.estimate(body, column_px);
            let host = self.layout.host_mut();
            if host.height(node) != height {
                host.set_height(node, height)?;
                rescaled += 1;
            }
        }
        self.estimated_px = column_px;
        Ok(rescaled)
    }

    fn create_card(&mut self, content: &CardContent, height: u32) -> Result<NodeId> {
        let class = self.layout.config().filter.card_class().to_string();
        let host = self.layout.host_mut();
        let node = host.create_card(&class, height);
        host.set_text(node, content.as_text())?;
        let container = host.container();
        host.append_child(container, node)?;
        Ok(node)
    }

    fn write_card(&mut self, node: NodeId, content: &CardContent, height: u32) -> Result<()> {
        let host = self.layout.host_mut();
        host.set_text(node, content.as_text())?;
        host.set_height(node, height)
    }

    fn log<I>(&self, level: LogLevel, message: &str, fields: I)
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        if let Some(logger) = self.logger.as_ref() {
            let _ = logger.log_event(event_with_fields(level, LOG_TARGET, message, fields));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::SkipReason;
    use crate::logging::MemorySink;
    use crate::render::summary_renderer;
    use serde_json::json;
    use std::time::Duration;

    fn board(columns: usize) -> Dashboard {
        let mut renderers = RendererRegistry::new();
        renderers
            .register("sortie", summary_renderer("Sortie"))
            .register("alerts", summary_renderer("Alerts"))
            .register("fissures", summary_renderer("Fissures"));
        let config = MasonryConfig::default().with_columns(columns).with_gap(16);
        Dashboard::new(Size::new(1280, 900), config, renderers).unwrap()
    }

    #[test]
    fn first_snapshot_creates_and_places_cards() {
        let mut dash = board(2);
        let update = dash
            .apply_snapshot(&json!({
                "sortie": { "boss": "Vay Hek" },
                "alerts": ["Survival on Mot"],
                "fissures": ["Lith Capture", "Meso Defense", "Neo Survival"]
            }))
            .unwrap();

        assert_eq!(update.created, vec!["sortie", "alerts", "fissures"]);
        assert_eq!(
            update.outcome,
            Some(PassOutcome::Completed {
                placed: 3,
                columns: 2
            })
        );
        let sortie = dash.card_for("sortie").unwrap();
        assert_eq!(dash.layout().host().text(sortie), Some("Sortie\nboss: Vay Hek"));
        assert_eq!(dash.layout().assignment()[0][0], sortie);
    }

    #[test]
    fn unchanged_snapshot_does_nothing() {
        let mut dash = board(2);
        let snapshot = json!({ "alerts": ["Excavation"] });
        dash.apply_snapshot(&snapshot).unwrap();
        let update = dash.apply_snapshot(&snapshot).unwrap();
        assert!(update.is_empty());
        assert_eq!(update.outcome, None);
    }

    #[test]
    fn changed_content_updates_height_and_refreshes() {
        let mut dash = board(2);
        dash.apply_snapshot(&json!({ "fissures": ["Lith"] })).unwrap();
        let node = dash.card_for("fissures").unwrap();
        let before = dash.layout().host().height(node);

        let update = dash
            .apply_snapshot(&json!({ "fissures": ["Lith", "Meso", "Neo", "Axi"] }))
            .unwrap();
        assert_eq!(update.updated, vec!["fissures"]);
        assert!(dash.layout().host().height(node) > before);
        assert!(update.outcome.unwrap().is_completed());
    }

    #[test]
    fn lone_new_card_is_appended() {
        let mut dash = board(2);
        dash.apply_snapshot(&json!({ "sortie": "Defense" })).unwrap();
        let update = dash
            .apply_snapshot(&json!({ "sortie": "Defense", "alerts": ["Spy"] }))
            .unwrap();
        assert_eq!(
            update.outcome,
            Some(PassOutcome::Completed {
                placed: 1,
                columns: 2
            })
        );
        let alerts = dash.card_for("alerts").unwrap();
        assert_eq!(dash.layout().assignment()[1], vec![alerts]);
    }

    #[test]
    fn vanished_categories_are_removed() {
        let mut dash = board(2);
        dash.apply_snapshot(&json!({ "sortie": "Defense", "alerts": ["Spy"] }))
            .unwrap();
        let alerts = dash.card_for("alerts").unwrap();

        let update = dash.apply_snapshot(&json!({ "sortie": "Defense" })).unwrap();
        assert_eq!(update.removed, vec!["alerts"]);
        assert_eq!(dash.card_count(), 1);
        assert_eq!(dash.layout().host().parent(alerts), None);
        assert!(dash.layout().assignment().concat().len() == 1);
    }

    #[test]
    fn non_object_snapshot_is_rejected() {
        let mut dash = board(2);
        let err = dash.apply_snapshot(&json!([1, 2])).unwrap_err();
        assert!(matches!(err, LayoutError::InvalidSnapshot));
    }

    #[test]
    fn resize_applies_after_quiet_period() {
        let mut dash = board(5);
        dash.apply_snapshot(&json!({ "sortie": "Defense" })).unwrap();
        let start = Instant::now();

        dash.resize(Size::new(1280, 600), start).unwrap();
        assert!(!dash.layout().pending_width_change());

        dash.resize(Size::new(700, 600), start).unwrap();
        assert_eq!(dash.tick(start + Duration::from_millis(100)), None);
        let outcome = dash.tick(start + Duration::from_millis(260)).unwrap();
        assert!(outcome.is_completed());
        assert_eq!(dash.layout().column_count(), 2);
    }

    #[test]
    fn resize_reestimates_heights_for_new_column_width() {
        let mut dash = board(5);
        let body = "aaaa bbbb cccc dddd eeee ffff gggg hhhh";
        let snapshot = json!({ "sortie": body });
        dash.apply_snapshot(&snapshot).unwrap();
        let node = dash.card_for("sortie").unwrap();
        let narrow = dash.layout().host().height(node);
        assert_eq!(narrow, HeightMetrics::default().estimate(body, 243));

        let start = Instant::now();
        dash.resize(Size::new(700, 900), start).unwrap();
        let outcome = dash.tick(start + Duration::from_millis(300)).unwrap();
        assert!(outcome.is_completed());
        assert_eq!(dash.layout().column_width(), 342);

        let wide = dash.layout().host().height(node);
        assert_eq!(wide, HeightMetrics::default().estimate(body, 342));
        assert!(wide < narrow);
        assert_eq!(dash.layout().column_height(0), wide + 16);

        let update = dash.apply_snapshot(&snapshot).unwrap();
        assert!(update.is_empty());
        assert_eq!(update.outcome, None);
    }

    #[test]
    fn snapshots_after_destroy_only_track_content() {
        let sink = MemorySink::new();
        let mut renderers = RendererRegistry::new();
        renderers.register("alerts", summary_renderer("Alerts"));
        let config = MasonryConfig::default()
            .with_columns(2)
            .with_logger(Logger::new(sink.clone()));
        let mut dash = Dashboard::new(Size::new(1000, 800), config, renderers).unwrap();
        dash.layout_mut().destroy();
        assert!(matches!(
            dash.resize(Size::new(600, 800), Instant::now()),
            Err(LayoutError::Destroyed)
        ));

        let update = dash.apply_snapshot(&json!({ "alerts": ["Spy"] })).unwrap();
        assert_eq!(
            update.outcome,
            Some(PassOutcome::Skipped(SkipReason::NotActive))
        );
        assert!(sink.messages().contains(&"snapshot_applied".to_string()));
    }
}
