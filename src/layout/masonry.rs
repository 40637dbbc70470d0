use std::collections::{HashMap, HashSet};
use std::time::Instant;

use serde_json::Value;

use crate::audit::{LayoutAuditEvent, LayoutAuditStage};
use crate::eligibility::CardPredicate;
use crate::error::{LayoutError, Result};
use crate::geometry::column_width;
use crate::host::{LayoutHost, ListenerId};
use crate::logging::{LogLevel, event_with_fields, json_kv, json_str};
use crate::metrics::LayoutMetrics;

use super::config::MasonryConfig;
use super::debounce::Debouncer;

const LOG_TARGET: &str = "card_masonry::layout";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutState {
    Uninitialized,
    Active,
    Destroyed,
}

/// Why an operation returned without touching the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotActive,
    MissingWrapper,
    Ineligible,
    AlreadyPlaced,
    UnknownCard,
    WidthJitter,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::NotActive => "not_active",
            SkipReason::MissingWrapper => "missing_wrapper",
            SkipReason::Ineligible => "ineligible",
            SkipReason::AlreadyPlaced => "already_placed",
            SkipReason::UnknownCard => "unknown_card",
            SkipReason::WidthJitter => "width_jitter",
        }
    }

    fn level(&self) -> LogLevel {
        match self {
            SkipReason::NotActive | SkipReason::MissingWrapper => LogLevel::Warn,
            _ => LogLevel::Debug,
        }
    }
}

/// Result of a layout pass. Passes never fail loudly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassOutcome {
    Completed { placed: usize, columns: usize },
    Skipped(SkipReason),
    /// The host tree changed underneath the pass. Every card was returned to
    /// the container and the column structure dropped.
    Aborted(String),
}

impl PassOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, PassOutcome::Completed { .. })
    }
}

/// Greedy shortest-column card balancer.
///
/// Cards are placed one at a time into whichever column is currently
/// shortest, ties going to the lowest index. The column count follows the
/// container width through the configured breakpoint table.
///
/// While the layout is active it is the only thing allowed to reparent cards
/// in the host container. Use [`MasonryLayout::add_card`] and
/// [`MasonryLayout::remove_card`] rather than moving cards through
/// [`MasonryLayout::host_mut`], or cards can be lost from the balance.
pub struct MasonryLayout<H: LayoutHost> {
    host: H,
    config: MasonryConfig,
    predicate: Box<dyn CardPredicate<H>>,
    state: LayoutState,
    wrapper: Option<H::Node>,
    columns: Vec<H::Node>,
    cards: Vec<H::Node>,
    listener: Option<ListenerId>,
    debouncer: Debouncer,
    last_width: u32,
    started_at: Instant,
}

impl<H: LayoutHost> MasonryLayout<H> {
    /// Build the wrapper and columns inside `host`'s container and start
    /// listening for width changes. Cards are distributed by [`refresh`](Self::refresh).
    pub fn new(host: H, config: MasonryConfig) -> Result<Self> {
        let filter = config.filter.clone();
        Self::with_predicate(host, config, filter)
    }

    pub fn with_predicate<P>(host: H, config: MasonryConfig, predicate: P) -> Result<Self>
    where
        P: CardPredicate<H> + 'static,
    {
        let mut layout = Self::deferred_with_predicate(host, config, predicate)?;
        layout.init()?;
        Ok(layout)
    }

    /// Validate the config without touching the host. Call [`init`](Self::init) later.
    pub fn deferred(host: H, config: MasonryConfig) -> Result<Self> {
        let filter = config.filter.clone();
        Self::deferred_with_predicate(host, config, filter)
    }

    fn deferred_with_predicate<P>(host: H, config: MasonryConfig, predicate: P) -> Result<Self>
    where
        P: CardPredicate<H> + 'static,
    {
        config.validate()?;
        let debouncer = Debouncer::new(config.quiet_period);
        Ok(Self {
            host,
            config,
            predicate: Box::new(predicate),
            state: LayoutState::Uninitialized,
            wrapper: None,
            columns: Vec::new(),
            cards: Vec::new(),
            listener: None,
            debouncer,
            last_width: 0,
            started_at: Instant::now(),
        })
    }

    /// Build step. A no-op once active; a destroyed layout cannot come back.
    pub fn init(&mut self) -> Result<()> {
        match self.state {
            LayoutState::Active => return Ok(()),
            LayoutState::Destroyed => return Err(LayoutError::Destroyed),
            LayoutState::Uninitialized => {}
        }

        self.clear_stale_wrappers()?;
        if let Err(err) = self.build_columns() {
            let _ = self.dissolve();
            return Err(err);
        }

        self.listener = Some(self.host.add_width_listener());
        self.last_width = self.host.width(self.host.container());
        self.state = LayoutState::Active;
        self.started_at = Instant::now();

        self.log_layout_event(
            LogLevel::Info,
            "layout_constructed",
            [
                json_kv("columns", self.columns.len()),
                json_kv("gap_px", self.config.gap_px),
                json_kv("width", self.last_width),
            ],
        );
        self.audit(
            LayoutAuditEvent::new(LayoutAuditStage::Constructed)
                .detail("columns", self.columns.len()),
        );
        Ok(())
    }

    /// Return every card to the container, then deal the eligible ones out
    /// to the shortest column one by one.
    pub fn refresh(&mut self) -> PassOutcome {
        if let Some(reason) = self.precondition() {
            return self.skip("refresh", reason);
        }

        match self.try_refresh() {
            Ok(placed) => {
                self.with_metrics(|m| m.record_refresh(placed));
                self.log_layout_event(
                    LogLevel::Debug,
                    "refresh_completed",
                    [
                        json_kv("placed", placed),
                        json_kv("columns", self.columns.len()),
                    ],
                );
                self.audit(
                    LayoutAuditEvent::new(LayoutAuditStage::RefreshCompleted)
                        .detail("placed", placed)
                        .detail("columns", self.columns.len()),
                );
                PassOutcome::Completed {
                    placed,
                    columns: self.columns.len(),
                }
            }
            Err(err) => self.salvage("refresh", &err),
        }
    }

    /// Sum of card heights plus one gap per card. Zero for unknown columns.
    pub fn column_height(&self, index: usize) -> u32 {
        let Some(column) = self.columns.get(index) else {
            return 0;
        };
        self.host
            .children(*column)
            .into_iter()
            .map(|card| self.host.height(card).saturating_add(self.config.gap_px))
            .fold(0, u32::saturating_add)
    }

    /// First column with the smallest height.
    pub fn shortest_column_index(&self) -> usize {
        let mut index = 0;
        let mut best = self.column_height(0);
        for candidate in 1..self.columns.len() {
            let height = self.column_height(candidate);
            if height < best {
                best = height;
                index = candidate;
            }
        }
        index
    }

    /// Record a viewport width signal. Work happens in [`poll`](Self::poll)
    /// once the signal has been quiet for the configured period.
    pub fn handle_width_change(&mut self, width: u32, now: Instant) {
        if self.state != LayoutState::Active {
            return;
        }
        self.debouncer.signal(width, now);
        self.with_metrics(|m| m.record_width_signal());
        self.log_layout_event(LogLevel::Trace, "width_signal", [json_kv("width", width)]);
    }

    /// Drain the host's width notifications for this layout and, if the
    /// viewport changed, signal its current width.
    pub fn sync_viewport(&mut self, now: Instant) -> bool {
        let Some(listener) = self.listener else {
            return false;
        };
        if !self.host.take_width_change(listener) {
            return false;
        }
        let width = self.host.viewport_width();
        self.handle_width_change(width, now);
        true
    }

    /// Apply the pending width change if its quiet period has elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<PassOutcome> {
        if self.state != LayoutState::Active {
            self.debouncer.cancel();
            return None;
        }
        let width = self.debouncer.poll(now)?;
        Some(self.apply_width(width))
    }

    pub fn pending_width_change(&self) -> bool {
        self.debouncer.is_pending()
    }

    fn apply_width(&mut self, width: u32) -> PassOutcome {
        let delta = width.abs_diff(self.last_width);
        if delta < self.config.width_threshold_px && self.wrapper.is_some() {
            self.with_metrics(|m| m.record_suppressed_width());
            self.log_layout_event(
                LogLevel::Debug,
                "width_change_suppressed",
                [json_kv("width", width), json_kv("delta", delta)],
            );
            return PassOutcome::Skipped(SkipReason::WidthJitter);
        }
        self.last_width = width;
        self.update_columns(width)
    }

    /// Recompute the column count for `width`. Rebuilds the columns when the
    /// count changes (or the structure was lost), otherwise just rebalances.
    pub fn update_columns(&mut self, width: u32) -> PassOutcome {
        if self.state != LayoutState::Active {
            return self.skip("update_columns", SkipReason::NotActive);
        }

        let target = self.config.breakpoints.columns_for(width);
        self.audit(
            LayoutAuditEvent::new(LayoutAuditStage::ColumnsUpdated)
                .detail("width", width)
                .detail("columns", target),
        );

        if target == self.config.column_count && self.wrapper.is_some() {
            return self.refresh();
        }

        let previous = self.config.column_count;
        self.config.column_count = target;
        if let Err(err) = self.rebuild() {
            return self.salvage("update_columns", &err);
        }

        self.with_metrics(|m| m.record_rebuild());
        self.log_layout_event(
            LogLevel::Info,
            "columns_rebuilt",
            [
                json_kv("from", previous),
                json_kv("to", target),
                json_kv("width", width),
            ],
        );
        self.audit(
            LayoutAuditEvent::new(LayoutAuditStage::ColumnsRebuilt)
                .detail("from", previous)
                .detail("to", target),
        );
        self.refresh()
    }

    /// Match the column count to the container's current width.
    pub fn fit_to_container(&mut self) -> PassOutcome {
        let width = self.host.width(self.host.container());
        self.last_width = width;
        self.update_columns(width)
    }

    /// Append one card to the shortest column without a full refresh.
    pub fn add_card(&mut self, card: H::Node) -> PassOutcome {
        if let Some(reason) = self.precondition() {
            return self.skip("add_card", reason);
        }
        if !self.predicate.accepts(&self.host, card) {
            return self.skip("add_card", SkipReason::Ineligible);
        }
        if self
            .host
            .parent(card)
            .is_some_and(|parent| self.columns.contains(&parent))
        {
            return self.skip("add_card", SkipReason::AlreadyPlaced);
        }

        let result = self.check_structure().and_then(|_| self.place(card));
        match result {
            Ok(index) => {
                if !self.cards.contains(&card) {
                    self.cards.push(card);
                }
                self.with_metrics(|m| m.record_placements(1));
                self.log_layout_event(
                    LogLevel::Debug,
                    "card_added",
                    [
                        json_str("card", format!("{card:?}")),
                        json_kv("column", index),
                    ],
                );
                self.audit(
                    LayoutAuditEvent::new(LayoutAuditStage::CardAdded).detail("column", index),
                );
                PassOutcome::Completed {
                    placed: 1,
                    columns: self.columns.len(),
                }
            }
            Err(err) => self.salvage("add_card", &err),
        }
    }

    /// Take a card out of the layout entirely. Returns whether anything was removed.
    pub fn remove_card(&mut self, card: H::Node) -> bool {
        let known = self.cards.contains(&card);
        let placed = self
            .host
            .parent(card)
            .is_some_and(|parent| self.columns.contains(&parent));
        if !known && !placed {
            self.skip("remove_card", SkipReason::UnknownCard);
            return false;
        }

        if let Err(err) = self.host.detach(card) {
            self.log_layout_event(
                LogLevel::Warn,
                "card_remove_failed",
                [json_str("error", err.to_string())],
            );
            return false;
        }
        self.cards.retain(|known| *known != card);
        self.audit(LayoutAuditEvent::new(LayoutAuditStage::CardRemoved));
        true
    }

    /// Release the width listener and put every card back in the container,
    /// concatenated column by column. Safe to call more than once.
    pub fn destroy(&mut self) {
        match self.state {
            LayoutState::Destroyed => return,
            LayoutState::Uninitialized => {
                self.state = LayoutState::Destroyed;
                return;
            }
            LayoutState::Active => {}
        }

        if let Some(listener) = self.listener.take() {
            self.host.remove_width_listener(listener);
        }
        self.debouncer.cancel();

        match self.dissolve() {
            Ok(returned) => self.log_layout_event(
                LogLevel::Info,
                "layout_destroyed",
                [json_kv("returned", returned)],
            ),
            Err(err) => {
                self.salvage("destroy", &err);
            }
        }

        self.cards.clear();
        self.state = LayoutState::Destroyed;
        self.audit(LayoutAuditEvent::new(LayoutAuditStage::Destroyed));
    }

    /// Log a metrics snapshot through the configured logger.
    pub fn emit_metrics(&self) {
        if let (Some(logger), Some(metrics)) =
            (self.config.logger.as_ref(), self.config.metrics.as_ref())
        {
            if let Ok(guard) = metrics.lock() {
                let event = guard
                    .snapshot(self.started_at.elapsed())
                    .to_log_event(&self.config.metrics_target);
                let _ = logger.log_event(event);
            }
        }
    }

    pub fn state(&self) -> LayoutState {
        self.state
    }

    /// `Ok` only while the layout is active.
    pub fn ensure_active(&self) -> Result<()> {
        match self.state {
            LayoutState::Active => Ok(()),
            LayoutState::Uninitialized => Err(LayoutError::NotInitialized),
            LayoutState::Destroyed => Err(LayoutError::Destroyed),
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Mutable host access for content updates. See the type docs before
    /// reparenting anything through this.
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn into_host(mut self) -> H {
        self.destroy();
        self.host
    }

    pub fn config(&self) -> &MasonryConfig {
        &self.config
    }

    pub fn column_count(&self) -> usize {
        self.config.column_count
    }

    pub fn wrapper(&self) -> Option<H::Node> {
        self.wrapper
    }

    pub fn columns(&self) -> &[H::Node] {
        &self.columns
    }

    /// Cards the layout currently manages, in placement order.
    pub fn cards(&self) -> &[H::Node] {
        &self.cards
    }

    /// Card membership of every column, top to bottom.
    pub fn assignment(&self) -> Vec<Vec<H::Node>> {
        self.columns
            .iter()
            .map(|column| self.host.children(*column))
            .collect()
    }

    pub fn last_applied_width(&self) -> u32 {
        self.last_width
    }

    /// Horizontal space each column gets in the current container.
    pub fn column_width(&self) -> u32 {
        column_width(
            self.host.width(self.host.container()),
            self.config.column_count,
            self.config.gap_px,
        )
    }

    fn precondition(&self) -> Option<SkipReason> {
        if self.state != LayoutState::Active {
            return Some(SkipReason::NotActive);
        }
        if self.wrapper.is_none() {
            return Some(SkipReason::MissingWrapper);
        }
        None
    }

    fn try_refresh(&mut self) -> Result<usize> {
        let wrapper = self.check_structure()?;
        let container = self.host.container();

        for column in self.columns.clone() {
            for card in self.host.children(column) {
                self.host.append_child(container, card)?;
            }
        }

        let mut loose: Vec<H::Node> = self
            .host
            .children(container)
            .into_iter()
            .filter(|node| *node != wrapper && self.predicate.accepts(&self.host, *node))
            .collect();

        // Cards seen before keep their relative order; newcomers follow in container order.
        let rank: HashMap<H::Node, usize> = self
            .cards
            .iter()
            .enumerate()
            .map(|(idx, card)| (*card, idx))
            .collect();
        loose.sort_by_key(|card| rank.get(card).copied().unwrap_or(usize::MAX));

        for card in &loose {
            self.place(*card)?;
        }

        let placed = loose.len();
        self.cards = loose;
        Ok(placed)
    }

    fn place(&mut self, card: H::Node) -> Result<usize> {
        let index = self.shortest_column_index();
        let column = *self
            .columns
            .get(index)
            .ok_or(LayoutError::MissingWrapper)?;
        if self.host.parent(column) != self.wrapper {
            return Err(LayoutError::detached(column));
        }
        self.host.append_child(column, card)?;
        Ok(index)
    }

    fn check_structure(&self) -> Result<H::Node> {
        let wrapper = self.wrapper.ok_or(LayoutError::MissingWrapper)?;
        if self.host.parent(wrapper) != Some(self.host.container()) {
            return Err(LayoutError::detached(wrapper));
        }
        if let Some(column) = self
            .columns
            .iter()
            .find(|column| self.host.parent(**column) != Some(wrapper))
        {
            return Err(LayoutError::detached(*column));
        }
        Ok(wrapper)
    }

    fn build_columns(&mut self) -> Result<()> {
        let container = self.host.container();
        let wrapper = self.host.create_element(&self.config.wrapper_class);
        let mut columns = Vec::with_capacity(self.config.column_count);
        for _ in 0..self.config.column_count {
            let column = self.host.create_element(&self.config.column_class);
            self.host.append_child(wrapper, column)?;
            columns.push(column);
        }

        let anchor = self.config.anchor_class.as_deref().and_then(|class| {
            self.host
                .children(container)
                .into_iter()
                .find(|child| self.host.has_class(*child, class))
        });
        match anchor {
            Some(anchor) => self.host.insert_after(container, wrapper, anchor)?,
            None => self.host.append_child(container, wrapper)?,
        }

        self.wrapper = Some(wrapper);
        self.columns = columns;
        Ok(())
    }

    fn rebuild(&mut self) -> Result<()> {
        self.dissolve()?;
        self.build_columns()
    }

    fn dissolve(&mut self) -> Result<usize> {
        let container = self.host.container();
        let mut returned = 0;
        if let Some(wrapper) = self.wrapper {
            for column in self.columns.clone() {
                for card in self.host.children(column) {
                    self.host.append_child(container, card)?;
                    returned += 1;
                }
            }
            self.host.detach(wrapper)?;
        }
        self.wrapper = None;
        self.columns.clear();
        Ok(returned)
    }

    fn clear_stale_wrappers(&mut self) -> Result<()> {
        let container = self.host.container();
        let stale = self
            .host
            .find_descendants(container, &self.config.wrapper_class);
        for wrapper in stale {
            // Only eligible cards come back; anything else leaves with the wrapper.
            let rescued: Vec<H::Node> = self
                .host
                .children(wrapper)
                .into_iter()
                .flat_map(|column| self.host.children(column))
                .filter(|card| self.predicate.accepts(&self.host, *card))
                .collect();
            let returned = rescued.len();
            for card in rescued {
                self.host.append_child(container, card)?;
            }
            self.host.detach(wrapper)?;
            self.log_layout_event(
                LogLevel::Info,
                "stale_wrapper_cleared",
                [json_kv("returned", returned)],
            );
            self.audit(
                LayoutAuditEvent::new(LayoutAuditStage::StaleWrapperCleared)
                    .detail("returned", returned),
            );
        }
        Ok(())
    }

    /// Put every card we know of back into the container and drop the
    /// column structure. The next width change rebuilds it.
    fn salvage(&mut self, operation: &str, err: &LayoutError) -> PassOutcome {
        let container = self.host.container();
        let mut seen = HashSet::new();
        let candidates: Vec<H::Node> = self
            .columns
            .iter()
            .flat_map(|column| self.host.children(*column))
            .chain(self.cards.iter().copied())
            .collect();

        let mut rescued = 0;
        for card in candidates {
            if !seen.insert(card) || self.host.parent(card) == Some(container) {
                continue;
            }
            if self.host.append_child(container, card).is_ok() {
                rescued += 1;
            }
        }

        if let Some(wrapper) = self.wrapper.take() {
            let _ = self.host.detach(wrapper);
        }
        self.columns.clear();

        let level = if err.is_structural() {
            LogLevel::Warn
        } else {
            LogLevel::Error
        };
        self.with_metrics(|m| m.record_abort());
        self.log_layout_event(
            level,
            "layout_pass_aborted",
            [
                json_str("operation", operation),
                json_str("error", err.to_string()),
                json_kv("rescued", rescued),
            ],
        );
        self.audit(
            LayoutAuditEvent::new(LayoutAuditStage::PassAborted)
                .detail("operation", operation)
                .detail("rescued", rescued),
        );
        PassOutcome::Aborted(err.to_string())
    }

    fn skip(&self, operation: &str, reason: SkipReason) -> PassOutcome {
        self.with_metrics(|m| m.record_skip());
        self.log_layout_event(
            reason.level(),
            "pass_skipped",
            [
                json_str("operation", operation),
                json_str("reason", reason.as_str()),
            ],
        );
        PassOutcome::Skipped(reason)
    }

    fn with_metrics(&self, record: impl FnOnce(&mut LayoutMetrics)) {
        if let Some(metrics) = self.config.metrics.as_ref() {
            if let Ok(mut guard) = metrics.lock() {
                record(&mut *guard);
            }
        }
    }

    fn audit(&self, event: LayoutAuditEvent) {
        self.config.audit.record(event);
    }

    fn log_layout_event<I>(&self, level: LogLevel, message: &str, fields: I)
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        if let Some(logger) = self.config.logger.as_ref() {
            let event = event_with_fields(level, LOG_TARGET, message, fields);
            let _ = logger.log_event(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Size;
    use crate::host::{DocumentTree, NodeId};
    use crate::logging::{Logger, MemorySink};
    use std::time::Duration;

    fn config(columns: usize, gap: u32) -> MasonryConfig {
        MasonryConfig::default().with_columns(columns).with_gap(gap)
    }

    fn doc_with(heights: &[u32]) -> (DocumentTree, Vec<NodeId>) {
        let mut doc = DocumentTree::new(Size::new(1280, 900));
        let cards = heights.iter().map(|h| doc.push_card(*h)).collect();
        (doc, cards)
    }

    #[test]
    fn construction_builds_empty_columns_and_listener() {
        let (doc, _) = doc_with(&[]);
        let layout = MasonryLayout::new(doc, config(3, 24)).unwrap();
        let host = layout.host();
        let wrapper = layout.wrapper().unwrap();

        assert_eq!(layout.state(), LayoutState::Active);
        assert_eq!(host.parent(wrapper), Some(host.container()));
        assert_eq!(host.children(wrapper), layout.columns().to_vec());
        assert_eq!(layout.columns().len(), 3);
        assert!(layout.assignment().iter().all(Vec::is_empty));
        assert_eq!(host.listener_count(), 1);
        assert_eq!(layout.last_applied_width(), 1280);
    }

    #[test]
    fn init_is_idempotent() {
        let (doc, _) = doc_with(&[]);
        let mut layout = MasonryLayout::new(doc, config(2, 0)).unwrap();
        let wrapper = layout.wrapper();
        layout.init().unwrap();
        assert_eq!(layout.wrapper(), wrapper);
        assert_eq!(layout.host().listener_count(), 1);
    }

    #[test]
    fn zero_columns_is_rejected() {
        let (doc, _) = doc_with(&[]);
        let err = MasonryLayout::new(doc, config(0, 0)).err().unwrap();
        assert!(matches!(err, LayoutError::InvalidConfig(_)));
    }

    #[test]
    fn refresh_places_into_shortest_column() {
        let (doc, cards) = doc_with(&[100, 100, 100, 100, 500]);
        let mut layout = MasonryLayout::new(doc, config(2, 0)).unwrap();

        let outcome = layout.refresh();
        assert_eq!(
            outcome,
            PassOutcome::Completed {
                placed: 5,
                columns: 2
            }
        );
        let assignment = layout.assignment();
        assert_eq!(assignment[0], vec![cards[0], cards[2], cards[4]]);
        assert_eq!(assignment[1], vec![cards[1], cards[3]]);
        assert_eq!(layout.column_height(0), 700);
        assert_eq!(layout.column_height(1), 200);
    }

    #[test]
    fn gap_counts_once_per_card() {
        let (doc, _) = doc_with(&[50, 70, 30]);
        let mut layout = MasonryLayout::new(doc, config(1, 24)).unwrap();
        layout.refresh();
        assert_eq!(layout.column_height(0), 50 + 70 + 30 + 3 * 24);
        assert_eq!(layout.column_height(7), 0);
    }

    #[test]
    fn ties_go_to_lowest_index() {
        let (doc, cards) = doc_with(&[40, 40, 40]);
        let mut layout = MasonryLayout::new(doc, config(3, 10)).unwrap();
        assert_eq!(layout.shortest_column_index(), 0);
        layout.refresh();
        assert_eq!(
            layout.assignment(),
            vec![vec![cards[0]], vec![cards[1]], vec![cards[2]]]
        );
    }

    #[test]
    fn refresh_is_stable_across_repeats() {
        let (doc, _) = doc_with(&[80, 80, 80, 80]);
        let mut layout = MasonryLayout::new(doc, config(2, 24)).unwrap();
        layout.refresh();
        let first = layout.assignment();
        layout.refresh();
        assert_eq!(layout.assignment(), first);
    }

    #[test]
    fn refresh_rebalances_after_height_change() {
        let (doc, cards) = doc_with(&[100, 100, 100]);
        let mut layout = MasonryLayout::new(doc, config(2, 0)).unwrap();
        layout.refresh();
        assert_eq!(layout.assignment()[0], vec![cards[0], cards[2]]);

        layout.host_mut().set_height(cards[0], 400).unwrap();
        layout.refresh();
        assert_eq!(layout.assignment()[0], vec![cards[0]]);
        assert_eq!(layout.assignment()[1], vec![cards[1], cards[2]]);
    }

    #[test]
    fn excluded_region_and_non_cards_stay_put() {
        let mut doc = DocumentTree::new(Size::new(1280, 900));
        let root = doc.container();
        let cycles = doc.create_element("world-cycles-container");
        doc.append_child(root, cycles).unwrap();
        let cycle_card = doc.create_card("card", 60);
        doc.append_child(cycles, cycle_card).unwrap();
        let note = doc.create_card("notice", 20);
        doc.append_child(root, note).unwrap();
        let card = doc.push_card(90);

        let mut layout = MasonryLayout::new(doc, config(2, 0)).unwrap();
        let wrapper = layout.wrapper().unwrap();
        assert_eq!(
            layout.host().children(root),
            vec![cycles, wrapper, note, card]
        );

        layout.refresh();
        assert_eq!(layout.cards(), &[card]);
        assert_eq!(layout.host().parent(cycle_card), Some(cycles));
        assert_eq!(layout.host().children(root), vec![cycles, wrapper, note]);
    }

    #[test]
    fn custom_predicate_selects_cards() {
        let (doc, cards) = doc_with(&[10, 500, 20]);
        let tall_only = |host: &DocumentTree, node: NodeId| host.height(node) >= 100;
        let mut layout = MasonryLayout::with_predicate(doc, config(2, 0), tall_only).unwrap();
        layout.refresh();
        assert_eq!(layout.cards(), &[cards[1]]);
    }

    #[test]
    fn add_card_targets_shortest_column() {
        let (doc, cards) = doc_with(&[300, 100]);
        let mut layout = MasonryLayout::new(doc, config(2, 0)).unwrap();
        layout.refresh();

        let extra = layout.host_mut().create_card("card", 50);
        let outcome = layout.add_card(extra);
        assert!(outcome.is_completed());
        assert_eq!(layout.assignment()[1], vec![cards[1], extra]);
        assert_eq!(
            layout.add_card(extra),
            PassOutcome::Skipped(SkipReason::AlreadyPlaced)
        );

        let banner = layout.host_mut().create_card("banner", 50);
        assert_eq!(
            layout.add_card(banner),
            PassOutcome::Skipped(SkipReason::Ineligible)
        );
        assert_eq!(layout.cards().len(), 3);
    }

    #[test]
    fn remove_card_forgets_it() {
        let (doc, cards) = doc_with(&[100, 100]);
        let mut layout = MasonryLayout::new(doc, config(2, 0)).unwrap();
        layout.refresh();

        assert!(layout.remove_card(cards[0]));
        assert_eq!(layout.host().parent(cards[0]), None);
        assert_eq!(layout.cards(), &[cards[1]]);
        assert!(!layout.remove_card(cards[0]));
    }

    #[test]
    fn operations_before_init_are_skipped() {
        let (doc, _) = doc_with(&[100]);
        let mut layout = MasonryLayout::deferred(doc, config(2, 0)).unwrap();
        assert_eq!(layout.state(), LayoutState::Uninitialized);
        assert_eq!(
            layout.refresh(),
            PassOutcome::Skipped(SkipReason::NotActive)
        );
        assert!(layout.wrapper().is_none());
        assert!(matches!(
            layout.ensure_active(),
            Err(LayoutError::NotInitialized)
        ));
        layout.init().unwrap();
        assert!(layout.refresh().is_completed());
    }

    #[test]
    fn destroyed_layout_cannot_reinit() {
        let (doc, _) = doc_with(&[100]);
        let mut layout = MasonryLayout::new(doc, config(2, 0)).unwrap();
        assert!(layout.ensure_active().is_ok());
        layout.destroy();
        assert!(matches!(layout.ensure_active(), Err(LayoutError::Destroyed)));
        assert!(matches!(layout.init(), Err(LayoutError::Destroyed)));
        assert_eq!(
            layout.add_card(NodeId(1)),
            PassOutcome::Skipped(SkipReason::NotActive)
        );
    }

    #[test]
    fn jitter_below_threshold_is_ignored() {
        let (doc, _) = doc_with(&[100, 100]);
        let mut layout = MasonryLayout::new(doc, config(4, 0)).unwrap();
        layout.refresh();
        let start = Instant::now();

        layout.handle_width_change(1300, start);
        let outcome = layout.poll(start + Duration::from_millis(300));
        assert_eq!(outcome, Some(PassOutcome::Skipped(SkipReason::WidthJitter)));
        assert_eq!(layout.last_applied_width(), 1280);
        assert_eq!(layout.column_count(), 4);
    }

    #[test]
    fn viewport_changes_flow_through_the_listener() {
        let (doc, cards) = doc_with(&[100, 100, 100]);
        let mut layout = MasonryLayout::new(doc, config(5, 0)).unwrap();
        layout.refresh();
        let start = Instant::now();
        assert!(!layout.sync_viewport(start));

        layout.host_mut().set_viewport(Size::new(500, 900));
        assert!(layout.sync_viewport(start));
        assert!(layout.pending_width_change());
        assert!(!layout.sync_viewport(start));

        let outcome = layout.poll(start + Duration::from_millis(300));
        assert!(outcome.is_some_and(|o| o.is_completed()));
        assert_eq!(layout.column_count(), 1);
        assert_eq!(layout.assignment(), vec![cards]);

        layout.destroy();
        layout.host_mut().set_viewport(Size::new(1400, 900));
        assert!(!layout.sync_viewport(start));
    }

    #[test]
    fn unchanged_count_only_refreshes() {
        let (doc, _) = doc_with(&[100, 100]);
        let mut layout = MasonryLayout::new(doc, config(4, 0)).unwrap();
        layout.refresh();
        let wrapper = layout.wrapper();

        let outcome = layout.update_columns(1400);
        assert!(outcome.is_completed());
        assert_eq!(layout.wrapper(), wrapper);
    }

    #[test]
    fn logs_skips_and_passes() {
        let sink = MemorySink::new();
        let (doc, _) = doc_with(&[100]);
        let mut cfg = config(2, 0).with_logger(Logger::new(sink.clone()));
        cfg.enable_metrics();
        let metrics = cfg.metrics_handle().unwrap();
        let mut layout = MasonryLayout::new(doc, cfg).unwrap();

        layout.refresh();
        layout.destroy();
        layout.refresh();
        layout.emit_metrics();

        let messages = sink.messages();
        assert!(messages.contains(&"layout_constructed".to_string()));
        assert!(messages.contains(&"refresh_completed".to_string()));
        assert!(messages.contains(&"layout_destroyed".to_string()));
        assert!(messages.contains(&"pass_skipped".to_string()));
        assert_eq!(messages.last().map(String::as_str), Some("layout_metrics"));

        let snapshot = metrics.lock().unwrap().snapshot(Duration::ZERO);
        assert_eq!(snapshot.refreshes, 1);
        assert_eq!(snapshot.skipped_passes, 1);
        assert_eq!(snapshot.cards_placed, 1);
    }
}
