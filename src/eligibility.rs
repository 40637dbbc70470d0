//! Predicates deciding which container children the layout manages.

use crate::host::LayoutHost;

pub trait CardPredicate<H: LayoutHost> {
    fn accepts(&self, host: &H, node: H::Node) -> bool;
}

impl<H, F> CardPredicate<H> for F
where
    H: LayoutHost,
    F: Fn(&H, H::Node) -> bool,
{
    fn accepts(&self, host: &H, node: H::Node) -> bool {
        self(host, node)
    }
}

/// Class based filter: the node carries `card_class` and does not sit inside
/// an element carrying `excluded_region`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardFilter {
    card_class: String,
    excluded_region: Option<String>,
}

impl Default for CardFilter {
    fn default() -> Self {
        Self::new("card", Some("world-cycles-container"))
    }
}

impl CardFilter {
    pub fn new(card_class: impl Into<String>, excluded_region: Option<&str>) -> Self {
        Self {
            card_class: card_class.into(),
            excluded_region: excluded_region.map(str::to_string),
        }
    }

    pub fn card_class(&self) -> &str {
        &self.card_class
    }

    pub fn excluded_region(&self) -> Option<&str> {
        self.excluded_region.as_deref()
    }
}

impl<H: LayoutHost> CardPredicate<H> for CardFilter {
    fn accepts(&self, host: &H, node: H::Node) -> bool {
        if !host.has_class(node, &self.card_class) {
            return false;
        }
        match self.excluded_region.as_deref() {
            Some(region) => host.closest(node, region).is_none(),
            None => true,
        }
    }
}
