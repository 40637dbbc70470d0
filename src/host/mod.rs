//! Boundary between the masonry engine and the tree it rearranges.
//!
//! The engine never owns card content. It only needs the handful of tree
//! primitives below, so any DOM-like backend can drive it. [`DocumentTree`]
//! is the in-memory backend used by the dashboard, tests and benches.

mod document;

use std::fmt::Debug;
use std::hash::Hash;

use crate::error::Result;

pub use document::{DocumentTree, NodeId};

/// Handle returned when registering interest in viewport width changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

pub trait LayoutHost {
    /// Reference-like node handle. Equality is identity.
    type Node: Copy + Eq + Hash + Debug;

    /// The host container that owns cards before and after layout.
    fn container(&self) -> Self::Node;

    /// Create a detached element carrying a single class.
    fn create_element(&mut self, class: &str) -> Self::Node;

    /// Append `child` as the last child of `parent`, moving it out of its
    /// current parent first.
    fn append_child(&mut self, parent: Self::Node, child: Self::Node) -> Result<()>;

    /// Insert `child` directly after `reference`, which must be a child of `parent`.
    fn insert_after(
        &mut self,
        parent: Self::Node,
        child: Self::Node,
        reference: Self::Node,
    ) -> Result<()>;

    /// Remove `node` from its parent. Detaching a parentless node is a no-op.
    fn detach(&mut self, node: Self::Node) -> Result<()>;

    fn children(&self, parent: Self::Node) -> Vec<Self::Node>;

    fn parent(&self, node: Self::Node) -> Option<Self::Node>;

    fn has_class(&self, node: Self::Node, class: &str) -> bool;

    /// Rendered height in device pixels. Unrendered nodes report zero.
    fn height(&self, node: Self::Node) -> u32;

    /// Rendered width in device pixels.
    fn width(&self, node: Self::Node) -> u32;

    fn viewport_width(&self) -> u32;

    fn add_width_listener(&mut self) -> ListenerId;

    /// Whether the viewport width changed since `id` last drained its
    /// notifications. Draining clears the flag.
    fn take_width_change(&mut self, id: ListenerId) -> bool;

    fn remove_width_listener(&mut self, id: ListenerId);

    /// Nearest inclusive ancestor of `node` carrying `class`.
    fn closest(&self, node: Self::Node, class: &str) -> Option<Self::Node> {
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if self.has_class(current, class) {
                return Some(current);
            }
            cursor = self.parent(current);
        }
        None
    }

    /// Descendants of `root` carrying `class`, in document order.
    fn find_descendants(&self, root: Self::Node, class: &str) -> Vec<Self::Node> {
        let mut found = Vec::new();
        let mut stack: Vec<Self::Node> = self.children(root).into_iter().rev().collect();
        while let Some(node) = stack.pop() {
            if self.has_class(node, class) {
                found.push(node);
            }
            stack.extend(self.children(node).into_iter().rev());
        }
        found
    }

    /// Whether `node` sits somewhere beneath `ancestor`.
    fn is_within(&self, node: Self::Node, ancestor: Self::Node) -> bool {
        let mut cursor = self.parent(node);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.parent(current);
        }
        false
    }
}
