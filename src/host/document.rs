use std::collections::HashMap;

use crate::error::{LayoutError, Result};
use crate::geometry::Size;

use super::{LayoutHost, ListenerId};

/// Index of a node inside a [`DocumentTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone)]
struct NodeData {
    classes: Vec<String>,
    height: u32,
    width: u32,
    text: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl NodeData {
    fn new(class: &str) -> Self {
        Self {
            classes: class.split_whitespace().map(str::to_string).collect(),
            height: 0,
            width: 0,
            text: String::new(),
            parent: None,
            children: Vec::new(),
        }
    }
}

/// Arena-backed tree with a single root container.
///
/// Nodes are never freed. Detached nodes keep their data so they can be
/// reattached later, which mirrors how DOM elements survive `remove()`.
#[derive(Debug, Clone)]
pub struct DocumentTree {
    nodes: Vec<NodeData>,
    root: NodeId,
    viewport: Size,
    /// Registered listeners and whether each has an undrained width change.
    listeners: HashMap<ListenerId, bool>,
    next_listener: u64,
}

impl DocumentTree {
    pub fn new(viewport: Size) -> Self {
        let mut root = NodeData::new("container");
        root.width = viewport.width;
        root.height = viewport.height;
        Self {
            nodes: vec![root],
            root: NodeId(0),
            viewport,
            listeners: HashMap::new(),
            next_listener: 0,
        }
    }

    /// Create a detached node with a fixed rendered height.
    pub fn create_card(&mut self, class: &str, height: u32) -> NodeId {
        let id = self.create_element(class);
        self.nodes[id.0].height = height;
        id
    }

    /// Create a card and append it to the container.
    pub fn push_card(&mut self, height: u32) -> NodeId {
        let id = self.create_card("card", height);
        let root = self.root;
        self.nodes[root.0].children.push(id);
        self.nodes[id.0].parent = Some(root);
        id
    }

    pub fn set_height(&mut self, node: NodeId, height: u32) -> Result<()> {
        self.node_mut(node)?.height = height;
        Ok(())
    }

    pub fn set_text(&mut self, node: NodeId, text: impl Into<String>) -> Result<()> {
        self.node_mut(node)?.text = text.into();
        Ok(())
    }

    pub fn text(&self, node: NodeId) -> Option<&str> {
        self.nodes.get(node.0).map(|data| data.text.as_str())
    }

    pub fn add_class(&mut self, node: NodeId, class: &str) -> Result<()> {
        let data = self.node_mut(node)?;
        if !data.classes.iter().any(|c| c == class) {
            data.classes.push(class.to_string());
        }
        Ok(())
    }

    /// Resize the viewport. The container always spans the viewport width.
    /// A width change is reported to every registered listener.
    pub fn set_viewport(&mut self, viewport: Size) {
        if self.viewport.width_delta(viewport) > 0 {
            for pending in self.listeners.values_mut() {
                *pending = true;
            }
        }
        self.viewport = viewport;
        let root = self.root;
        self.nodes[root.0].width = viewport.width;
        self.nodes[root.0].height = viewport.height;
    }

    pub fn viewport(&self) -> Size {
        self.viewport
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    fn node(&self, id: NodeId) -> Result<&NodeData> {
        self.nodes.get(id.0).ok_or_else(|| LayoutError::not_found(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut NodeData> {
        self.nodes
            .get_mut(id.0)
            .ok_or_else(|| LayoutError::not_found(id))
    }

    fn unlink(&mut self, child: NodeId) {
        if let Some(parent) = self.nodes[child.0].parent.take() {
            self.nodes[parent.0].children.retain(|c| *c != child);
        }
    }

    fn check_insertable(&self, parent: NodeId, child: NodeId) -> Result<()> {
        self.node(parent)?;
        self.node(child)?;
        if child == self.root || parent == child || self.is_within(parent, child) {
            return Err(LayoutError::HierarchyRequest {
                node: format!("{child:?}"),
            });
        }
        Ok(())
    }
}

impl LayoutHost for DocumentTree {
    type Node = NodeId;

    fn container(&self) -> NodeId {
        self.root
    }

    fn create_element(&mut self, class: &str) -> NodeId {
        self.nodes.push(NodeData::new(class));
        NodeId(self.nodes.len() - 1)
    }

    fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.check_insertable(parent, child)?;
        self.unlink(child);
        self.nodes[parent.0].children.push(child);
        self.nodes[child.0].parent = Some(parent);
        Ok(())
    }

    fn insert_after(&mut self, parent: NodeId, child: NodeId, reference: NodeId) -> Result<()> {
        self.check_insertable(parent, child)?;
        if self.node(reference)?.parent != Some(parent) {
            return Err(LayoutError::detached(reference));
        }
        self.unlink(child);
        let siblings = &mut self.nodes[parent.0].children;
        let position = siblings
            .iter()
            .position(|c| *c == reference)
            .map(|idx| idx + 1)
            .unwrap_or(siblings.len());
        siblings.insert(position, child);
        self.nodes[child.0].parent = Some(parent);
        Ok(())
    }

    fn detach(&mut self, node: NodeId) -> Result<()> {
        self.node(node)?;
        self.unlink(node);
        Ok(())
    }

    fn children(&self, parent: NodeId) -> Vec<NodeId> {
        self.nodes
            .get(parent.0)
            .map(|data| data.children.clone())
            .unwrap_or_default()
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node.0).and_then(|data| data.parent)
    }

    fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.nodes
            .get(node.0)
            .map(|data| data.classes.iter().any(|c| c == class))
            .unwrap_or(false)
    }

    fn height(&self, node: NodeId) -> u32 {
        self.nodes.get(node.0).map(|data| data.height).unwrap_or(0)
    }

    fn width(&self, node: NodeId) -> u32 {
        self.nodes.get(node.0).map(|data| data.width).unwrap_or(0)
    }

    fn viewport_width(&self) -> u32 {
        self.viewport.width
    }

    fn add_width_listener(&mut self) -> ListenerId {
        self.next_listener += 1;
        let id = ListenerId(self.next_listener);
        self.listeners.insert(id, false);
        id
    }

    fn take_width_change(&mut self, id: ListenerId) -> bool {
        self.listeners
            .get_mut(&id)
            .map(std::mem::take)
            .unwrap_or(false)
    }

    fn remove_width_listener(&mut self, id: ListenerId) {
        self.listeners.remove(&id);
    }
}
