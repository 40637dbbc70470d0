use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use blake3::Hash as ContentHash;

/// Dashboard category a card belongs to, e.g. `"sortie"` or `"alerts"`.
pub type CategoryId = String;

#[derive(Debug, Clone)]
pub struct CardEntry<N> {
    pub node: N,
    hash: ContentHash,
    pub is_dirty: bool,
}

/// Maps each category to the card node showing it, and tracks whether the
/// rendered content changed since the last drain.
#[derive(Debug)]
pub struct CardRegistry<N> {
    entries: HashMap<CategoryId, CardEntry<N>>,
    dirty: HashSet<CategoryId>,
}

impl<N> Default for CardRegistry<N> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            dirty: HashSet::new(),
        }
    }
}

impl<N: Copy + Eq + Hash> CardRegistry<N> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the content currently rendered for `category`. Returns true when
    /// the entry is new, points at a different node, or its content changed.
    pub fn sync(&mut self, category: &str, node: N, content: &str) -> bool {
        use std::collections::hash_map::Entry;

        let new_hash = blake3::hash(content.as_bytes());
        let changed = match self.entries.entry(category.to_string()) {
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                if entry.hash != new_hash || entry.node != node {
                    entry.hash = new_hash;
                    entry.node = node;
                    entry.is_dirty = true;
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(CardEntry {
                    node,
                    hash: new_hash,
                    is_dirty: true,
                });
                true
            }
        };

        if changed {
            self.dirty.insert(category.to_string());
        }
        changed
    }

    pub fn node_of(&self, category: &str) -> Option<N> {
        self.entries.get(category).map(|entry| entry.node)
    }

    /// Drop every category not in `present`, returning the removed nodes.
    pub fn retain<S: AsRef<str>>(&mut self, present: &[S]) -> Vec<(CategoryId, N)> {
        let keep: HashSet<&str> = present.iter().map(AsRef::as_ref).collect();
        let mut removed: Vec<(CategoryId, N)> = self
            .entries
            .iter()
            .filter(|(id, _)| !keep.contains(id.as_str()))
            .map(|(id, entry)| (id.clone(), entry.node))
            .collect();
        removed.sort_by(|a, b| a.0.cmp(&b.0));

        for (id, _) in &removed {
            self.entries.remove(id);
            self.dirty.remove(id);
        }
        removed
    }

    /// Drain dirty categories in sorted order.
    pub fn take_dirty(&mut self) -> Vec<CategoryId> {
        let mut ids: Vec<_> = self.dirty.drain().collect();
        ids.sort();
        for id in &ids {
            if let Some(entry) = self.entries.get_mut(id) {
                entry.is_dirty = false;
            }
        }
        ids
    }

    pub fn has_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
