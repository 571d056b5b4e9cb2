//! Field declarations and the built field tree.

use std::fmt;

use serde::Serialize;

use crate::arena::{Arena, ArenaIndex};

pub mod config;
mod node;

pub use config::{
    Debounce, FieldConfig, Hook, Hooks, LifecycleHook, ModelOptions, Parser, TemplateOptions,
    truthy,
};
pub use node::FieldNode;
pub(crate) use node::ValueSubscription;

/// Identifier of a node inside a [`FieldTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FieldId(ArenaIndex);

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "field#{}", self.0)
    }
}

/// Arena owning every node of a form's field tree.
///
/// Slots of removed nodes are reused; a [`FieldId`] of a removed node never
/// resolves again.
#[derive(Debug, Default)]
pub struct FieldTree {
    nodes: Arena<FieldNode>,
}

impl FieldTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: FieldId) -> Option<&FieldNode> {
        self.nodes.get(id.0)
    }

    pub(crate) fn get_mut(&mut self, id: FieldId) -> Option<&mut FieldNode> {
        self.nodes.get_mut(id.0)
    }

    pub fn contains(&self, id: FieldId) -> bool {
        self.get(id).is_some()
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Allocated node slots, including vacant ones awaiting reuse.
    pub fn capacity(&self) -> usize {
        self.nodes.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reserves the id the next inserted node will receive.
    pub(crate) fn next_id(&self) -> FieldId {
        FieldId(self.nodes.next_index())
    }

    pub(crate) fn insert(&mut self, node: FieldNode) -> FieldId {
        debug_assert_eq!(node.id, self.next_id());
        FieldId(self.nodes.insert(node))
    }

    pub(crate) fn remove(&mut self, id: FieldId) -> Option<FieldNode> {
        self.nodes.remove(id.0)
    }

    /// Live nodes in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &FieldNode> {
        self.nodes.iter()
    }

    /// `id` followed by its descendants, parents before children.
    pub fn pre_order(&self, id: FieldId) -> Vec<FieldId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = self.get(current) else {
                continue;
            };
            out.push(current);
            stack.extend(node.children.iter().rev().copied());
        }
        out
    }

    /// `id` and its descendants, children before parents.
    pub fn post_order(&self, id: FieldId) -> Vec<FieldId> {
        let mut out = self.pre_order(id);
        out.reverse();
        out
    }
}
