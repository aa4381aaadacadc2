//! Node implementation for the routing table.
//!
//! Nodes live in a [`NodeArena`] and refer to each other by [`NodeId`]. The
//! arena exclusively owns every node; parent and child links are plain indices,
//! so detaching a subtree never leaves a dangling reference behind.

use std::ops::{Index, IndexMut};

use super::error::RouteError;
use super::key::Segment;
use super::RouteResult;

/// Index of a node inside its [`NodeArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct NodeId(usize);

/// A vertex of the routing trie.
#[derive(Debug)]
pub(crate) struct Node<V> {
    /// Token this node represents
    pub segment: Segment,

    /// Destination handle, present when the node resolves
    pub value: Option<V>,

    /// Whether a caller registered a route at exactly this node
    pub routed: bool,

    /// Parent node, `None` for roots
    pub parent: Option<NodeId>,

    /// Child nodes in insertion order
    pub children: Vec<NodeId>,
}

impl<V> Node<V> {
    /// Creates a node with no children.
    pub fn new(segment: Segment, value: Option<V>, routed: bool, parent: Option<NodeId>) -> Self {
        Self {
            segment,
            value,
            routed,
            parent,
            children: Vec::new(),
        }
    }

    /// Returns `true` for nodes held by the root directory.
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// Slot storage for nodes with a free list for reuse.
#[derive(Debug)]
pub(crate) struct NodeArena<V> {
    slots: Vec<Option<Node<V>>>,
    free: Vec<NodeId>,
    live: usize,
}

impl<V> NodeArena<V> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
        }
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.live
    }

    /// Makes sure the next `additional` calls to [`NodeArena::insert`] do not allocate.
    pub fn try_reserve(&mut self, additional: usize) -> RouteResult<()> {
        let needed = additional.saturating_sub(self.free.len());
        self.slots
            .try_reserve(needed)
            .map_err(|_| RouteError::OutOfMemory("growing the node arena"))?;
        // The free list must be able to hold every slot without reallocating on removal.
        let free_room = self.slots.len() + needed - self.free.len();
        self.free
            .try_reserve(free_room)
            .map_err(|_| RouteError::OutOfMemory("growing the node arena"))?;
        Ok(())
    }

    /// Stores a node, reusing a released slot when one is available.
    pub fn insert(&mut self, node: Node<V>) -> NodeId {
        self.live += 1;
        match self.free.pop() {
            Some(id) => {
                self.slots[id.0] = Some(node);
                id
            }
            None => {
                self.slots.push(Some(node));
                NodeId(self.slots.len() - 1)
            }
        }
    }

    /// Takes a node out of the arena and releases its slot.
    pub fn remove(&mut self, id: NodeId) -> Option<Node<V>> {
        let node = self.slots.get_mut(id.0)?.take()?;
        self.live -= 1;
        self.free.push(id);
        Some(node)
    }

    /// Returns `true` if `id` refers to a live node.
    pub fn contains(&self, id: NodeId) -> bool {
        matches!(self.slots.get(id.0), Some(Some(_)))
    }
}

impl<V> Default for NodeArena<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Index<NodeId> for NodeArena<V> {
    type Output = Node<V>;

    fn index(&self, id: NodeId) -> &Self::Output {
        match self.slots.get(id.0) {
            Some(Some(node)) => node,
            _ => panic!("stale node id {id:?}"),
        }
    }
}

impl<V> IndexMut<NodeId> for NodeArena<V> {
    fn index_mut(&mut self, id: NodeId) -> &mut Self::Output {
        match self.slots.get_mut(id.0) {
            Some(Some(node)) => node,
            _ => panic!("stale node id {id:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(text: &str) -> Node<u32> {
        Node::new(Segment::from_token(text).unwrap(), Some(1), true, None)
    }

    #[test]
    fn test_arena_insert_and_remove() {
        let mut arena = NodeArena::new();
        arena.try_reserve(2).unwrap();
        let a = arena.insert(leaf("a"));
        let b = arena.insert(leaf("b"));
        assert_eq!(arena.len(), 2);
        assert_eq!(arena[a].segment.as_str(), "a");
        assert!(arena[b].is_root());

        let removed = arena.remove(a).unwrap();
        assert_eq!(removed.segment.as_str(), "a");
        assert!(!arena.contains(a));
        assert!(arena.contains(b));
        assert_eq!(arena.len(), 1);
        assert!(arena.remove(a).is_none());
    }

    #[test]
    fn test_arena_reuses_released_slots() {
        let mut arena = NodeArena::new();
        arena.try_reserve(1).unwrap();
        let first = arena.insert(leaf("a"));
        arena.remove(first);

        arena.try_reserve(1).unwrap();
        let second = arena.insert(leaf("b"));
        assert_eq!(first, second);
        assert_eq!(arena[second].segment.as_str(), "b");
    }

    #[test]
    #[should_panic(expected = "stale node id")]
    fn test_arena_stale_index_panics() {
        let mut arena = NodeArena::new();
        arena.try_reserve(1).unwrap();
        let id = arena.insert(leaf("a"));
        arena.remove(id);
        let _ = &arena[id];
    }
}
