//! Bounded directory of root nodes.
//!
//! Roots are kept in fixed slots (iteration follows slot order, so traces are
//! stable) and indexed by their segment text. A hierarchical key finds its
//! root through its first token; a literal key through the whole key.

use fnv::FnvHashMap;

use super::error::RouteError;
use super::node::NodeId;
use super::RouteResult;

#[derive(Debug)]
pub(crate) struct RootDirectory {
    slots: Vec<Option<NodeId>>,
    index: FnvHashMap<String, usize>,
}

impl RootDirectory {
    /// Creates a directory with room for `capacity` roots.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity],
            index: FnvHashMap::default(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Looks up the root whose segment is exactly `segment`.
    pub fn find(&self, segment: &str) -> Option<NodeId> {
        self.index.get(segment).and_then(|&slot| self.slots[slot])
    }

    /// Fails unless a subsequent [`RootDirectory::insert`] is guaranteed to succeed.
    pub fn try_reserve(&mut self) -> RouteResult<()> {
        if self.len() >= self.capacity() {
            return Err(RouteError::CapacityExceeded {
                capacity: self.capacity(),
            });
        }
        self.index
            .try_reserve(1)
            .map_err(|_| RouteError::OutOfMemory("growing the root index"))
    }

    /// Registers `node` under `segment` in the first vacant slot.
    pub fn insert(&mut self, segment: String, node: NodeId) -> RouteResult<usize> {
        let slot = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(RouteError::CapacityExceeded {
                capacity: self.capacity(),
            })?;
        self.slots[slot] = Some(node);
        self.index.insert(segment, slot);
        Ok(slot)
    }

    /// Vacates the slot holding `segment`, making it available again.
    pub fn remove(&mut self, segment: &str) -> Option<NodeId> {
        let slot = self.index.remove(segment)?;
        self.slots[slot].take()
    }

    /// Iterates over live roots in slot order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = NodeId> + '_ {
        self.slots.iter().filter_map(|slot| *slot)
    }
}
