//! Per-instruction node arena.
//!
//! Every graph node an instruction owns (actions and effects) is allocated
//! from the instruction's own arena and reclaimed en masse when the
//! instruction retires or is squashed. It provides:
//! 1. **Bump allocation:** `alloc` appends into a fixed-capacity slot region.
//! 2. **Chained extension:** on exhaustion, exactly one extension region of
//!    the same capacity is created lazily and delegated to.
//! 3. **Bulk reclaim:** no per-node free exists; dropping the arena drops
//!    the whole chain.
//! 4. **Diagnostics:** a process-wide counter of live arena regions.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Process-wide count of live arena regions, for leak diagnostics.
static LIVE_ARENAS: AtomicUsize = AtomicUsize::new(0);

/// Returns the number of arena regions currently alive in the process.
pub fn live_arenas() -> usize {
    LIVE_ARENAS.load(Ordering::Relaxed)
}

/// A node handle into an arena chain.
///
/// Ids are dense across the chain (`region * capacity + slot`), so a handle
/// stays valid for the lifetime of the owning instruction regardless of how
/// many extension regions were created after it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

/// Fixed-capacity slot arena with lazily chained extensions.
#[derive(Debug)]
pub struct Arena<T> {
    slots: Vec<T>,
    capacity: usize,
    extension: Option<Box<Arena<T>>>,
}

impl<T> Arena<T> {
    /// Creates an arena with the given per-region slot capacity.
    ///
    /// # Panics
    ///
    /// A zero capacity can never satisfy any request and is a simulator
    /// defect, so construction asserts against it.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "arena region capacity must be non-zero");
        let _ = LIVE_ARENAS.fetch_add(1, Ordering::Relaxed);
        Self {
            slots: Vec::with_capacity(capacity),
            capacity,
            extension: None,
        }
    }

    /// Allocates a slot for `node`, chaining one extension region if this
    /// region is exhausted. Prior allocations are never moved.
    pub fn alloc(&mut self, node: T) -> NodeId {
        self.alloc_from(node, 0)
    }

    fn alloc_from(&mut self, node: T, base: u32) -> NodeId {
        if self.slots.len() < self.capacity {
            let id = NodeId(base + self.slots.len() as u32);
            self.slots.push(node);
            id
        } else {
            let capacity = self.capacity;
            self.extension
                .get_or_insert_with(|| Box::new(Self::new(capacity)))
                .alloc_from(node, base + capacity as u32)
        }
    }

    /// Returns a reference to the node with the given id.
    ///
    /// # Panics
    ///
    /// An id that was not produced by this arena chain is a simulator defect.
    pub fn get(&self, id: NodeId) -> &T {
        let idx = id.0 as usize;
        if idx < self.slots.len() {
            &self.slots[idx]
        } else {
            match &self.extension {
                Some(ext) if idx >= self.capacity => ext.get(NodeId((idx - self.capacity) as u32)),
                _ => panic!("arena node {idx} does not exist"),
            }
        }
    }

    /// Returns a mutable reference to the node with the given id.
    ///
    /// # Panics
    ///
    /// An id that was not produced by this arena chain is a simulator defect.
    pub fn get_mut(&mut self, id: NodeId) -> &mut T {
        let idx = id.0 as usize;
        if idx < self.slots.len() {
            &mut self.slots[idx]
        } else {
            match &mut self.extension {
                Some(ext) if idx >= self.capacity => {
                    ext.get_mut(NodeId((idx - self.capacity) as u32))
                }
                _ => panic!("arena node {idx} does not exist"),
            }
        }
    }

    /// Returns the total number of allocated nodes across the chain.
    pub fn len(&self) -> usize {
        self.slots.len() + self.extension.as_ref().map_or(0, |e| e.len())
    }

    /// Returns true if no node has been allocated yet.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Returns the number of regions in the chain (1 = no extension yet).
    pub fn regions(&self) -> usize {
        1 + self.extension.as_ref().map_or(0, |e| e.regions())
    }
}

impl<T> Drop for Arena<T> {
    fn drop(&mut self) {
        let _ = LIVE_ARENAS.fetch_sub(1, Ordering::Relaxed);
    }
}
