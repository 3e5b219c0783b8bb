//! Miss-status holding registers: outstanding memory requests keyed by
//! block-aligned physical address.
//!
//! A block with an outstanding request never issues a second one; later
//! accesses to the same block join the waiter list and share the reply.

use std::collections::HashMap;

use crate::common::PhysAddr;
use crate::core::msg::TransactionId;

/// One outstanding request.
#[derive(Debug)]
pub struct MshrEntry {
    /// Transaction identity of the outstanding request.
    pub transaction: TransactionId,
    /// Sequence numbers of instructions sharing the reply.
    pub waiters: Vec<u64>,
}

/// The bounded MSHR file for one core.
#[derive(Debug)]
pub struct MshrTable {
    entries: HashMap<PhysAddr, MshrEntry>,
    capacity: usize,
}

impl MshrTable {
    /// Creates a table holding at most `capacity` outstanding requests.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "MSHR capacity must be non-zero");
        Self {
            entries: HashMap::with_capacity(capacity),
            capacity,
        }
    }

    /// True if another request can be tracked.
    pub fn available(&self) -> bool {
        self.entries.len() < self.capacity
    }

    /// Outstanding entry for a block, if any.
    pub fn get(&self, paddr: PhysAddr) -> Option<&MshrEntry> {
        self.entries.get(&paddr)
    }

    /// Registers a new outstanding request.
    ///
    /// # Panics
    ///
    /// Capacity and duplicate-block violations are issue-logic defects.
    pub fn allocate(&mut self, paddr: PhysAddr, transaction: TransactionId, waiter: u64) {
        assert!(self.available(), "MSHR overflow");
        let prior = self.entries.insert(
            paddr,
            MshrEntry {
                transaction,
                waiters: vec![waiter],
            },
        );
        assert!(prior.is_none(), "duplicate MSHR entry for {paddr:?}");
    }

    /// Joins an existing outstanding request for the block.
    pub fn add_waiter(&mut self, paddr: PhysAddr, waiter: u64) {
        let entry = self
            .entries
            .get_mut(&paddr)
            .unwrap_or_else(|| panic!("no outstanding request for {paddr:?}"));
        entry.waiters.push(waiter);
    }

    /// Finds the block whose request carries `transaction`.
    pub fn find_transaction(&self, transaction: TransactionId) -> Option<PhysAddr> {
        self.entries
            .iter()
            .find_map(|(paddr, e)| (e.transaction == transaction).then_some(*paddr))
    }

    /// Releases an entry once its reply has been consumed, returning the
    /// waiter list.
    pub fn release(&mut self, paddr: PhysAddr) -> Vec<u64> {
        self.entries
            .remove(&paddr)
            .map(|e| e.waiters)
            .unwrap_or_default()
    }

    /// Drops a squashed instruction from every waiter list.
    pub fn remove_waiter(&mut self, seq: u64) {
        for entry in self.entries.values_mut() {
            entry.waiters.retain(|&w| w != seq);
        }
    }

    /// Number of outstanding requests.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no requests are outstanding.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
