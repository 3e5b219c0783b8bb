//! Load/store queue: one entry per in-flight memory instruction, ordered by
//! sequence number.
//!
//! Entries are allocated at dispatch, erased on squash, and drained at
//! commit. An ordinary retirement never erases an entry: stores (and loads
//! awaiting their architectural access) survive until commit.

use std::collections::BTreeMap;

use crate::common::error::Exception;
use crate::common::{PhysAddr, VirtAddr};
use crate::core::msg::TransactionId;
use crate::graph::Edge;
use crate::insn::class::{AccessClass, AccessSize};

/// The operation an entry models.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LsqKind {
    /// An ordinary or exclusive load.
    Load,
    /// An ordinary or exclusive store.
    Store,
    /// A fetch-op read-modify-write.
    Rmw,
    /// A compare-and-swap.
    Cas,
}

/// One load/store-queue entry.
#[derive(Clone, Copy, Debug)]
pub struct LsqEntry {
    /// Owning instruction's sequence number.
    pub seq: u64,
    /// The operation kind.
    pub kind: LsqKind,
    /// Access size.
    pub size: AccessSize,
    /// Ordering class of the access.
    pub class: AccessClass,
    /// Effective virtual address, once computed.
    pub vaddr: Option<VirtAddr>,
    /// Translated physical address, once the reply arrives.
    pub paddr: Option<PhysAddr>,
    /// Translation-path fault, raised at the owner's trap check.
    pub fault: Option<Exception>,
    /// Outgoing data (store value, RMW operand, CAS swap value).
    pub data: Option<u64>,
    /// CAS compare value.
    pub compare: Option<u64>,
    /// Edge satisfied when the incoming value is delivered.
    pub value_dep: Option<Edge>,
    /// Request sent to the memory hierarchy.
    pub issued: bool,
    /// Reply received.
    pub complete: bool,
    /// Owner has retired.
    pub retired: bool,
    /// Store suppressed by a failed exclusive pass; drained without a write.
    pub dropped: bool,
    /// Outstanding transaction, while issued.
    pub transaction: Option<TransactionId>,
}

impl LsqEntry {
    /// Creates an entry at dispatch time; addresses and data resolve later.
    pub fn new(seq: u64, kind: LsqKind, size: AccessSize, class: AccessClass) -> Self {
        Self {
            seq,
            kind,
            size,
            class,
            vaddr: None,
            paddr: None,
            fault: None,
            data: None,
            compare: None,
            value_dep: None,
            issued: false,
            complete: false,
            retired: false,
            dropped: false,
            transaction: None,
        }
    }

    /// True once address and data are resolved and no fault is pending
    /// (store-side retirement constraint).
    pub fn store_ready(&self) -> bool {
        self.paddr.is_some() && self.data.is_some() && self.fault.is_none()
    }

    /// True when the entry writes memory at commit.
    pub fn writes_memory(&self) -> bool {
        matches!(self.kind, LsqKind::Store | LsqKind::Rmw | LsqKind::Cas)
    }
}

/// The bounded load/store queue for one core.
#[derive(Debug)]
pub struct LoadStoreQueue {
    entries: BTreeMap<u64, LsqEntry>,
    capacity: usize,
}

impl LoadStoreQueue {
    /// Creates a queue holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "load/store queue capacity must be non-zero");
        Self {
            entries: BTreeMap::new(),
            capacity,
        }
    }

    /// Free entries remaining.
    pub fn available(&self) -> usize {
        self.capacity - self.entries.len()
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no entries are live.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Inserts an entry at dispatch.
    ///
    /// # Panics
    ///
    /// Overflow and duplicate sequence numbers are admission defects.
    pub fn allocate(&mut self, entry: LsqEntry) {
        assert!(self.available() > 0, "load/store queue overflow");
        let seq = entry.seq;
        let prior = self.entries.insert(seq, entry);
        assert!(prior.is_none(), "duplicate load/store entry for seq {seq}");
    }

    /// Entry for a sequence number.
    pub fn get(&self, seq: u64) -> Option<&LsqEntry> {
        self.entries.get(&seq)
    }

    /// Mutable entry for a sequence number.
    pub fn get_mut(&mut self, seq: u64) -> Option<&mut LsqEntry> {
        self.entries.get_mut(&seq)
    }

    /// Removes an entry (commit drain or squash).
    pub fn erase(&mut self, seq: u64) -> Option<LsqEntry> {
        self.entries.remove(&seq)
    }

    /// Oldest live entry.
    pub fn oldest(&self) -> Option<&LsqEntry> {
        self.entries.values().next()
    }

    /// Iterates entries oldest-first.
    pub fn iter(&self) -> impl Iterator<Item = &LsqEntry> {
        self.entries.values()
    }

}
