//! Reorder buffer: the bounded in-order window of in-flight instructions.

use std::collections::VecDeque;

use crate::insn::InstructionRecord;

/// The bounded reorder buffer for one core. Head is the oldest instruction;
/// retirement leaves from the head only, squash removes from the tail.
#[derive(Debug)]
pub struct ReorderBuffer {
    entries: VecDeque<InstructionRecord>,
    capacity: usize,
}

impl ReorderBuffer {
    /// Creates a buffer admitting at most `capacity` instructions.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "reorder buffer capacity must be non-zero");
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Free slots remaining.
    pub fn available(&self) -> usize {
        self.capacity - self.entries.len()
    }

    /// Number of in-flight instructions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is in flight.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Admits an instruction at the tail.
    ///
    /// # Panics
    ///
    /// Admission past capacity, or out of program order, is a dispatch
    /// defect.
    pub fn push(&mut self, record: InstructionRecord) {
        assert!(self.available() > 0, "reorder buffer overflow");
        if let Some(back) = self.entries.back() {
            assert!(
                back.seq() < record.seq(),
                "out-of-order admission: seq {} after {}",
                record.seq(),
                back.seq()
            );
        }
        self.entries.push_back(record);
    }

    /// The oldest in-flight instruction.
    pub fn front(&self) -> Option<&InstructionRecord> {
        self.entries.front()
    }

    /// The youngest in-flight instruction.
    pub fn back(&self) -> Option<&InstructionRecord> {
        self.entries.back()
    }

    /// Removes and returns the oldest instruction (retirement path).
    pub fn pop_front(&mut self) -> Option<InstructionRecord> {
        self.entries.pop_front()
    }

    /// Removes and returns the youngest instruction (squash path).
    pub fn pop_back(&mut self) -> Option<InstructionRecord> {
        self.entries.pop_back()
    }

    /// Finds an in-flight instruction by sequence number.
    pub fn find(&self, seq: u64) -> Option<&InstructionRecord> {
        self.entries.iter().find(|r| r.seq() == seq)
    }

    /// Finds an in-flight instruction by sequence number, mutably.
    pub fn find_mut(&mut self, seq: u64) -> Option<&mut InstructionRecord> {
        self.entries.iter_mut().find(|r| r.seq() == seq)
    }
}
