//! Register rename: logical→physical mapping, free list, ready/value
//! tracking, and per-physical waiter lists.
//!
//! Invariant: a physical register returns to the free list only through
//! `free` (at retirement of the instruction that displaced it) or `unmap`
//! (squash of the instruction that allocated it). It is never recycled while
//! an in-flight consumer still waits on it.

use std::collections::VecDeque;

use crate::common::reg::{LogReg, PhysReg};
use crate::graph::Edge;
use crate::insn::operand::OperandCode;

/// A consumer waiting for a physical register to produce its value.
#[derive(Clone, Copy, Debug)]
pub struct Waiter {
    /// Sequence number of the waiting instruction.
    pub seq: u64,
    /// Edge to satisfy once the value is available.
    pub edge: Edge,
    /// Operand slot of the waiting record to fill.
    pub code: OperandCode,
}

/// The rename table for one core.
#[derive(Debug)]
pub struct RenameTable {
    /// Current logical→physical mapping; `None` means the architectural
    /// value lives in the backend.
    map: Vec<Option<PhysReg>>,
    free: VecDeque<PhysReg>,
    ready: Vec<bool>,
    value: Vec<u64>,
    waiters: Vec<Vec<Waiter>>,
}

impl RenameTable {
    /// Creates a table with `phys_count` physical registers, all free.
    pub fn new(phys_count: usize) -> Self {
        Self {
            map: vec![None; 32],
            free: (0..phys_count).map(|i| PhysReg(i as u16)).collect(),
            ready: vec![false; phys_count],
            value: vec![0; phys_count],
            waiters: vec![Vec::new(); phys_count],
        }
    }

    /// Number of free physical registers.
    pub fn available(&self) -> usize {
        self.free.len()
    }

    /// Current mapping of a logical register, if renamed.
    pub fn lookup(&self, reg: LogReg) -> Option<PhysReg> {
        self.map[reg.0 as usize]
    }

    /// Maps `reg` to a fresh physical register.
    ///
    /// Returns the allocation and the displaced mapping (to be freed at the
    /// mapping instruction's retirement, or restored on its squash).
    ///
    /// # Panics
    ///
    /// The core checks `available()` before dispatch; exhaustion here is a
    /// defect.
    pub fn map_destination(&mut self, reg: LogReg) -> (PhysReg, Option<PhysReg>) {
        let allocated = self
            .free
            .pop_front()
            .unwrap_or_else(|| panic!("physical register file exhausted mapping {reg:?}"));
        self.ready[allocated.0 as usize] = false;
        self.value[allocated.0 as usize] = 0;
        let previous = self.map[reg.0 as usize].replace(allocated);
        (allocated, previous)
    }

    /// Rolls back a mapping on squash: restores the displaced mapping and
    /// returns the allocation to the free list.
    pub fn unmap(&mut self, reg: LogReg, allocated: PhysReg, previous: Option<PhysReg>) {
        assert_eq!(
            self.map[reg.0 as usize],
            Some(allocated),
            "unmap of {reg:?} does not match the current mapping"
        );
        self.map[reg.0 as usize] = previous;
        self.waiters[allocated.0 as usize].clear();
        self.ready[allocated.0 as usize] = false;
        self.free.push_back(allocated);
    }

    /// Frees a displaced physical register once its displacer retires.
    pub fn free(&mut self, reg: PhysReg) {
        assert!(
            self.waiters[reg.0 as usize].is_empty(),
            "freeing {reg:?} with consumers still waiting"
        );
        self.ready[reg.0 as usize] = false;
        self.free.push_back(reg);
    }

    /// Publishes a produced value and drains the waiters that can now be
    /// satisfied.
    pub fn write(&mut self, reg: PhysReg, value: u64) -> Vec<Waiter> {
        self.ready[reg.0 as usize] = true;
        self.value[reg.0 as usize] = value;
        std::mem::take(&mut self.waiters[reg.0 as usize])
    }

    /// Reads a physical register if its value has been produced.
    pub fn read(&self, reg: PhysReg) -> Option<u64> {
        self.ready[reg.0 as usize].then(|| self.value[reg.0 as usize])
    }

    /// Registers a consumer waiting on `reg`.
    pub fn add_waiter(&mut self, reg: PhysReg, waiter: Waiter) {
        assert!(
            !self.ready[reg.0 as usize],
            "waiter registered on already-ready {reg:?}"
        );
        self.waiters[reg.0 as usize].push(waiter);
    }

    /// Drops every waiter registered by a squashed instruction.
    pub fn remove_waiters_of(&mut self, seq: u64) {
        for list in &mut self.waiters {
            list.retain(|w| w.seq != seq);
        }
    }
}
