//! Core configuration.
//!
//! Deserialized from the embedding simulator's JSON configuration; every
//! field has a default so a partial (or empty) object configures a usable
//! core.

use serde::{Deserialize, Serialize};

/// Sizing and width parameters for one out-of-order core.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Reorder-buffer entries.
    pub rob_entries: usize,
    /// Load/store-queue entries.
    pub lsq_entries: usize,
    /// Miss-status holding registers.
    pub mshr_entries: usize,
    /// Physical registers backing rename.
    pub phys_regs: usize,
    /// Instructions retired per cycle.
    pub retire_width: usize,
    /// Memory instructions committed per cycle.
    pub commit_width: usize,
    /// Coherence block size in bytes.
    pub block_size: u64,
    /// Egress memory-port depth.
    pub memory_port_depth: usize,
    /// Egress snoop-port depth.
    pub snoop_port_depth: usize,
    /// Egress translation-port depth.
    pub translation_port_depth: usize,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            rob_entries: defaults::ROB_ENTRIES,
            lsq_entries: defaults::LSQ_ENTRIES,
            mshr_entries: defaults::MSHR_ENTRIES,
            phys_regs: defaults::PHYS_REGS,
            retire_width: defaults::RETIRE_WIDTH,
            commit_width: defaults::COMMIT_WIDTH,
            block_size: defaults::BLOCK_SIZE,
            memory_port_depth: defaults::PORT_DEPTH,
            snoop_port_depth: defaults::PORT_DEPTH,
            translation_port_depth: defaults::PORT_DEPTH,
        }
    }
}

impl CoreConfig {
    /// Checks the invariants the core's assertions rely on.
    ///
    /// # Panics
    ///
    /// Zero-sized structures and a non-power-of-two block size make the
    /// model meaningless; they are configuration defects.
    pub fn validate(&self) {
        assert!(self.rob_entries > 0, "rob_entries must be non-zero");
        assert!(self.lsq_entries > 0, "lsq_entries must be non-zero");
        assert!(self.mshr_entries > 0, "mshr_entries must be non-zero");
        assert!(
            self.phys_regs >= 32,
            "phys_regs must cover the architectural registers"
        );
        assert!(self.retire_width > 0, "retire_width must be non-zero");
        assert!(self.commit_width > 0, "commit_width must be non-zero");
        assert!(
            self.block_size.is_power_of_two(),
            "block_size must be a power of two"
        );
    }
}

/// Default sizing, matching a mid-size simulated core.
pub mod defaults {
    /// Reorder-buffer entries.
    pub const ROB_ENTRIES: usize = 64;
    /// Load/store-queue entries.
    pub const LSQ_ENTRIES: usize = 32;
    /// Miss-status holding registers.
    pub const MSHR_ENTRIES: usize = 8;
    /// Physical registers.
    pub const PHYS_REGS: usize = 128;
    /// Retirement width.
    pub const RETIRE_WIDTH: usize = 4;
    /// Commit width.
    pub const COMMIT_WIDTH: usize = 2;
    /// Coherence block size.
    pub const BLOCK_SIZE: u64 = 64;
    /// Egress port depth.
    pub const PORT_DEPTH: usize = 8;
}
