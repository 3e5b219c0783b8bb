//! Modeled-program exception conditions.
//!
//! The simulator distinguishes two error tiers:
//! 1. **Simulator defects** — arena overflow, reads of unset operands,
//!    unrecognized message types. These are bugs in the simulator itself and
//!    abort the run via `assert!`/`panic!`; they never appear here.
//! 2. **Modeled-program conditions** — faults the simulated program can
//!    cause. These are ordinary values carried through exception effects and
//!    this module defines them.

use thiserror::Error;

use super::addr::VirtAddr;

/// A synchronous exception raised by the modeled program.
///
/// Exceptions are inserted into an instruction's effect chains by the decoder
/// or the translation path and surface when the instruction approaches
/// retirement, where they squash younger work and redirect the front end.
/// They are never raised as host-level panics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum Exception {
    /// The fetched word does not decode to any allocated encoding.
    #[error("illegal instruction {0:#010x}")]
    IllegalInstruction(u32),

    /// A data access violated memory protection.
    #[error("data abort at {:#x}", .0.0)]
    DataAbort(VirtAddr),

    /// A data access was not aligned for its size.
    #[error("alignment fault at {:#x}", .0.0)]
    AlignmentFault(VirtAddr),

    /// Address translation failed for a data access.
    #[error("translation fault at {:#x}", .0.0)]
    TranslationFault(VirtAddr),
}
