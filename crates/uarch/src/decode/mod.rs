//! Instruction decoder.
//!
//! Turns one fetched 32-bit word into a fully wired [`InstructionRecord`]:
//! 1. Top-level field dispatch selects the family builder.
//! 2. The family builder allocates actions and effect chains from the
//!    record's arena and records operands, destinations, and constraints.
//! 3. Anything unrecognized routes to the unallocated builder, which raises
//!    an illegal-instruction exception only if the word actually executes.
//!
//! Decode never touches core state; the record is handed to the core for
//! admission afterwards.

use tracing::trace;

use crate::common::VirtAddr;
use crate::insn::InstructionRecord;

/// Atomic family: exclusives, compare-and-swap, fetch-op.
pub mod atomic;

/// Bitfield extraction helpers.
pub mod bits;

/// Branch family.
pub mod branch;

/// Shared graph-construction helpers.
pub mod builder;

/// Load/store family.
pub mod loadstore;

/// Unallocated-encoding fallback.
pub mod unallocated;

use bits::extract;

/// Arena capacity sized for the largest family builder's node count; an
/// overflowing record chains an extension region rather than failing.
const RECORD_ARENA_CAPACITY: usize = 48;

/// One fetched instruction word plus front-end state.
#[derive(Clone, Copy, Debug)]
pub struct FetchedOpcode {
    /// Virtual program counter of the word.
    pub pc: VirtAddr,
    /// The raw 32-bit encoding.
    pub word: u32,
    /// Predicted branch target, if the front end made a prediction.
    pub predicted_target: Option<VirtAddr>,
}

/// Decodes one fetched word into a wired instruction record.
pub fn decode(fetched: &FetchedOpcode, core_index: usize, seq: u64) -> InstructionRecord {
    let word = fetched.word;
    let mut inst = InstructionRecord::new(
        fetched.pc.val(),
        word,
        seq,
        core_index,
        fetched.predicted_target,
        RECORD_ARENA_CAPACITY,
    );

    if extract(word, 26, 5) == 0b00101 {
        branch::unconditional(&mut inst, word);
    } else if extract(word, 25, 7) == 0b0101010 && extract(word, 4, 1) == 0 {
        branch::conditional(&mut inst, word);
    } else if extract(word, 25, 6) == 0b011010 {
        branch::compare_and_branch(&mut inst, word);
    } else if extract(word, 25, 7) == 0b1101011 {
        if extract(word, 21, 2) <= 2 && extract(word, 16, 5) == 0b11111 {
            branch::indirect(&mut inst, word);
        } else {
            unallocated::unallocated(&mut inst);
        }
    } else if extract(word, 25, 6) == 0b011011 {
        branch::test_and_branch(&mut inst, word);
    } else if extract(word, 23, 7) == 0b0010001 {
        atomic::compare_swap(&mut inst, word);
    } else if extract(word, 23, 7) == 0b0010000 {
        atomic::exclusive(&mut inst, word);
    } else if is_fetch_op(word) {
        atomic::read_modify_write(&mut inst, word);
    } else if is_load_store_unsigned(word) {
        if !loadstore::load_store_unsigned(&mut inst, word) {
            unallocated::unallocated(&mut inst);
        }
    } else {
        unallocated::unallocated(&mut inst);
    }

    trace!(
        pc = format_args!("{:#x}", inst.pc()),
        word = format_args!("{word:#010x}"),
        seq,
        class = ?inst.class(),
        opcode = ?inst.opcode(),
        nodes = inst.graph_nodes(),
        "decoded"
    );
    inst
}

/// `LDADD`-shaped fetch-op: memory top bits, bit 21 set, opc and option
/// fields zero.
fn is_fetch_op(word: u32) -> bool {
    extract(word, 27, 3) == 0b111
        && extract(word, 26, 1) == 0
        && extract(word, 24, 2) == 0b00
        && extract(word, 21, 1) == 1
        && extract(word, 12, 3) == 0b000
        && extract(word, 10, 2) == 0b00
}

/// Unsigned-immediate-offset load/store group.
fn is_load_store_unsigned(word: u32) -> bool {
    extract(word, 27, 3) == 0b111 && extract(word, 26, 1) == 0 && extract(word, 24, 2) == 0b01
}
