//! Fallback builder for unrecognized or unallocated encodings.

use crate::common::error::Exception;
use crate::graph::effect::EffectKind;
use crate::insn::class::{InstructionClass, OpClass};
use crate::insn::InstructionRecord;

/// Builds a well-formed record that raises an illegal-instruction
/// exception if it reaches its trap-check point.
///
/// The record flows through the pipeline like any other instruction and is
/// simply squashed away if an older branch mispredicted into it; the
/// exception only surfaces when the instruction would actually execute.
pub fn unallocated(inst: &mut InstructionRecord) {
    let word = inst.encoding();
    inst.set_class(InstructionClass::Computation, OpClass::Unallocated);
    inst.add_check_trap_effect(EffectKind::RaiseException(Exception::IllegalInstruction(
        word,
    )));
}
