//! Shared graph-construction helpers used by every decode family.
//!
//! Builders only wire structure into the record: actions, edges, operand
//! slots, effect chains. Nothing is computed here; values flow at dispatch
//! when the core resolves source reads and the graph pump runs.

use crate::common::reg::LogReg;
use crate::graph::action::{Action, ActionKind};
use crate::graph::arena::NodeId;
use crate::graph::effect::EffectKind;
use crate::graph::Edge;
use crate::insn::operand::OperandCode;
use crate::insn::InstructionRecord;

/// Wires a source-register read whose value lands in `code`.
///
/// Reads of the zero register short-circuit: the slot is set to zero at
/// decode and the read action fires at dispatch with no rename lookup.
pub fn add_read_register(inst: &mut InstructionRecord, reg: LogReg, code: OperandCode) -> NodeId {
    if reg.is_zero() {
        inst.set_operand(code, 0);
        let id = inst.add_action(Action::new(ActionKind::ReadRegister { dest: code }, 0));
        inst.add_dispatch_action(id);
        id
    } else {
        inst.add_source_read(reg, code)
    }
}

/// Wires an effective-address computation `Operand1 + Operand2` with
/// `inputs` unsatisfied edges. `Operand2` defaults to zero when unset.
pub fn add_compute_address(inst: &mut InstructionRecord, inputs: u8) -> NodeId {
    inst.add_action(Action::new(
        ActionKind::ComputeAddress {
            base: OperandCode::Operand1,
            offset: OperandCode::Operand2,
        },
        inputs,
    ))
}

/// Sets an immediate operand and satisfies the edge that was waiting on it
/// at dispatch time.
pub fn add_immediate(inst: &mut InstructionRecord, code: OperandCode, value: u64, edge: Edge) {
    inst.set_operand(code, value);
    inst.add_dispatch_effect(EffectKind::Satisfy(edge));
}

/// Wires the destination-register plumbing shared by every writing
/// instruction: map at dispatch, unmap on squash, free the displaced
/// mapping at retirement.
pub fn add_destination(inst: &mut InstructionRecord, reg: LogReg) {
    if reg.is_zero() {
        // Writes to the zero register are architectural no-ops; the value
        // is still computed but never mapped.
        return;
    }
    inst.set_destination(reg);
    inst.add_dispatch_effect(EffectKind::MapDestination);
    inst.add_squash_effect(EffectKind::UnmapDestination);
    inst.add_retirement_effect(EffectKind::FreeMapping);
}

/// Wires a link-register write of `pc + 4` for call-class branches.
///
/// Uses the high operand slots so it never collides with the branch's own
/// condition or address operands.
pub fn add_link(inst: &mut InstructionRecord, link_reg: LogReg) {
    inst.set_operand(OperandCode::Operand3, inst.pc());
    inst.set_operand(OperandCode::Operand4, 4);
    let add = inst.add_action(Action::new(
        ActionKind::Add {
            a: OperandCode::Operand3,
            b: OperandCode::Operand4,
            dest: OperandCode::Result,
        },
        0,
    ));
    inst.add_dispatch_action(add);
    add_destination(inst, link_reg);
}
