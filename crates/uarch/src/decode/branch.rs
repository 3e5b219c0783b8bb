//! Branch-family decode builders.
//!
//! Targets are computed at decode from the instruction word; direction (for
//! conditional forms) and the final address (for register-indirect forms)
//! resolve in the graph and gate retirement through a retirement dependence.

use crate::common::reg::{LogReg, LINK_REG};
use crate::common::VirtAddr;
use crate::decode::bits::{extract, sextract};
use crate::decode::builder::{add_compute_address, add_link, add_read_register};
use crate::graph::action::{Action, ActionKind, BranchCond};
use crate::graph::effect::EffectKind;
use crate::graph::Edge;
use crate::insn::class::{InstructionClass, OpClass};
use crate::insn::operand::OperandCode;
use crate::insn::InstructionRecord;

/// `B` / `BL`: pc-relative unconditional branch, optionally linking.
pub fn unconditional(inst: &mut InstructionRecord, word: u32) {
    let link = extract(word, 31, 1) == 1;
    let offset = sextract(word, 0, 26);
    let target = VirtAddr(
        inst.pc()
            .wrapping_add(offset.wrapping_mul(4).wrapping_sub(4) as u64),
    );

    if link {
        inst.set_class(InstructionClass::Branch, OpClass::BranchCall);
        inst.add_retirement_effect(EffectKind::UpdateCall(target));
        add_link(inst, LINK_REG);
    } else {
        inst.set_class(InstructionClass::Branch, OpClass::BranchUnconditional);
        inst.add_retirement_effect(EffectKind::UpdateUnconditional(target));
    }
    // Speculative front-end redirect at dispatch; confirmed at retirement.
    inst.add_dispatch_effect(EffectKind::Branch(target));
}

/// `B.cond`: pc-relative branch on the NZCV condition field.
pub fn conditional(inst: &mut InstructionRecord, word: u32) {
    let cond = extract(word, 0, 4) as u8;
    let target = VirtAddr(
        inst.pc()
            .wrapping_add(sextract(word, 5, 19).wrapping_mul(4) as u64),
    );

    inst.set_class(InstructionClass::Branch, OpClass::BranchConditional);
    inst.set_reads_flags();

    let act = inst.add_action(Action::new(
        ActionKind::BranchCondition {
            cond: BranchCond::Field(cond),
        },
        1,
    ));
    // The core fills CondFlags before running the dispatch chain, so the
    // condition's single input can be satisfied there.
    inst.add_dispatch_effect(EffectKind::Satisfy(Edge::to_action(act, 0)));
    let retire = inst.retirement_dependence();
    inst.connect(act, retire);
    inst.add_retirement_effect(EffectKind::UpdateConditional(target));
}

/// `CBZ` / `CBNZ`: branch on register compare against zero.
pub fn compare_and_branch(inst: &mut InstructionRecord, word: u32) {
    let negated = extract(word, 24, 1) == 1;
    let rt = LogReg(extract(word, 0, 5) as u8);
    let target = VirtAddr(
        inst.pc()
            .wrapping_add(sextract(word, 5, 19).wrapping_mul(4) as u64),
    );

    inst.set_class(InstructionClass::Branch, OpClass::BranchConditional);
    let cond = if negated {
        BranchCond::NeZero
    } else {
        BranchCond::EqZero
    };
    wire_condition(inst, rt, cond, target);
}

/// `TBZ` / `TBNZ`: branch on a single register bit.
pub fn test_and_branch(inst: &mut InstructionRecord, word: u32) {
    let set = extract(word, 24, 1) == 1;
    let bit = (extract(word, 31, 1) << 5) | extract(word, 19, 5);
    let target = VirtAddr(
        inst.pc()
            .wrapping_add(sextract(word, 5, 14).wrapping_mul(4).wrapping_sub(4) as u64),
    );
    let rt = LogReg(extract(word, 0, 5) as u8);

    inst.set_class(InstructionClass::Branch, OpClass::BranchConditional);
    inst.set_operand(OperandCode::Operand2, 1u64 << bit);
    let cond = if set {
        BranchCond::BitSet
    } else {
        BranchCond::BitClear
    };
    wire_condition(inst, rt, cond, target);
}

/// `BR` / `BLR` / `RET`: register-indirect branch.
///
/// Unrecognized opc fields are the caller's problem; the top-level
/// dispatcher routes them to the unallocated builder.
pub fn indirect(inst: &mut InstructionRecord, word: u32) {
    let opc = extract(word, 21, 2);
    let rn = LogReg(extract(word, 5, 5) as u8);
    let link = opc == 1;

    let opclass = if link {
        OpClass::BranchCall
    } else {
        OpClass::BranchIndirect
    };
    inst.set_class(InstructionClass::Branch, opclass);

    let read = add_read_register(inst, rn, OperandCode::Operand1);
    let addr = add_compute_address(inst, 1);
    inst.connect(read, Edge::to_action(addr, 0));
    let retire = inst.retirement_dependence();
    inst.connect(addr, retire);
    inst.add_retirement_effect(EffectKind::BranchToComputedAddress);

    if link {
        add_link(inst, LINK_REG);
    }
}

/// Shared wiring for direction-resolving branches: a register read feeding
/// the condition action, which gates retirement.
fn wire_condition(inst: &mut InstructionRecord, rt: LogReg, cond: BranchCond, target: VirtAddr) {
    let read = add_read_register(inst, rt, OperandCode::Operand1);
    let act = inst.add_action(Action::new(ActionKind::BranchCondition { cond }, 1));
    inst.connect(read, Edge::to_action(act, 0));
    let retire = inst.retirement_dependence();
    inst.connect(act, retire);
    inst.add_retirement_effect(EffectKind::UpdateConditional(target));
}
