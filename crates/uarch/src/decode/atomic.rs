//! Atomic-family decode builders: exclusive pairs, compare-and-swap, and
//! fetch-op read-modify-write.
//!
//! Every atomic defers commit (`set_may_commit(false)`) until the memory
//! system confirms the operation succeeded under the memory-order
//! speculation rules; the core re-enables commit when the reply arrives.

use crate::common::reg::LogReg;
use crate::decode::bits::extract;
use crate::decode::builder::{add_destination, add_read_register};
use crate::decode::loadstore::wire_address;
use crate::graph::action::{Action, ActionKind};
use crate::graph::effect::EffectKind;
use crate::graph::Edge;
use crate::insn::class::{AccessSize, ExtendMode, InstructionClass, OpClass};
use crate::insn::operand::OperandCode;
use crate::insn::{InstructionRecord, RetireConstraint};

/// Decodes `LDXR`/`STXR` (exclusive load/store pair).
pub fn exclusive(inst: &mut InstructionRecord, word: u32) {
    let size = AccessSize::from_field(extract(word, 30, 2) as u8);
    let load = extract(word, 22, 1) == 1;
    let rs = LogReg(extract(word, 16, 5) as u8);
    let rn = LogReg(extract(word, 5, 5) as u8);
    let rt = LogReg(extract(word, 0, 5) as u8);

    if load {
        build_exclusive_load(inst, rn, rt, size);
    } else {
        build_exclusive_store(inst, rn, rt, rs, size);
    }
}

/// Decodes `CAS` (compare and swap).
pub fn compare_swap(inst: &mut InstructionRecord, word: u32) {
    let size = AccessSize::from_field(extract(word, 30, 2) as u8);
    let rs = LogReg(extract(word, 16, 5) as u8);
    let rn = LogReg(extract(word, 5, 5) as u8);
    let rt = LogReg(extract(word, 0, 5) as u8);

    inst.set_class(InstructionClass::Atomic, OpClass::CompareSwap);
    let _addr = wire_address(inst, rn, 0);

    // Compare value and swap value resolve like ordinary sources.
    let compare = add_read_register(inst, rs, OperandCode::Operand3);
    let swap = add_read_register(inst, rt, OperandCode::StoreValue);

    // The old memory value comes back through the queue entry and lands in
    // rs, whatever the comparison decided.
    let old = inst.add_action(Action::predicated(
        ActionKind::Load {
            size,
            extend: ExtendMode::Zero,
        },
        1,
        true,
    ));
    let dep = Edge::to_action(old, 0);
    inst.add_dispatch_effect(EffectKind::AllocateCas { size, dep });
    inst.add_check_trap_effect(EffectKind::TranslationCheck);

    for producer in [compare, swap, old] {
        let retire = inst.retirement_dependence();
        inst.connect(producer, retire);
    }
    inst.add_retirement_constraint(RetireConstraint::StoreQueueReady);
    inst.add_retirement_effect(EffectKind::RetireMem);
    inst.add_commit_effect(EffectKind::AccessMem);
    inst.add_squash_effect(EffectKind::EraseLsq);
    inst.add_annulment_effect(EffectKind::SquashEdge(dep));
    inst.set_may_commit(false);

    add_destination(inst, rs);
}

/// Decodes `LDADD` (fetch-and-add read-modify-write).
pub fn read_modify_write(inst: &mut InstructionRecord, word: u32) {
    let size = AccessSize::from_field(extract(word, 30, 2) as u8);
    let rs = LogReg(extract(word, 16, 5) as u8);
    let rn = LogReg(extract(word, 5, 5) as u8);
    let rt = LogReg(extract(word, 0, 5) as u8);

    inst.set_class(InstructionClass::Atomic, OpClass::ReadModifyWrite);
    let _addr = wire_address(inst, rn, 0);

    // The addend travels to the memory system as the store value; the old
    // value returns as the load result.
    let addend = add_read_register(inst, rs, OperandCode::StoreValue);
    let old = inst.add_action(Action::predicated(
        ActionKind::Load {
            size,
            extend: ExtendMode::Zero,
        },
        1,
        true,
    ));
    let dep = Edge::to_action(old, 0);
    inst.add_dispatch_effect(EffectKind::AllocateRmw { size, dep });
    inst.add_check_trap_effect(EffectKind::TranslationCheck);

    for producer in [addend, old] {
        let retire = inst.retirement_dependence();
        inst.connect(producer, retire);
    }
    inst.add_retirement_constraint(RetireConstraint::StoreQueueReady);
    inst.add_retirement_effect(EffectKind::RetireMem);
    inst.add_commit_effect(EffectKind::AccessMem);
    inst.add_squash_effect(EffectKind::EraseLsq);
    inst.add_annulment_effect(EffectKind::SquashEdge(dep));
    inst.set_may_commit(false);

    add_destination(inst, rt);
}

fn build_exclusive_load(inst: &mut InstructionRecord, rn: LogReg, rt: LogReg, size: AccessSize) {
    inst.set_class(InstructionClass::Atomic, OpClass::LoadExclusive);
    let _addr = wire_address(inst, rn, 0);

    let load = inst.add_action(Action::predicated(
        ActionKind::Load {
            size,
            extend: ExtendMode::Zero,
        },
        1,
        true,
    ));
    let dep = Edge::to_action(load, 0);
    inst.add_dispatch_effect(EffectKind::AllocateLoad {
        size,
        class: crate::insn::class::AccessClass::Atomic,
        dep,
    });
    inst.add_check_trap_effect(EffectKind::TranslationCheck);

    let retire = inst.retirement_dependence();
    inst.connect(load, retire);
    inst.add_retirement_constraint(RetireConstraint::LoadComplete);
    // Arm the monitor only once the access is architecturally certain.
    inst.add_retirement_effect(EffectKind::MarkExclusive { size });
    inst.add_retirement_effect(EffectKind::RetireMem);
    inst.add_commit_effect(EffectKind::AccessMem);
    inst.add_squash_effect(EffectKind::EraseLsq);
    inst.add_annulment_effect(EffectKind::SquashEdge(dep));

    add_destination(inst, rt);
}

fn build_exclusive_store(
    inst: &mut InstructionRecord,
    rn: LogReg,
    rt: LogReg,
    rs: LogReg,
    size: AccessSize,
) {
    inst.set_class(InstructionClass::Atomic, OpClass::StoreExclusive);
    let addr = wire_address(inst, rn, 0);
    let data = add_read_register(inst, rt, OperandCode::StoreValue);

    for producer in [addr, data] {
        let retire = inst.retirement_dependence();
        inst.connect(producer, retire);
    }
    inst.add_retirement_constraint(RetireConstraint::StoreQueueReady);

    inst.add_dispatch_effect(EffectKind::AllocateStore {
        size,
        class: crate::insn::class::AccessClass::Atomic,
    });
    inst.add_check_trap_effect(EffectKind::TranslationCheck);
    // The monitor check writes the status register and decides whether the
    // store drains or is dropped.
    inst.add_retirement_effect(EffectKind::ExclusivePass { size });
    inst.add_retirement_effect(EffectKind::RetireMem);
    inst.add_commit_effect(EffectKind::CommitStore);
    inst.add_commit_effect(EffectKind::ClearExclusive);
    inst.add_squash_effect(EffectKind::EraseLsq);
    inst.set_may_commit(false);

    add_destination(inst, rs);
}
