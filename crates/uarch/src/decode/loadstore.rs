//! Load/store-family decode builders (unsigned-immediate-offset forms).
//!
//! Both forms share the address pipeline: a register read feeding an
//! address-compute action, with the scaled immediate satisfied from the
//! dispatch chain. Loads gate retirement on value delivery; stores gate
//! commit on the queue entry being drained.

use crate::common::reg::LogReg;
use crate::decode::bits::extract;
use crate::decode::builder::{add_compute_address, add_destination, add_immediate, add_read_register};
use crate::graph::action::{Action, ActionKind};
use crate::graph::arena::NodeId;
use crate::graph::effect::EffectKind;
use crate::graph::Edge;
use crate::insn::class::{AccessClass, AccessSize, ExtendMode, InstructionClass, OpClass};
use crate::insn::operand::OperandCode;
use crate::insn::{InstructionRecord, RetireConstraint};

/// Decodes `LDR`/`STR`/`LDRS*` (unsigned immediate offset).
///
/// Returns `false` for field combinations with no allocated instruction
/// (prefetch hints, signed doubleword) so the caller can route the word
/// to the unallocated builder.
pub fn load_store_unsigned(inst: &mut InstructionRecord, word: u32) -> bool {
    let size_field = extract(word, 30, 2) as u8;
    let opc = extract(word, 22, 2);
    let offset = u64::from(extract(word, 10, 12)) << size_field;
    let rn = LogReg(extract(word, 5, 5) as u8);
    let rt = LogReg(extract(word, 0, 5) as u8);
    let size = AccessSize::from_field(size_field);

    match opc {
        0b00 => {
            build_store(inst, rn, rt, size, offset);
            true
        }
        0b01 => {
            build_load(inst, rn, rt, size, ExtendMode::Zero, offset);
            true
        }
        // Signed loads; doubleword size here is PRFM or unallocated.
        0b10 | 0b11 if size_field != 0b11 => {
            build_load(inst, rn, rt, size, ExtendMode::Sign, offset);
            true
        }
        _ => false,
    }
}

/// Wires the shared base + scaled-immediate address computation and returns
/// the address action.
pub(crate) fn wire_address(inst: &mut InstructionRecord, rn: LogReg, offset: u64) -> NodeId {
    let base = add_read_register(inst, rn, OperandCode::Operand1);
    let addr = add_compute_address(inst, 2);
    inst.connect(base, Edge::to_action(addr, 0));
    add_immediate(inst, OperandCode::Operand2, offset, Edge::to_action(addr, 1));
    addr
}

fn build_load(
    inst: &mut InstructionRecord,
    rn: LogReg,
    rt: LogReg,
    size: AccessSize,
    extend: ExtendMode,
    offset: u64,
) {
    inst.set_class(InstructionClass::Load, OpClass::Load);
    let _addr = wire_address(inst, rn, offset);

    // The load action's single input is the delivered memory value; it can
    // be annulled if the instruction turns out not to execute.
    let load = inst.add_action(Action::predicated(ActionKind::Load { size, extend }, 1, true));
    let dep = Edge::to_action(load, 0);

    inst.add_dispatch_effect(EffectKind::AllocateLoad {
        size,
        class: AccessClass::Normal,
        dep,
    });
    inst.add_check_trap_effect(EffectKind::TranslationCheck);

    let retire = inst.retirement_dependence();
    inst.connect(load, retire);
    inst.add_retirement_constraint(RetireConstraint::LoadComplete);
    inst.add_retirement_effect(EffectKind::RetireMem);
    inst.add_commit_effect(EffectKind::AccessMem);
    inst.add_squash_effect(EffectKind::EraseLsq);
    inst.add_annulment_effect(EffectKind::SquashEdge(dep));

    add_destination(inst, rt);
}

fn build_store(
    inst: &mut InstructionRecord,
    rn: LogReg,
    rt: LogReg,
    size: AccessSize,
    offset: u64,
) {
    inst.set_class(InstructionClass::Store, OpClass::Store);
    let addr = wire_address(inst, rn, offset);
    let data = add_read_register(inst, rt, OperandCode::StoreValue);

    // A store retires only once both its address and its data are in the
    // queue entry; the entry itself survives retirement until commit.
    let addr_ready = inst.retirement_dependence();
    inst.connect(addr, addr_ready);
    let data_ready = inst.retirement_dependence();
    inst.connect(data, data_ready);
    inst.add_retirement_constraint(RetireConstraint::StoreQueueReady);

    inst.add_dispatch_effect(EffectKind::AllocateStore {
        size,
        class: AccessClass::Normal,
    });
    inst.add_check_trap_effect(EffectKind::TranslationCheck);
    inst.add_retirement_effect(EffectKind::RetireMem);
    inst.add_commit_effect(EffectKind::CommitStore);
    inst.add_squash_effect(EffectKind::EraseLsq);
}
