//! Per-dynamic-instruction record.
//!
//! An [`InstructionRecord`] carries everything one dynamic instruction needs
//! between decode and reclaim:
//! 1. **Identity:** program counter, raw encoding, sequence number, core index.
//! 2. **Operand table:** enumerated slots for immediates, resolved register
//!    values, and raw memory data.
//! 3. **Graph:** actions and effect chains allocated from the record's own
//!    arena, plus the worklist that drives satisfy/squash message delivery.
//! 4. **Bookkeeping:** resource class, commit gating, retirement dependences
//!    and constraints, rename rollback state.
//!
//! The record is created by the decoder, mutated by the core as the graph
//! executes, and destroyed (arena and all) at retirement or squash.

use std::collections::VecDeque;

use crate::common::reg::{LogReg, PhysReg};
use crate::common::VirtAddr;
use crate::graph::action::{apply_extension, condition_holds, Action, ActionKind, ActionState, BranchCond};
use crate::graph::arena::{Arena, NodeId};
use crate::graph::effect::{EffectChain, EffectKind, Event};
use crate::graph::{Edge, EdgeTarget, GraphMsg, Node, Outcome};
use crate::insn::class::{InstructionClass, OpClass};
use crate::insn::operand::{OperandCode, OperandTable};

/// Instruction resource classes and memory access attributes.
pub mod class;

/// The enumerated operand table.
pub mod operand;

/// Lifecycle state of an in-flight instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum InsnState {
    /// Decoded but not yet admitted to the reorder buffer.
    #[default]
    Decoded,
    /// Admitted; dispatch effects have run.
    Dispatched,
    /// At least one action is still pending or memory is outstanding.
    Executing,
    /// Retired in program order; commit may still be pending.
    Retired,
    /// Retired and committed; externally visible.
    Committed,
    /// Rolled back by a squash.
    Squashed,
}

/// A retirement constraint checked by the core before the record may retire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetireConstraint {
    /// The store's queue entry must have its address and data resolved.
    StoreQueueReady,
    /// The load's value must have been delivered.
    LoadComplete,
}

/// A source-register read the core resolves at dispatch.
#[derive(Clone, Copy, Debug)]
pub struct SourceRead {
    /// The logical register to read.
    pub reg: LogReg,
    /// Operand slot the resolved value lands in.
    pub code: OperandCode,
    /// Edge satisfied once the value is in place.
    pub edge: Edge,
}

/// Rename rollback state recorded when the destination is mapped.
#[derive(Clone, Copy, Debug)]
pub struct RenameUndo {
    /// The fresh physical register this instruction allocated.
    pub allocated: PhysReg,
    /// The mapping it displaced, restored on squash.
    pub previous: Option<PhysReg>,
}

/// Per-dynamic-instruction state container.
#[derive(Debug)]
pub struct InstructionRecord {
    pc: u64,
    encoding: u32,
    seq: u64,
    core_index: usize,
    predicted_target: Option<VirtAddr>,

    class: InstructionClass,
    opcode: OpClass,
    state: InsnState,
    may_commit: bool,
    /// The backend's NZCV flags are needed before dispatch actions run.
    reads_flags: bool,

    operands: OperandTable,
    arena: Arena<Node>,

    dispatch_effects: EffectChain,
    retirement_effects: EffectChain,
    commit_effects: EffectChain,
    squash_effects: EffectChain,
    annulment_effects: EffectChain,
    check_trap_effects: EffectChain,
    retire_constraints: Vec<RetireConstraint>,

    dispatch_actions: Vec<NodeId>,
    source_reads: Vec<SourceRead>,
    dest: Option<LogReg>,
    rename_undo: Option<RenameUndo>,

    retire_outstanding: u32,
    retire_squashed: bool,

    worklist: VecDeque<GraphMsg>,
}

impl InstructionRecord {
    /// Creates a record for one fetched instruction word.
    pub fn new(
        pc: u64,
        encoding: u32,
        seq: u64,
        core_index: usize,
        predicted_target: Option<VirtAddr>,
        arena_capacity: usize,
    ) -> Self {
        Self {
            pc,
            encoding,
            seq,
            core_index,
            predicted_target,
            class: InstructionClass::default(),
            opcode: OpClass::default(),
            state: InsnState::Decoded,
            may_commit: true,
            reads_flags: false,
            operands: OperandTable::new(),
            arena: Arena::new(arena_capacity),
            dispatch_effects: EffectChain::new(),
            retirement_effects: EffectChain::new(),
            commit_effects: EffectChain::new(),
            squash_effects: EffectChain::new(),
            annulment_effects: EffectChain::new(),
            check_trap_effects: EffectChain::new(),
            retire_constraints: Vec::new(),
            dispatch_actions: Vec::new(),
            source_reads: Vec::new(),
            dest: None,
            rename_undo: None,
            retire_outstanding: 0,
            retire_squashed: false,
            worklist: VecDeque::new(),
        }
    }

    /// Program counter of this instruction.
    #[inline]
    pub fn pc(&self) -> u64 {
        self.pc
    }

    /// Raw 32-bit encoding.
    #[inline]
    pub fn encoding(&self) -> u32 {
        self.encoding
    }

    /// Global dispatch sequence number (program order).
    #[inline]
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Index of the simulated core this instruction belongs to.
    #[inline]
    pub fn core_index(&self) -> usize {
        self.core_index
    }

    /// The fetch-time predicted target, if the front end supplied one.
    #[inline]
    pub fn predicted_target(&self) -> Option<VirtAddr> {
        self.predicted_target
    }

    /// Replaces the prediction after a dispatch-time redirect, so that
    /// retirement confirms against where fetch was actually steered.
    #[inline]
    pub fn set_predicted_target(&mut self, target: VirtAddr) {
        self.predicted_target = Some(target);
    }

    /// Current lifecycle state.
    #[inline]
    pub fn state(&self) -> InsnState {
        self.state
    }

    /// Advances the lifecycle state.
    pub fn set_state(&mut self, state: InsnState) {
        self.state = state;
    }

    /// Resource class recorded by the decoder.
    #[inline]
    pub fn class(&self) -> InstructionClass {
        self.class
    }

    /// Opcode class recorded by the decoder.
    #[inline]
    pub fn opcode(&self) -> OpClass {
        self.opcode
    }

    /// Records the resource class and opcode class.
    pub fn set_class(&mut self, class: InstructionClass, opcode: OpClass) {
        self.class = class;
        self.opcode = opcode;
    }

    /// Whether the instruction may commit once retired.
    #[inline]
    pub fn may_commit(&self) -> bool {
        self.may_commit
    }

    /// Defers (or re-enables) commit pending an external ordering condition.
    pub fn set_may_commit(&mut self, may_commit: bool) {
        self.may_commit = may_commit;
    }

    /// Whether the core must supply NZCV flags at dispatch.
    #[inline]
    pub fn reads_flags(&self) -> bool {
        self.reads_flags
    }

    /// Marks the record as needing NZCV flags at dispatch.
    pub fn set_reads_flags(&mut self) {
        self.reads_flags = true;
    }

    /// Sets an operand slot to a plain value.
    pub fn set_operand(&mut self, code: OperandCode, value: u64) {
        self.operands.set(code, value);
    }

    /// Reads an operand slot; an unset slot is a fatal wiring defect.
    pub fn operand(&self, code: OperandCode) -> u64 {
        self.operands.value(code)
    }

    /// Reads an operand slot with an explicit default.
    pub fn operand_or(&self, code: OperandCode, default: u64) -> u64 {
        self.operands.value_or(code, default)
    }

    /// Returns true if the slot has been set.
    pub fn has_operand(&self, code: OperandCode) -> bool {
        self.operands.is_set(code)
    }

    /// Appends an effect to the chain for `event`.
    pub fn add_effect(&mut self, event: Event, kind: EffectKind) {
        let chain = match event {
            Event::Dispatch => &mut self.dispatch_effects,
            Event::Retirement => &mut self.retirement_effects,
            Event::Commit => &mut self.commit_effects,
            Event::Squash => &mut self.squash_effects,
            Event::Annulment => &mut self.annulment_effects,
            Event::CheckTrap => &mut self.check_trap_effects,
        };
        chain.append(&mut self.arena, kind);
    }

    /// Appends to the dispatch chain.
    pub fn add_dispatch_effect(&mut self, kind: EffectKind) {
        self.add_effect(Event::Dispatch, kind);
    }

    /// Appends to the retirement chain.
    pub fn add_retirement_effect(&mut self, kind: EffectKind) {
        self.add_effect(Event::Retirement, kind);
    }

    /// Appends to the commit chain.
    pub fn add_commit_effect(&mut self, kind: EffectKind) {
        self.add_effect(Event::Commit, kind);
    }

    /// Appends to the squash chain.
    pub fn add_squash_effect(&mut self, kind: EffectKind) {
        self.add_effect(Event::Squash, kind);
    }

    /// Appends to the annulment chain.
    pub fn add_annulment_effect(&mut self, kind: EffectKind) {
        self.add_effect(Event::Annulment, kind);
    }

    /// Appends to the trap-check chain.
    pub fn add_check_trap_effect(&mut self, kind: EffectKind) {
        self.add_effect(Event::CheckTrap, kind);
    }

    /// Collects the effect kinds for `event` in invocation order.
    pub fn effects(&self, event: Event) -> Vec<EffectKind> {
        let chain = match event {
            Event::Dispatch => &self.dispatch_effects,
            Event::Retirement => &self.retirement_effects,
            Event::Commit => &self.commit_effects,
            Event::Squash => &self.squash_effects,
            Event::Annulment => &self.annulment_effects,
            Event::CheckTrap => &self.check_trap_effects,
        };
        chain.collect(&self.arena)
    }

    /// Adds a retirement constraint checked by the core.
    pub fn add_retirement_constraint(&mut self, constraint: RetireConstraint) {
        self.retire_constraints.push(constraint);
    }

    /// The retirement constraints recorded at decode.
    pub fn retirement_constraints(&self) -> &[RetireConstraint] {
        &self.retire_constraints
    }

    /// Allocates an action node from the record's arena.
    pub fn add_action(&mut self, action: Action) -> NodeId {
        self.arena.alloc(Node::Action(action))
    }

    /// Registers an action for evaluation at dispatch.
    pub fn add_dispatch_action(&mut self, id: NodeId) {
        self.dispatch_actions.push(id);
    }

    /// Connects `producer`'s completion to `edge`.
    pub fn connect(&mut self, producer: NodeId, edge: Edge) {
        self.arena.get_mut(producer).action_mut().dependents.push(edge);
    }

    /// Registers one retirement dependence and returns the edge that
    /// satisfies it.
    pub fn retirement_dependence(&mut self) -> Edge {
        self.retire_outstanding += 1;
        Edge {
            target: EdgeTarget::Retirement,
            slot: 0,
        }
    }

    /// True once every retirement dependence has been satisfied and none
    /// was squashed.
    pub fn retirement_ready(&self) -> bool {
        self.retire_outstanding == 0 && !self.retire_squashed
    }

    /// True if a retirement dependence was squashed.
    pub fn retirement_squashed(&self) -> bool {
        self.retire_squashed
    }

    /// Registers a source-register read resolved by the core at dispatch.
    ///
    /// Returns the action node so builders can wire its dependents.
    pub fn add_source_read(&mut self, reg: LogReg, code: OperandCode) -> NodeId {
        let id = self.add_action(Action::new(ActionKind::ReadRegister { dest: code }, 1));
        self.source_reads.push(SourceRead {
            reg,
            code,
            edge: Edge::to_action(id, 0),
        });
        id
    }

    /// The source-register reads the core must resolve at dispatch.
    pub fn source_reads(&self) -> Vec<SourceRead> {
        self.source_reads.clone()
    }

    /// Records the destination logical register.
    pub fn set_destination(&mut self, reg: LogReg) {
        self.dest = Some(reg);
    }

    /// Destination logical register, if any.
    pub fn destination(&self) -> Option<LogReg> {
        self.dest
    }

    /// Stores the rename rollback state after the destination was mapped.
    pub fn set_rename_undo(&mut self, undo: RenameUndo) {
        self.rename_undo = Some(undo);
    }

    /// The rename rollback state, if the destination was mapped.
    pub fn rename_undo(&self) -> Option<RenameUndo> {
        self.rename_undo
    }

    /// Number of graph nodes allocated so far (diagnostics).
    pub fn graph_nodes(&self) -> usize {
        self.arena.len()
    }

    /// Posts a message to the graph worklist without draining it.
    pub fn post(&mut self, msg: GraphMsg) {
        self.worklist.push_back(msg);
    }

    /// Posts evaluation requests for all dispatch-registered actions.
    ///
    /// Actions whose inputs are already satisfied (zero-input actions,
    /// immediates) fire on the next pump.
    pub fn launch(&mut self) {
        for id in self.dispatch_actions.clone() {
            self.worklist.push_back(GraphMsg::Evaluate(id));
        }
    }

    /// Returns the state of an action node (tests and diagnostics).
    pub fn action_state(&self, id: NodeId) -> ActionState {
        self.arena.get(id).action().state
    }

    /// Drains the graph worklist, applying satisfy/squash transitions and
    /// firing eligible actions, and returns the outcomes for the core.
    pub fn pump(&mut self) -> Vec<Outcome> {
        let mut outcomes = Vec::new();
        while let Some(msg) = self.worklist.pop_front() {
            match msg {
                GraphMsg::Satisfy(edge) => self.apply_satisfy(edge, &mut outcomes),
                GraphMsg::Squash(edge) => self.apply_squash(edge),
                GraphMsg::PredicateOn(id) => {
                    let eligible = {
                        let action = self.arena.get_mut(id).action_mut();
                        action.predicate = Some(true);
                        action.eligible()
                    };
                    if eligible {
                        self.fire(id, &mut outcomes);
                    }
                }
                GraphMsg::PredicateOff(id) => {
                    let action = self.arena.get_mut(id).action_mut();
                    if action.state == ActionState::Pending {
                        action.predicate = Some(false);
                    }
                }
                GraphMsg::Evaluate(id) => {
                    if self.arena.get(id).action().eligible() {
                        self.fire(id, &mut outcomes);
                    }
                }
            }
        }
        outcomes
    }

    fn apply_satisfy(&mut self, edge: Edge, outcomes: &mut Vec<Outcome>) {
        match edge.target {
            EdgeTarget::Action(id) => {
                let eligible = {
                    let action = self.arena.get_mut(id).action_mut();
                    match action.state {
                        // A satisfy arriving after the action fired (or was
                        // cancelled) must never re-fire it.
                        ActionState::Fired | ActionState::Cancelled => false,
                        ActionState::Pending | ActionState::Ready => {
                            action.outstanding = action.outstanding.saturating_sub(1);
                            action.eligible()
                        }
                    }
                };
                if eligible {
                    self.fire(id, outcomes);
                }
            }
            EdgeTarget::Retirement => {
                assert!(
                    self.retire_outstanding > 0,
                    "retirement dependence of seq {} satisfied more times than registered",
                    self.seq
                );
                self.retire_outstanding -= 1;
            }
        }
    }

    fn apply_squash(&mut self, edge: Edge) {
        match edge.target {
            EdgeTarget::Action(id) => {
                let action = self.arena.get_mut(id).action_mut();
                match action.state {
                    // Squash is one-way and idempotent; a fired result is
                    // not retracted.
                    ActionState::Fired | ActionState::Cancelled => {}
                    ActionState::Pending | ActionState::Ready => {
                        action.state = ActionState::Cancelled;
                        let dependents = std::mem::take(&mut action.dependents);
                        for dep in dependents {
                            self.worklist.push_back(GraphMsg::Squash(dep));
                        }
                    }
                }
            }
            EdgeTarget::Retirement => self.retire_squashed = true,
        }
    }

    /// Evaluates and fires an eligible action exactly once.
    fn fire(&mut self, id: NodeId, outcomes: &mut Vec<Outcome>) {
        let kind = {
            let action = self.arena.get_mut(id).action_mut();
            action.state = ActionState::Ready;
            action.kind
        };

        let (written, outcome) = self.evaluate(kind);
        if let Some((code, value)) = written {
            self.operands.set(code, value);
        }

        let action = self.arena.get_mut(id).action_mut();
        action.state = ActionState::Fired;
        action.output = written.map(|(_, value)| value);
        let dependents = action.dependents.clone();

        if let Some(outcome) = outcome {
            outcomes.push(outcome);
        }
        for dep in dependents {
            self.worklist.push_back(GraphMsg::Satisfy(dep));
        }
    }

    /// Computes an action kind against the operand table.
    fn evaluate(&self, kind: ActionKind) -> (Option<(OperandCode, u64)>, Option<Outcome>) {
        match kind {
            ActionKind::ReadRegister { dest } => {
                let value = self.operands.value(dest);
                (None, Some(Outcome::ValueProduced { code: dest, value }))
            }
            ActionKind::ComputeAddress { base, offset } => {
                let addr = self
                    .operands
                    .value(base)
                    .wrapping_add(self.operands.value_or(offset, 0));
                (
                    Some((OperandCode::Address, addr)),
                    Some(Outcome::AddressReady(VirtAddr(addr))),
                )
            }
            ActionKind::Add { a, b, dest } => {
                let value = self.operands.value(a).wrapping_add(self.operands.value(b));
                (
                    Some((dest, value)),
                    Some(Outcome::ValueProduced { code: dest, value }),
                )
            }
            ActionKind::Load { size, extend } => {
                let value = apply_extension(self.operands.value(OperandCode::MemValue), size, extend);
                (
                    Some((OperandCode::Result, value)),
                    Some(Outcome::ValueProduced {
                        code: OperandCode::Result,
                        value,
                    }),
                )
            }
            ActionKind::MoveOperand { src, dest } => {
                let value = self.operands.value(src);
                (
                    Some((dest, value)),
                    Some(Outcome::ValueProduced { code: dest, value }),
                )
            }
            ActionKind::BranchCondition { cond } => {
                let value = self.operands.value_or(OperandCode::Operand1, 0);
                let aux = match cond {
                    BranchCond::Field(_) => self.operands.value_or(OperandCode::CondFlags, 0),
                    _ => self.operands.value_or(OperandCode::Operand2, 0),
                };
                let taken = condition_holds(cond, value, aux);
                (
                    Some((OperandCode::Condition, u64::from(taken))),
                    Some(Outcome::BranchResolved { taken }),
                )
            }
        }
    }
}
