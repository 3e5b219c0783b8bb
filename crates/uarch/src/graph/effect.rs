//! Ordered pipeline-event effects.
//!
//! An effect is a procedure fired at a pipeline-stage transition (dispatch,
//! retirement, commit, squash, annulment, trap check). Effects are chained
//! through the owning instruction's arena: invoking an effect always invokes
//! its successor, so one chain behaves as a single ordered procedure
//! sequence triggered atomically at its event.
//!
//! [`EffectKind`] is a closed set: the out-of-order core interprets each
//! kind in one dispatch table, and an unknown combination of kind and event
//! is a wiring defect, not a runtime condition.

use crate::common::error::Exception;
use crate::common::VirtAddr;
use crate::graph::action::Edge;
use crate::graph::arena::{Arena, NodeId};
use crate::graph::Node;
use crate::insn::class::{AccessClass, AccessSize};

/// Pipeline events an instruction carries an effect chain for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    /// The instruction is admitted into the reorder buffer.
    Dispatch,
    /// The instruction retires in program order.
    Retirement,
    /// A retired memory instruction's access becomes externally visible.
    Commit,
    /// The instruction is rolled back by a squash.
    Squash,
    /// The instruction is annulled (predicated false) without a squash.
    Annulment,
    /// Trap conditions are checked just before retirement.
    CheckTrap,
}

/// The closed set of effect kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EffectKind {
    /// Maps the instruction's destination register to a fresh physical
    /// register, remembering the displaced mapping for rollback.
    MapDestination,
    /// Rolls the destination mapping back (squash path): restores the
    /// displaced mapping and returns the fresh register to the free list.
    UnmapDestination,
    /// Frees the displaced physical register (retirement path): once this
    /// mapping is architectural, the previous holder is dead.
    FreeMapping,
    /// Speculatively redirects fetch to a decode-time-known target.
    Branch(VirtAddr),
    /// Redirects fetch to the computed
    /// [`OperandCode::Address`](crate::insn::operand::OperandCode::Address)
    /// value.
    BranchToComputedAddress,
    /// Retirement-time confirmation of an unconditional branch.
    UpdateUnconditional(VirtAddr),
    /// Retirement-time confirmation of a conditional branch against the
    /// evaluated
    /// [`OperandCode::Condition`](crate::insn::operand::OperandCode::Condition)
    /// operand.
    UpdateConditional(VirtAddr),
    /// Retirement-time confirmation of a call (link-writing) branch.
    UpdateCall(VirtAddr),
    /// Allocates a load entry in the load/store queue; `dep` is satisfied
    /// when the memory reply delivers the value.
    AllocateLoad {
        /// Access size of the load.
        size: AccessSize,
        /// Ordering class of the access.
        class: AccessClass,
        /// Edge satisfied when the load value arrives.
        dep: Edge,
    },
    /// Allocates a store entry in the load/store queue.
    AllocateStore {
        /// Access size of the store.
        size: AccessSize,
        /// Ordering class of the access.
        class: AccessClass,
    },
    /// Allocates a read-modify-write entry; `dep` is satisfied when the
    /// old memory value arrives.
    AllocateRmw {
        /// Access size of the operation.
        size: AccessSize,
        /// Edge satisfied when the old value arrives.
        dep: Edge,
    },
    /// Allocates a compare-and-swap entry; `dep` is satisfied when the
    /// old memory value arrives.
    AllocateCas {
        /// Access size of the operation.
        size: AccessSize,
        /// Edge satisfied when the old value arrives.
        dep: Edge,
    },
    /// Erases the instruction's load/store-queue entry (squash path).
    EraseLsq,
    /// Marks the instruction's memory entry as retired.
    RetireMem,
    /// Commits a store: issues the memory write and drains the entry.
    CommitStore,
    /// Commit-point bookkeeping for loads and read-modify-writes: the
    /// access is architecturally performed and the entry drains.
    AccessMem,
    /// Raises any translation fault recorded for this instruction.
    TranslationCheck,
    /// Satisfies a dependency edge of this instruction's own graph.
    Satisfy(Edge),
    /// Squashes a dependency edge of this instruction's own graph.
    SquashEdge(Edge),
    /// Arms the exclusive monitor over the accessed block.
    MarkExclusive {
        /// Access size the monitor covers.
        size: AccessSize,
    },
    /// Checks the exclusive monitor, producing a pass/fail status operand.
    ExclusivePass {
        /// Access size the conditional store covers.
        size: AccessSize,
    },
    /// Disarms the exclusive monitor.
    ClearExclusive,
    /// Raises a modeled-program exception at the trap-check point.
    RaiseException(Exception),
}

/// A chainable effect node.
#[derive(Clone, Debug)]
pub struct Effect {
    /// The procedure this node performs.
    pub kind: EffectKind,
    /// Successor in the chain, always invoked after this node.
    pub next: Option<NodeId>,
}

/// Owns the head and tail of one event's effect chain.
///
/// `append` preserves program order within the instruction; invocation
/// walks head to tail exactly once per trigger event.
#[derive(Clone, Copy, Debug, Default)]
pub struct EffectChain {
    head: Option<NodeId>,
    tail: Option<NodeId>,
}

impl EffectChain {
    /// Creates an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if no effect has been appended.
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Appends an effect to the tail, allocating its node from `arena`.
    pub fn append(&mut self, arena: &mut Arena<Node>, kind: EffectKind) {
        let id = arena.alloc(Node::Effect(Effect { kind, next: None }));
        match self.tail {
            Some(tail) => match arena.get_mut(tail) {
                Node::Effect(effect) => effect.next = Some(id),
                Node::Action(_) => panic!("effect chain tail is not an effect node"),
            },
            None => self.head = Some(id),
        }
        self.tail = Some(id);
    }

    /// Collects the chain's kinds in invocation (append) order.
    ///
    /// The walk follows each node's `next` link, so a node always delivers
    /// its successor; the caller interprets the kinds one by one.
    pub fn collect(&self, arena: &Arena<Node>) -> Vec<EffectKind> {
        let mut kinds = Vec::new();
        let mut cursor = self.head;
        while let Some(id) = cursor {
            match arena.get(id) {
                Node::Effect(effect) => {
                    kinds.push(effect.kind);
                    cursor = effect.next;
                }
                Node::Action(_) => panic!("effect chain node is not an effect"),
            }
        }
        kinds
    }
}
