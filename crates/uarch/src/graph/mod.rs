//! Per-instruction dependency-graph primitives.
//!
//! Every dynamic instruction owns a small graph of nodes allocated from its
//! own arena:
//! 1. **Actions** compute a value once their input edges are satisfied.
//! 2. **Effects** are ordered procedures fired at pipeline-stage events.
//! 3. **Edges** connect a producer's completion to one consumer input slot,
//!    notified via explicit satisfy/squash messages.
//!
//! The graph is reclaimed as a whole when the instruction retires or is
//! squashed; no node is ever freed individually.

/// Value-producing actions and dependency edges.
pub mod action;

/// Fixed-capacity chained arena for graph nodes.
pub mod arena;

/// Ordered pipeline-event effects and chains.
pub mod effect;

pub use action::{Action, ActionKind, ActionState, BranchCond, Edge, EdgeTarget};
pub use arena::{Arena, NodeId, live_arenas};
pub use effect::{Effect, EffectChain, EffectKind, Event};

/// A node in an instruction's graph arena.
#[derive(Clone, Debug)]
pub enum Node {
    /// A value-producing action.
    Action(Action),
    /// A chained pipeline-event effect.
    Effect(Effect),
}

impl Node {
    /// Returns the action payload.
    ///
    /// # Panics
    ///
    /// Using an effect node where an action is required is a wiring defect.
    pub fn action(&self) -> &Action {
        match self {
            Self::Action(action) => action,
            Self::Effect(_) => panic!("graph node is not an action"),
        }
    }

    /// Returns the action payload mutably.
    ///
    /// # Panics
    ///
    /// Using an effect node where an action is required is a wiring defect.
    pub fn action_mut(&mut self) -> &mut Action {
        match self {
            Self::Action(action) => action,
            Self::Effect(_) => panic!("graph node is not an action"),
        }
    }
}

/// A message posted to an instruction's graph worklist.
///
/// Producers never call into consumers directly; completion and
/// cancellation travel as messages drained by the owning record's pump.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GraphMsg {
    /// One input edge of the target has been satisfied.
    Satisfy(Edge),
    /// One input edge of the target has been abandoned.
    Squash(Edge),
    /// The predicate guard of the action turned true.
    PredicateOn(NodeId),
    /// The predicate guard of the action turned false.
    PredicateOff(NodeId),
    /// Evaluate the action now if it is already eligible.
    ///
    /// Posted at dispatch for actions whose inputs were satisfied at
    /// decode (immediates, zero-input reads).
    Evaluate(NodeId),
}

/// An event the graph pump reports back to the out-of-order core.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// An action wrote a value into an operand slot.
    ValueProduced {
        /// The operand slot written.
        code: crate::insn::operand::OperandCode,
        /// The value produced.
        value: u64,
    },
    /// The effective address of the instruction's memory access is known.
    AddressReady(crate::common::VirtAddr),
    /// A conditional branch resolved its direction.
    BranchResolved {
        /// Whether the branch is taken.
        taken: bool,
    },
}
