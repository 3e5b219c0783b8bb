//! Value-producing dependency-graph actions.
//!
//! An action computes a value once all of its input edges have been
//! satisfied and its predicate (if any) holds. The closed [`ActionKind`] set
//! keeps evaluation in one place against the owning instruction's operand
//! table, and satisfaction travels as explicit messages instead of
//! callbacks.
//!
//! Lifecycle per action: `Pending → Ready → Fired`, with the alternate
//! terminal `Cancelled` reachable from `Pending` or `Ready` via squash. A
//! fired action never re-fires and a squash never retracts a fired result.

use crate::graph::arena::NodeId;
use crate::insn::class::{AccessSize, ExtendMode};
use crate::insn::operand::OperandCode;

/// Lifecycle state of an action node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ActionState {
    /// Waiting on one or more input edges (or a false predicate).
    #[default]
    Pending,
    /// All inputs satisfied and predicate true; evaluation is imminent.
    Ready,
    /// Evaluated exactly once; output is final.
    Fired,
    /// Squashed before firing; will never produce an output.
    Cancelled,
}

/// The consumer side of a dependency edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EdgeTarget {
    /// An action node in the same instruction's graph.
    Action(NodeId),
    /// The instruction's retirement dependence counter.
    Retirement,
}

/// A dependency edge: one consumer slot a producer will notify.
///
/// `slot` disambiguates which input of the target the notification is for;
/// it is carried through satisfy/squash untouched.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Edge {
    /// The consumer being notified.
    pub target: EdgeTarget,
    /// Which input slot of the consumer this edge feeds.
    pub slot: u8,
}

impl Edge {
    /// Creates an edge feeding input `slot` of action `id`.
    pub fn to_action(id: NodeId, slot: u8) -> Self {
        Self {
            target: EdgeTarget::Action(id),
            slot,
        }
    }
}

/// Condition evaluated by a conditional-branch action.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BranchCond {
    /// Taken when the first operand is zero (compare-and-branch).
    EqZero,
    /// Taken when the first operand is non-zero (compare-and-branch).
    NeZero,
    /// Taken when the tested bit (second operand is the mask) is clear.
    BitClear,
    /// Taken when the tested bit (second operand is the mask) is set.
    BitSet,
    /// Taken when the encoded condition field holds against the NZCV flags
    /// (read from the flags operand slot, bits [3:0]).
    Field(u8),
}

/// The closed set of value-producing action kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActionKind {
    /// Publishes a source-register value the core resolved into `dest`.
    ReadRegister {
        /// Operand slot the core fills before satisfying this action.
        dest: OperandCode,
    },
    /// Computes `base + offset` into [`OperandCode::Address`].
    ComputeAddress {
        /// Operand slot holding the base value.
        base: OperandCode,
        /// Operand slot holding the offset (often an immediate).
        offset: OperandCode,
    },
    /// Computes `a + b` into `dest` (link-address synthesis for calls).
    Add {
        /// First addend operand slot.
        a: OperandCode,
        /// Second addend operand slot.
        b: OperandCode,
        /// Destination operand slot.
        dest: OperandCode,
    },
    /// Applies size masking and extension policy to the raw memory value in
    /// [`OperandCode::MemValue`], producing [`OperandCode::Result`].
    Load {
        /// Access size of the load.
        size: AccessSize,
        /// Extension policy applied to sub-doubleword loads.
        extend: ExtendMode,
    },
    /// Copies one operand slot to another (read-modify-write value staging).
    MoveOperand {
        /// Source operand slot.
        src: OperandCode,
        /// Destination operand slot.
        dest: OperandCode,
    },
    /// Evaluates a branch condition into [`OperandCode::Condition`].
    BranchCondition {
        /// The condition to evaluate.
        cond: BranchCond,
    },
}

/// A value-producing node in an instruction's dependency graph.
#[derive(Clone, Debug)]
pub struct Action {
    /// What this action computes when it fires.
    pub kind: ActionKind,
    /// Current lifecycle state.
    pub state: ActionState,
    /// Input edges not yet satisfied.
    pub outstanding: u8,
    /// Predicate gate: `None` for unpredicated actions, otherwise the
    /// current guard value. Firing requires `predicate != Some(false)`.
    pub predicate: Option<bool>,
    /// Edges satisfied (or squashed) when this action completes.
    pub dependents: Vec<Edge>,
    /// The computed value, present once fired.
    pub output: Option<u64>,
}

impl Action {
    /// Creates an unpredicated action awaiting `inputs` satisfactions.
    pub fn new(kind: ActionKind, inputs: u8) -> Self {
        Self {
            kind,
            state: ActionState::Pending,
            outstanding: inputs,
            predicate: None,
            dependents: Vec::new(),
            output: None,
        }
    }

    /// Creates a predicated action with an initial guard value.
    pub fn predicated(kind: ActionKind, inputs: u8, initial: bool) -> Self {
        Self {
            predicate: Some(initial),
            ..Self::new(kind, inputs)
        }
    }

    /// Returns true if all input edges are satisfied and the guard holds.
    pub fn eligible(&self) -> bool {
        self.state == ActionState::Pending
            && self.outstanding == 0
            && self.predicate != Some(false)
    }
}

/// Applies the load size mask and extension policy to a raw memory value.
///
/// # Panics
///
/// There is no quad-word extension path in the modeled ISA subset; a
/// sign/zero extension request on an unsupported combination would have been
/// rejected at decode, so this function only handles the four real sizes.
pub fn apply_extension(raw: u64, size: AccessSize, extend: ExtendMode) -> u64 {
    let (mask, sign_bit): (u64, u64) = match size {
        AccessSize::Byte => (0xFF, 0x80),
        AccessSize::Half => (0xFFFF, 0x8000),
        AccessSize::Word => (0xFFFF_FFFF, 0x8000_0000),
        AccessSize::Double => return raw,
    };
    let value = raw & mask;
    match extend {
        ExtendMode::Sign if value & sign_bit != 0 => value | !mask,
        _ => value,
    }
}

/// Evaluates a branch condition against its operands.
///
/// `value` is the first operand (register value or condition-field flags
/// input); `aux` is the second (bit mask for test-and-branch, NZCV flags for
/// field conditions).
pub fn condition_holds(cond: BranchCond, value: u64, aux: u64) -> bool {
    match cond {
        BranchCond::EqZero => value == 0,
        BranchCond::NeZero => value != 0,
        BranchCond::BitClear => value & aux == 0,
        BranchCond::BitSet => value & aux != 0,
        BranchCond::Field(field) => field_holds(field, aux as u8),
    }
}

/// Standard condition-field evaluation against NZCV flags (N=bit3 .. V=bit0).
fn field_holds(field: u8, nzcv: u8) -> bool {
    let n = nzcv & 0b1000 != 0;
    let z = nzcv & 0b0100 != 0;
    let c = nzcv & 0b0010 != 0;
    let v = nzcv & 0b0001 != 0;
    let base = match field >> 1 {
        0b000 => z,           // EQ / NE
        0b001 => c,           // CS / CC
        0b010 => n,           // MI / PL
        0b011 => v,           // VS / VC
        0b100 => c && !z,     // HI / LS
        0b101 => n == v,      // GE / LT
        0b110 => !z && n == v, // GT / LE
        _ => true,            // AL (both encodings)
    };
    if field & 1 != 0 && field >> 1 != 0b111 {
        !base
    } else {
        base
    }
}
