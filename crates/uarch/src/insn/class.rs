//! Instruction resource classes and memory access attributes.

/// Resource class recorded by the decoder for scheduling and commit gating.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum InstructionClass {
    /// Pure computation; no pipeline resource beyond the reorder buffer.
    #[default]
    Computation,
    /// Consumes a load/store-queue load entry.
    Load,
    /// Consumes a load/store-queue store entry.
    Store,
    /// Atomic (exclusive, compare-and-swap, read-modify-write); commit is
    /// gated on memory-order speculation resolution.
    Atomic,
    /// Control transfer.
    Branch,
}

/// Opcode class within a resource class, for statistics and feedback.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum OpClass {
    /// Placeholder before the decoder classifies the instruction.
    #[default]
    Unclassified,
    /// Unconditional PC-relative branch.
    BranchUnconditional,
    /// Conditional branch (condition field or compare/test forms).
    BranchConditional,
    /// Register-indirect branch.
    BranchIndirect,
    /// Call-type branch writing the link register.
    BranchCall,
    /// Ordinary load.
    Load,
    /// Ordinary store.
    Store,
    /// Load-exclusive.
    LoadExclusive,
    /// Store-exclusive (conditional on the monitor).
    StoreExclusive,
    /// Compare-and-swap.
    CompareSwap,
    /// Read-modify-write atomic.
    ReadModifyWrite,
    /// Unallocated encoding routed to the illegal-instruction path.
    Unallocated,
}

/// Memory access size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessSize {
    /// 8-bit access.
    Byte,
    /// 16-bit access.
    Half,
    /// 32-bit access.
    Word,
    /// 64-bit access.
    Double,
}

impl AccessSize {
    /// Returns the access width in bytes.
    #[inline]
    pub fn bytes(&self) -> u64 {
        match self {
            Self::Byte => 1,
            Self::Half => 2,
            Self::Word => 4,
            Self::Double => 8,
        }
    }

    /// Builds a size from the 2-bit size field of a memory encoding.
    ///
    /// # Panics
    ///
    /// The field is two bits wide; any other input is a decode defect.
    pub fn from_field(field: u8) -> Self {
        match field {
            0 => Self::Byte,
            1 => Self::Half,
            2 => Self::Word,
            3 => Self::Double,
            _ => panic!("memory size field {field} out of range"),
        }
    }
}

/// Extension policy applied to sub-doubleword load values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExtendMode {
    /// No extension (upper bits zero by masking).
    None,
    /// Sign-extend from the top bit of the access size.
    Sign,
    /// Zero-extend explicitly.
    Zero,
}

/// Ordering class of a memory access.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum AccessClass {
    /// Normal cacheable access.
    #[default]
    Normal,
    /// Atomic access.
    Atomic,
}
