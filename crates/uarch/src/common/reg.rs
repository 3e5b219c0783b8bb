//! Logical and physical register handles.
//!
//! The rename table maps logical (architectural) registers to physical
//! registers drawn from a free list. Both are plain newtyped indices so a
//! record can carry its rename rollback state without referencing the
//! rename table itself.

/// A logical (architectural) register index.
///
/// The decoder produces these; register 31 is the zero register in the
/// modeled ISA and is never mapped by the rename table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LogReg(pub u8);

/// A physical register handle allocated from the rename free list.
///
/// A physical register stays allocated until the instruction that displaced
/// its mapping retires (ordinary reclaim) or until the instruction that
/// allocated it is squashed (rollback reclaim). It is never recycled while
/// an in-flight instruction can still read it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PhysReg(pub u16);

/// The hardwired-zero logical register of the modeled ISA.
pub const ZERO_REG: LogReg = LogReg(31);

/// The link register written by call-type branches.
pub const LINK_REG: LogReg = LogReg(30);

impl LogReg {
    /// Returns true if this is the hardwired-zero register.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0 == ZERO_REG.0
    }
}
