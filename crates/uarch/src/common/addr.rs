//! Physical and Virtual Address types.
//!
//! Strong types for the two address spaces the core deals with, to prevent
//! accidental mixing. Virtual addresses come out of address-computation
//! actions and go to the translation port; physical addresses come back from
//! translation and key the MSHR table and coherence snoops.

/// A virtual address produced by an address-computation action.
///
/// Virtual addresses must be translated through the external translation
/// port before a memory request can be issued for them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct VirtAddr(pub u64);

/// A physical address returned by the external translation collaborator.
///
/// Physical addresses key outstanding-miss (MSHR) entries, the exclusive
/// monitor, and incoming coherence messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct PhysAddr(pub u64);

impl VirtAddr {
    /// Creates a new virtual address from a raw 64-bit value.
    #[inline(always)]
    pub fn new(addr: u64) -> Self {
        Self(addr)
    }

    /// Returns the raw 64-bit address value.
    #[inline(always)]
    pub fn val(&self) -> u64 {
        self.0
    }
}

impl PhysAddr {
    /// Creates a new physical address from a raw 64-bit value.
    #[inline(always)]
    pub fn new(addr: u64) -> Self {
        Self(addr)
    }

    /// Returns the raw 64-bit address value.
    #[inline(always)]
    pub fn val(&self) -> u64 {
        self.0
    }

    /// Returns the address aligned down to the given coherence-unit size.
    ///
    /// Coherence messages address whole blocks, so MSHR matching and
    /// exclusive-monitor checks compare block-aligned addresses.
    #[inline]
    pub fn block_base(&self, block_size: u64) -> Self {
        debug_assert!(block_size.is_power_of_two(), "coherence unit must be a power of two");
        Self(self.0 & !(block_size - 1))
    }
}
