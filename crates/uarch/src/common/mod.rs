//! Common types shared across the out-of-order core simulator.
//!
//! This module provides fundamental building blocks used by every other
//! component. It includes:
//! 1. **Address Types:** Strong types for virtual and physical addresses.
//! 2. **Register Types:** Logical (architectural) and physical (renamed) register handles.
//! 3. **Exceptions:** Modeled-program conditions routed through effect chains.

/// Address type definitions (physical and virtual addresses).
pub mod addr;

/// Modeled-program exception conditions.
pub mod error;

/// Logical and physical register handles.
pub mod reg;

pub use addr::{PhysAddr, VirtAddr};
pub use error::Exception;
pub use reg::{LogReg, PhysReg};
