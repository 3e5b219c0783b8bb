//! The per-instruction operand table.
//!
//! Operand slots connect the decoder, the dependency graph, and the core:
//! the decoder seeds immediates, the core fills in resolved register values
//! and raw memory data, and actions read inputs and write results. Reading
//! a slot that was never set is a simulator defect (the decoder wired the
//! graph wrong), not a modeled-program condition, and aborts the run.

/// Enumerated operand slots of an instruction record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(usize)]
pub enum OperandCode {
    /// First source operand.
    Operand1,
    /// Second source operand.
    Operand2,
    /// Third source operand.
    Operand3,
    /// Fourth source operand.
    Operand4,
    /// Computed effective address.
    Address,
    /// Raw value delivered by a memory reply.
    MemValue,
    /// Value staged for a store or read-modify-write.
    StoreValue,
    /// Final result destined for the mapped destination register.
    Result,
    /// Resolved branch condition (0 = not taken).
    Condition,
    /// NZCV flags supplied by the execution backend at dispatch.
    CondFlags,
}

/// Number of operand slots (table array length).
pub const OPERAND_SLOTS: usize = 10;

/// Fixed-slot operand table.
#[derive(Clone, Debug, Default)]
pub struct OperandTable {
    slots: [Option<u64>; OPERAND_SLOTS],
}

impl OperandTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `code` to a value.
    pub fn set(&mut self, code: OperandCode, value: u64) {
        self.slots[code as usize] = Some(value);
    }

    /// Reads the value in `code`.
    ///
    /// # Panics
    ///
    /// Reading an unset slot is a graph-wiring defect and aborts the run.
    pub fn value(&self, code: OperandCode) -> u64 {
        match self.slots[code as usize] {
            Some(value) => value,
            None => panic!("operand {code:?} read before it was set"),
        }
    }

    /// Reads the value in `code`, or `default` if the slot is unset.
    pub fn value_or(&self, code: OperandCode, default: u64) -> u64 {
        self.slots[code as usize].unwrap_or(default)
    }

    /// Returns true if the slot has been set.
    pub fn is_set(&self, code: OperandCode) -> bool {
        self.slots[code as usize].is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_read() {
        let mut table = OperandTable::new();
        table.set(OperandCode::Operand1, 42);
        assert_eq!(table.value(OperandCode::Operand1), 42);
        assert!(table.is_set(OperandCode::Operand1));
        assert!(!table.is_set(OperandCode::Operand2));
    }

    #[test]
    fn test_default_fallback() {
        let table = OperandTable::new();
        assert_eq!(table.value_or(OperandCode::Operand2, 7), 7);
    }

    #[test]
    #[should_panic(expected = "read before it was set")]
    fn test_unset_read_is_a_defect() {
        let table = OperandTable::new();
        let _ = table.value(OperandCode::Result);
    }
}
