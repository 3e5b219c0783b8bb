//! Dispatch, in-order retirement, rename wakeup, and exception behaviour.

use pretty_assertions::assert_eq;

use crate::common::{encode, MockBackend, TestCore};
use uarchsim_uarch::core::msg::{MemoryRequestKind, SquashCause};

/// Predicted target of a `B`/`BL` word dispatched at `pc`.
fn b_target(pc: u64, offset_words: i32) -> u64 {
    pc.wrapping_add((i64::from(offset_words) * 4 - 4) as u64)
}

#[test]
fn test_retires_in_program_order() {
    let mut t = TestCore::new();
    for _ in 0..3 {
        let pc = t.next_pc();
        let _ = t.dispatch_predicted(encode::b(2), Some(b_target(pc, 2)));
    }
    assert_eq!(t.core.stats().dispatched, 3);

    t.core.cycle();
    assert_eq!(t.core.stats().retired, 3);
    assert_eq!(t.core.stats().committed, 3);
    assert_eq!(t.core.stats().squash_events, 0);
    assert!(t.core.is_quiesced());
}

#[test]
fn test_unready_head_blocks_younger_retirement() {
    let mut backend = MockBackend::default();
    backend.regs[1] = 0x7000;
    let mut t = TestCore::with_backend(backend);

    let _load = t.dispatch_word(encode::ldrb(2, 1, 0));
    let pc = t.next_pc();
    let _branch = t.dispatch_predicted(encode::b(2), Some(b_target(pc, 2)));

    // The branch is ready immediately but must wait behind the load.
    t.core.cycle();
    t.service_translations();
    assert_eq!(t.core.stats().retired, 0);

    t.core.cycle();
    let requests = t.service_memory(0xAB);
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].kind, MemoryRequestKind::Load);

    t.core.cycle();
    assert_eq!(t.core.stats().retired, 2);
}

#[test]
fn test_load_value_wakes_dependent_store_through_rename() {
    let mut backend = MockBackend::default();
    backend.regs[1] = 0x7000;
    backend.regs[3] = 0x8000;
    let mut t = TestCore::with_backend(backend);

    // LDR x2, [x1] ; STR x2, [x3] — the store's data comes from the load.
    let _ = t.dispatch_word(encode::ldr64(2, 1, 0));
    let _ = t.dispatch_word(encode::str64(2, 3, 0));

    t.core.cycle();
    t.service_translations();
    t.core.cycle();
    let fills = t.service_memory(0x5A5A);
    assert_eq!(fills.len(), 1);

    t.core.cycle();
    assert_eq!(t.core.stats().retired, 2);
    assert_eq!(t.core.stats().committed, 2);
    assert_eq!(t.core.stats().stores_committed, 1);

    let drained = t.service_memory(0);
    assert_eq!(drained.len(), 1);
    assert_eq!(drained[0].kind, MemoryRequestKind::Store);
    assert_eq!(drained[0].paddr.0, 0x8000);
    assert_eq!(drained[0].data, Some(0x5A5A));
    assert!(t.core.is_quiesced());
}

#[test]
fn test_illegal_encoding_raises_at_retirement() {
    let mut t = TestCore::new();
    let faulting_pc = t.next_pc();
    let _ = t.dispatch_word(encode::unallocated());
    let pc = t.next_pc();
    let _younger = t.dispatch_predicted(encode::b(2), Some(b_target(pc, 2)));

    t.core.cycle();
    assert_eq!(t.core.stats().exceptions, 1);
    assert_eq!(t.core.stats().retired, 0);
    // The faulting instruction and everything younger are squashed.
    assert_eq!(t.core.stats().squashed, 2);

    let notes = t.core.take_notifications();
    assert_eq!(notes.squash, Some(SquashCause::Exception));
    assert_eq!(notes.redirect.map(|a| a.0), Some(faulting_pc));
    assert!(t.core.is_quiesced());
}

#[test]
fn test_available_slots_tracks_queue_occupancy() {
    let mut backend = MockBackend::default();
    backend.regs[1] = 0x7000;
    let mut t = TestCore::with_backend(backend);

    let before = t.core.available_slots();
    let _ = t.dispatch_word(encode::str64(2, 1, 0));
    // The store holds both a reorder-buffer slot and a queue entry.
    assert_eq!(t.core.available_slots(), before - 1);

    t.core.cycle();
    t.service_translations();
    t.core.cycle();
    let _ = t.service_memory(0);
    assert_eq!(t.core.available_slots(), before);
    assert!(!t.core.is_stalled());
}
