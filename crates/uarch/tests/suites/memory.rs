//! Load/store queue lifecycle, MSHR sharing, store forwarding, translation
//! faults, atomics, and coherence snoops.

use pretty_assertions::assert_eq;

use crate::common::{encode, MockBackend, TestCore};
use uarchsim_uarch::common::{Exception, PhysAddr, VirtAddr};
use uarchsim_uarch::core::msg::{MemoryMessage, MemoryRequestKind, SnoopReply, SquashCause};
use uarchsim_uarch::CoreConfig;

#[test]
fn test_store_entry_survives_retirement_until_commit() {
    let mut backend = MockBackend::default();
    backend.regs[1] = 0x7000;
    backend.regs[2] = 0x1111;
    backend.regs[4] = 0x2222;
    let config = CoreConfig {
        // One-deep port: only one store can drain per servicing.
        memory_port_depth: 1,
        ..CoreConfig::default()
    };
    let mut t = TestCore::with_setup(config, backend);

    let _ = t.dispatch_word(encode::str64(2, 1, 0));
    let _ = t.dispatch_word(encode::str64(4, 1, 1));

    t.core.cycle();
    t.service_translations();
    t.core.cycle();
    t.service_translations();

    t.core.cycle();
    // Both retired; only the first fit the port, the second still holds
    // its queue entry.
    assert_eq!(t.core.stats().retired, 2);
    assert_eq!(t.core.stats().stores_committed, 1);
    assert!(!t.core.is_quiesced());

    let first = t.service_memory(0);
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].data, Some(0x1111));

    t.core.cycle();
    assert_eq!(t.core.stats().stores_committed, 2);
    let second = t.service_memory(0);
    assert_eq!(second[0].data, Some(0x2222));
    assert_eq!(second[0].paddr.0, 0x7008);
    assert!(t.core.is_quiesced());
}

#[test]
fn test_squashed_store_never_reaches_memory() {
    let mut backend = MockBackend::default();
    backend.regs[1] = 0x7000;
    let mut t = TestCore::with_backend(backend);

    // A mispredicted conditional resolves at retirement and squashes the
    // wrong-path store behind it.
    let _branch = t.dispatch_predicted(encode::cbz(5, 4, false), Some(0xBAD0));
    let _store = t.dispatch_word(encode::str64(2, 1, 0));

    t.core.cycle();
    assert_eq!(t.core.take_notifications().squash, Some(SquashCause::Mispredict));
    assert_eq!(t.core.stats().stores_committed, 0);
    assert!(t.service_memory(0).is_empty());
    assert!(t.core.is_quiesced());
}

#[test]
fn test_translation_fault_surfaces_as_exception() {
    let mut backend = MockBackend::default();
    backend.regs[1] = 0x7000;
    let mut t = TestCore::with_backend(backend);

    let pc = t.next_pc();
    let _ = t.dispatch_word(encode::ldrb(2, 1, 0));

    t.core.cycle();
    t.fail_translations(Exception::TranslationFault(VirtAddr(0x7000)));

    t.core.cycle();
    assert_eq!(t.core.stats().exceptions, 1);
    assert_eq!(t.core.stats().retired, 0);
    let notes = t.core.take_notifications();
    assert_eq!(notes.squash, Some(SquashCause::Exception));
    assert_eq!(notes.redirect.map(|a| a.0), Some(pc));
    assert!(t.core.is_quiesced());
}

#[test]
fn test_loads_to_one_block_share_a_fill() {
    let mut backend = MockBackend::default();
    backend.regs[1] = 0x7000;
    let mut t = TestCore::with_backend(backend);

    let _ = t.dispatch_word(encode::ldrb(2, 1, 0));
    let _ = t.dispatch_word(encode::ldrb(3, 1, 8));

    t.core.cycle();
    t.service_translations();
    t.core.cycle();

    let fills = t.service_memory(0x42);
    assert_eq!(fills.len(), 1);
    assert_eq!(t.core.stats().loads_issued, 1);

    t.core.cycle();
    assert_eq!(t.core.stats().retired, 2);
    assert!(t.core.is_quiesced());
}

#[test]
fn test_load_forwards_from_older_store() {
    let mut backend = MockBackend::default();
    backend.regs[1] = 0x7000;
    backend.regs[2] = 0xABCD;
    backend.regs[4] = 0x9000;
    let mut t = TestCore::with_backend(backend);

    let store_seq = t.dispatch_word(encode::str64(2, 1, 0));
    let load_seq = t.dispatch_word(encode::ldr64(3, 1, 0));
    // Re-stores the loaded register, making the forwarded data observable.
    let _ = t.dispatch_word(encode::str64(3, 4, 0));

    t.core.cycle();
    t.service_translations();
    t.core.cycle();

    let notes = t.core.take_notifications();
    assert_eq!(notes.forwards.len(), 1);
    assert_eq!(notes.forwards[0].load_seq, load_seq);
    assert_eq!(notes.forwards[0].store_seq, store_seq);
    assert_eq!(notes.forwards[0].paddr, PhysAddr(0x7000));
    assert_eq!(t.core.stats().loads_forwarded, 1);
    assert_eq!(t.core.stats().loads_issued, 0);
    assert_eq!(t.core.stats().retired, 3);

    let first = t.service_memory(0);
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].kind, MemoryRequestKind::Store);
    assert_eq!(first[0].data, Some(0xABCD));

    t.core.cycle();
    let second = t.service_memory(0);
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].paddr, PhysAddr(0x9000));
    assert_eq!(second[0].data, Some(0xABCD));
    assert_eq!(t.core.stats().stores_committed, 2);
    assert!(t.core.is_quiesced());
}

#[test]
fn test_partial_store_overlap_holds_the_load() {
    let mut backend = MockBackend::default();
    backend.regs[1] = 0x7000;
    backend.regs[2] = 0xFF;
    let mut t = TestCore::with_backend(backend);

    let _ = t.dispatch_word(encode::strb(2, 1, 0));
    let _ = t.dispatch_word(encode::ldr64(3, 1, 0));

    t.core.cycle();
    t.service_translations();
    t.core.cycle();
    // A byte store cannot supply a doubleword, so the load neither forwards
    // nor issues past the overlapping write.
    assert_eq!(t.core.stats().loads_forwarded, 0);
    assert_eq!(t.core.stats().loads_issued, 0);
    assert_eq!(t.core.stats().stores_committed, 1);

    t.core.cycle();
    let reqs = t.service_memory(0x55);
    assert_eq!(reqs.len(), 2);
    assert_eq!(t.core.stats().loads_issued, 1);

    t.core.cycle();
    assert_eq!(t.core.stats().retired, 2);
    assert!(t.core.is_quiesced());
}

#[test]
fn test_exclusive_pair_drains_store_on_success() {
    let mut backend = MockBackend::default();
    backend.regs[1] = 0x7000;
    let mut t = TestCore::with_backend(backend);

    let _ = t.dispatch_word(encode::ldxr(2, 1));
    t.core.cycle();
    t.service_translations();
    t.core.cycle();
    let _ = t.service_memory(7);
    t.core.cycle();
    assert_eq!(t.core.stats().retired, 1);

    // STXR w3, x2, [x1]: same block, monitor still armed.
    let _ = t.dispatch_word(encode::stxr(3, 2, 1));
    t.core.cycle();
    t.service_translations();
    t.core.cycle();
    assert_eq!(t.core.stats().exclusive_failures, 0);
    assert_eq!(t.core.stats().stores_committed, 1);

    let drained = t.service_memory(0);
    assert_eq!(drained.len(), 1);
    assert_eq!(drained[0].kind, MemoryRequestKind::Store);
    // The stored value is the one the exclusive load brought in.
    assert_eq!(drained[0].data, Some(7));
}

#[test]
fn test_invalidate_breaks_the_exclusive_monitor() {
    let mut backend = MockBackend::default();
    backend.regs[1] = 0x7000;
    let mut t = TestCore::with_backend(backend);

    let _ = t.dispatch_word(encode::ldxr(2, 1));
    t.core.cycle();
    t.service_translations();
    t.core.cycle();
    let _ = t.service_memory(7);
    t.core.cycle();

    // Another core writes the block.
    t.core.push_memory_message(MemoryMessage::Invalidate {
        paddr: uarchsim_uarch::common::PhysAddr(0x7000),
    });
    assert_eq!(
        t.core.pull_snoop_reply(),
        Some(SnoopReply::InvalidateAck {
            paddr: uarchsim_uarch::common::PhysAddr(0x7000)
        })
    );

    let _ = t.dispatch_word(encode::stxr(3, 2, 1));
    t.core.cycle();
    t.service_translations();
    t.core.cycle();
    assert_eq!(t.core.stats().exclusive_failures, 1);
    assert_eq!(t.core.stats().stores_committed, 0);
    assert!(t.service_memory(0).is_empty());
    assert!(t.core.is_quiesced());
}

#[test]
fn test_rmw_carries_addend_and_commits_after_reply() {
    let mut backend = MockBackend::default();
    backend.regs[9] = 0x3000;
    backend.regs[7] = 5;
    let mut t = TestCore::with_backend(backend);

    let _ = t.dispatch_word(encode::ldadd(7, 8, 9));
    t.core.cycle();
    t.service_translations();

    t.core.cycle();
    let requests = t.service_memory(10);
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].kind, MemoryRequestKind::Rmw);
    assert_eq!(requests[0].data, Some(5));
    assert_eq!(requests[0].paddr.0, 0x3000);

    t.core.cycle();
    assert_eq!(t.core.stats().retired, 1);
    assert_eq!(t.core.stats().committed, 1);
    assert!(t.core.is_quiesced());
}

#[test]
fn test_cas_issues_at_head_and_returns_old_value() {
    let mut backend = MockBackend::default();
    backend.regs[4] = 7;
    backend.regs[5] = 9;
    backend.regs[6] = 0x3000;
    backend.regs[7] = 0x9000;
    let mut t = TestCore::with_backend(backend);

    // x4 is both the compare source and the old-value destination; the
    // compare must resolve against the pre-instruction value of x4.
    let _cas = t.dispatch_word(encode::cas(4, 5, 6));
    // Re-stores x4 so the written-back old value is observable.
    let _ = t.dispatch_word(encode::str64(4, 7, 0));

    t.core.cycle();
    t.service_translations();
    t.core.cycle();

    let reqs = t.service_memory(7);
    assert_eq!(reqs.len(), 1);
    assert_eq!(reqs[0].kind, MemoryRequestKind::Cas);
    assert_eq!(reqs[0].paddr, PhysAddr(0x3000));
    assert_eq!(reqs[0].data, Some(9));
    assert_eq!(reqs[0].compare, Some(7));

    t.core.cycle();
    assert_eq!(t.core.stats().retired, 2);
    assert_eq!(t.core.stats().committed, 2);
    assert_eq!(t.core.stats().stores_committed, 1);

    let drained = t.service_memory(0);
    assert_eq!(drained.len(), 1);
    assert_eq!(drained[0].paddr, PhysAddr(0x9000));
    assert_eq!(drained[0].data, Some(7));
    assert!(t.core.is_quiesced());
}

#[test]
fn test_snoops_are_answered_fresh() {
    let mut t = TestCore::new();
    let paddr = uarchsim_uarch::common::PhysAddr(0x9000);

    t.core.push_memory_message(MemoryMessage::Probe { paddr });
    assert_eq!(t.core.pull_snoop_reply(), Some(SnoopReply::ProbeMiss { paddr }));

    t.core.push_memory_message(MemoryMessage::ReturnRequest { paddr });
    assert_eq!(
        t.core.pull_snoop_reply(),
        Some(SnoopReply::ReturnReply { paddr, data: None })
    );
    assert_eq!(t.core.stats().snoops_answered, 2);
}
