//! Branch resolution, prediction confirmation, and mispredict recovery.

use pretty_assertions::assert_eq;

use crate::common::{encode, MockBackend, TestCore};
use uarchsim_uarch::core::msg::SquashCause;

#[test]
fn test_unpredicted_unconditional_redirects_at_dispatch() {
    let mut backend = MockBackend::default();
    backend.regs[1] = 0x7000;
    let mut t = TestCore::with_backend(backend);
    let pc = t.next_pc();
    let target = pc + 4 * 4 - 4;
    let _ = t.dispatch_word(encode::b(4));

    // Speculative redirect fires before the branch retires.
    let notes = t.core.take_notifications();
    assert_eq!(notes.redirect.map(|a| a.0), Some(target));

    // Fetch followed the redirect, so the next instruction is on the
    // correct path; retirement confirms the steered branch instead of
    // squashing it.
    let _ = t.dispatch_word(encode::ldrb(2, 1, 0));
    t.run_serviced(3, 0x42);

    assert_eq!(t.core.stats().mispredicts, 0);
    assert_eq!(t.core.stats().squash_events, 0);
    assert_eq!(t.core.stats().retired, 2);
    assert!(t.core.is_quiesced());

    let notes = t.core.take_notifications();
    assert_eq!(notes.feedback.len(), 1);
    assert!(!notes.feedback[0].mispredicted);
}

#[test]
fn test_mispredict_squashes_younger_and_releases_resources() {
    let mut backend = MockBackend::default();
    backend.regs[1] = 0x7000;
    let mut t = TestCore::with_backend(backend);

    // CBZ x5 with x5 == 0 resolves taken at retirement; the prediction
    // pointed somewhere else, so the loads behind it are wrong-path.
    let pc = t.next_pc();
    let target = pc + 4 * 4;
    let _branch = t.dispatch_predicted(encode::cbz(5, 4, false), Some(0xBAD0));
    let _wrong_a = t.dispatch_word(encode::ldrb(2, 1, 0));
    let _wrong_b = t.dispatch_word(encode::ldrb(3, 1, 8));
    let _ = t.core.take_notifications();

    t.core.cycle();
    assert_eq!(t.core.stats().retired, 1);
    assert_eq!(t.core.stats().mispredicts, 1);
    assert_eq!(t.core.stats().squashed, 2);

    let notes = t.core.take_notifications();
    assert_eq!(notes.squash, Some(SquashCause::Mispredict));
    assert_eq!(notes.redirect.map(|a| a.0), Some(target));
    assert_eq!(notes.feedback.len(), 1);
    assert!(notes.feedback[0].mispredicted);

    // Queue entries and rename mappings of the squashed loads are gone.
    assert!(t.core.is_quiesced());
    assert!(t.service_memory(0).is_empty());
}

#[test]
fn test_correct_prediction_retires_without_squash() {
    let mut t = TestCore::new();
    let pc = t.next_pc();
    let target = pc + 4 * 4 - 4;
    let _ = t.dispatch_predicted(encode::b(4), Some(target));

    t.core.cycle();
    assert_eq!(t.core.stats().retired, 1);
    assert_eq!(t.core.stats().squash_events, 0);

    let notes = t.core.take_notifications();
    assert_eq!(notes.feedback.len(), 1);
    assert!(!notes.feedback[0].mispredicted);
    assert!(notes.feedback[0].taken);
    assert_eq!(notes.feedback[0].target.0, target);
}

#[test]
fn test_conditional_not_taken_falls_through() {
    let mut backend = MockBackend::default();
    backend.regs[5] = 0;
    let mut t = TestCore::with_backend(backend);

    // CBNZ x5 with x5 == 0: not taken, no prediction, no mispredict.
    let _ = t.dispatch_word(encode::cbz(5, 4, true));

    t.core.cycle();
    assert_eq!(t.core.stats().branches_resolved, 1);
    assert_eq!(t.core.stats().mispredicts, 0);
    assert_eq!(t.core.stats().retired, 1);

    let notes = t.core.take_notifications();
    assert!(!notes.feedback[0].taken);
    assert!(!notes.feedback[0].mispredicted);
}

#[test]
fn test_conditional_taken_without_prediction_redirects() {
    let mut backend = MockBackend::default();
    backend.regs[5] = 0;
    let mut t = TestCore::with_backend(backend);

    // CBZ x5 with x5 == 0: taken.
    let pc = t.next_pc();
    let target = pc + 4 * 4;
    let _ = t.dispatch_word(encode::cbz(5, 4, false));

    t.core.cycle();
    assert_eq!(t.core.stats().mispredicts, 1);
    let notes = t.core.take_notifications();
    assert_eq!(notes.redirect.map(|a| a.0), Some(target));
    assert!(notes.feedback[0].taken);
}

#[test]
fn test_condition_flags_gate_field_branches() {
    // Z set: B.EQ taken, predicted correctly.
    let mut backend = MockBackend::default();
    backend.flags = 0b0100;
    let mut t = TestCore::with_backend(backend);

    let pc = t.next_pc();
    let target = pc + 2 * 4;
    let _ = t.dispatch_predicted(encode::b_cond(0, 2), Some(target));

    t.core.cycle();
    assert_eq!(t.core.stats().retired, 1);
    assert_eq!(t.core.stats().mispredicts, 0);
    assert!(t.core.take_notifications().feedback[0].taken);
}

#[test]
fn test_link_value_flows_to_indirect_return() {
    let mut t = TestCore::new();

    // BL ... ; BR x30 — the return address written by the call feeds the
    // indirect branch through rename.
    let bl_pc = t.next_pc();
    let bl_target = bl_pc + 4 * 4 - 4;
    let _ = t.dispatch_predicted(encode::bl(4), Some(bl_target));
    let link = bl_pc + 4;
    let _ = t.dispatch_predicted(encode::br(30), Some(link));

    t.core.cycle();
    assert_eq!(t.core.stats().retired, 2);
    assert_eq!(t.core.stats().mispredicts, 0);

    let notes = t.core.take_notifications();
    assert_eq!(notes.feedback.len(), 2);
    assert_eq!(notes.feedback[1].target.0, link);
}
