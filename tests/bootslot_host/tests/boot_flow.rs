// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! CONTEXT: Integration tests for boot slot selection from on-disk fixtures
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Stable
//! TEST_COVERAGE: 13 tests
//!
//! TEST_SCOPE:
//!   - Misc record arbitration through FileMetadata
//!   - Misc checksum gate and slot 0 fallback
//!   - Grubenv rollback and copy redundancy through DirConfigStore
//!   - Grubenv total corruption and missing files
//!   - Decision idempotence
//!
//! TEST_SCENARIOS:
//!   - test_misc_equal_priority_prefers_slot_a()
//!   - test_misc_higher_priority_wins()
//!   - test_misc_single_bootable_slot()
//!   - test_misc_none_bootable_falls_back()
//!   - test_misc_bit_flip_falls_back(): property over every byte
//!   - test_misc_missing_image_falls_back()
//!   - test_mender_rollback_after_trial_boot()
//!   - test_mender_first_boot_of_update()
//!   - test_mender_locked_copy_uses_second()
//!   - test_mender_total_corruption_falls_back()
//!   - test_mender_missing_lock_file_falls_back()
//!   - test_none_mode_ignores_media()
//!   - test_decision_is_idempotent()

use bootslot::{
    select_boot_slot, BootDecision, BootSlotError, DirConfigStore, EnvCopy, FileMetadata,
    MenderFiles, SelectionMode, Slot, SourceError, MENDER_ENV_MAX_SIZE, MISC_RECORD_OFFSET,
};
use bootslot_host::{grubenv_text, sealed_record, slot, Fixture};
use proptest::prelude::*;

fn decide(fx: &Fixture, mode: SelectionMode) -> BootDecision {
    let mut misc = FileMetadata::new(fx.misc_image(), MISC_RECORD_OFFSET);
    let mut env = DirConfigStore::new(fx.root());
    select_boot_slot(mode, &mut misc, &mut env, &MenderFiles::default(), MENDER_ENV_MAX_SIZE)
}

#[test]
fn test_misc_equal_priority_prefers_slot_a() {
    let fx = Fixture::new().expect("fixture");
    fx.write_misc(&sealed_record(slot(5, 1, false), slot(5, 1, false))).expect("misc");
    let decision = decide(&fx, SelectionMode::Misc);
    assert_eq!(decision, BootDecision::selected(Slot::A));
}

#[test]
fn test_misc_higher_priority_wins() {
    let fx = Fixture::new().expect("fixture");
    fx.write_misc(&sealed_record(slot(3, 0, true), slot(7, 2, false))).expect("misc");
    let decision = decide(&fx, SelectionMode::Misc);
    assert_eq!(decision.index(), 1);
    assert_eq!(decision.diagnostic, None);
}

#[test]
fn test_misc_single_bootable_slot() {
    let fx = Fixture::new().expect("fixture");
    fx.write_misc(&sealed_record(slot(0, 7, true), slot(1, 2, false))).expect("misc");
    assert_eq!(decide(&fx, SelectionMode::Misc).slot, Slot::B);
}

#[test]
fn test_misc_none_bootable_falls_back() {
    let fx = Fixture::new().expect("fixture");
    fx.write_misc(&sealed_record(slot(0, 0, false), slot(0, 0, false))).expect("misc");
    let decision = decide(&fx, SelectionMode::Misc);
    assert_eq!(decision.slot, Slot::A);
    assert_eq!(decision.diagnostic, Some(BootSlotError::NoBootableSlot));
}

#[test]
fn test_misc_missing_image_falls_back() {
    let fx = Fixture::new().expect("fixture");
    let decision = decide(&fx, SelectionMode::Misc);
    assert_eq!(decision.slot, Slot::A);
    assert_eq!(decision.diagnostic, Some(BootSlotError::Source(SourceError::NotFound)));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_misc_bit_flip_falls_back(byte in 0usize..28, bit in 0u8..8) {
        let fx = Fixture::new().expect("fixture");
        let mut bytes = sealed_record(slot(3, 1, false), slot(7, 1, false)).encode();
        bytes[byte] ^= 1 << bit;
        fx.write_misc_bytes(&bytes).expect("misc");

        let decision = decide(&fx, SelectionMode::Misc);
        prop_assert_eq!(decision.slot, Slot::A);
        let rejected = matches!(
            decision.diagnostic,
            Some(BootSlotError::ChecksumMismatch { .. }) | Some(BootSlotError::MagicMismatch { .. })
        );
        prop_assert!(rejected, "unexpected diagnostic {:?}", decision.diagnostic);
    }
}

#[test]
fn test_mender_rollback_after_trial_boot() {
    let fx = Fixture::new().expect("fixture");
    let env = grubenv_text(2, 1, 1);
    let lock = Some("editing=0\n");
    fx.write_grubenv([Some(env.as_str()), lock, Some(env.as_str()), lock]).expect("grubenv");
    let decision = decide(&fx, SelectionMode::Mender);
    assert_eq!(decision, BootDecision::selected(Slot::B));
}

#[test]
fn test_mender_first_boot_of_update() {
    let fx = Fixture::new().expect("fixture");
    let env = grubenv_text(2, 1, 0);
    let lock = Some("editing=0\n");
    fx.write_grubenv([Some(env.as_str()), lock, Some(env.as_str()), lock]).expect("grubenv");
    assert_eq!(decide(&fx, SelectionMode::Mender).slot, Slot::A);
}

#[test]
fn test_mender_locked_copy_uses_second() {
    let fx = Fixture::new().expect("fixture");
    let stale = grubenv_text(2, 0, 0);
    let fresh = grubenv_text(3, 0, 0);
    fx.write_grubenv([
        Some(stale.as_str()),
        Some("editing=1\n"),
        Some(fresh.as_str()),
        Some("editing=0\n"),
    ])
    .expect("grubenv");
    let decision = decide(&fx, SelectionMode::Mender);
    assert_eq!(decision.index(), 1);
    assert_eq!(decision.diagnostic, None);
}

#[test]
fn test_mender_total_corruption_falls_back() {
    let fx = Fixture::new().expect("fixture");
    let good = grubenv_text(3, 0, 0);
    fx.write_grubenv([
        Some(good.as_str()),
        Some("editing=1\n"),
        Some("mender_boot_part=3\nbootcount=2\n"),
        Some("editing=0\n"),
    ])
    .expect("grubenv");
    let decision = decide(&fx, SelectionMode::Mender);
    assert_eq!(decision.slot, Slot::A);
    assert_eq!(decision.diagnostic, Some(BootSlotError::BothCopiesCorrupted));
    assert!(matches!(
        decision.grubenv.rejection(EnvCopy::Second),
        Some(BootSlotError::InvalidFieldValue { key: "bootcount", .. })
    ));
}

#[test]
fn test_mender_missing_lock_file_falls_back() {
    let fx = Fixture::new().expect("fixture");
    let env = grubenv_text(3, 0, 0);
    fx.write_grubenv([Some(env.as_str()), None, Some(env.as_str()), Some("editing=0\n")])
        .expect("grubenv");
    let decision = decide(&fx, SelectionMode::Mender);
    assert_eq!(decision.slot, Slot::A);
    assert_eq!(decision.diagnostic, Some(BootSlotError::Source(SourceError::NotFound)));
}

#[test]
fn test_none_mode_ignores_media() {
    let fx = Fixture::new().expect("fixture");
    fx.write_misc(&sealed_record(slot(1, 1, false), slot(15, 1, false))).expect("misc");
    let decision = decide(&fx, SelectionMode::None);
    assert_eq!(decision, BootDecision::selected(Slot::A));
}

#[test]
fn test_decision_is_idempotent() {
    let fx = Fixture::new().expect("fixture");
    fx.write_misc(&sealed_record(slot(3, 1, false), slot(7, 1, false))).expect("misc");
    let env = grubenv_text(3, 1, 1);
    let lock = Some("editing=0\n");
    fx.write_grubenv([Some(env.as_str()), lock, Some(env.as_str()), lock]).expect("grubenv");

    for mode in [SelectionMode::Misc, SelectionMode::Mender] {
        let first = decide(&fx, mode);
        let second = decide(&fx, mode);
        assert_eq!(first, second);
    }
    assert_eq!(decide(&fx, SelectionMode::Mender).slot, Slot::A);
}
