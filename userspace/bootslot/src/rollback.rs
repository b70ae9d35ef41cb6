// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Copy selection and boot-count rollback for the grubenv scheme.

use log::{error, info, warn};

use crate::error::{BootSlotError, Result};
use crate::mender::{EnvCopy, MenderEnvPair, RootfsPart};

/// Picks the authoritative copy (first trustworthy one) and applies the
/// rollback rule to it.
///
/// With `upgrade_available` set, a nonzero `bootcount` means the new image
/// already spent its trial boot without clearing the flag, so the other
/// partition is chosen. A zero `bootcount` is the first boot of the update.
pub fn resolve_target(pair: &MenderEnvPair) -> Result<RootfsPart> {
    let trusted = EnvCopy::ALL.into_iter().find_map(|copy| {
        let cfg = &pair.copies[copy.index()];
        let part = cfg.boot_part.filter(|_| cfg.is_trustworthy())?;
        Some((copy, cfg, part))
    });
    let Some((copy, cfg, recorded)) = trusted else {
        error!("bootslot: grubenv files are corrupted");
        return Err(BootSlotError::BothCopiesCorrupted);
    };
    if copy != EnvCopy::First {
        warn!("bootslot: grubenv copy 1 untrusted, using copy {}", copy);
    }

    if !cfg.upgrade_available {
        return Ok(recorded);
    }
    if cfg.boot_count != 0 {
        info!("bootslot: rolling back from {} to {}", recorded, recorded.other());
        Ok(recorded.other())
    } else {
        info!("bootslot: booting new update on {}", recorded);
        Ok(recorded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mender::MenderEnvConfig;

    fn copy(part: RootfsPart, upgrade_available: bool, boot_count: u8) -> MenderEnvConfig {
        MenderEnvConfig {
            boot_count,
            boot_part: Some(part),
            upgrade_available,
            ..MenderEnvConfig::default()
        }
    }

    fn locked() -> MenderEnvConfig {
        MenderEnvConfig { editing: true, ..copy(RootfsPart::A, false, 0) }
    }

    fn invalid() -> MenderEnvConfig {
        MenderEnvConfig { invalid: true, ..copy(RootfsPart::A, false, 0) }
    }

    #[test]
    fn spent_trial_boot_rolls_back() {
        let pair = MenderEnvPair::new(copy(RootfsPart::A, true, 1), locked());
        assert_eq!(resolve_target(&pair), Ok(RootfsPart::B));
        let pair = MenderEnvPair::new(copy(RootfsPart::B, true, 1), locked());
        assert_eq!(resolve_target(&pair), Ok(RootfsPart::A));
    }

    #[test]
    fn first_boot_of_update_keeps_target() {
        let pair = MenderEnvPair::new(copy(RootfsPart::A, true, 0), locked());
        assert_eq!(resolve_target(&pair), Ok(RootfsPart::A));
    }

    #[test]
    fn no_upgrade_ignores_bootcount() {
        let pair = MenderEnvPair::new(copy(RootfsPart::B, false, 1), locked());
        assert_eq!(resolve_target(&pair), Ok(RootfsPart::B));
    }

    #[test]
    fn locked_first_copy_falls_back_to_second() {
        let pair = MenderEnvPair::new(locked(), copy(RootfsPart::B, false, 0));
        assert_eq!(resolve_target(&pair), Ok(RootfsPart::B));
    }

    #[test]
    fn first_trustworthy_copy_wins() {
        let pair = MenderEnvPair::new(copy(RootfsPart::A, false, 0), copy(RootfsPart::B, false, 0));
        assert_eq!(resolve_target(&pair), Ok(RootfsPart::A));
    }

    #[test]
    fn locked_and_invalid_copies_are_total_corruption() {
        let pair = MenderEnvPair::new(locked(), invalid());
        assert_eq!(resolve_target(&pair), Err(BootSlotError::BothCopiesCorrupted));
        let pair = MenderEnvPair::new(locked(), locked());
        assert_eq!(resolve_target(&pair), Err(BootSlotError::BothCopiesCorrupted));
    }

    #[test]
    fn copy_without_boot_part_is_not_trusted() {
        let pair = MenderEnvPair::new(MenderEnvConfig::default(), copy(RootfsPart::B, true, 0));
        assert_eq!(resolve_target(&pair), Ok(RootfsPart::B));
    }
}
