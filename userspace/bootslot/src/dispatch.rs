// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! CONTEXT: Boot slot dispatcher (scheme selection + slot 0 fallback)
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Stable (v1.0)
//! TEST_COVERAGE: Unit tests + integration tests (via tests/bootslot_host)
//!
//! Every outcome is a slot. Failures of either scheme fall back to slot A and
//! carry the reason as a non-fatal diagnostic.

use log::error;

use crate::error::{BootSlotError, Result};
use crate::mender::{EnvCopy, MenderEnvPair, MenderFiles, MenderReport};
use crate::misc::{parse_boot_slot, RECORD_LEN};
use crate::rollback::resolve_target;
use crate::slot::Slot;
use crate::source::{ConfigSource, MetadataSource};

/// Which scheme the boot option asks for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Deserialize))]
#[cfg_attr(feature = "std", serde(rename_all = "lowercase"))]
pub enum SelectionMode {
    /// No redundancy: always slot A.
    #[default]
    None,
    /// Binary A/B record in the misc partition.
    Misc,
    /// Redundant grubenv text files.
    Mender,
}

impl SelectionMode {
    /// Resolves raw boot-option flags; misc takes precedence.
    pub fn from_flags(misc: bool, mender: bool) -> Self {
        if misc {
            SelectionMode::Misc
        } else if mender {
            SelectionMode::Mender
        } else {
            SelectionMode::None
        }
    }
}

/// Result of the boot decision.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootDecision {
    pub slot: Slot,
    /// Why the fallback slot was used, if it was.
    pub diagnostic: Option<BootSlotError>,
    /// Per-copy rejections from the grubenv scheme; empty in other modes.
    pub grubenv: MenderReport,
}

impl BootDecision {
    pub fn selected(slot: Slot) -> Self {
        Self { slot, ..Self::default() }
    }

    fn fallback(err: BootSlotError) -> Self {
        error!("bootslot: boot slot error ({}), falling back to slot 0", err);
        Self { slot: Slot::A, diagnostic: Some(err), ..Self::default() }
    }

    /// Zero-based slot index.
    pub fn index(&self) -> usize {
        self.slot.index()
    }
}

/// Chooses the slot to boot.
///
/// `metadata` is only consulted in [`SelectionMode::Misc`]; `configs`,
/// `files` and `max_size` only in [`SelectionMode::Mender`].
pub fn select_boot_slot<M, C>(
    mode: SelectionMode,
    metadata: &mut M,
    configs: &mut C,
    files: &MenderFiles,
    max_size: usize,
) -> BootDecision
where
    M: MetadataSource + ?Sized,
    C: ConfigSource + ?Sized,
{
    let mut grubenv = MenderReport::default();
    let outcome = match mode {
        SelectionMode::None => return BootDecision::selected(Slot::A),
        SelectionMode::Misc => select_misc(metadata),
        SelectionMode::Mender => select_mender(configs, files, max_size, &mut grubenv),
    };
    let decision = match outcome {
        Ok(slot) => BootDecision::selected(slot),
        Err(err) => BootDecision::fallback(err),
    };
    BootDecision { grubenv, ..decision }
}

fn select_misc<M: MetadataSource + ?Sized>(metadata: &mut M) -> Result<Slot> {
    let mut buf = [0u8; RECORD_LEN];
    metadata.read_metadata(&mut buf)?;
    parse_boot_slot(&buf)
}

fn select_mender<C: ConfigSource + ?Sized>(
    configs: &mut C,
    files: &MenderFiles,
    max_size: usize,
    report: &mut MenderReport,
) -> Result<Slot> {
    let (pair, loaded) = MenderEnvPair::load(configs, files, max_size)?;
    *report = loaded;
    let target = resolve_target(&pair);
    if target.is_err() {
        for copy in EnvCopy::ALL {
            if let Some(reason) = report.rejection(copy) {
                error!("bootslot: grubenv copy {} unusable: {}", copy, reason);
            }
        }
    }
    Ok(target?.into())
}
