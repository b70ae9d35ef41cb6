// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! CONTEXT: A/B slot identity and per-slot health record
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Stable (v1.0)
//! TEST_COVERAGE: Unit tests + bootable-predicate property
//!
//! On-disk slot entry (2 bytes, LSB first):
//!   byte 0: bits 0-3 priority, bits 4-6 tries remaining, bit 7 successful boot
//!   byte 1: bit 0 verity corrupted, bits 1-7 reserved

/// One of the two redundant images.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Slot {
    /// Also the fallback slot.
    #[default]
    A,
    B,
}

impl Slot {
    pub fn other(self) -> Self {
        match self {
            Slot::A => Slot::B,
            Slot::B => Slot::A,
        }
    }

    /// Zero-based index reported to the caller of the boot path.
    pub fn index(self) -> usize {
        match self {
            Slot::A => 0,
            Slot::B => 1,
        }
    }
}

/// Encoded size of one [`SlotRecord`].
pub const SLOT_RECORD_LEN: usize = 2;

pub const MAX_PRIORITY: u8 = 0x0F;
pub const MAX_TRIES: u8 = 0x07;

/// Health of one slot as recorded in the misc block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SlotRecord {
    /// 0 = permanently unbootable, 15 = highest.
    pub priority: u8,
    /// Boot attempts left; decremented by the OS side, never here.
    pub tries_remaining: u8,
    pub successful_boot: bool,
    pub verity_corrupted: bool,
    /// Bits 1-7 of the second byte, kept so encoding is lossless.
    pub reserved: u8,
}

impl SlotRecord {
    /// Bootable iff priority is nonzero and the slot either booted
    /// successfully or still has tries left.
    pub fn is_bootable(&self) -> bool {
        self.priority > 0 && (self.successful_boot || self.tries_remaining > 0)
    }

    pub fn decode(bytes: [u8; SLOT_RECORD_LEN]) -> Self {
        Self {
            priority: bytes[0] & MAX_PRIORITY,
            tries_remaining: (bytes[0] >> 4) & MAX_TRIES,
            successful_boot: bytes[0] & 0x80 != 0,
            verity_corrupted: bytes[1] & 0x01 != 0,
            reserved: bytes[1] >> 1,
        }
    }

    /// Packs the record; out-of-range fields are masked to their bit width.
    pub fn encode(&self) -> [u8; SLOT_RECORD_LEN] {
        let first = (self.priority & MAX_PRIORITY)
            | ((self.tries_remaining & MAX_TRIES) << 4)
            | (u8::from(self.successful_boot) << 7);
        let second = u8::from(self.verity_corrupted) | ((self.reserved & 0x7F) << 1);
        [first, second]
    }
}
