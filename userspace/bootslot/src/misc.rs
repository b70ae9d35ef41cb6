// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! CONTEXT: Misc-partition A/B record: decode, checksum gate, slot arbitration
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Stable (v1.0)
//! TEST_COVERAGE: Unit tests + bit-flip property
//!
//! Record layout (32 bytes, little-endian, bitfields LSB first):
//!
//! | bytes  | field                                                        |
//! |--------|--------------------------------------------------------------|
//! | 0..4   | active slot suffix (NUL terminated)                          |
//! | 4..8   | magic `AB_MAGIC`                                             |
//! | 8      | version                                                      |
//! | 9      | bits 0-2 slot count, 3-5 recovery tries, 6-7 merge status lo |
//! | 10     | bit 0 merge status hi, bits 1-7 reserved                     |
//! | 11     | reserved                                                     |
//! | 12..20 | four slot entries (see `slot`)                               |
//! | 20..28 | reserved                                                     |
//! | 28..32 | CRC32 of bytes 0..28                                         |

use log::debug;

use crate::error::{BootSlotError, Result};
use crate::slot::{Slot, SlotRecord, SLOT_RECORD_LEN};

/// "BCAB" read as a little-endian u32.
pub const AB_MAGIC: u32 = 0x4241_4342;

/// Encoded record size.
pub const RECORD_LEN: usize = 32;

/// Byte offset of the record inside the misc partition (after the legacy
/// bootloader message area).
pub const MISC_RECORD_OFFSET: u64 = 2048;

pub const MAX_SLOTS: usize = 4;

const CRC_OFFSET: usize = RECORD_LEN - 4;
const SLOTS_OFFSET: usize = 12;
const RESERVED_OFFSET: usize = SLOTS_OFFSET + MAX_SLOTS * SLOT_RECORD_LEN;

/// Decoded misc A/B record.
///
/// Every bit of the encoded form is represented, so `encode(decode(b)) == b`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootMetadata {
    pub slot_suffix: [u8; 4],
    pub magic: u32,
    pub version: u8,
    /// 3 bits; number of meaningful entries in `slots`.
    pub slot_count: u8,
    /// 3 bits.
    pub recovery_tries_remaining: u8,
    /// 3 bits, split across bytes 9 and 10.
    pub merge_status: u8,
    /// Bits 1-7 of byte 10.
    pub reserved_bits: u8,
    /// Byte 11.
    pub reserved0: u8,
    pub slots: [SlotRecord; MAX_SLOTS],
    pub reserved1: [u8; 8],
    pub crc32: u32,
}

impl Default for BootMetadata {
    fn default() -> Self {
        Self {
            slot_suffix: *b"_a\0\0",
            magic: AB_MAGIC,
            version: 1,
            slot_count: 2,
            recovery_tries_remaining: 0,
            merge_status: 0,
            reserved_bits: 0,
            reserved0: 0,
            slots: [SlotRecord::default(); MAX_SLOTS],
            reserved1: [0; 8],
            crc32: 0,
        }
    }
}

impl BootMetadata {
    pub fn decode(bytes: &[u8; RECORD_LEN]) -> Self {
        let mut slots = [SlotRecord::default(); MAX_SLOTS];
        for (idx, slot) in slots.iter_mut().enumerate() {
            let at = SLOTS_OFFSET + idx * SLOT_RECORD_LEN;
            *slot = SlotRecord::decode([bytes[at], bytes[at + 1]]);
        }
        let mut reserved1 = [0u8; 8];
        reserved1.copy_from_slice(&bytes[RESERVED_OFFSET..CRC_OFFSET]);

        Self {
            slot_suffix: [bytes[0], bytes[1], bytes[2], bytes[3]],
            magic: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
            version: bytes[8],
            slot_count: bytes[9] & 0x07,
            recovery_tries_remaining: (bytes[9] >> 3) & 0x07,
            merge_status: (bytes[9] >> 6) | ((bytes[10] & 0x01) << 2),
            reserved_bits: bytes[10] >> 1,
            reserved0: bytes[11],
            slots,
            reserved1,
            crc32: u32::from_le_bytes([
                bytes[CRC_OFFSET],
                bytes[CRC_OFFSET + 1],
                bytes[CRC_OFFSET + 2],
                bytes[CRC_OFFSET + 3],
            ]),
        }
    }

    pub fn encode(&self) -> [u8; RECORD_LEN] {
        let mut out = [0u8; RECORD_LEN];
        out[0..4].copy_from_slice(&self.slot_suffix);
        out[4..8].copy_from_slice(&self.magic.to_le_bytes());
        out[8] = self.version;
        out[9] = (self.slot_count & 0x07)
            | ((self.recovery_tries_remaining & 0x07) << 3)
            | ((self.merge_status & 0x03) << 6);
        out[10] = ((self.merge_status >> 2) & 0x01) | ((self.reserved_bits & 0x7F) << 1);
        out[11] = self.reserved0;
        for (idx, slot) in self.slots.iter().enumerate() {
            let at = SLOTS_OFFSET + idx * SLOT_RECORD_LEN;
            out[at..at + SLOT_RECORD_LEN].copy_from_slice(&slot.encode());
        }
        out[RESERVED_OFFSET..CRC_OFFSET].copy_from_slice(&self.reserved1);
        out[CRC_OFFSET..].copy_from_slice(&self.crc32.to_le_bytes());
        out
    }

    /// CRC32 over every encoded byte preceding the checksum field.
    pub fn compute_crc32(&self) -> u32 {
        crc32fast::hash(&self.encode()[..CRC_OFFSET])
    }

    /// Stores the checksum matching the current contents.
    pub fn seal(&mut self) {
        self.crc32 = self.compute_crc32();
    }

    /// Magic and checksum gate. Nothing in the record is trusted unless both pass.
    pub fn validate(&self) -> Result<()> {
        if self.magic != AB_MAGIC {
            debug!("bootslot: misc magic error: 0x{:x}", self.magic);
            return Err(BootSlotError::MagicMismatch { found: self.magic });
        }
        let computed = self.compute_crc32();
        if computed != self.crc32 {
            debug!("bootslot: misc crc error: 0x{:x} != 0x{:x}", computed, self.crc32);
            return Err(BootSlotError::ChecksumMismatch { stored: self.crc32, computed });
        }
        Ok(())
    }

    /// Priority arbitration between the first two slots; slot A wins ties.
    ///
    /// Assumes the record already passed [`BootMetadata::validate`].
    pub fn arbitrate(&self) -> Result<Slot> {
        let a = &self.slots[0];
        let b = &self.slots[1];
        match (a.is_bootable(), b.is_bootable()) {
            (true, true) if b.priority > a.priority => Ok(Slot::B),
            (true, _) => Ok(Slot::A),
            (false, true) => Ok(Slot::B),
            (false, false) => Err(BootSlotError::NoBootableSlot),
        }
    }
}

/// Validates a raw record and selects the slot to boot.
pub fn parse_boot_slot(bytes: &[u8; RECORD_LEN]) -> Result<Slot> {
    let record = BootMetadata::decode(bytes);
    record.validate()?;
    record.arbitrate()
}
