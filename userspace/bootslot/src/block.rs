// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! CONTEXT: Block-device backed misc record source
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Stable (v1.0)
//! TEST_COVERAGE: Unit tests (in-memory device)

use alloc::vec;
use alloc::vec::Vec;

use crate::error::SourceError;
use crate::misc::MISC_RECORD_OFFSET;
use crate::source::MetadataSource;

/// Block device error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockError {
    /// Read failed.
    IoError,
    /// Block index out of range.
    OutOfRange,
}

impl From<BlockError> for SourceError {
    fn from(err: BlockError) -> Self {
        match err {
            BlockError::IoError => SourceError::Io,
            BlockError::OutOfRange => SourceError::OutOfRange,
        }
    }
}

/// Read-only view of the boot medium.
pub trait BlockDevice {
    /// Block size in bytes (typically 512).
    fn block_size(&self) -> usize;

    /// Total number of blocks.
    fn block_count(&self) -> u64;

    /// Read a single block into buffer.
    fn read_block(&self, block_idx: u64, buf: &mut [u8]) -> Result<(), BlockError>;
}

/// In-memory block device for testing.
pub struct MemBlockDevice {
    block_size: usize,
    blocks: Vec<Vec<u8>>,
}

impl MemBlockDevice {
    /// Create a zeroed device with given block size and count.
    pub fn new(block_size: usize, block_count: u64) -> Self {
        let blocks = (0..block_count).map(|_| vec![0u8; block_size]).collect();
        Self { block_size, blocks }
    }

    /// Copies `data` onto the device starting at byte `offset`.
    pub fn write_bytes(&mut self, offset: u64, data: &[u8]) -> Result<(), BlockError> {
        for (i, byte) in data.iter().enumerate() {
            let pos = offset + i as u64;
            let block = (pos / self.block_size as u64) as usize;
            let within = (pos % self.block_size as u64) as usize;
            let slot = self
                .blocks
                .get_mut(block)
                .and_then(|b| b.get_mut(within))
                .ok_or(BlockError::OutOfRange)?;
            *slot = *byte;
        }
        Ok(())
    }
}

impl BlockDevice for MemBlockDevice {
    fn block_size(&self) -> usize {
        self.block_size
    }

    fn block_count(&self) -> u64 {
        self.blocks.len() as u64
    }

    fn read_block(&self, block_idx: u64, buf: &mut [u8]) -> Result<(), BlockError> {
        let idx = block_idx as usize;
        if idx >= self.blocks.len() {
            return Err(BlockError::OutOfRange);
        }
        if buf.len() < self.block_size {
            return Err(BlockError::IoError);
        }
        buf[..self.block_size].copy_from_slice(&self.blocks[idx]);
        Ok(())
    }
}

/// Misc partition on a block device.
///
/// Reads are rounded up to whole blocks covering the legacy area and the
/// record, then the record bytes are copied out.
pub struct MiscPartition<B: BlockDevice> {
    device: B,
    start_lba: u64,
    record_offset: u64,
}

impl<B: BlockDevice> MiscPartition<B> {
    pub fn new(device: B, start_lba: u64) -> Self {
        Self { device, start_lba, record_offset: MISC_RECORD_OFFSET }
    }

    pub fn with_record_offset(mut self, offset: u64) -> Self {
        self.record_offset = offset;
        self
    }

    /// Bytes read from the partition start: legacy area plus record, block
    /// aligned. `None` for a device reporting zero-sized blocks.
    fn aligned_read_len(&self, record_len: usize) -> Option<usize> {
        let block_size = self.device.block_size();
        if block_size == 0 {
            return None;
        }
        let wanted = self.record_offset as usize + record_len;
        Some(wanted.div_ceil(block_size) * block_size)
    }
}

impl<B: BlockDevice> MetadataSource for MiscPartition<B> {
    fn read_metadata(&mut self, buf: &mut [u8]) -> Result<(), SourceError> {
        let read_len = self.aligned_read_len(buf.len()).ok_or(SourceError::Io)?;
        let block_size = self.device.block_size();
        let blocks = (read_len / block_size) as u64;
        if self.start_lba.saturating_add(blocks) > self.device.block_count() {
            return Err(SourceError::OutOfRange);
        }

        let mut staging = Vec::new();
        staging.try_reserve_exact(read_len).map_err(|_| SourceError::OutOfResources)?;
        staging.resize(read_len, 0);
        for (i, chunk) in staging.chunks_mut(block_size).enumerate() {
            self.device.read_block(self.start_lba + i as u64, chunk)?;
        }

        let start = self.record_offset as usize;
        buf.copy_from_slice(&staging[start..start + buf.len()]);
        Ok(())
    }
}
