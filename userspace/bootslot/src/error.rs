// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Error taxonomy shared by both selection schemes.

use alloc::string::String;

/// Result alias for slot selection operations.
pub type Result<T> = core::result::Result<T, BootSlotError>;

/// Failure reported by a storage collaborator.
///
/// The core never retries and never reinterprets these; they are wrapped in
/// [`BootSlotError::Source`] unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    /// The named file or partition does not exist.
    #[error("not found")]
    NotFound,
    /// Read failed.
    #[error("i/o error")]
    Io,
    /// Buffer allocation or similar resource exhaustion.
    #[error("out of resources")]
    OutOfResources,
    /// Block or byte range outside the device.
    #[error("out of range")]
    OutOfRange,
}

#[cfg(feature = "std")]
impl From<std::io::Error> for SourceError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => SourceError::NotFound,
            std::io::ErrorKind::UnexpectedEof => SourceError::OutOfRange,
            std::io::ErrorKind::OutOfMemory => SourceError::OutOfResources,
            _ => SourceError::Io,
        }
    }
}

/// Errors produced while selecting a boot slot.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BootSlotError {
    /// Misc record signature is wrong; the whole record is discarded.
    #[error("misc record magic mismatch: 0x{found:08x}")]
    MagicMismatch { found: u32 },
    /// Misc record CRC does not cover its contents; the whole record is discarded.
    #[error("misc record crc mismatch: stored 0x{stored:08x}, computed 0x{computed:08x}")]
    ChecksumMismatch { stored: u32, computed: u32 },
    /// Neither slot passes the bootable predicate.
    #[error("no bootable slot")]
    NoBootableSlot,
    /// A recognized grubenv key carries an out-of-range or malformed value.
    #[error("grubenv variable '{key}' invalid: '{value}'")]
    InvalidFieldValue { key: &'static str, value: String },
    /// A grubenv key outside the recognized and ignorable sets.
    #[error("grubenv key not recognized: '{key}'")]
    UnrecognizedKey { key: String },
    /// A copy finished parsing without assigning a required key.
    #[error("grubenv variable '{key}' missing")]
    MissingKey { key: &'static str },
    /// Grubenv file is larger than the configured bound.
    #[error("grubenv file too large: {size} bytes (max {max})")]
    ConfigTooLarge { size: usize, max: usize },
    /// Grubenv file is empty.
    #[error("grubenv file empty")]
    ConfigEmpty,
    /// Both redundant grubenv copies are locked or invalid.
    #[error("both grubenv copies are corrupted")]
    BothCopiesCorrupted,
    /// Storage collaborator failure.
    #[error("source: {0}")]
    Source(#[from] SourceError),
}

impl BootSlotError {
    /// True when the error came from the grubenv text of a single copy and the
    /// other copy may still be usable.
    pub fn is_copy_local(&self) -> bool {
        matches!(
            self,
            BootSlotError::InvalidFieldValue { .. }
                | BootSlotError::UnrecognizedKey { .. }
                | BootSlotError::MissingKey { .. }
                | BootSlotError::ConfigTooLarge { .. }
                | BootSlotError::ConfigEmpty
        )
    }
}
