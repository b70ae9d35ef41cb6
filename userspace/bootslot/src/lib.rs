// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! CONTEXT: Boot-time A/B slot selection (misc record + redundant grubenv)
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Stable (v1.0)
//! TEST_COVERAGE: Unit tests per module + 13 integration tests (via tests/bootslot_host)
//!   - misc record checksum gate and priority arbitration
//!   - grubenv parsing, copy selection and rollback
//!   - dispatcher fallback to slot 0
//!
//! PUBLIC API:
//!   - select_boot_slot(): single entry point for the boot path
//!   - BootMetadata / SlotRecord: fixed-layout misc record
//!   - MenderEnvConfig / MenderEnvPair: redundant grubenv copies
//!   - MetadataSource / ConfigSource: collaborator seams
//!   - BootSlotConfig (std): TOML configuration for host tooling
//!
//! DEPENDENCIES:
//!   - crc32fast: record integrity
//!   - log: diagnostics (no_std facade)
//!   - thiserror: error taxonomy
//!   - serde + toml (std): configuration files

#![forbid(unsafe_code)]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod block;
pub mod dispatch;
pub mod error;
pub mod mender;
pub mod misc;
pub mod rollback;
pub mod slot;
pub mod source;

#[cfg(feature = "std")]
pub mod config;
#[cfg(feature = "std")]
pub mod host;

pub use block::{BlockDevice, BlockError, MemBlockDevice, MiscPartition};
pub use dispatch::{select_boot_slot, BootDecision, SelectionMode};
pub use error::{BootSlotError, Result, SourceError};
pub use mender::{
    parse_line, Assignment, EnvCopy, MenderEnvConfig, MenderEnvPair, MenderFiles, MenderReport,
    RootfsPart, MENDER_ENV_MAX_SIZE,
};
pub use misc::{parse_boot_slot, BootMetadata, AB_MAGIC, MISC_RECORD_OFFSET, RECORD_LEN};
pub use rollback::resolve_target;
pub use slot::{Slot, SlotRecord};
pub use source::{ConfigSource, MemConfigStore, MemMetadata, MetadataSource};

#[cfg(feature = "std")]
pub use config::{BootSlotConfig, ConfigError, MenderConfig, MiscConfig};
#[cfg(feature = "std")]
pub use host::{DirConfigStore, FileMetadata};
