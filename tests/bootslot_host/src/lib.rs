// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! CONTEXT: Host integration fixtures for the bootslot library
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Stable
//! TEST_COVERAGE: Used by tests/boot_flow.rs
//!
//! Builds on-disk fixtures the way a boot medium presents them: a raw misc
//! partition image and a boot partition holding the grubenv tree.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use bootslot::{BootMetadata, MenderFiles, SlotRecord, MISC_RECORD_OFFSET};
use tempfile::TempDir;

/// Temporary boot medium.
pub struct Fixture {
    dir: TempDir,
}

impl Fixture {
    pub fn new() -> io::Result<Self> {
        Ok(Self { dir: TempDir::new()? })
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn misc_image(&self) -> PathBuf {
        self.root().join("misc.img")
    }

    /// Writes a misc image: zeroed legacy area followed by the encoded record.
    pub fn write_misc(&self, record: &BootMetadata) -> io::Result<PathBuf> {
        self.write_misc_bytes(&record.encode())
    }

    pub fn write_misc_bytes(&self, record: &[u8]) -> io::Result<PathBuf> {
        let mut image = vec![0u8; MISC_RECORD_OFFSET as usize];
        image.extend_from_slice(record);
        let path = self.misc_image();
        fs::write(&path, image)?;
        Ok(path)
    }

    /// Writes the four grubenv files `[env1, lock1, env2, lock2]`; `None` leaves a file out.
    pub fn write_grubenv(&self, contents: [Option<&str>; 4]) -> io::Result<()> {
        let files = MenderFiles::default();
        for (name, body) in files.names().iter().zip(contents) {
            let Some(body) = body else { continue };
            let path = self.root().join(name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, body)?;
        }
        Ok(())
    }
}

/// Sealed record with the given first two slots.
pub fn sealed_record(a: SlotRecord, b: SlotRecord) -> BootMetadata {
    let mut record = BootMetadata::default();
    record.slots[0] = a;
    record.slots[1] = b;
    record.seal();
    record
}

pub fn slot(priority: u8, tries_remaining: u8, successful_boot: bool) -> SlotRecord {
    SlotRecord { priority, tries_remaining, successful_boot, ..SlotRecord::default() }
}

/// Env file text as Mender's grub integration writes it.
pub fn grubenv_text(boot_part: u8, upgrade_available: u8, bootcount: u8) -> String {
    format!(
        "# GRUB Environment Block\n\
         mender_boot_part={boot_part}\n\
         mender_boot_part_hex={boot_part}\n\
         upgrade_available={upgrade_available}\n\
         bootcount={bootcount}\n\
         mender_uboot_separator=1\n\
         ###########\n"
    )
}
