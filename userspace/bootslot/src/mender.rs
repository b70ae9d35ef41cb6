// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! CONTEXT: Redundant grubenv (Mender) parsing
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Stable (v1.0)
//! TEST_COVERAGE: Unit tests
//!   - per-key validation and abort-on-first-error
//!   - ignorable and unrecognized keys
//!   - two-copy loading with per-copy invalidation
//!
//! Two copies exist, each made of an env file and a lock file. Both files of a
//! copy assign into the same [`MenderEnvConfig`]; the lock file is where an
//! external writer raises `editing` while it rewrites the env file.

use alloc::borrow::ToOwned;
use alloc::string::String;
use alloc::vec::Vec;

use log::{debug, warn};

use crate::error::{BootSlotError, Result, SourceError};
use crate::slot::Slot;
use crate::source::ConfigSource;

/// Upper bound on a single grubenv file.
pub const MENDER_ENV_MAX_SIZE: usize = 1024;

/// Number of redundant copies.
pub const COPIES: usize = 2;

/// Which of the two redundant copies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvCopy {
    First,
    Second,
}

impl EnvCopy {
    /// Load and trust order.
    pub const ALL: [EnvCopy; COPIES] = [EnvCopy::First, EnvCopy::Second];

    pub fn index(self) -> usize {
        match self {
            EnvCopy::First => 0,
            EnvCopy::Second => 1,
        }
    }
}

impl core::fmt::Display for EnvCopy {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.index() + 1)
    }
}

const KEY_BOOTCOUNT: &str = "bootcount";
const KEY_BOOT_PART: &str = "mender_boot_part";
const KEY_UPGRADE_AVAILABLE: &str = "upgrade_available";

/// Keys Mender writes that play no part in slot selection.
const IGNORED_KEYS: [&str; 4] = [
    "mender_boot_part_hex",
    "mender_uboot_separator",
    "systemd_machine_id",
    "mender_systemd_machine_id",
];

/// Root filesystem partition numbers in the Mender layout
/// (1 boot, 2 rootfs A, 3 rootfs B, 4 data).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RootfsPart {
    A = 2,
    B = 3,
}

impl RootfsPart {
    pub fn from_number(n: u64) -> Option<Self> {
        match n {
            2 => Some(RootfsPart::A),
            3 => Some(RootfsPart::B),
            _ => None,
        }
    }

    pub fn other(self) -> Self {
        match self {
            RootfsPart::A => RootfsPart::B,
            RootfsPart::B => RootfsPart::A,
        }
    }
}

/// One copy of the grubenv state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MenderEnvConfig {
    /// 0 or 1.
    pub boot_count: u8,
    /// `None` until the copy assigns `mender_boot_part`.
    pub boot_part: Option<RootfsPart>,
    pub upgrade_available: bool,
    /// Lock raised by a writer mid-update; a locked copy is never trusted.
    pub editing: bool,
    /// Set when any value in this copy failed validation.
    pub invalid: bool,
}

impl MenderEnvConfig {
    /// A copy may drive the decision only if it is unlocked and valid.
    pub fn is_trustworthy(&self) -> bool {
        !self.editing && !self.invalid && self.boot_part.is_some()
    }

    fn apply(&mut self, assignment: Assignment<'_>) {
        match assignment {
            Assignment::BootCount(count) => self.boot_count = count,
            Assignment::BootPart(part) => self.boot_part = Some(part),
            Assignment::UpgradeAvailable(flag) => self.upgrade_available = flag,
            Assignment::Editing(flag) => self.editing = flag,
            Assignment::Ignored(key) => debug!("bootslot: grubenv irrelevant config '{}'", key),
        }
    }

    /// Parses one file's text into this copy.
    ///
    /// Stops at the first error; fields assigned before it stay assigned. An
    /// out-of-range value also marks the copy invalid.
    pub fn parse(&mut self, text: &[u8]) -> Result<()> {
        for line in text.split(|b| *b == b'\n') {
            match parse_line(line) {
                Ok(Some(assignment)) => self.apply(assignment),
                Ok(None) => {}
                Err(err) => {
                    if matches!(err, BootSlotError::InvalidFieldValue { .. }) {
                        self.invalid = true;
                    }
                    return Err(err);
                }
            }
        }
        Ok(())
    }
}

/// A single recognized `key=value` line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assignment<'a> {
    BootCount(u8),
    BootPart(RootfsPart),
    UpgradeAvailable(bool),
    Editing(bool),
    /// Known key with no bearing on slot selection.
    Ignored(&'a str),
}

/// Parses one line (without its `\n`).
///
/// Lines without `=` yield `Ok(None)`. Keys match exactly and case-sensitively.
pub fn parse_line(line: &[u8]) -> Result<Option<Assignment<'_>>> {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    let Some(eq) = line.iter().position(|b| *b == b'=') else {
        return Ok(None);
    };
    let (key, value) = (&line[..eq], &line[eq + 1..]);

    let assignment = match key {
        b"bootcount" => match parse_decimal(value) {
            Some(n @ (0 | 1)) => Assignment::BootCount(n as u8),
            _ => return Err(invalid(KEY_BOOTCOUNT, value)),
        },
        b"mender_boot_part" => match parse_decimal(value).and_then(RootfsPart::from_number) {
            Some(part) => Assignment::BootPart(part),
            None => return Err(invalid(KEY_BOOT_PART, value)),
        },
        b"upgrade_available" => match parse_decimal(value) {
            Some(n @ (0 | 1)) => Assignment::UpgradeAvailable(n == 1),
            _ => return Err(invalid(KEY_UPGRADE_AVAILABLE, value)),
        },
        b"editing" => Assignment::Editing(leading_decimal(value) != 0),
        _ => match IGNORED_KEYS.iter().find(|known| known.as_bytes() == key) {
            Some(known) => Assignment::Ignored(known),
            None => {
                return Err(BootSlotError::UnrecognizedKey {
                    key: String::from_utf8_lossy(key).into_owned(),
                })
            }
        },
    };
    Ok(Some(assignment))
}

fn invalid(key: &'static str, value: &[u8]) -> BootSlotError {
    BootSlotError::InvalidFieldValue { key, value: String::from_utf8_lossy(value).into_owned() }
}

/// Strict decimal: surrounding ASCII whitespace allowed, digits only otherwise.
fn parse_decimal(value: &[u8]) -> Option<u64> {
    let digits = value.trim_ascii();
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    digits
        .iter()
        .try_fold(0u64, |acc, d| acc.checked_mul(10)?.checked_add(u64::from(d - b'0')))
}

/// Lenient decimal: leading digits after optional blanks, 0 when there are none.
fn leading_decimal(value: &[u8]) -> u64 {
    value
        .iter()
        .skip_while(|b| **b == b' ' || **b == b'\t')
        .take_while(|b| b.is_ascii_digit())
        .fold(0u64, |acc, d| acc.saturating_mul(10).saturating_add(u64::from(d - b'0')))
}

/// Logical names of the four grubenv files, ordered env/lock per copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenderFiles {
    names: [String; 4],
}

impl Default for MenderFiles {
    fn default() -> Self {
        Self::new([
            "grub-mender-grubenv/mender_grubenv1/env",
            "grub-mender-grubenv/mender_grubenv1/lock",
            "grub-mender-grubenv/mender_grubenv2/env",
            "grub-mender-grubenv/mender_grubenv2/lock",
        ])
    }
}

impl MenderFiles {
    /// `names` is `[env1, lock1, env2, lock2]`.
    pub fn new<S: AsRef<str>>(names: [S; 4]) -> Self {
        Self { names: names.map(|n| n.as_ref().to_owned()) }
    }

    /// Files feeding the given copy, in parse order.
    pub fn copy_files(&self, copy: EnvCopy) -> [&str; 2] {
        let base = copy.index() * 2;
        [self.names[base].as_str(), self.names[base + 1].as_str()]
    }

    pub fn names(&self) -> &[String; 4] {
        &self.names
    }
}

/// Per-copy parse outcome, kept for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MenderReport {
    pub copies: [Option<BootSlotError>; COPIES],
}

impl MenderReport {
    pub fn rejection(&self, copy: EnvCopy) -> Option<&BootSlotError> {
        self.copies[copy.index()].as_ref()
    }
}

/// Both grubenv copies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MenderEnvPair {
    pub copies: [MenderEnvConfig; COPIES],
}

impl MenderEnvPair {
    pub fn new(first: MenderEnvConfig, second: MenderEnvConfig) -> Self {
        Self { copies: [first, second] }
    }

    /// Parses `text` into one copy.
    pub fn parse_copy(&mut self, copy: EnvCopy, text: &[u8]) -> Result<()> {
        self.copies[copy.index()].parse(text)
    }

    /// Loads both copies through `source`.
    ///
    /// A copy whose text is malformed, empty, oversized or missing
    /// `mender_boot_part` is marked invalid and the other copy is still
    /// loaded. Collaborator failures abort the whole load.
    pub fn load<C: ConfigSource + ?Sized>(
        source: &mut C,
        files: &MenderFiles,
        max_size: usize,
    ) -> Result<(Self, MenderReport)> {
        let mut pair = Self::default();
        let mut report = MenderReport::default();
        for copy in EnvCopy::ALL {
            if let Err(err) = pair.load_copy(source, files, copy, max_size) {
                if !err.is_copy_local() {
                    return Err(err);
                }
                warn!("bootslot: grubenv copy {} rejected: {}", copy, err);
                pair.copies[copy.index()].invalid = true;
                report.copies[copy.index()] = Some(err);
            }
        }
        Ok((pair, report))
    }

    fn load_copy<C: ConfigSource + ?Sized>(
        &mut self,
        source: &mut C,
        files: &MenderFiles,
        copy: EnvCopy,
        max_size: usize,
    ) -> Result<()> {
        let cfg = &mut self.copies[copy.index()];
        for name in files.copy_files(copy) {
            debug!("bootslot: checking {}", name);
            let size = source.config_size(name)?;
            if size == 0 {
                return Err(BootSlotError::ConfigEmpty);
            }
            if size > max_size {
                return Err(BootSlotError::ConfigTooLarge { size, max: max_size });
            }
            let mut buf = Vec::new();
            buf.try_reserve_exact(size).map_err(|_| SourceError::OutOfResources)?;
            buf.resize(size, 0);
            let read = source.read_config(name, &mut buf)?;
            debug!("bootslot: loaded {} [size 0x{:x}]", name, read);
            cfg.parse(&buf[..read])?;
        }
        if cfg.boot_part.is_none() {
            return Err(BootSlotError::MissingKey { key: KEY_BOOT_PART });
        }
        Ok(())
    }
}

impl From<RootfsPart> for Slot {
    fn from(part: RootfsPart) -> Self {
        match part {
            RootfsPart::A => Slot::A,
            RootfsPart::B => Slot::B,
        }
    }
}

impl core::fmt::Display for RootfsPart {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            RootfsPart::A => "rootfs-a",
            RootfsPart::B => "rootfs-b",
        })
    }
}
