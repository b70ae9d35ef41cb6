// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! TOML configuration for host tooling.
//!
//! ```toml
//! mode = "mender"
//!
//! [misc]
//! image = "/dev/disk/by-partlabel/misc"
//! offset = 2048
//! block_size = 512
//!
//! [mender]
//! root = "/boot/efi"
//! max_size = 1024
//! files = [
//!     "grub-mender-grubenv/mender_grubenv1/env",
//!     "grub-mender-grubenv/mender_grubenv1/lock",
//!     "grub-mender-grubenv/mender_grubenv2/env",
//!     "grub-mender-grubenv/mender_grubenv2/lock",
//! ]
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::dispatch::SelectionMode;
use crate::mender::{MenderFiles, MENDER_ENV_MAX_SIZE};
use crate::misc::MISC_RECORD_OFFSET;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid config: {reason}")]
    Invalid { reason: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BootSlotConfig {
    pub mode: SelectionMode,
    pub misc: MiscConfig,
    pub mender: MenderConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MiscConfig {
    /// Raw misc partition (or an image of it).
    pub image: PathBuf,
    /// Byte offset of the A/B record within `image`.
    pub offset: u64,
    pub block_size: usize,
}

impl Default for MiscConfig {
    fn default() -> Self {
        Self { image: PathBuf::from("misc.img"), offset: MISC_RECORD_OFFSET, block_size: 512 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MenderConfig {
    /// Directory holding the grubenv tree (the boot partition mount).
    pub root: PathBuf,
    /// `[env1, lock1, env2, lock2]`, relative to `root`.
    pub files: Vec<String>,
    pub max_size: usize,
}

impl Default for MenderConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            files: MenderFiles::default().names().to_vec(),
            max_size: MENDER_ENV_MAX_SIZE,
        }
    }
}

impl MenderConfig {
    pub fn mender_files(&self) -> Result<MenderFiles, ConfigError> {
        let names: [String; 4] = self.files.clone().try_into().map_err(|files: Vec<String>| {
            ConfigError::Invalid {
                reason: format!("mender.files needs exactly 4 entries, got {}", files.len()),
            }
        })?;
        Ok(MenderFiles::new(names))
    }
}

impl BootSlotConfig {
    pub fn from_toml(text: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        Self::from_toml(&text, path)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mender.max_size == 0 {
            return Err(ConfigError::Invalid { reason: "mender.max_size must be nonzero".into() });
        }
        if self.misc.block_size == 0 {
            return Err(ConfigError::Invalid { reason: "misc.block_size must be nonzero".into() });
        }
        self.mender.mender_files().map(|_| ())
    }
}
