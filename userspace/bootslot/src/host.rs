// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! CONTEXT: Host collaborators backed by the filesystem
//! OWNERS: @runtime
//! STATUS: Functional (host-first)
//! API_STABILITY: Unstable
//! TEST_COVERAGE: Unit tests (tempfile fixtures)

use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom};
use std::path::{Component, Path, PathBuf};

use crate::error::SourceError;
use crate::source::{ConfigSource, MetadataSource};

/// Misc record read from a raw partition device or image file.
#[derive(Debug, Clone)]
pub struct FileMetadata {
    path: PathBuf,
    offset: u64,
    block_size: u64,
}

impl FileMetadata {
    pub fn new(path: impl Into<PathBuf>, offset: u64) -> Self {
        Self { path: path.into(), offset, block_size: 1 }
    }

    /// Reads whole `block_size` blocks around the record, as a raw block
    /// device requires. Zero is treated as 1.
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = (block_size as u64).max(1);
        self
    }
}

impl MetadataSource for FileMetadata {
    fn read_metadata(&mut self, buf: &mut [u8]) -> Result<(), SourceError> {
        let start = self.offset - self.offset % self.block_size;
        let skip = (self.offset - start) as usize;
        let span = (skip + buf.len()) as u64;
        let len = usize::try_from(span.div_ceil(self.block_size) * self.block_size)
            .map_err(|_| SourceError::OutOfRange)?;

        let mut staging = Vec::new();
        staging.try_reserve_exact(len).map_err(|_| SourceError::OutOfResources)?;
        staging.resize(len, 0);

        let mut file = File::open(&self.path)?;
        file.seek(SeekFrom::Start(start))?;
        file.read_exact(&mut staging)?;
        buf.copy_from_slice(&staging[skip..skip + buf.len()]);
        Ok(())
    }
}

/// Grubenv files resolved under a root directory.
///
/// Names are `/`-separated and relative; anything that would leave `root`
/// is reported as not found.
#[derive(Debug, Clone)]
pub struct DirConfigStore {
    root: PathBuf,
}

impl DirConfigStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, name: &str) -> Result<PathBuf, SourceError> {
        let rel = Path::new(name);
        if !rel.components().all(|c| matches!(c, Component::Normal(_))) {
            return Err(SourceError::NotFound);
        }
        Ok(self.root.join(rel))
    }
}

impl ConfigSource for DirConfigStore {
    fn config_size(&mut self, name: &str) -> Result<usize, SourceError> {
        let meta = fs::metadata(self.resolve(name)?)?;
        usize::try_from(meta.len()).map_err(|_| SourceError::OutOfRange)
    }

    fn read_config(&mut self, name: &str, buf: &mut [u8]) -> Result<usize, SourceError> {
        let mut file = File::open(self.resolve(name)?)?;
        let mut filled = 0;
        while filled < buf.len() {
            let n = file.read(&mut buf[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        Ok(filled)
    }
}
