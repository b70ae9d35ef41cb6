// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Storage collaborator seams and their in-memory implementations.
//!
//! The core only ever asks for "N bytes of the misc record" and "one small
//! text file by name". Locating partitions and filesystems stays on the
//! other side of these traits.

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;

use crate::error::SourceError;

/// Supplies the raw misc record.
pub trait MetadataSource {
    /// Fill all of `buf` with the record bytes.
    fn read_metadata(&mut self, buf: &mut [u8]) -> Result<(), SourceError>;
}

/// Supplies grubenv text files by logical name.
pub trait ConfigSource {
    /// Size in bytes of the named file.
    fn config_size(&mut self, name: &str) -> Result<usize, SourceError>;

    /// Read the named file into `buf`, returning the number of bytes written.
    fn read_config(&mut self, name: &str, buf: &mut [u8]) -> Result<usize, SourceError>;
}

impl<T: MetadataSource + ?Sized> MetadataSource for &mut T {
    fn read_metadata(&mut self, buf: &mut [u8]) -> Result<(), SourceError> {
        (**self).read_metadata(buf)
    }
}

impl<T: ConfigSource + ?Sized> ConfigSource for &mut T {
    fn config_size(&mut self, name: &str) -> Result<usize, SourceError> {
        (**self).config_size(name)
    }

    fn read_config(&mut self, name: &str, buf: &mut [u8]) -> Result<usize, SourceError> {
        (**self).read_config(name, buf)
    }
}

/// Misc record held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemMetadata {
    bytes: Vec<u8>,
}

impl MemMetadata {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self { bytes: bytes.into() }
    }

    /// Stored bytes, e.g. to damage a record in place.
    pub fn raw_mut(&mut self) -> &mut Vec<u8> {
        &mut self.bytes
    }
}

impl MetadataSource for MemMetadata {
    fn read_metadata(&mut self, buf: &mut [u8]) -> Result<(), SourceError> {
        let src = self.bytes.get(..buf.len()).ok_or(SourceError::OutOfRange)?;
        buf.copy_from_slice(src);
        Ok(())
    }
}

/// Grubenv files held in memory, keyed by logical name.
#[derive(Debug, Clone, Default)]
pub struct MemConfigStore {
    files: BTreeMap<String, Vec<u8>>,
}

impl MemConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, contents: impl Into<Vec<u8>>) {
        self.files.insert(name.into(), contents.into());
    }

    pub fn with(mut self, name: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        self.insert(name, contents);
        self
    }

    pub fn remove(&mut self, name: &str) -> Option<Vec<u8>> {
        self.files.remove(name)
    }
}

impl ConfigSource for MemConfigStore {
    fn config_size(&mut self, name: &str) -> Result<usize, SourceError> {
        self.files.get(name).map(Vec::len).ok_or(SourceError::NotFound)
    }

    fn read_config(&mut self, name: &str, buf: &mut [u8]) -> Result<usize, SourceError> {
        let data = self.files.get(name).ok_or(SourceError::NotFound)?;
        let len = data.len().min(buf.len());
        buf[..len].copy_from_slice(&data[..len]);
        Ok(len)
    }
}
