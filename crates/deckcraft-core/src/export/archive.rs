//! Archive assembly for multi-card export

use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::ExportError;

/// Default DEFLATE level (0 = store, 9 = smallest)
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

/// Highest accepted compression level
pub const MAX_COMPRESSION_LEVEL: u32 = 9;

/// A named file inside an archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Bundles many files into one downloadable blob
pub trait Archiver {
    /// File extension of produced archives, without the dot
    fn extension(&self) -> &str;

    /// Bundle `entries` in order into a single archive
    fn bundle(&self, entries: &[ArchiveEntry]) -> Result<Vec<u8>, ExportError>;
}

/// Zip archive assembled in memory
///
/// Entries are collected as they are added; the compression level is chosen
/// when the archive is finalized.
#[derive(Debug, Default)]
pub struct ZipBuilder {
    entries: Vec<ArchiveEntry>,
}

impl ZipBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: &str, bytes: &[u8]) {
        self.entries.push(ArchiveEntry {
            name: name.to_string(),
            bytes: bytes.to_vec(),
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Compress every entry at `level` (clamped to 0..=9) and return the
    /// archive bytes
    pub fn finalize(self, level: u32) -> Result<Vec<u8>, ExportError> {
        let level = level.min(MAX_COMPRESSION_LEVEL);
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(i64::from(level)));

        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for entry in &self.entries {
            writer.start_file(entry.name.as_str(), options.clone())?;
            writer.write_all(&entry.bytes)?;
        }
        let cursor = writer.finish()?;
        Ok(cursor.into_inner())
    }
}

/// DEFLATE-compressed zip archives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZipArchiver {
    level: u32,
}

impl ZipArchiver {
    pub fn new(level: u32) -> Self {
        Self {
            level: level.min(MAX_COMPRESSION_LEVEL),
        }
    }

    pub fn level(&self) -> u32 {
        self.level
    }
}

impl Default for ZipArchiver {
    fn default() -> Self {
        Self::new(DEFAULT_COMPRESSION_LEVEL)
    }
}

impl Archiver for ZipArchiver {
    fn extension(&self) -> &str {
        "zip"
    }

    fn bundle(&self, entries: &[ArchiveEntry]) -> Result<Vec<u8>, ExportError> {
        let mut builder = ZipBuilder::new();
        for entry in entries {
            builder.add(&entry.name, &entry.bytes);
        }
        builder.finalize(self.level)
    }
}
