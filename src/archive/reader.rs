//! Zip-backed archive reader.
//!
//! Entries are exposed in the container's stored order, which is the page
//! order; nothing is sorted or renumbered. Each reader owns its file handle
//! and releases it on drop, so callers open one per operation.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use thiserror::Error;
use zip::result::ZipError;
use zip::ZipArchive;

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("archive not found: {0}")]
    NotFound(PathBuf),

    #[error("corrupt archive {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: ZipError,
    },

    #[error("entry {index} out of range (archive has {count} entries)")]
    IndexOutOfRange { index: usize, count: usize },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// An open archive container.
pub struct ArchiveReader {
    path: PathBuf,
    zip: ZipArchive<File>,
}

/// One entry of an open archive, readable as a byte stream.
pub struct ArchiveEntry<'a> {
    name: String,
    is_directory: bool,
    reader: Box<dyn Read + 'a>,
}

impl ArchiveEntry<'_> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_directory(&self) -> bool {
        self.is_directory
    }
}

impl Read for ArchiveEntry<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

impl ArchiveReader {
    /// Open the container at `path`, reading its central directory.
    pub fn open(path: &Path) -> Result<Self, ArchiveError> {
        let file = File::open(path).map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => ArchiveError::NotFound(path.to_path_buf()),
            _ => ArchiveError::Io(err),
        })?;

        let zip = ZipArchive::new(file).map_err(|source| ArchiveError::Corrupt {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            zip,
        })
    }

    /// Number of entries, directories included.
    pub fn entry_count(&self) -> usize {
        self.zip.len()
    }

    /// Open the entry at `index` for reading.
    pub fn entry_at(&mut self, index: usize) -> Result<ArchiveEntry<'_>, ArchiveError> {
        let count = self.zip.len();
        if index >= count {
            return Err(ArchiveError::IndexOutOfRange { index, count });
        }

        let path = &self.path;
        let file = self
            .zip
            .by_index(index)
            .map_err(|source| ArchiveError::Corrupt {
                path: path.clone(),
                source,
            })?;

        Ok(ArchiveEntry {
            name: file.name().to_string(),
            is_directory: file.is_dir(),
            reader: Box::new(file),
        })
    }

    /// Index of the first non-directory entry, if any.
    pub fn first_content_index(&mut self) -> Result<Option<usize>, ArchiveError> {
        for index in 0..self.entry_count() {
            if !self.entry_at(index)?.is_directory() {
                return Ok(Some(index));
            }
        }
        Ok(None)
    }
}

/// Count the entries of the archive at `path`.
pub fn count_entries(path: &Path) -> Result<usize, ArchiveError> {
    Ok(ArchiveReader::open(path)?.entry_count())
}
