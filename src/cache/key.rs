//! Cache addressing and extraction request signatures.

use std::ops::Range;

use crate::archive::identity::ArchiveIdentity;
use crate::cache::resize::{resolve, ResolvedSize, OUTPUT_EXTENSION};

/// Addresses one cached render: (archive, page index, resolved size).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageKey {
    pub archive: ArchiveIdentity,
    pub index: usize,
    pub size: ResolvedSize,
}

impl PageKey {
    /// Key for a request with raw max-height/max-width constraints.
    pub fn new(archive: ArchiveIdentity, index: usize, max_height: u32, max_width: u32) -> Self {
        Self {
            archive,
            index,
            size: resolve(max_height, max_width),
        }
    }

    /// File name inside the archive's cache directory.
    pub fn file_name(&self) -> String {
        format!(
            "{}_{}_{}.{}",
            self.index, self.size.height, self.size.width, OUTPUT_EXTENSION
        )
    }
}

/// A batch extraction request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionJob {
    pub archive: ArchiveIdentity,
    pub start: usize,
    /// Number of entries to cover; 0 means every entry from `start`.
    pub limit: usize,
    pub max_height: u32,
    pub max_width: u32,
}

impl ExtractionJob {
    pub fn new(
        archive: ArchiveIdentity,
        start: usize,
        limit: usize,
        max_height: u32,
        max_width: u32,
    ) -> Self {
        Self {
            archive,
            start,
            limit,
            max_height,
            max_width,
        }
    }

    /// In-flight marker. Two jobs with equal signatures do the same work.
    pub fn signature(&self) -> String {
        format!(
            "{}_{}_{}_{}_{}",
            self.archive, self.start, self.limit, self.max_height, self.max_width
        )
    }

    pub fn size(&self) -> ResolvedSize {
        resolve(self.max_height, self.max_width)
    }

    /// Entry indices covered by this job in an archive of `entry_count` entries.
    pub fn range(&self, entry_count: usize) -> Range<usize> {
        let limit = if self.limit == 0 { entry_count } else { self.limit };
        let end = self.start.saturating_add(limit).min(entry_count);
        self.start.min(end)..end
    }

    pub fn key(&self, index: usize) -> PageKey {
        PageKey {
            archive: self.archive.clone(),
            index,
            size: self.size(),
        }
    }
}
