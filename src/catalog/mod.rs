//! Archive catalog seam.
//!
//! The cache engine only ever reads the catalog: it resolves an
//! [`ArchiveIdentity`] to the archive's file path once per call.
//! [`memory::MemoryCatalog`] is the in-process implementation used by the
//! server binary and tests.

pub mod memory;

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use async_trait::async_trait;

use crate::archive::identity::ArchiveIdentity;
use crate::archive::reader::{count_entries, ArchiveError};

/// Catalog entry for one archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveRecord {
    pub identity: ArchiveIdentity,
    pub path: PathBuf,
    pub page_count: usize,
    pub file_size: u64,
    pub modified: SystemTime,
}

impl ArchiveRecord {
    /// Build a record by inspecting the archive at `path`.
    pub fn from_path(path: &Path) -> Result<Self, ArchiveError> {
        let page_count = count_entries(path)?;
        let meta = std::fs::metadata(path)?;

        Ok(Self {
            identity: ArchiveIdentity::from_path(path),
            path: path.to_path_buf(),
            page_count,
            file_size: meta.len(),
            modified: meta.modified()?,
        })
    }
}

/// Read-only lookup of archives by identity.
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn lookup(&self, identity: &ArchiveIdentity) -> Option<ArchiveRecord>;
}
