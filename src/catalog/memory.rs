//! In-memory catalog.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::info;

use crate::archive::identity::ArchiveIdentity;
use crate::catalog::{ArchiveRecord, Catalog};
use crate::error::PageError;

#[derive(Default)]
pub struct MemoryCatalog {
    records: RwLock<HashMap<ArchiveIdentity, ArchiveRecord>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a record.
    pub async fn insert(&self, record: ArchiveRecord) {
        self.records
            .write()
            .await
            .insert(record.identity.clone(), record);
    }

    /// Inspect the archive at `path` and add it to the catalog.
    pub async fn register(&self, path: &Path) -> Result<ArchiveRecord, PageError> {
        let owned = path.to_path_buf();
        let record = tokio::task::spawn_blocking(move || ArchiveRecord::from_path(&owned)).await??;

        info!(
            archive = %record.identity,
            path = %record.path.display(),
            pages = record.page_count,
            bytes = record.file_size,
            "Registered archive"
        );

        self.insert(record.clone()).await;
        Ok(record)
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl Catalog for MemoryCatalog {
    async fn lookup(&self, identity: &ArchiveIdentity) -> Option<ArchiveRecord> {
        self.records.read().await.get(identity).cloned()
    }
}
