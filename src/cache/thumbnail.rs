//! Cover thumbnails: the first content entry of an archive, scaled to a
//! fixed width and stored as `<dir>/<identity>.jpg`.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::archive::identity::ArchiveIdentity;
use crate::archive::reader::ArchiveReader;
use crate::cache::resize::{ResizePolicy, ResolvedSize, OUTPUT_EXTENSION};
use crate::cache::store::write_atomic;
use crate::catalog::ArchiveRecord;
use crate::config::ThumbnailConfig;
use crate::error::PageError;

pub struct ThumbnailStore {
    dir: PathBuf,
    width: u32,
    policy: ResizePolicy,
    default_image: PathBuf,
}

impl ThumbnailStore {
    pub fn new(config: &ThumbnailConfig) -> Self {
        Self {
            dir: config.dir.clone(),
            width: config.width,
            policy: ResizePolicy::new(config.jpeg_quality),
            default_image: config.default_image.clone(),
        }
    }

    pub fn path_for(&self, archive: &ArchiveIdentity) -> PathBuf {
        self.dir.join(format!("{archive}.{OUTPUT_EXTENSION}"))
    }

    /// The archive's thumbnail, if it has been created.
    pub async fn existing(&self, archive: &ArchiveIdentity) -> Option<PathBuf> {
        let path = self.path_for(archive);
        match tokio::fs::try_exists(&path).await {
            Ok(true) => Some(path),
            _ => None,
        }
    }

    /// The archive's thumbnail if one exists, otherwise the default image.
    pub async fn path_or_default(&self, archive: &ArchiveIdentity) -> PathBuf {
        self.existing(archive)
            .await
            .unwrap_or_else(|| self.default_image.clone())
    }

    /// Render the thumbnail for `record`. Blocking.
    ///
    /// Returns `None` when the archive has no content entries. An existing
    /// thumbnail is kept as is.
    pub fn create(&self, record: &ArchiveRecord) -> Result<Option<PathBuf>, PageError> {
        let path = self.path_for(&record.identity);
        if path.is_file() {
            return Ok(Some(path));
        }

        let mut reader = ArchiveReader::open(&record.path)?;
        let Some(index) = reader.first_content_index()? else {
            return Ok(None);
        };

        let entry = reader.entry_at(index)?;
        let size = ResolvedSize {
            height: 0,
            width: self.width,
        };
        let encoded = self.policy.render_page(entry, size)?;

        std::fs::create_dir_all(&self.dir)?;
        write_atomic(&path, &encoded)?;
        debug!(archive = %record.identity, path = %path.display(), "Created thumbnail");
        Ok(Some(path))
    }
}
