//! Page service: the entry point the HTTP layer calls.
//!
//! A cache miss on a synchronous request blocks and extracts the single
//! requested page through the coordinator. If the identical request is
//! already in flight the caller gets [`PageError::Busy`] and may retry.
//! Every successful fetch launches a prefetch of the following pages.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use crate::archive::identity::ArchiveIdentity;
use crate::cache::coordinator::{BatchOutcome, ExtractionCoordinator};
use crate::cache::evictor::{CacheEvictor, SweepReport};
use crate::cache::key::{ExtractionJob, PageKey};
use crate::cache::prefetcher::Prefetcher;
use crate::cache::resize::ResizePolicy;
use crate::cache::stats::{CacheStats, CacheStatsSnapshot};
use crate::cache::store::PageCacheStore;
use crate::cache::thumbnail::ThumbnailStore;
use crate::catalog::{ArchiveRecord, Catalog};
use crate::config::Config;
use crate::error::PageError;

pub struct PageService {
    config: Arc<Config>,
    catalog: Arc<dyn Catalog>,
    store: Arc<PageCacheStore>,
    coordinator: Arc<ExtractionCoordinator>,
    prefetcher: Prefetcher,
    evictor: CacheEvictor,
    thumbnails: Arc<ThumbnailStore>,
    stats: Arc<CacheStats>,
}

impl PageService {
    /// Wire the cache engine from `config`, creating the cache root.
    pub fn new(config: Arc<Config>, catalog: Arc<dyn Catalog>) -> io::Result<Self> {
        let stats = Arc::new(CacheStats::default());
        let store = Arc::new(PageCacheStore::open(config.cache.page_dir.clone())?);
        let coordinator = Arc::new(ExtractionCoordinator::new(
            catalog.clone(),
            store.clone(),
            ResizePolicy::new(config.cache.jpeg_quality),
            config.cache.lock_scope,
            stats.clone(),
        ));
        let prefetcher = Prefetcher::new(coordinator.clone(), config.prefetch.clone());
        let evictor = CacheEvictor::new(store.root().to_path_buf(), stats.clone());
        let thumbnails = Arc::new(ThumbnailStore::new(&config.thumbnail));

        Ok(Self {
            config,
            catalog,
            store,
            coordinator,
            prefetcher,
            evictor,
            thumbnails,
            stats,
        })
    }

    pub fn coordinator(&self) -> &Arc<ExtractionCoordinator> {
        &self.coordinator
    }

    pub fn stats(&self) -> CacheStatsSnapshot {
        self.stats.snapshot()
    }

    /// The catalog record for `archive`.
    pub async fn archive(&self, archive: &ArchiveIdentity) -> Result<ArchiveRecord, PageError> {
        self.record(archive).await
    }

    async fn record(&self, archive: &ArchiveIdentity) -> Result<ArchiveRecord, PageError> {
        self.catalog
            .lookup(archive)
            .await
            .ok_or_else(|| PageError::UnknownArchive(archive.clone()))
    }

    pub async fn page_count(&self, archive: &ArchiveIdentity) -> Result<usize, PageError> {
        Ok(self.record(archive).await?.page_count)
    }

    /// Non-blocking check: the cached render's path, if it exists.
    pub async fn cached_page(
        &self,
        archive: &ArchiveIdentity,
        index: usize,
        max_height: u32,
        max_width: u32,
    ) -> Result<Option<PathBuf>, PageError> {
        self.record(archive).await?;
        let path = self
            .store
            .locate(&PageKey::new(archive.clone(), index, max_height, max_width));
        Ok(tokio::fs::try_exists(&path).await?.then_some(path))
    }

    /// Blocking: return the cached render, extracting it first on a miss.
    pub async fn ensure_extracted(
        &self,
        archive: &ArchiveIdentity,
        index: usize,
        max_height: u32,
        max_width: u32,
    ) -> Result<PathBuf, PageError> {
        self.record(archive).await?;
        let path = self
            .store
            .locate(&PageKey::new(archive.clone(), index, max_height, max_width));
        if tokio::fs::try_exists(&path).await? {
            self.stats.record_hit();
            return Ok(path);
        }
        self.stats.record_miss();

        let job = ExtractionJob::new(archive.clone(), index, 1, max_height, max_width);
        let signature = job.signature();
        let mut report = match self.coordinator.run(job).await? {
            BatchOutcome::Completed(report) => report,
            BatchOutcome::AlreadyRunning => return Err(PageError::Busy(signature)),
        };

        if tokio::fs::try_exists(&path).await? {
            return Ok(path);
        }
        if let Some(err) = report.take_failure(index) {
            return Err(err);
        }
        if index >= report.entry_count {
            return Err(PageError::IndexOutOfRange {
                index,
                count: report.entry_count,
            });
        }
        Err(PageError::NotFound(format!(
            "entry {index} of archive {archive} is not a page"
        )))
    }

    /// Serve a page and warm the cache for the ones after it.
    pub async fn get_page_or_extract(
        &self,
        archive: &ArchiveIdentity,
        index: usize,
        max_height: u32,
        max_width: u32,
    ) -> Result<PathBuf, PageError> {
        let path = self
            .ensure_extracted(archive, index, max_height, max_width)
            .await?;
        self.prefetcher
            .schedule(archive, index, max_height, max_width);
        Ok(path)
    }

    pub async fn thumbnail(&self, archive: &ArchiveIdentity) -> Option<PathBuf> {
        self.thumbnails.existing(archive).await
    }

    pub async fn thumbnail_or_default(&self, archive: &ArchiveIdentity) -> PathBuf {
        self.thumbnails.path_or_default(archive).await
    }

    /// Render the archive's thumbnail if it does not exist yet.
    pub async fn create_thumbnail(
        &self,
        archive: &ArchiveIdentity,
    ) -> Result<Option<PathBuf>, PageError> {
        let record = self.record(archive).await?;
        let thumbnails = self.thumbnails.clone();
        tokio::task::spawn_blocking(move || thumbnails.create(&record)).await?
    }

    /// Run one eviction sweep with the configured directory ceiling.
    pub async fn sweep(&self) -> io::Result<SweepReport> {
        self.evictor.sweep(self.config.cache.max_directories).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::fixtures::{write_archive, FixtureEntry};
    use crate::catalog::memory::MemoryCatalog;
    use std::path::Path;
    use tempfile::TempDir;

    async fn service(root: &Path, archive: &Path) -> (PageService, ArchiveIdentity) {
        let mut config = Config::with_root(root);
        config.prefetch.enabled = false;
        let catalog = Arc::new(MemoryCatalog::new());
        let id = catalog.register(archive).await.unwrap().identity;
        (PageService::new(Arc::new(config), catalog).unwrap(), id)
    }

    fn mixed_archive(dir: &Path) -> PathBuf {
        write_archive(
            dir,
            "vol.zip",
            &[
                FixtureEntry::Dir("vol/"),
                FixtureEntry::Png("vol/001.png", 16, 16),
                FixtureEntry::Raw("vol/002.png", b"broken"),
            ],
        )
    }

    #[tokio::test]
    async fn test_miss_then_hit() {
        let tmp = TempDir::new().unwrap();
        let (pages, id) = service(tmp.path(), &mixed_archive(tmp.path())).await;

        assert!(pages.cached_page(&id, 1, 0, 8).await.unwrap().is_none());
        let path = pages.ensure_extracted(&id, 1, 0, 8).await.unwrap();
        assert!(path.ends_with("1_0_8.jpg"));
        assert_eq!(pages.cached_page(&id, 1, 0, 8).await.unwrap(), Some(path.clone()));

        let again = pages.ensure_extracted(&id, 1, 0, 8).await.unwrap();
        assert_eq!(again, path);

        let stats = pages.stats();
        assert_eq!((stats.hits, stats.misses, stats.pages_extracted), (1, 1, 1));
    }

    #[tokio::test]
    async fn test_page_count_and_record() {
        let tmp = TempDir::new().unwrap();
        let archive = mixed_archive(tmp.path());
        let (pages, id) = service(tmp.path(), &archive).await;

        assert_eq!(pages.page_count(&id).await.unwrap(), 3);
        let record = pages.archive(&id).await.unwrap();
        assert_eq!(record.file_size, std::fs::metadata(&archive).unwrap().len());
    }

    #[tokio::test]
    async fn test_directory_entry_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let (pages, id) = service(tmp.path(), &mixed_archive(tmp.path())).await;

        let err = pages.ensure_extracted(&id, 0, 0, 8).await.unwrap_err();
        assert!(matches!(err, PageError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_undecodable_page_surfaces_error() {
        let tmp = TempDir::new().unwrap();
        let (pages, id) = service(tmp.path(), &mixed_archive(tmp.path())).await;

        let err = pages.ensure_extracted(&id, 2, 0, 8).await.unwrap_err();
        assert!(matches!(err, PageError::Decode(_)));
    }

    #[tokio::test]
    async fn test_out_of_range() {
        let tmp = TempDir::new().unwrap();
        let (pages, id) = service(tmp.path(), &mixed_archive(tmp.path())).await;

        let err = pages.ensure_extracted(&id, 7, 0, 8).await.unwrap_err();
        assert!(matches!(err, PageError::IndexOutOfRange { index: 7, count: 3 }));
        assert!(err.is_permanent());
    }

    #[tokio::test]
    async fn test_unknown_archive() {
        let tmp = TempDir::new().unwrap();
        let (pages, _) = service(tmp.path(), &mixed_archive(tmp.path())).await;
        let other = ArchiveIdentity::from_path(Path::new("/elsewhere.zip"));

        assert!(matches!(
            pages.cached_page(&other, 0, 0, 8).await,
            Err(PageError::UnknownArchive(_))
        ));
        assert!(matches!(
            pages.ensure_extracted(&other, 0, 0, 8).await,
            Err(PageError::UnknownArchive(_))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_in_flight_is_busy() {
        let tmp = TempDir::new().unwrap();
        let (pages, id) = service(tmp.path(), &mixed_archive(tmp.path())).await;

        let job = ExtractionJob::new(id.clone(), 1, 1, 0, 8);
        let _claim = pages.coordinator().claim(job.signature()).unwrap();

        let err = pages.ensure_extracted(&id, 1, 0, 8).await.unwrap_err();
        assert!(matches!(err, PageError::Busy(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_thumbnail_falls_back_to_default() {
        let tmp = TempDir::new().unwrap();
        let (pages, id) = service(tmp.path(), &mixed_archive(tmp.path())).await;
        let default = Config::with_root(tmp.path()).thumbnail.default_image;

        assert_eq!(pages.thumbnail_or_default(&id).await, default);
        assert!(pages.thumbnail(&id).await.is_none());
        let created = pages.create_thumbnail(&id).await.unwrap().unwrap();
        assert_eq!(pages.thumbnail_or_default(&id).await, created);
        assert_eq!(pages.thumbnail(&id).await, Some(created));
    }
}
