//! Eviction policy: bounds the cache by the number of archive directories.
//!
//! Each subdirectory of the cache root holds every cached render of one
//! archive. Writing a page updates its directory's mtime, so directory mtime
//! is the freshness signal:
//! - rank directories most recently modified first
//! - keep the first `max_directories`
//! - remove the rest recursively, one directory at a time

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

use tokio::fs;
use tracing::{debug, info, warn};

use crate::cache::stats::CacheStats;

/// A per-archive cache directory considered for eviction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvictionCandidate {
    pub path: PathBuf,
    pub modified: SystemTime,
}

/// Outcome of one sweep.
#[derive(Debug, Default)]
pub struct SweepReport {
    pub kept: usize,
    pub removed: Vec<PathBuf>,
    pub failed: Vec<PathBuf>,
}

/// The eviction sweep over a cache root.
pub struct CacheEvictor {
    root: PathBuf,
    stats: Arc<CacheStats>,
}

impl CacheEvictor {
    pub fn new(root: PathBuf, stats: Arc<CacheStats>) -> Self {
        Self { root, stats }
    }

    /// Immediate subdirectories of the cache root, freshest first.
    pub async fn candidates(&self) -> io::Result<Vec<EvictionCandidate>> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err),
        };

        let mut candidates = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let meta = match entry.metadata().await {
                Ok(meta) => meta,
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "Skipping unreadable cache entry");
                    continue;
                }
            };
            if !meta.is_dir() {
                continue;
            }
            let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            candidates.push(EvictionCandidate { path, modified });
        }

        candidates.sort_by(|a, b| {
            b.modified
                .cmp(&a.modified)
                .then_with(|| a.path.cmp(&b.path))
        });
        Ok(candidates)
    }

    /// Split ranked candidates into (kept, victims).
    pub fn select_victims(
        candidates: &[EvictionCandidate],
        max_directories: usize,
    ) -> (&[EvictionCandidate], &[EvictionCandidate]) {
        candidates.split_at(max_directories.min(candidates.len()))
    }

    /// Delete every archive directory ranked beyond `max_directories`.
    ///
    /// A directory that cannot be removed is logged and left for the next
    /// sweep; the remaining victims are still processed.
    pub async fn sweep(&self, max_directories: usize) -> io::Result<SweepReport> {
        let candidates = self.candidates().await?;
        let (kept, victims) = Self::select_victims(&candidates, max_directories);

        let mut report = SweepReport {
            kept: kept.len(),
            ..Default::default()
        };

        for victim in victims {
            match fs::remove_dir_all(&victim.path).await {
                Ok(()) => {
                    debug!(path = %victim.path.display(), "Evicted archive cache");
                    report.removed.push(victim.path.clone());
                }
                Err(err) => {
                    warn!(
                        path = %victim.path.display(),
                        error = %err,
                        "Failed to evict archive cache"
                    );
                    report.failed.push(victim.path.clone());
                }
            }
        }

        self.stats.record_evicted(report.removed.len());
        if !victims.is_empty() {
            info!(
                kept = report.kept,
                removed = report.removed.len(),
                failed = report.failed.len(),
                "Eviction sweep complete"
            );
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn make_dir(root: &std::path::Path, name: &str, age_secs: u64) -> PathBuf {
        let dir = root.join(name);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("0_0_800.jpg"), b"page").unwrap();
        let modified = SystemTime::now() - Duration::from_secs(age_secs);
        std::fs::File::open(&dir).unwrap().set_modified(modified).unwrap();
        dir
    }

    #[tokio::test]
    async fn test_candidates_ranked_freshest_first() {
        let tmp = TempDir::new().unwrap();
        make_dir(tmp.path(), "old", 300);
        make_dir(tmp.path(), "new", 10);
        make_dir(tmp.path(), "mid", 100);
        std::fs::write(tmp.path().join("stray.txt"), b"not a directory").unwrap();

        let evictor = CacheEvictor::new(tmp.path().to_path_buf(), Arc::default());
        let names: Vec<_> = evictor
            .candidates()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["new", "mid", "old"]);
    }

    #[tokio::test]
    async fn test_sweep_under_limit_keeps_everything() {
        let tmp = TempDir::new().unwrap();
        make_dir(tmp.path(), "a", 10);
        make_dir(tmp.path(), "b", 20);

        let evictor = CacheEvictor::new(tmp.path().to_path_buf(), Arc::default());
        let report = evictor.sweep(5).await.unwrap();
        assert_eq!(report.kept, 2);
        assert!(report.removed.is_empty());
    }

    #[tokio::test]
    async fn test_sweep_missing_root_is_empty() {
        let tmp = TempDir::new().unwrap();
        let evictor = CacheEvictor::new(tmp.path().join("absent"), Arc::default());
        let report = evictor.sweep(1).await.unwrap();
        assert_eq!(report.kept, 0);
        assert!(report.removed.is_empty());
    }

    #[tokio::test]
    async fn test_sweep_zero_removes_all() {
        let tmp = TempDir::new().unwrap();
        make_dir(tmp.path(), "a", 10);
        make_dir(tmp.path(), "b", 20);

        let stats = Arc::new(CacheStats::default());
        let evictor = CacheEvictor::new(tmp.path().to_path_buf(), stats.clone());
        let report = evictor.sweep(0).await.unwrap();
        assert_eq!(report.removed.len(), 2);
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
        assert_eq!(stats.snapshot().directories_evicted, 2);
    }
}
