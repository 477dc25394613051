//! Prefetching: after a page is served, extract the next few pages in the
//! background so sequential reading hits the cache.
//!
//! Prefetch jobs go through the same [`ExtractionCoordinator`] gate as
//! synchronous requests. Their failures are logged and never reach the
//! reader whose request triggered them.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::archive::identity::ArchiveIdentity;
use crate::cache::coordinator::{BatchOutcome, ExtractionCoordinator};
use crate::cache::key::ExtractionJob;
use crate::config::PrefetchConfig;

/// The prefetcher decides which pages to warm and launches the work.
pub struct Prefetcher {
    coordinator: Arc<ExtractionCoordinator>,
    config: PrefetchConfig,
}

impl Prefetcher {
    pub fn new(coordinator: Arc<ExtractionCoordinator>, config: PrefetchConfig) -> Self {
        Self { coordinator, config }
    }

    /// The job covering `[index + 1, index + 1 + depth)` at the requested size.
    pub fn lookahead(
        &self,
        archive: &ArchiveIdentity,
        index: usize,
        max_height: u32,
        max_width: u32,
    ) -> Option<ExtractionJob> {
        if !self.config.enabled || self.config.depth == 0 {
            return None;
        }
        Some(ExtractionJob::new(
            archive.clone(),
            index.saturating_add(1),
            self.config.depth,
            max_height,
            max_width,
        ))
    }

    /// Launch the lookahead job on a detached task.
    ///
    /// The handle is only for callers that want to wait; dropping it leaves
    /// the task running to completion.
    pub fn schedule(
        &self,
        archive: &ArchiveIdentity,
        index: usize,
        max_height: u32,
        max_width: u32,
    ) -> Option<JoinHandle<()>> {
        let job = self.lookahead(archive, index, max_height, max_width)?;
        let coordinator = self.coordinator.clone();

        Some(tokio::spawn(async move {
            let archive = job.archive.clone();
            let start = job.start;
            match coordinator.run(job).await {
                Ok(BatchOutcome::Completed(report)) => {
                    debug!(%archive, start, created = report.created, "Prefetch finished");
                }
                Ok(BatchOutcome::AlreadyRunning) => {
                    debug!(%archive, start, "Prefetch already in flight");
                }
                Err(err) => {
                    warn!(%archive, start, error = %err, "Prefetch failed");
                }
            }
        }))
    }
}
