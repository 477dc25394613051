//! Extraction coordinator: the single-flight gate in front of batch extraction.
//!
//! ```text
//! run(job)
//!   claim signature ──(already claimed)──▶ AlreadyRunning, no filesystem access
//!        │
//!   acquire lock (global, or per archive)
//!        │
//!   extract_batch on the blocking pool
//!        │
//!   release lock, release claim
//! ```
//!
//! The claim is a check-and-insert on one set, so two identical requests can
//! never both get past it. Distinct requests queue on the lock.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Instant;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::archive::identity::ArchiveIdentity;
use crate::archive::reader::ArchiveReader;
use crate::cache::key::ExtractionJob;
use crate::cache::resize::ResizePolicy;
use crate::cache::stats::CacheStats;
use crate::cache::store::{write_atomic, PageCacheStore};
use crate::catalog::{ArchiveRecord, Catalog};
use crate::config::LockScope;
use crate::error::PageError;

/// A page that could not be extracted; the rest of its batch carried on.
#[derive(Debug)]
pub struct EntryFailure {
    pub index: usize,
    pub error: PageError,
}

/// Result of one batch extraction.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Newly written cache entries.
    pub created: usize,
    /// Entries in the archive, directories included.
    pub entry_count: usize,
    pub failures: Vec<EntryFailure>,
}

impl BatchReport {
    /// Remove and return the failure recorded for `index`.
    pub fn take_failure(&mut self, index: usize) -> Option<PageError> {
        let pos = self.failures.iter().position(|f| f.index == index)?;
        Some(self.failures.swap_remove(pos).error)
    }
}

#[derive(Debug)]
pub enum BatchOutcome {
    Completed(BatchReport),
    /// An identical job was already in flight; nothing was done.
    AlreadyRunning,
}

/// Releases its signature when dropped, on every exit path.
pub(crate) struct InFlightClaim {
    in_flight: Arc<StdMutex<HashSet<String>>>,
    signature: String,
}

impl Drop for InFlightClaim {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&self.signature);
    }
}

pub struct ExtractionCoordinator {
    catalog: Arc<dyn Catalog>,
    store: Arc<PageCacheStore>,
    policy: ResizePolicy,
    scope: LockScope,

    /// Serializes batches when `scope` is global.
    global_lock: Arc<Mutex<()>>,

    /// Lazily created locks when `scope` is per-archive.
    archive_locks: StdMutex<HashMap<ArchiveIdentity, Arc<Mutex<()>>>>,

    /// Signatures of queued or running jobs.
    in_flight: Arc<StdMutex<HashSet<String>>>,

    stats: Arc<CacheStats>,
}

impl ExtractionCoordinator {
    pub fn new(
        catalog: Arc<dyn Catalog>,
        store: Arc<PageCacheStore>,
        policy: ResizePolicy,
        scope: LockScope,
        stats: Arc<CacheStats>,
    ) -> Self {
        Self {
            catalog,
            store,
            policy,
            scope,
            global_lock: Arc::new(Mutex::new(())),
            archive_locks: StdMutex::new(HashMap::new()),
            in_flight: Arc::new(StdMutex::new(HashSet::new())),
            stats,
        }
    }

    pub fn store(&self) -> &Arc<PageCacheStore> {
        &self.store
    }

    /// Number of jobs queued or running.
    pub fn in_flight(&self) -> usize {
        self.in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Run `job` unless an identical job is already in flight.
    ///
    /// Blocks until the extraction lock is free. Catalog misses and archive
    /// open failures abort the job; per-page failures are collected in the
    /// report.
    ///
    /// Once the batch starts, the claim and the lock belong to the blocking
    /// task. Dropping this future does not stop the batch, and neither is
    /// released until the batch ends.
    pub async fn run(&self, job: ExtractionJob) -> Result<BatchOutcome, PageError> {
        let signature = job.signature();
        let Some(claim) = self.claim(signature) else {
            debug!(signature = %job.signature(), "Extraction already in flight, skipping");
            self.stats.record_rejected();
            return Ok(BatchOutcome::AlreadyRunning);
        };

        let guard = self.lock_for(&job.archive).lock_owned().await;

        let record = self
            .catalog
            .lookup(&job.archive)
            .await
            .ok_or_else(|| PageError::UnknownArchive(job.archive.clone()))?;

        let store = self.store.clone();
        let policy = self.policy;
        let stats = self.stats.clone();
        let report = tokio::task::spawn_blocking(move || {
            let _claim = claim;
            let _guard = guard;
            let report = extract_batch(&store, &policy, &record, &job)?;
            stats.record_batch(report.created);
            Ok::<_, PageError>(report)
        })
        .await??;

        Ok(BatchOutcome::Completed(report))
    }

    pub(crate) fn claim(&self, signature: String) -> Option<InFlightClaim> {
        let mut in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if !in_flight.insert(signature.clone()) {
            return None;
        }
        Some(InFlightClaim {
            in_flight: self.in_flight.clone(),
            signature,
        })
    }

    fn lock_for(&self, archive: &ArchiveIdentity) -> Arc<Mutex<()>> {
        match self.scope {
            LockScope::Global => self.global_lock.clone(),
            LockScope::PerArchive => self
                .archive_locks
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .entry(archive.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone(),
        }
    }
}

/// Extract, resize and cache every eligible page of `job` from `record`'s archive.
///
/// Entries are visited in ascending index order. Directories and pages that
/// are already cached are skipped; a page that fails to extract is logged and
/// skipped.
pub fn extract_batch(
    store: &PageCacheStore,
    policy: &ResizePolicy,
    record: &ArchiveRecord,
    job: &ExtractionJob,
) -> Result<BatchReport, PageError> {
    let started = Instant::now();
    let mut reader = ArchiveReader::open(&record.path)?;
    let entry_count = reader.entry_count();
    let size = job.size();

    let mut report = BatchReport {
        entry_count,
        ..Default::default()
    };

    for index in job.range(entry_count) {
        let key = job.key(index);
        let result = reader
            .entry_at(index)
            .map_err(PageError::from)
            .and_then(|entry| {
                if entry.is_directory() {
                    return Ok(false);
                }
                let path = store.path_for(&key)?;
                if store.exists(&path) {
                    return Ok(false);
                }
                let encoded = policy.render_page(entry, size)?;
                write_atomic(&path, &encoded)?;
                Ok(true)
            });

        match result {
            Ok(true) => {
                report.created += 1;
                debug!(archive = %job.archive, index, "Extracted page");
            }
            Ok(false) => {}
            Err(error) => {
                warn!(archive = %job.archive, index, error = %error, "Failed to extract page");
                report.failures.push(EntryFailure { index, error });
            }
        }
    }

    info!(
        archive = %job.archive,
        start = job.start,
        limit = job.limit,
        created = report.created,
        failed = report.failures.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Extraction batch finished"
    );

    Ok(report)
}
