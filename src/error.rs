//! Crate-level error taxonomy for page serving.

use std::path::PathBuf;

use thiserror::Error;

use crate::archive::identity::ArchiveIdentity;
use crate::archive::reader::ArchiveError;

#[derive(Error, Debug)]
pub enum PageError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("corrupt archive {path}: {source}")]
    CorruptArchive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("failed to decode page image: {0}")]
    Decode(#[source] image::ImageError),

    #[error("failed to encode page image: {0}")]
    Encode(#[source] image::ImageError),

    #[error("page {index} out of range (archive has {count} entries)")]
    IndexOutOfRange { index: usize, count: usize },

    #[error("unknown archive: {0}")]
    UnknownArchive(ArchiveIdentity),

    /// An identical extraction is already in flight.
    #[error("extraction already in progress: {0}")]
    Busy(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl PageError {
    /// Whether the same request may succeed if retried later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PageError::Busy(_))
    }

    /// Whether the request can never succeed as issued.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            PageError::NotFound(_)
                | PageError::IndexOutOfRange { .. }
                | PageError::UnknownArchive(_)
                | PageError::CorruptArchive { .. }
                | PageError::Decode(_)
        )
    }
}

impl From<ArchiveError> for PageError {
    fn from(err: ArchiveError) -> Self {
        match err {
            ArchiveError::NotFound(path) => {
                PageError::NotFound(format!("archive {}", path.display()))
            }
            ArchiveError::Corrupt { path, source } => PageError::CorruptArchive { path, source },
            ArchiveError::IndexOutOfRange { index, count } => {
                PageError::IndexOutOfRange { index, count }
            }
            ArchiveError::Io(err) => PageError::Io(err),
        }
    }
}
