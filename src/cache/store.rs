//! On-disk page cache layout.
//!
//! ```text
//! <root>/<archive identity>/<index>_<height>_<width>.jpg
//! ```
//!
//! Entries are only ever created (atomically, via rename) or removed together
//! with their archive directory by the evictor.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;
use uuid::Uuid;

use crate::archive::identity::ArchiveIdentity;
use crate::cache::key::PageKey;

pub struct PageCacheStore {
    /// Cache root; one subdirectory per archive.
    root: PathBuf,
}

impl PageCacheStore {
    /// Create a store rooted at `root`, creating the directory if needed.
    pub fn open(root: PathBuf) -> io::Result<Self> {
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn archive_dir(&self, archive: &ArchiveIdentity) -> PathBuf {
        self.root.join(archive.as_str())
    }

    /// Where `key` lives, without touching the filesystem.
    pub fn locate(&self, key: &PageKey) -> PathBuf {
        self.archive_dir(&key.archive).join(key.file_name())
    }

    /// Where `key` lives, creating the archive directory on first use.
    pub fn path_for(&self, key: &PageKey) -> io::Result<PathBuf> {
        let dir = self.archive_dir(&key.archive);
        fs::create_dir_all(&dir)?;
        Ok(dir.join(key.file_name()))
    }

    pub fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }
}

/// Write `data` to `path` so readers never observe a partial file.
pub fn write_atomic(path: &Path, data: &[u8]) -> io::Result<()> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "cache path has no file name"))?;
    let tmp = path.with_file_name(format!(".{file_name}.{}.tmp", Uuid::new_v4().simple()));

    if let Err(err) = fs::write(&tmp, data).and_then(|()| fs::rename(&tmp, path)) {
        let _ = fs::remove_file(&tmp);
        return Err(err);
    }

    debug!(path = %path.display(), size = data.len(), "Wrote cache entry");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn key(index: usize) -> PageKey {
        PageKey::new(ArchiveIdentity::from_path(Path::new("/library/a.zip")), index, 0, 800)
    }

    #[test]
    fn test_path_for_is_deterministic_and_idempotent() {
        let tmp = TempDir::new().unwrap();
        let store = PageCacheStore::open(tmp.path().join("cache")).unwrap();

        let first = store.path_for(&key(3)).unwrap();
        let second = store.path_for(&key(3)).unwrap();
        assert_eq!(first, second);
        assert!(first.parent().unwrap().is_dir());
        assert!(first.ends_with("3_0_800.jpg"));
        // Directory only; the entry itself is not created.
        assert!(!store.exists(&first));
    }

    #[test]
    fn test_locate_does_not_create_directory() {
        let tmp = TempDir::new().unwrap();
        let store = PageCacheStore::open(tmp.path().join("cache")).unwrap();

        let path = store.locate(&key(0));
        assert!(!path.parent().unwrap().exists());
        assert_eq!(path, store.path_for(&key(0)).unwrap());
    }

    #[test]
    fn test_write_atomic() {
        let tmp = TempDir::new().unwrap();
        let store = PageCacheStore::open(tmp.path().join("cache")).unwrap();
        let path = store.path_for(&key(1)).unwrap();

        write_atomic(&path, b"jpeg bytes").unwrap();
        assert!(store.exists(&path));
        assert_eq!(fs::read(&path).unwrap(), b"jpeg bytes");

        // No temp files left behind.
        let names: Vec<_> = fs::read_dir(path.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names.len(), 1);
    }
}
