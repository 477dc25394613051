//! Archive identities.
//!
//! An identity is the lowercase hex SHA-256 of the archive's path. It names
//! the archive's cache directory, so anything arriving from a client is
//! validated before it is allowed near the filesystem.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Longest identity accepted from outside the process.
const MAX_IDENTITY_LEN: usize = 128;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid archive identity: {0:?}")]
pub struct InvalidIdentity(pub String);

/// Stable opaque key naming one archive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArchiveIdentity(String);

impl ArchiveIdentity {
    /// Derive the identity of the archive stored at `path`.
    pub fn from_path(path: &Path) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(path.to_string_lossy().as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for ArchiveIdentity {
    type Err = InvalidIdentity;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let valid = !raw.is_empty()
            && raw.len() <= MAX_IDENTITY_LEN
            && raw
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
        if valid {
            Ok(Self(raw.to_string()))
        } else {
            Err(InvalidIdentity(raw.to_string()))
        }
    }
}

impl fmt::Display for ArchiveIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_stability() {
        let a = ArchiveIdentity::from_path(Path::new("/library/vol01.zip"));
        let b = ArchiveIdentity::from_path(Path::new("/library/vol01.zip"));
        assert_eq!(a, b);
    }

    #[test]
    fn test_identity_differs_by_path() {
        let a = ArchiveIdentity::from_path(Path::new("/library/vol01.zip"));
        let b = ArchiveIdentity::from_path(Path::new("/library/vol02.zip"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_identity_format() {
        let id = ArchiveIdentity::from_path(Path::new("/library/vol01.zip"));
        assert_eq!(id.as_str().len(), 64);
        assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        let parsed: ArchiveIdentity = id.as_str().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_parse_rejects_path_components() {
        assert!("../etc".parse::<ArchiveIdentity>().is_err());
        assert!("a/b".parse::<ArchiveIdentity>().is_err());
        assert!("".parse::<ArchiveIdentity>().is_err());
        assert!("x".repeat(129).parse::<ArchiveIdentity>().is_err());
    }
}
