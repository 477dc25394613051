//! Read-only access to page archives.
//!
//! - [`identity`]: ArchiveIdentity, the stable path-derived key naming an archive
//! - [`reader`]: ordered, index-addressable entries of a zip container

pub mod identity;
pub mod reader;

#[cfg(test)]
pub(crate) mod fixtures;
