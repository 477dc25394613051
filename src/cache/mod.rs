//! Page extraction cache.
//!
//! This module contains the cache engine:
//! - [`key`]: PageKey and ExtractionJob signatures
//! - [`resize`]: target-size resolution and JPEG re-encoding
//! - [`store`]: on-disk layout `<root>/<archive>/<index>_<height>_<width>.jpg`
//! - [`coordinator`]: single-flight, lock-serialized batch extraction
//! - [`prefetcher`]: background extraction of the following pages
//! - [`evictor`]: directory-granular eviction sweep
//! - [`thumbnail`]: per-archive cover thumbnails
//! - [`pages`]: the page service used by the HTTP layer
//! - [`stats`]: hit/miss/extraction counters

pub mod coordinator;
pub mod evictor;
pub mod key;
pub mod pages;
pub mod prefetcher;
pub mod resize;
pub mod stats;
pub mod store;
pub mod thumbnail;
