//! comic-page-cache: on-demand page extraction cache for comic/manga archives.
//!
//! Pages are pulled out of zip containers, resized to the viewer's requested
//! bounds, re-encoded as JPEG and persisted under a per-archive cache directory:
//!   request → cache hit? → (single-flight extraction) → prefetch next pages
//!
//! Cache growth is bounded by a periodic sweep that drops the coldest
//! per-archive directories.

pub mod archive;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;
pub mod server;

pub use error::PageError;
