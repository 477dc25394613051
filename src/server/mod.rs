//! HTTP server exposing the page cache.
//!
//! - [`api`]: Request/response types and route handlers

pub mod api;
