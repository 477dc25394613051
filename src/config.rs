//! Runtime configuration for comic-page-cache.
//!
//! Configuration is loaded from a JSON file or constructed programmatically.
//! Cache location, encode quality, prefetch depth and eviction bounds live here.

use std::path::{Path, PathBuf};

use clap::Parser;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Command-line arguments.
#[derive(Parser, Debug, Clone)]
#[command(name = "comic-page-cache", about = "Page extraction cache server for comic archives")]
pub struct Cli {
    /// Path to configuration file (JSON).
    #[arg(short, long, default_value = "config.json")]
    pub config: PathBuf,

    /// HTTP listen address (overrides the config file).
    #[arg(long)]
    pub listen: Option<String>,

    /// Archives to register in the catalog at startup.
    #[arg(short, long = "archive")]
    pub archives: Vec<PathBuf>,

    /// Enable verbose logging.
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines.
    #[arg(long)]
    pub log_json: bool,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,

    /// Page cache settings.
    pub cache: CacheConfig,

    /// Prefetching settings.
    pub prefetch: PrefetchConfig,

    /// Eviction schedule.
    pub eviction: EvictionConfig,

    /// Thumbnail settings.
    pub thumbnail: ThumbnailConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address (e.g. "0.0.0.0:8080").
    pub listen: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8080".to_string(),
        }
    }
}

/// How extraction batches are serialized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockScope {
    /// One batch at a time across the whole process.
    #[default]
    Global,
    /// One batch at a time per archive.
    PerArchive,
}

/// Page cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Root directory holding one subdirectory per archive.
    pub page_dir: PathBuf,

    /// JPEG quality for cached pages (0-100).
    pub jpeg_quality: u8,

    /// Maximum number of per-archive directories kept after a sweep.
    pub max_directories: usize,

    /// Scope of the extraction lock.
    pub lock_scope: LockScope,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            page_dir: PathBuf::from("_temp/cache"),
            jpeg_quality: 70,
            max_directories: 100,
            lock_scope: LockScope::Global,
        }
    }
}

/// Prefetch strategy settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrefetchConfig {
    /// Enable background extraction of following pages.
    pub enabled: bool,

    /// Number of pages to extract ahead of the requested one.
    pub depth: usize,
}

impl Default for PrefetchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            depth: 4,
        }
    }
}

/// Periodic eviction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvictionConfig {
    /// Seconds between sweeps (0 = never sweep).
    pub interval_secs: u64,
}

impl Default for EvictionConfig {
    fn default() -> Self {
        Self { interval_secs: 600 }
    }
}

/// Thumbnail settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThumbnailConfig {
    /// Directory holding `<identity>.jpg` thumbnails.
    pub dir: PathBuf,

    /// Thumbnail width in pixels; height follows the aspect ratio.
    pub width: u32,

    /// JPEG quality for thumbnails (0-100).
    pub jpeg_quality: u8,

    /// Image served when an archive has no thumbnail.
    pub default_image: PathBuf,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("_temp/thumbnail"),
            width: 512,
            jpeg_quality: 70,
            default_image: PathBuf::from("assets/noimage.jpg"),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file, falling back to defaults for missing fields.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let data = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&data)?;
            config.validate()?;
            Ok(config)
        } else {
            tracing::warn!("Config file not found at {:?}, using defaults", path);
            Ok(Config::default())
        }
    }

    /// Configuration rooted at `root`, for embedding and tests.
    pub fn with_root(root: &Path) -> Self {
        let mut config = Config::default();
        config.cache.page_dir = root.join("cache");
        config.thumbnail.dir = root.join("thumbnail");
        config
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache.page_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("cache.page_dir is empty".into()));
        }
        if self.cache.jpeg_quality > 100 {
            return Err(ConfigError::Invalid(format!(
                "cache.jpeg_quality {} exceeds 100",
                self.cache.jpeg_quality
            )));
        }
        if self.thumbnail.jpeg_quality > 100 {
            return Err(ConfigError::Invalid(format!(
                "thumbnail.jpeg_quality {} exceeds 100",
                self.thumbnail.jpeg_quality
            )));
        }
        if self.thumbnail.width == 0 {
            return Err(ConfigError::Invalid("thumbnail.width must be nonzero".into()));
        }
        Ok(())
    }
}
