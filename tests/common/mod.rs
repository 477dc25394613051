//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::fs::File;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use comic_page_cache::archive::identity::ArchiveIdentity;
use comic_page_cache::cache::pages::PageService;
use comic_page_cache::catalog::memory::MemoryCatalog;
use comic_page_cache::config::Config;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub fn png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 64]));
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

/// A zip of `count` PNG pages of the given size, stored uncompressed.
pub fn comic(dir: &Path, name: &str, count: usize, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    let mut zip = ZipWriter::new(File::create(&path).unwrap());
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let page = png(width, height);

    for i in 0..count {
        zip.start_file(format!("{i:03}.png"), options).unwrap();
        zip.write_all(&page).unwrap();
    }
    zip.finish().unwrap();
    path
}

pub fn config(root: &Path, prefetch: bool) -> Config {
    let mut config = Config::with_root(root);
    config.prefetch.enabled = prefetch;
    config.thumbnail.width = 32;
    config
}

/// A page service over a fresh catalog holding `archives`.
pub async fn service<P: AsRef<Path>>(
    config: Config,
    archives: &[P],
) -> (PageService, Vec<ArchiveIdentity>) {
    let catalog = Arc::new(MemoryCatalog::new());
    let mut ids = Vec::new();
    for archive in archives {
        ids.push(catalog.register(archive.as_ref()).await.unwrap().identity);
    }
    (PageService::new(Arc::new(config), catalog).unwrap(), ids)
}
