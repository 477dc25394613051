//! Archive fixtures for unit tests.

use std::fs::File;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub(crate) enum FixtureEntry<'a> {
    Dir(&'a str),
    Png(&'a str, u32, u32),
    Jpeg(&'a str, u32, u32),
    Raw(&'a str, &'a [u8]),
}

pub(crate) fn image_bytes(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 128]));
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), format)
        .unwrap();
    buf
}

pub(crate) fn write_archive(dir: &Path, name: &str, entries: &[FixtureEntry<'_>]) -> PathBuf {
    let path = dir.join(name);
    let mut zip = ZipWriter::new(File::create(&path).unwrap());
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

    for entry in entries {
        match entry {
            FixtureEntry::Dir(name) => zip.add_directory(*name, options).unwrap(),
            FixtureEntry::Png(name, w, h) => {
                zip.start_file(*name, options).unwrap();
                zip.write_all(&image_bytes(*w, *h, ImageFormat::Png)).unwrap();
            }
            FixtureEntry::Jpeg(name, w, h) => {
                zip.start_file(*name, options).unwrap();
                zip.write_all(&image_bytes(*w, *h, ImageFormat::Jpeg)).unwrap();
            }
            FixtureEntry::Raw(name, data) => {
                zip.start_file(*name, options).unwrap();
                zip.write_all(data).unwrap();
            }
        }
    }

    zip.finish().unwrap();
    path
}

/// An archive of `count` PNG pages, no directory entries.
pub(crate) fn write_pages(
    dir: &Path,
    name: &str,
    count: usize,
    width: u32,
    height: u32,
) -> PathBuf {
    let names: Vec<String> = (0..count).map(|i| format!("{i:03}.png")).collect();
    let entries: Vec<FixtureEntry<'_>> = names
        .iter()
        .map(|n| FixtureEntry::Png(n.as_str(), width, height))
        .collect();
    write_archive(dir, name, &entries)
}
