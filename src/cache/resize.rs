//! Resize pipeline for page images.
//!
//! Every cached page is decoded (JPEG or PNG), resampled with Lanczos3 and
//! re-encoded as JPEG at one configured quality, whatever the source format.

use std::io::Read;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;

use crate::error::PageError;

/// Extension shared by all cache entries.
pub const OUTPUT_EXTENSION: &str = "jpg";

/// Target dimensions after tie-break resolution. 0 means "auto on this axis".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ResolvedSize {
    pub height: u32,
    pub width: u32,
}

/// Resolve requested max-height/max-width into the size a page is rendered at.
///
/// ```text
/// both nonzero, unequal → the larger becomes 0 (auto), the smaller binds
/// both nonzero, equal   → both kept (bounding box)
/// either zero           → passed through
/// ```
pub fn resolve(max_height: u32, max_width: u32) -> ResolvedSize {
    let (mut height, mut width) = (max_height, max_width);
    if height != 0 && width != 0 {
        if width > height {
            width = 0;
        } else if height > width {
            height = 0;
        }
    }
    ResolvedSize { height, width }
}

/// Output pixel dimensions `(width, height)` for a source image.
///
/// Bounds are upper limits: a page already inside them keeps its source
/// resolution, so no request can make a page larger than it is.
pub fn target_dimensions(src_width: u32, src_height: u32, size: ResolvedSize) -> (u32, u32) {
    if src_width == 0 || src_height == 0 {
        return (src_width, src_height);
    }
    let source = (src_width, src_height);

    match (size.width, size.height) {
        (0, 0) => source,
        (width, 0) if width >= src_width => source,
        (width, 0) => (width, scale(src_height, width, src_width)),
        (0, height) if height >= src_height => source,
        (0, height) => (scale(src_width, height, src_height), height),
        (width, height) if src_width <= width && src_height <= height => source,
        (width, height) => {
            // Fit inside the box, whichever axis binds first.
            let by_width = scale(src_height, width, src_width);
            if by_width <= height {
                (width, by_width)
            } else {
                (scale(src_width, height, src_height), height)
            }
        }
    }
}

/// `value * num / den`, rounded, never below 1.
fn scale(value: u32, num: u32, den: u32) -> u32 {
    let scaled = (value as u64 * num as u64 + den as u64 / 2) / den as u64;
    scaled.clamp(1, u32::MAX as u64) as u32
}

/// Renders decoded pages at a resolved size and encodes them as JPEG.
#[derive(Debug, Clone, Copy)]
pub struct ResizePolicy {
    quality: u8,
}

impl ResizePolicy {
    /// `quality` is clamped into the encoder's 1-100 range.
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Decode a page image from a stream.
    pub fn decode(mut reader: impl Read) -> Result<DynamicImage, PageError> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        image::load_from_memory(&bytes).map_err(PageError::Decode)
    }

    /// Resize `image` to `size` and encode it.
    pub fn render_and_encode(
        &self,
        image: &DynamicImage,
        size: ResolvedSize,
    ) -> Result<Vec<u8>, PageError> {
        let (width, height) = target_dimensions(image.width(), image.height(), size);

        let rgb = if (width, height) == (image.width(), image.height()) {
            image.to_rgb8()
        } else {
            image.resize_exact(width, height, FilterType::Lanczos3).to_rgb8()
        };

        let mut out = Vec::new();
        JpegEncoder::new_with_quality(&mut out, self.quality)
            .encode_image(&rgb)
            .map_err(PageError::Encode)?;
        Ok(out)
    }

    /// Decode, resize and encode in one step.
    pub fn render_page(&self, reader: impl Read, size: ResolvedSize) -> Result<Vec<u8>, PageError> {
        let image = Self::decode(reader)?;
        self.render_and_encode(&image, size)
    }
}
