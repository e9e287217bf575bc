//! In-memory RGBA rasters and canvas normalisation.

use crate::result::{VisregError, VisregResult};
use image::RgbaImage;
use std::borrow::Cow;

/// Bytes per RGBA pixel
pub const CHANNELS: usize = 4;

/// Row-major RGBA8 pixel buffer
///
/// Invariant: `data.len() == width * height * 4`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl RasterImage {
    /// Wrap an existing buffer, checking its length
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> VisregResult<Self> {
        let expected = buffer_len(width, height);
        if data.len() != expected {
            return Err(VisregError::DimensionMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Fully transparent raster
    #[must_use]
    pub fn transparent(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; buffer_len(width, height)],
        }
    }

    /// Raster filled with one colour
    #[must_use]
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let data = rgba
            .iter()
            .copied()
            .cycle()
            .take(buffer_len(width, height))
            .collect();
        Self {
            width,
            height,
            data,
        }
    }

    /// Width in pixels
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// `(width, height)`
    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Number of pixels
    #[must_use]
    pub fn pixel_count(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Raw RGBA bytes
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consume into raw RGBA bytes
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Pixel at `(x, y)`, if in bounds
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * CHANNELS;
        Some([
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ])
    }

    /// Overwrite the pixel at `(x, y)`; out-of-bounds writes are ignored
    pub fn put_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let i = (y as usize * self.width as usize + x as usize) * CHANNELS;
        self.data[i..i + CHANNELS].copy_from_slice(&rgba);
    }
}

impl From<RgbaImage> for RasterImage {
    fn from(img: RgbaImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            data: img.into_raw(),
        }
    }
}

impl From<RasterImage> for RgbaImage {
    fn from(raster: RasterImage) -> Self {
        let (width, height) = raster.dimensions();
        // The length invariant matches what `from_raw` checks.
        Self::from_raw(width, height, raster.data)
            .unwrap_or_else(|| Self::new(width, height))
    }
}

fn buffer_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * CHANNELS
}

/// Canvas both images of a comparison are padded to
#[must_use]
pub fn target_size(a: &RasterImage, b: &RasterImage) -> (u32, u32) {
    (a.width.max(b.width), a.height.max(b.height))
}

/// Fit `image` onto a `width x height` canvas
///
/// Returns the image itself when it already has that size. Otherwise the
/// pixels are copied to the top-left of a transparent canvas; rows or
/// columns beyond the target are dropped.
#[must_use]
pub fn normalize(image: &RasterImage, width: u32, height: u32) -> Cow<'_, RasterImage> {
    if image.dimensions() == (width, height) {
        return Cow::Borrowed(image);
    }

    let mut canvas = RasterImage::transparent(width, height);
    let copy_width = image.width.min(width) as usize * CHANNELS;
    let src_stride = image.width as usize * CHANNELS;
    let dst_stride = width as usize * CHANNELS;

    for row in 0..image.height.min(height) as usize {
        let src = &image.data[row * src_stride..row * src_stride + copy_width];
        canvas.data[row * dst_stride..row * dst_stride + copy_width].copy_from_slice(src);
    }

    Cow::Owned(canvas)
}
