//! Perceptual pixel comparison.
//!
//! Colour distance is measured in YIQ space, which weights brightness over
//! chroma roughly the way human vision does. Pixels that only differ because
//! of anti-aliasing along an edge are detected and, by default, not counted.

use crate::raster::{RasterImage, CHANNELS};
use crate::result::{VisregError, VisregResult};

/// Largest possible YIQ delta between two pixels
pub const MAX_YIQ_DELTA: f64 = 35215.0;

/// Options for [`diff`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiffOptions {
    /// Per-pixel sensitivity (0.0-1.0); smaller is stricter
    pub threshold: f64,
    /// Count anti-aliased pixels as mismatches
    pub include_anti_aliasing: bool,
    /// Opacity of unchanged pixels in the diff image
    pub alpha: f64,
    /// Colour of anti-aliased pixels
    pub aa_color: [u8; 3],
    /// Colour of mismatched pixels
    pub diff_color: [u8; 3],
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            threshold: 0.1,
            include_anti_aliasing: false,
            alpha: 0.1,
            aa_color: [255, 255, 0],
            diff_color: [255, 0, 0],
        }
    }
}

impl DiffOptions {
    /// Set the per-pixel sensitivity
    #[must_use]
    pub const fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Count anti-aliased pixels
    #[must_use]
    pub const fn with_include_anti_aliasing(mut self, include: bool) -> Self {
        self.include_anti_aliasing = include;
        self
    }

    fn max_delta(&self) -> f64 {
        MAX_YIQ_DELTA * self.threshold * self.threshold
    }
}

/// Result of [`diff`]
#[derive(Debug, Clone)]
pub struct PixelDiff {
    /// Pixels whose colour distance exceeded the sensitivity
    pub mismatched_pixels: u64,
    /// Visualisation: red mismatches, yellow anti-aliasing, faded context
    pub diff_image: RasterImage,
}

/// Compare two equally sized RGBA buffers
///
/// `a` supplies the faded context in the diff image. Pure and deterministic.
pub fn diff(
    a: &[u8],
    b: &[u8],
    width: u32,
    height: u32,
    options: &DiffOptions,
) -> VisregResult<PixelDiff> {
    let expected = width as usize * height as usize * CHANNELS;
    for len in [a.len(), b.len()] {
        if len != expected {
            return Err(VisregError::DimensionMismatch {
                expected,
                actual: len,
            });
        }
    }

    let mut output = RasterImage::transparent(width, height);

    if a == b {
        for y in 0..height {
            for x in 0..width {
                draw_gray(a, pos(x, y, width), options.alpha, &mut output, x, y);
            }
        }
        return Ok(PixelDiff {
            mismatched_pixels: 0,
            diff_image: output,
        });
    }

    let max_delta = options.max_delta();
    let mut mismatched_pixels = 0u64;

    for y in 0..height {
        for x in 0..width {
            let i = pos(x, y, width);
            let delta = color_delta(a, b, i, i, false);

            if delta.abs() > max_delta {
                let anti_aliased = !options.include_anti_aliasing
                    && (anti_aliased(a, b, x, y, width, height)
                        || anti_aliased(b, a, x, y, width, height));
                if anti_aliased {
                    output.put_pixel(x, y, opaque(options.aa_color));
                } else {
                    output.put_pixel(x, y, opaque(options.diff_color));
                    mismatched_pixels += 1;
                }
            } else {
                draw_gray(a, i, options.alpha, &mut output, x, y);
            }
        }
    }

    Ok(PixelDiff {
        mismatched_pixels,
        diff_image: output,
    })
}

/// Compare two rasters of identical size
pub fn diff_images(
    a: &RasterImage,
    b: &RasterImage,
    options: &DiffOptions,
) -> VisregResult<PixelDiff> {
    if a.dimensions() != b.dimensions() {
        return Err(VisregError::DimensionMismatch {
            expected: a.as_bytes().len(),
            actual: b.as_bytes().len(),
        });
    }
    diff(a.as_bytes(), b.as_bytes(), a.width(), a.height(), options)
}

const fn pos(x: u32, y: u32, width: u32) -> usize {
    (y as usize * width as usize + x as usize) * CHANNELS
}

const fn opaque([r, g, b]: [u8; 3]) -> [u8; 4] {
    [r, g, b, 255]
}

fn rgb2y(r: f64, g: f64, b: f64) -> f64 {
    r * 0.298_895_31 + g * 0.586_622_47 + b * 0.114_482_23
}

fn rgb2i(r: f64, g: f64, b: f64) -> f64 {
    r * 0.595_977_99 - g * 0.274_176_10 - b * 0.321_801_89
}

fn rgb2q(r: f64, g: f64, b: f64) -> f64 {
    r * 0.211_470_17 - g * 0.522_617_11 + b * 0.311_146_94
}

/// Blend a channel toward white by `alpha`
fn blend(c: f64, alpha: f64) -> f64 {
    255.0 + (c - 255.0) * alpha
}

/// RGB of the pixel at byte offset `i`, composited over white
fn composited(img: &[u8], i: usize) -> (f64, f64, f64) {
    let (r, g, b) = (f64::from(img[i]), f64::from(img[i + 1]), f64::from(img[i + 2]));
    let a = img[i + 3];
    if a == 255 {
        return (r, g, b);
    }
    let alpha = f64::from(a) / 255.0;
    (blend(r, alpha), blend(g, alpha), blend(b, alpha))
}

/// Signed YIQ distance between pixel `k` of `a` and pixel `m` of `b`
///
/// The full delta is negative when the first pixel is brighter. With
/// `y_only` the raw brightness difference `y1 - y2` is returned instead,
/// which is positive when the first pixel is brighter.
fn color_delta(a: &[u8], b: &[u8], k: usize, m: usize, y_only: bool) -> f64 {
    if a[k..k + CHANNELS] == b[m..m + CHANNELS] {
        return 0.0;
    }

    let (r1, g1, b1) = composited(a, k);
    let (r2, g2, b2) = composited(b, m);

    let y1 = rgb2y(r1, g1, b1);
    let y2 = rgb2y(r2, g2, b2);
    let y = y1 - y2;

    if y_only {
        return y;
    }

    let i = rgb2i(r1, g1, b1) - rgb2i(r2, g2, b2);
    let q = rgb2q(r1, g1, b1) - rgb2q(r2, g2, b2);
    let delta = 0.5053 * y * y + 0.299 * i * i + 0.1957 * q * q;

    if y1 > y2 {
        -delta
    } else {
        delta
    }
}

/// 3x3 neighbourhood bounds around `(x, y)` and whether it touches an edge
fn neighbourhood(x: u32, y: u32, width: u32, height: u32) -> (u32, u32, u32, u32, bool) {
    let x0 = x.saturating_sub(1);
    let y0 = y.saturating_sub(1);
    let x2 = (x + 1).min(width - 1);
    let y2 = (y + 1).min(height - 1);
    let on_edge = x == x0 || x == x2 || y == y0 || y == y2;
    (x0, y0, x2, y2, on_edge)
}

/// Whether the pixel at `(x1, y1)` of `img` looks like anti-aliasing
///
/// An anti-aliased pixel sits between a darkest and a brightest neighbour,
/// and at least one of those extremes belongs to a flat region in both
/// images.
fn anti_aliased(img: &[u8], other: &[u8], x1: u32, y1: u32, width: u32, height: u32) -> bool {
    let (x0, y0, x2, y2, on_edge) = neighbourhood(x1, y1, width, height);
    let center = pos(x1, y1, width);
    let mut zeroes = u32::from(on_edge);

    let mut min = 0.0;
    let mut max = 0.0;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (0, 0, 0, 0);

    for x in x0..=x2 {
        for y in y0..=y2 {
            if x == x1 && y == y1 {
                continue;
            }

            let delta = color_delta(img, img, center, pos(x, y, width), true);

            if delta == 0.0 {
                zeroes += 1;
                if zeroes > 2 {
                    return false;
                }
            } else if delta < min {
                min = delta;
                min_x = x;
                min_y = y;
            } else if delta > max {
                max = delta;
                max_x = x;
                max_y = y;
            }
        }
    }

    if min == 0.0 || max == 0.0 {
        return false;
    }

    (has_many_siblings(img, min_x, min_y, width, height)
        && has_many_siblings(other, min_x, min_y, width, height))
        || (has_many_siblings(img, max_x, max_y, width, height)
            && has_many_siblings(other, max_x, max_y, width, height))
}

/// Whether at least three neighbours of `(x1, y1)` share its exact colour
fn has_many_siblings(img: &[u8], x1: u32, y1: u32, width: u32, height: u32) -> bool {
    let (x0, y0, x2, y2, on_edge) = neighbourhood(x1, y1, width, height);
    let center = pos(x1, y1, width);
    let mut zeroes = u32::from(on_edge);

    for x in x0..=x2 {
        for y in y0..=y2 {
            if x == x1 && y == y1 {
                continue;
            }
            let other = pos(x, y, width);
            if img[center..center + CHANNELS] == img[other..other + CHANNELS] {
                zeroes += 1;
            }
            if zeroes > 2 {
                return true;
            }
        }
    }

    false
}

fn draw_gray(img: &[u8], i: usize, alpha: f64, output: &mut RasterImage, x: u32, y: u32) {
    let (r, g, b) = (f64::from(img[i]), f64::from(img[i + 1]), f64::from(img[i + 2]));
    let luma = rgb2y(r, g, b);
    let value = blend(luma, alpha * f64::from(img[i + 3]) / 255.0)
        .round()
        .clamp(0.0, 255.0) as u8;
    output.put_pixel(x, y, [value, value, value, 255]);
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    const RED: [u8; 4] = [255, 0, 0, 255];
    const YELLOW: [u8; 4] = [255, 255, 0, 255];

    fn solid(w: u32, h: u32, rgba: [u8; 4]) -> RasterImage {
        RasterImage::filled(w, h, rgba)
    }

    mod delta_tests {
        use super::*;

        #[test]
        fn test_identical_pixels_have_zero_delta() {
            let px = [12, 34, 56, 255];
            assert_eq!(color_delta(&px, &px, 0, 0, false), 0.0);
        }

        #[test]
        fn test_black_white_is_near_max_delta() {
            let white = [255, 255, 255, 255];
            let black = [0, 0, 0, 255];
            let delta = color_delta(&black, &white, 0, 0, false);
            assert!(delta > 30_000.0 && delta <= MAX_YIQ_DELTA, "delta was {delta}");
        }

        #[test]
        fn test_sign_follows_brightness() {
            let white = [255, 255, 255, 255];
            let black = [0, 0, 0, 255];
            assert!(color_delta(&white, &black, 0, 0, false) < 0.0);
            assert!(color_delta(&black, &white, 0, 0, false) > 0.0);
            assert!(color_delta(&white, &black, 0, 0, true) > 0.0);
            assert!(color_delta(&black, &white, 0, 0, true) < 0.0);
        }

        #[test]
        fn test_transparent_composites_over_white() {
            let transparent = [0, 0, 0, 0];
            let white = [255, 255, 255, 255];
            assert_eq!(color_delta(&transparent, &white, 0, 0, false), 0.0);
        }
    }

    mod diff_tests {
        use super::*;

        #[test]
        fn test_identical_images_have_no_mismatch() {
            let img = solid(8, 8, [40, 80, 120, 255]);
            let result = diff_images(&img, &img, &DiffOptions::default()).unwrap();
            assert_eq!(result.mismatched_pixels, 0);
            assert_eq!(result.diff_image.dimensions(), (8, 8));
            let px = result.diff_image.pixel(3, 3).unwrap();
            assert_eq!(px[0], px[1]);
            assert_eq!(px[3], 255);
            assert!(px[0] > 200, "context should be faded toward white");
        }

        #[test]
        fn test_completely_different_images() {
            let a = solid(4, 4, [255, 255, 255, 255]);
            let b = solid(4, 4, [0, 0, 0, 255]);
            let result = diff_images(&a, &b, &DiffOptions::default()).unwrap();
            assert_eq!(result.mismatched_pixels, 16);
            assert_eq!(result.diff_image.pixel(0, 0), Some(RED));
        }

        #[test]
        fn test_small_change_below_sensitivity() {
            let a = solid(4, 4, [100, 100, 100, 255]);
            let mut b = a.clone();
            b.put_pixel(1, 1, [103, 103, 103, 255]);
            let result = diff_images(&a, &b, &DiffOptions::default()).unwrap();
            assert_eq!(result.mismatched_pixels, 0);

            let strict = DiffOptions::default().with_threshold(0.0);
            let result = diff_images(&a, &b, &strict).unwrap();
            assert_eq!(result.mismatched_pixels, 1);
        }

        #[test]
        fn test_isolated_block_counts_every_pixel() {
            let a = solid(10, 10, [255, 255, 255, 255]);
            let mut b = a.clone();
            for y in 2..5 {
                for x in 2..5 {
                    b.put_pixel(x, y, [0, 0, 0, 255]);
                }
            }
            let result = diff_images(&a, &b, &DiffOptions::default()).unwrap();
            assert_eq!(result.mismatched_pixels, 9);
            assert_eq!(result.diff_image.pixel(3, 3), Some(RED));
        }

        #[test]
        fn test_anti_aliased_edge_is_ignored_by_default() {
            // Black left half, white right half; the boundary column of `b`
            // holds an intermediate grey, as an anti-aliased edge would.
            let mut a = solid(6, 6, [255, 255, 255, 255]);
            for y in 0..6 {
                for x in 0..3 {
                    a.put_pixel(x, y, [0, 0, 0, 255]);
                }
            }
            let mut b = a.clone();
            for y in 0..6 {
                b.put_pixel(3, y, [128, 128, 128, 255]);
            }

            let result = diff_images(&a, &b, &DiffOptions::default()).unwrap();
            assert_eq!(result.mismatched_pixels, 0);
            assert_eq!(result.diff_image.pixel(3, 2), Some(YELLOW));

            let counting = DiffOptions::default().with_include_anti_aliasing(true);
            let result = diff_images(&a, &b, &counting).unwrap();
            assert_eq!(result.mismatched_pixels, 6);
        }

        #[test]
        fn test_deterministic() {
            let a = solid(5, 5, [10, 200, 30, 255]);
            let mut b = a.clone();
            b.put_pixel(4, 4, [200, 10, 30, 255]);
            let first = diff_images(&a, &b, &DiffOptions::default()).unwrap();
            let second = diff_images(&a, &b, &DiffOptions::default()).unwrap();
            assert_eq!(first.mismatched_pixels, second.mismatched_pixels);
            assert_eq!(first.diff_image, second.diff_image);
        }

        #[test]
        fn test_rejects_wrong_buffer_length() {
            let err = diff(&[0; 16], &[0; 12], 2, 2, &DiffOptions::default()).unwrap_err();
            assert!(matches!(
                err,
                VisregError::DimensionMismatch {
                    expected: 16,
                    actual: 12
                }
            ));

            let a = solid(2, 2, RED);
            let b = solid(3, 2, RED);
            assert!(diff_images(&a, &b, &DiffOptions::default()).is_err());
        }

        #[test]
        fn test_empty_canvas() {
            let result = diff(&[], &[], 0, 0, &DiffOptions::default()).unwrap();
            assert_eq!(result.mismatched_pixels, 0);
        }
    }
}
