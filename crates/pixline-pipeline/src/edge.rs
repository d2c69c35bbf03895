//! Sobel gradient magnitude with a hard threshold.
//!
//! Both gradients come from `imageproc`'s clamped 3×3 Sobel filters
//! (`[-1,0,1,-2,0,2,-1,0,1]` and its transpose). An interior pixel is an
//! edge (255) when `sqrt(gx² + gy²) > threshold` and background (0)
//! otherwise. The outermost ring of pixels has no full neighborhood and
//! is always 0.
//!
//! The comparison is done on squared integers (`gx² + gy² > t²`), which
//! is exact and equivalent for non-negative values.

use image::imageops;
use image::{GrayImage, Luma};
use imageproc::definitions::Image;
use imageproc::filter::filter_clamped;
use imageproc::kernel;

/// Value written for edge pixels.
pub const EDGE: u8 = 255;

/// Detect edges, returning a binary mask of the same dimensions.
#[must_use = "returns the binary edge mask"]
pub fn detect_edges(image: &GrayImage, threshold: u32) -> GrayImage {
    let mut out = GrayImage::new(image.width(), image.height());
    detect_edges_into(image, threshold, &mut out);
    out
}

/// Like [`detect_edges`] but writes into a caller-owned buffer of the
/// same dimensions. Every pixel of `out` is overwritten.
pub fn detect_edges_into(image: &GrayImage, threshold: u32, out: &mut GrayImage) {
    debug_assert_eq!(image.dimensions(), out.dimensions());
    out.fill(0);

    let (w, h) = image.dimensions();
    if w < 3 || h < 3 {
        return;
    }

    let (gx, gy) = gradients(image);
    let threshold_sq = u64::from(threshold) * u64::from(threshold);

    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let dx = i32::from(gx.get_pixel(x, y).0[0]);
            let dy = i32::from(gy.get_pixel(x, y).0[0]);
            if magnitude_sq(dx, dy) > threshold_sq {
                out.put_pixel(x, y, Luma([EDGE]));
            }
        }
    }
}

/// Sobel gradient `(gx, gy)` at `(x, y)`.
///
/// Returns `None` on the border ring, where the 3×3 neighborhood would
/// leave the image.
#[must_use]
pub fn sobel_at(image: &GrayImage, x: u32, y: u32) -> Option<(i32, i32)> {
    let (w, h) = image.dimensions();
    if x == 0 || y == 0 || x + 1 >= w || y + 1 >= h {
        return None;
    }

    let window = imageops::crop_imm(image, x - 1, y - 1, 3, 3).to_image();
    let (gx, gy) = gradients(&window);
    Some((
        i32::from(gx.get_pixel(1, 1).0[0]),
        i32::from(gy.get_pixel(1, 1).0[0]),
    ))
}

/// Gradient magnitude `sqrt(gx² + gy²)`.
#[must_use]
pub fn magnitude(gx: i32, gy: i32) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let sq = magnitude_sq(gx, gy) as f64;
    sq.sqrt()
}

/// Number of edge pixels (value [`EDGE`]) in a mask.
#[must_use]
pub fn count_edge_pixels(mask: &GrayImage) -> u64 {
    mask.pixels().map(|p| u64::from(p.0[0] == EDGE)).sum()
}

/// Horizontal and vertical Sobel responses. `|g| <= 4 * 255` fits `i16`.
fn gradients(image: &GrayImage) -> (Image<Luma<i16>>, Image<Luma<i16>>) {
    let gx = filter_clamped(image, kernel::SOBEL_HORIZONTAL_3X3);
    let gy = filter_clamped(image, kernel::SOBEL_VERTICAL_3X3);
    (gx, gy)
}

#[inline]
fn magnitude_sq(gx: i32, gy: i32) -> u64 {
    let (ax, ay) = (u64::from(gx.unsigned_abs()), u64::from(gy.unsigned_abs()));
    ax * ax + ay * ay
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// 20x20 image with a sharp vertical boundary at x = 10.
    fn sharp_edge_image() -> GrayImage {
        GrayImage::from_fn(20, 20, |x, _y| {
            if x < 10 {
                image::Luma([0])
            } else {
                image::Luma([255])
            }
        })
    }

    /// 3x3 image whose single interior pixel has the given neighborhood.
    fn neighborhood(values: [u8; 9]) -> GrayImage {
        GrayImage::from_raw(3, 3, values.to_vec()).unwrap()
    }

    #[test]
    fn blank_image_produces_no_edges() {
        let img = GrayImage::from_pixel(20, 20, image::Luma([128]));
        let edges = detect_edges(&img, 10);
        assert_eq!(edges.dimensions(), (20, 20));
        assert_eq!(count_edge_pixels(&edges), 0);
    }

    #[test]
    fn sharp_edge_detected_on_both_sides_of_boundary() {
        let edges = detect_edges(&sharp_edge_image(), 50);
        for y in 1..19 {
            for x in 0..20 {
                let expected = if x == 9 || x == 10 { EDGE } else { 0 };
                assert_eq!(edges.get_pixel(x, y).0[0], expected, "at ({x},{y})");
            }
        }
    }

    #[test]
    fn border_ring_is_always_zero() {
        // Noisy content everywhere, including the border.
        let img = GrayImage::from_fn(12, 9, |x, y| {
            image::Luma([if (x + y) % 2 == 0 { 0 } else { 255 }])
        });
        let edges = detect_edges(&img, 0);
        let (w, h) = edges.dimensions();
        for x in 0..w {
            assert_eq!(edges.get_pixel(x, 0).0[0], 0);
            assert_eq!(edges.get_pixel(x, h - 1).0[0], 0);
        }
        for y in 0..h {
            assert_eq!(edges.get_pixel(0, y).0[0], 0);
            assert_eq!(edges.get_pixel(w - 1, y).0[0], 0);
        }
    }

    #[test]
    #[allow(clippy::cast_possible_truncation)]
    fn output_is_binary() {
        let img =
            GrayImage::from_fn(16, 16, |x, y| image::Luma([((x * 37 + y * 11) % 256) as u8]));
        let edges = detect_edges(&img, 60);
        assert!(edges.pixels().all(|p| p.0[0] == 0 || p.0[0] == EDGE));
    }

    #[test]
    fn threshold_is_strict() {
        // Right column of 10s: gx = 10 * (1 + 2 + 1) = 40, gy = 0.
        let img = neighborhood([0, 0, 10, 0, 0, 10, 0, 0, 10]);
        assert_eq!(sobel_at(&img, 1, 1), Some((40, 0)));
        assert_eq!(detect_edges(&img, 40).get_pixel(1, 1).0[0], 0);
        assert_eq!(detect_edges(&img, 39).get_pixel(1, 1).0[0], EDGE);
    }

    #[test]
    fn threshold_uses_euclidean_magnitude() {
        // gx = 2*4 + 4 = 12, gy = 2*6 + 4 = 16, magnitude = 20.
        let img = neighborhood([0, 0, 0, 0, 0, 4, 0, 6, 4]);
        assert_eq!(sobel_at(&img, 1, 1), Some((12, 16)));
        assert!((magnitude(12, 16) - 20.0).abs() < f64::EPSILON);
        assert_eq!(detect_edges(&img, 20).get_pixel(1, 1).0[0], 0);
        assert_eq!(detect_edges(&img, 19).get_pixel(1, 1).0[0], EDGE);
    }

    #[test]
    fn operators_have_expected_signs() {
        // Brighter to the right -> positive gx; brighter below -> positive gy.
        let right = neighborhood([0, 0, 9, 0, 0, 9, 0, 0, 9]);
        let below = neighborhood([0, 0, 0, 0, 0, 0, 9, 9, 9]);
        assert_eq!(sobel_at(&right, 1, 1), Some((36, 0)));
        assert_eq!(sobel_at(&below, 1, 1), Some((0, 36)));
    }

    #[test]
    fn sobel_at_border_is_none() {
        let img = GrayImage::new(4, 4);
        assert!(sobel_at(&img, 0, 1).is_none());
        assert!(sobel_at(&img, 1, 3).is_none());
        assert!(sobel_at(&img, 1, 1).is_some());
    }

    #[test]
    fn tiny_images_have_no_interior() {
        for (w, h) in [(0, 0), (1, 1), (2, 5), (5, 2)] {
            let img = GrayImage::from_pixel(w, h, image::Luma([255]));
            let edges = detect_edges(&img, 0);
            assert_eq!(count_edge_pixels(&edges), 0);
        }
    }

    #[test]
    fn into_variant_clears_stale_mask() {
        let img = GrayImage::from_pixel(6, 6, image::Luma([50]));
        let mut out = GrayImage::from_pixel(6, 6, image::Luma([EDGE]));
        detect_edges_into(&img, 10, &mut out);
        assert_eq!(count_edge_pixels(&out), 0);
    }

    /// Plain 3×3 correlation of the neighborhood around `(x, y)`.
    fn correlate(img: &GrayImage, x: u32, y: u32) -> (i32, i32) {
        const HORIZONTAL: [i32; 9] = [-1, 0, 1, -2, 0, 2, -1, 0, 1];
        const VERTICAL: [i32; 9] = [-1, -2, -1, 0, 0, 0, 1, 2, 1];
        let (mut gx, mut gy) = (0, 0);
        for (i, (hx, vy)) in HORIZONTAL.iter().zip(VERTICAL).enumerate() {
            let (kx, ky) = (u32::try_from(i % 3).unwrap(), u32::try_from(i / 3).unwrap());
            let v = i32::from(img.get_pixel(x + kx - 1, y + ky - 1).0[0]);
            gx += hx * v;
            gy += vy * v;
        }
        (gx, gy)
    }

    #[test]
    #[allow(clippy::cast_possible_truncation)]
    fn mask_matches_plain_correlation() {
        let img = GrayImage::from_fn(24, 18, |x, y| {
            Luma([((x * x * 3 + y * 29 + x * y * 7) % 256) as u8])
        });
        let threshold = 300;
        let edges = detect_edges(&img, threshold);

        for y in 1..17 {
            for x in 1..23 {
                let (gx, gy) = correlate(&img, x, y);
                assert_eq!(sobel_at(&img, x, y), Some((gx, gy)), "at ({x},{y})");
                let expected = if magnitude(gx, gy) > f64::from(threshold) {
                    EDGE
                } else {
                    0
                };
                assert_eq!(edges.get_pixel(x, y).0[0], expected, "at ({x},{y})");
            }
        }
    }

    #[test]
    fn extreme_gradients_do_not_saturate() {
        // Full-scale step along both axes: |gx| = |gy| = 4 * 255.
        let img = neighborhood([255, 255, 0, 255, 255, 0, 0, 0, 0]);
        let (gx, gy) = sobel_at(&img, 1, 1).unwrap();
        assert_eq!((gx, gy), (-765, -765));
        let corner = neighborhood([0, 0, 0, 0, 0, 0, 0, 0, 255]);
        assert_eq!(sobel_at(&corner, 1, 1), Some((255, 255)));
        let full = neighborhood([0, 0, 255, 0, 0, 255, 0, 0, 255]);
        assert_eq!(sobel_at(&full, 1, 1), Some((1020, 0)));
    }
}
