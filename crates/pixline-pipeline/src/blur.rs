//! Kernel convolution with edge-replicated borders.
//!
//! Every output pixel is `Σ kernel[kx, ky] * input[clamp(x + kx), clamp(y + ky)]`
//! where each coordinate saturates independently to `[0, dim - 1]`. The
//! sum is accumulated in `f64`, saturated to `0..=255` and rounded half
//! to even. Sampling never wraps and never reads outside the image, even
//! when the kernel is larger than the image.
//!
//! The full 2D kernel is applied; two separable 1D passes would round
//! between passes and change the output.

use image::{GrayImage, Luma};
use imageproc::filter::filter;

use crate::kernel::Kernel;

/// Convolve `image` with `kernel`, returning a new buffer.
#[must_use = "returns the smoothed image"]
pub fn convolve(image: &GrayImage, kernel: &Kernel) -> GrayImage {
    let side = 2 * kernel.radius() + 1;
    let taps = imageproc::kernel::Kernel::new(kernel.weights(), side, side);
    filter::<Luma<u8>, f64, _, Luma<u8>>(image, taps, quantize)
}

/// Like [`convolve`] but writes into a caller-owned buffer of the same
/// dimensions.
pub fn convolve_into(image: &GrayImage, kernel: &Kernel, out: &mut GrayImage) {
    debug_assert_eq!(image.dimensions(), out.dimensions());
    if kernel.radius() == 0 {
        out.copy_from_slice(image);
        return;
    }
    *out = convolve(image, kernel);
}

/// Saturate an accumulated sum into a byte, rounding half to even.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn quantize(sum: f64) -> u8 {
    sum.clamp(0.0, 255.0).round_ties_even() as u8
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// Test image with a sharp black-to-white boundary at x = 5.
    fn sharp_edge_image() -> GrayImage {
        GrayImage::from_fn(10, 10, |x, _y| {
            if x < 5 {
                image::Luma([0])
            } else {
                image::Luma([255])
            }
        })
    }

    #[test]
    fn identity_kernel_returns_identical_image() {
        let img = sharp_edge_image();
        assert_eq!(convolve(&img, &Kernel::identity()), img);
    }

    #[test]
    fn output_dimensions_preserved() {
        let img = GrayImage::new(17, 31);
        let blurred = convolve(&img, &Kernel::gaussian(2));
        assert_eq!(blurred.width(), 17);
        assert_eq!(blurred.height(), 31);
    }

    #[test]
    fn blur_smooths_sharp_edge() {
        let blurred = convolve(&sharp_edge_image(), &Kernel::gaussian(2));
        let left_of_edge = blurred.get_pixel(4, 5).0[0];
        let right_of_edge = blurred.get_pixel(5, 5).0[0];
        assert!(
            left_of_edge > 0,
            "expected blur to raise left-of-edge above 0, got {left_of_edge}",
        );
        assert!(
            right_of_edge < 255,
            "expected blur to lower right-of-edge below 255, got {right_of_edge}",
        );
    }

    #[test]
    fn uniform_image_unchanged_by_blur() {
        for radius in 0..=5 {
            for value in [0u8, 1, 77, 128, 254, 255] {
                let img = GrayImage::from_pixel(9, 7, image::Luma([value]));
                let blurred = convolve(&img, &Kernel::gaussian(radius));
                assert!(
                    blurred.pixels().all(|p| p.0[0] == value),
                    "radius {radius}: flat {value} did not survive blur",
                );
            }
        }
    }

    #[test]
    fn kernel_larger_than_image_clamps_at_corners() {
        // 2x2 image, 11x11 kernel: every tap outside the image replicates
        // the nearest edge pixel.
        let img = GrayImage::from_raw(2, 2, vec![0, 100, 200, 40]).unwrap_or_default();
        let kernel = Kernel::gaussian(5);
        let blurred = convolve(&img, &kernel);

        // Expected value for (0, 0): weight mass landing on each source
        // pixel after clamping.
        let mut mass = [0.0f64; 4];
        for ky in -5i64..=5 {
            for kx in -5i64..=5 {
                let sx = usize::from(kx > 0);
                let sy = usize::from(ky > 0);
                mass[sy * 2 + sx] += kernel.weight(kx, ky).unwrap_or_default();
            }
        }
        let expected = 200.0f64.mul_add(mass[2], 100.0f64.mul_add(mass[1], 40.0 * mass[3]));
        let got = f64::from(blurred.get_pixel(0, 0).0[0]);
        assert!(
            (got - expected).abs() <= 1.0,
            "corner: expected ~{expected}, got {got}",
        );

        // Every output stays within the input range.
        assert!(blurred.pixels().all(|p| p.0[0] <= 200));
    }

    #[test]
    fn single_pixel_image_is_fixed_point() {
        let img = GrayImage::from_pixel(1, 1, image::Luma([93]));
        assert_eq!(convolve(&img, &Kernel::gaussian(4)).get_pixel(0, 0).0[0], 93);
    }

    #[test]
    fn impulse_spreads_symmetrically() {
        let mut img = GrayImage::new(9, 9);
        img.put_pixel(4, 4, image::Luma([255]));
        let blurred = convolve(&img, &Kernel::gaussian(1));
        let center = blurred.get_pixel(4, 4).0[0];
        assert!(center < 255 && center > 0);
        assert_eq!(blurred.get_pixel(3, 4), blurred.get_pixel(5, 4));
        assert_eq!(blurred.get_pixel(4, 3), blurred.get_pixel(4, 5));
        assert_eq!(blurred.get_pixel(3, 3), blurred.get_pixel(5, 5));
        assert_eq!(blurred.get_pixel(0, 0).0[0], 0);
    }

    #[test]
    fn convolve_into_reuses_buffer() {
        let img = sharp_edge_image();
        let kernel = Kernel::gaussian(1);
        let mut out = GrayImage::from_pixel(10, 10, image::Luma([7]));
        convolve_into(&img, &kernel, &mut out);
        assert_eq!(out, convolve(&img, &kernel));
    }

    #[test]
    fn halfway_sums_round_to_even() {
        assert_eq!(quantize(2.5), 2);
        assert_eq!(quantize(3.5), 4);
        assert_eq!(quantize(254.5), 254);
        assert_eq!(quantize(127.49), 127);
        assert_eq!(quantize(-3.0), 0);
        assert_eq!(quantize(300.0), 255);
    }

    #[test]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn matches_direct_clamped_sum() {
        let (w, h) = (13i64, 9i64);
        let img = GrayImage::from_fn(13, 9, |x, y| {
            image::Luma([((x * 53 + y * 97 + x * y * 13) % 256) as u8])
        });
        for radius in [1, 2, 4] {
            let kernel = Kernel::gaussian(radius);
            let blurred = convolve(&img, &kernel);
            let r = i64::from(radius);
            for y in 0..h {
                for x in 0..w {
                    let mut sum = 0.0f64;
                    for ky in -r..=r {
                        for kx in -r..=r {
                            let sx = (x + kx).clamp(0, w - 1) as u32;
                            let sy = (y + ky).clamp(0, h - 1) as u32;
                            sum += kernel.weight(kx, ky).unwrap()
                                * f64::from(img.get_pixel(sx, sy).0[0]);
                        }
                    }
                    assert_eq!(
                        blurred.get_pixel(x as u32, y as u32).0[0],
                        quantize(sum),
                        "radius {radius} at ({x},{y})",
                    );
                }
            }
        }
    }
}
