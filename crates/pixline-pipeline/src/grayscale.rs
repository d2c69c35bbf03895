//! RGBA frame to single-channel intensity.
//!
//! Each intensity sample is the truncated flat average `(R + G + B) / 3`;
//! alpha is ignored. This is not perceptual luma; all three channels
//! weigh the same.

use image::GrayImage;

use crate::types::Frame;

/// Reduce a frame to an intensity buffer of the same dimensions.
#[must_use = "returns the intensity buffer"]
pub fn grayscale(frame: &Frame<'_>) -> GrayImage {
    let mut out = GrayImage::new(frame.width(), frame.height());
    grayscale_into(frame, &mut out);
    out
}

/// Like [`grayscale`] but writes into a caller-owned buffer.
///
/// `out` must have the frame's dimensions; extra pixels are left
/// untouched and missing ones are skipped.
pub fn grayscale_into(frame: &Frame<'_>, out: &mut GrayImage) {
    debug_assert_eq!(out.dimensions(), (frame.width(), frame.height()));

    let out: &mut [u8] = out;
    for (dst, px) in out.iter_mut().zip(frame.pixels()) {
        *dst = average(px[0], px[1], px[2]);
    }
}

/// Truncated mean of three channels. Never exceeds 255.
#[inline]
fn average(r: u8, g: u8, b: u8) -> u8 {
    let sum = u16::from(r) + u16::from(g) + u16::from(b);
    u8::try_from(sum / 3).unwrap_or(u8::MAX)
}
