//! pixline-pipeline: Per-frame edge outline pipeline (sans-IO).
//!
//! Turns an RGBA frame into a sequence of draw commands through:
//! grayscale -> Gaussian smoothing -> Sobel edge detection ->
//! quantized-grid outline rendering.
//!
//! This crate has **no I/O dependencies**. It reads borrowed pixel
//! buffers and returns plain data; painting the commands is the job of a
//! renderer sink (`pixline-render` for raster images, `pixline-wasm` for
//! an HTML canvas).
//!
//! Use [`Pipeline`] for a stream of frames so the smoothing kernel and
//! scratch buffers are reused, or [`process_frame`] for a one-off.

pub mod blur;
pub mod diagnostics;
pub mod edge;
pub mod grayscale;
pub mod grid;
pub mod kernel;
pub mod pipeline;
pub mod types;

pub use diagnostics::{Clock, FrameDiagnostics, InstantClock};
pub use kernel::Kernel;
pub use pipeline::{Pipeline, StagedFrame};
pub use types::{
    ColorParseError, Dimensions, DrawCommand, Frame, FrameError, GrayImage, Parameters, Rgb,
    RgbaImage,
};

/// Process a single frame without keeping any state.
///
/// Equivalent to a fresh [`Pipeline`] processing one frame. Builds the
/// kernel and buffers from scratch on every call.
///
/// # Pipeline steps
///
/// 1. Reduce RGBA to intensity (unweighted channel average)
/// 2. Smooth with a normalized Gaussian kernel of radius `blur_radius`
/// 3. Sobel gradient magnitude, thresholded to a 0/255 mask
/// 4. Stroke one square per grid cell whose top-left pixel is an edge
#[must_use = "returns the draw commands for this frame"]
pub fn process_frame(frame: &Frame<'_>, params: &Parameters) -> Vec<DrawCommand> {
    Pipeline::new().process(frame, params)
}
