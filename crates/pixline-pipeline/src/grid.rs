//! Quantized-grid outline rendering.
//!
//! Walks the edge mask in `cell_size` steps, row-major, and emits one
//! stroked square per cell whose top-left pixel is an edge. Only that
//! single pixel is sampled; there is no aggregation over the cell. The
//! sequence always starts with a white background fill so non-edge
//! regions render as a blank canvas rather than the live video.

use image::GrayImage;

use crate::types::{DrawCommand, Rgb};

/// Color of the background fill that opens every command sequence.
pub const BACKGROUND: Rgb = Rgb::WHITE;

/// Render the edge mask as a sequence of draw commands.
///
/// A `cell_size` of zero is treated as one.
#[must_use = "returns the draw commands"]
pub fn render_grid(
    mask: &GrayImage,
    cell_size: u32,
    stroke_color: Rgb,
    stroke_width: f32,
) -> Vec<DrawCommand> {
    let cell = cell_size.max(1);
    let (w, h) = mask.dimensions();
    let step = cell as usize;

    let mut commands = Vec::with_capacity(1 + cell_count(w, h, cell) / 4);
    commands.push(DrawCommand::FillBackground { color: BACKGROUND });

    for y in (0..h).step_by(step) {
        for x in (0..w).step_by(step) {
            if mask.get_pixel(x, y).0[0] != 0 {
                commands.push(DrawCommand::StrokeSquare {
                    x,
                    y,
                    size: cell,
                    color: stroke_color,
                    width: stroke_width,
                });
            }
        }
    }

    commands
}

/// Number of cells sampled for a `w x h` mask.
#[must_use]
pub fn cell_count(w: u32, h: u32, cell_size: u32) -> usize {
    let cell = cell_size.max(1);
    (w.div_ceil(cell) as usize) * (h.div_ceil(cell) as usize)
}
