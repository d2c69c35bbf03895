//! pixline-render: Raster renderer sink for pixline draw commands.
//!
//! Paints a [`DrawCommand`] sequence onto a `tiny-skia` [`Pixmap`] with
//! the same conventions as an HTML canvas: a background fill covers the
//! whole surface, and a stroked square is outlined along its edges with
//! the stroke centered on the boundary (half inside, half outside).
//!
//! Commands are painted strictly in order, so later strokes draw over
//! earlier ones.

use image::{Rgba, RgbaImage};
use pixline_pipeline::{DrawCommand, Rgb};
use tiny_skia::{Color, LineCap, LineJoin, Paint, PathBuilder, Pixmap, Rect, Stroke, Transform};

/// Errors from the raster sink.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    /// `tiny-skia` refused to allocate a surface of this size.
    #[error("cannot allocate a {width}x{height} render surface")]
    Surface {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },
}

/// Paint `commands` onto `pixmap`, in order.
///
/// Strokes with a non-positive or non-finite width are skipped, matching
/// a canvas that ignores such `lineWidth` values.
pub fn paint(pixmap: &mut Pixmap, commands: &[DrawCommand]) {
    for command in commands {
        match *command {
            DrawCommand::FillBackground { color } => pixmap.fill(to_color(color)),
            DrawCommand::StrokeSquare {
                x,
                y,
                size,
                color,
                width,
            } => stroke_square(pixmap, x, y, size, color, width),
        }
    }
}

/// Render `commands` onto a fresh `width x height` surface and return it
/// as straight (non-premultiplied) RGBA.
///
/// Pixels not covered by any command stay fully transparent.
///
/// # Errors
///
/// Returns [`RenderError::Surface`] if either dimension is zero or the
/// surface is too large to allocate.
pub fn render(
    commands: &[DrawCommand],
    width: u32,
    height: u32,
) -> Result<RgbaImage, RenderError> {
    let mut pixmap = Pixmap::new(width, height).ok_or(RenderError::Surface { width, height })?;
    paint(&mut pixmap, commands);
    Ok(to_rgba_image(&pixmap))
}

/// Convert a pixmap (premultiplied RGBA) to an `RgbaImage` (straight RGBA).
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn to_rgba_image(pixmap: &Pixmap) -> RgbaImage {
    let data = pixmap.data();
    let mut img = RgbaImage::new(pixmap.width(), pixmap.height());
    for (pixel, src) in img.pixels_mut().zip(data.chunks_exact(4)) {
        let a = src[3];
        *pixel = if a == 0 {
            Rgba([0, 0, 0, 0])
        } else {
            // channel = premultiplied * 255 / alpha
            let unmul = |c: u8| (u16::from(c) * 255 / u16::from(a)) as u8;
            Rgba([unmul(src[0]), unmul(src[1]), unmul(src[2]), a])
        };
    }
    img
}

#[allow(clippy::cast_precision_loss)]
fn stroke_square(pixmap: &mut Pixmap, x: u32, y: u32, size: u32, color: Rgb, width: f32) {
    if !(width.is_finite() && width > 0.0) {
        log::debug!("skipping stroke at ({x}, {y}) with width {width}");
        return;
    }
    let Some(rect) = Rect::from_xywh(x as f32, y as f32, size as f32, size as f32) else {
        log::debug!("skipping degenerate square at ({x}, {y}) of size {size}");
        return;
    };
    let path = PathBuilder::from_rect(rect);

    // Canvas `strokeRect` defaults: miter joins, butt caps.
    let stroke = Stroke {
        width,
        line_cap: LineCap::Butt,
        line_join: LineJoin::Miter,
        ..Stroke::default()
    };

    let mut paint = Paint::default();
    paint.set_color(to_color(color));
    paint.anti_alias = true;

    pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
}

fn to_color(color: Rgb) -> Color {
    Color::from_rgba8(color.r, color.g, color.b, 255)
}
