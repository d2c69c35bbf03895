//! Shared types for the pixline frame pipeline.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Re-export `GrayImage` so downstream crates can reference
/// intensity buffers and edge masks without depending on `image` directly.
pub use image::GrayImage;

/// Re-export `RgbaImage` so downstream crates can build frames from
/// decoded images without depending on `image` directly.
pub use image::RgbaImage;

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Total number of pixels.
    #[must_use]
    pub fn pixel_count(self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

/// Errors describing a frame that cannot be processed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// One of the frame dimensions is zero.
    #[error("frame has an empty dimension ({width}x{height})")]
    EmptyDimensions {
        /// Reported width.
        width: u32,
        /// Reported height.
        height: u32,
    },

    /// The pixel buffer does not hold exactly `width * height * 4` bytes.
    #[error("frame buffer holds {actual} bytes, expected {expected}")]
    BufferLength {
        /// Bytes required by the reported dimensions.
        expected: u64,
        /// Bytes actually supplied.
        actual: u64,
    },
}

/// A borrowed RGBA8 frame: `width * height` pixels, 4 interleaved
/// channels, row-major, top-left origin.
///
/// Construction validates the buffer length, so every `Frame` the
/// pipeline sees is well formed. The pipeline never mutates the pixels.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    width: u32,
    height: u32,
    data: &'a [u8],
}

impl<'a> Frame<'a> {
    /// Number of interleaved channels per pixel.
    pub const CHANNELS: usize = 4;

    /// Wrap a raw RGBA buffer.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::EmptyDimensions`] if either dimension is zero.
    /// Returns [`FrameError::BufferLength`] if `data.len()` is not
    /// `width * height * 4`.
    pub fn new(data: &'a [u8], width: u32, height: u32) -> Result<Self, FrameError> {
        if width == 0 || height == 0 {
            return Err(FrameError::EmptyDimensions { width, height });
        }

        let expected = (u64::from(width) * u64::from(height)).saturating_mul(4);
        let actual = u64::try_from(data.len()).unwrap_or(u64::MAX);
        if expected != actual {
            return Err(FrameError::BufferLength { expected, actual });
        }

        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Borrow a decoded RGBA image as a frame.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::EmptyDimensions`] for a zero-sized image.
    pub fn from_rgba(image: &'a RgbaImage) -> Result<Self, FrameError> {
        Self::new(image.as_raw(), image.width(), image.height())
    }

    /// Frame width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Frame height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Frame dimensions.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.width,
            height: self.height,
        }
    }

    /// The raw interleaved RGBA bytes.
    #[must_use]
    pub const fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Iterate pixels in row-major order as `[r, g, b, a]` slices.
    pub fn pixels(&self) -> std::slice::ChunksExact<'a, u8> {
        self.data.chunks_exact(Self::CHANNELS)
    }
}

/// Errors from parsing a CSS-style hex color.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ColorParseError {
    /// The string is not 3 or 6 hex digits (after an optional `#`).
    #[error("expected 3 or 6 hex digits, got {0}")]
    InvalidLength(usize),

    /// The string contains a non-hex character.
    #[error("invalid hex digit in color {0:?}")]
    InvalidDigit(String),
}

/// An opaque 8-bit RGB color.
///
/// Serialized as a `#rrggbb` hex string so parameter JSON matches what
/// a browser color input produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Rgb {
    /// `#ffffff`, the canvas background.
    pub const WHITE: Self = Self::new(255, 255, 255);
    /// `#000000`.
    pub const BLACK: Self = Self::new(0, 0, 0);
    /// `#0000ff`, the default stroke color.
    pub const BLUE: Self = Self::new(0, 0, 255);

    /// Create a color from its channels.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl FromStr for Rgb {
    type Err = ColorParseError;

    /// Parse `#rgb`, `#rrggbb`, `rgb` or `rrggbb` (case-insensitive).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.trim().strip_prefix('#').unwrap_or_else(|| s.trim());
        if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ColorParseError::InvalidDigit(s.to_owned()));
        }

        let channel = |hex: &str| {
            u8::from_str_radix(hex, 16).map_err(|_| ColorParseError::InvalidDigit(s.to_owned()))
        };

        match digits.len() {
            3 => {
                // Shorthand: each nibble is doubled (`f` -> `ff`).
                let r = channel(&digits[0..1])?;
                let g = channel(&digits[1..2])?;
                let b = channel(&digits[2..3])?;
                Ok(Self::new(r * 17, g * 17, b * 17))
            }
            6 => Ok(Self::new(
                channel(&digits[0..2])?,
                channel(&digits[2..4])?,
                channel(&digits[4..6])?,
            )),
            n => Err(ColorParseError::InvalidLength(n)),
        }
    }
}

impl TryFrom<String> for Rgb {
    type Error = ColorParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Rgb> for String {
    fn from(color: Rgb) -> Self {
        color.to_string()
    }
}

/// Per-frame processing parameters.
///
/// An immutable snapshot handed to every
/// [`Pipeline::process`](crate::Pipeline::process) call. The pipeline
/// does not validate ranges; callers that take values from user input
/// should pass them through [`Parameters::clamped`] first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Parameters {
    /// Side length of one grid cell in pixels.
    pub cell_size: u32,

    /// Gradient magnitude a pixel must strictly exceed to count as an edge.
    pub gradient_threshold: u32,

    /// Smoothing kernel radius; the kernel side is `2 * blur_radius + 1`.
    /// Zero disables smoothing.
    pub blur_radius: u32,

    /// Outline color of edge cells.
    pub stroke_color: Rgb,

    /// Outline width in pixels.
    pub stroke_width: f32,
}

impl Parameters {
    /// Smallest documented cell size.
    pub const MIN_CELL_SIZE: u32 = 1;
    /// Largest documented cell size.
    pub const MAX_CELL_SIZE: u32 = 20;
    /// Default cell size.
    pub const DEFAULT_CELL_SIZE: u32 = 8;

    /// Smallest documented gradient threshold.
    pub const MIN_GRADIENT_THRESHOLD: u32 = 10;
    /// Largest documented gradient threshold.
    pub const MAX_GRADIENT_THRESHOLD: u32 = 200;
    /// Default gradient threshold.
    pub const DEFAULT_GRADIENT_THRESHOLD: u32 = 50;

    /// Largest documented blur radius (the smallest is zero).
    pub const MAX_BLUR_RADIUS: u32 = 5;
    /// Default blur radius.
    pub const DEFAULT_BLUR_RADIUS: u32 = 3;

    /// Default stroke color.
    pub const DEFAULT_STROKE_COLOR: Rgb = Rgb::BLUE;
    /// Default stroke width.
    pub const DEFAULT_STROKE_WIDTH: f32 = 2.0;

    /// Return a copy with every field forced into its documented range.
    ///
    /// This is the boundary helper for parameter providers; the pipeline
    /// itself never calls it. A non-finite or negative stroke width falls
    /// back to [`Self::DEFAULT_STROKE_WIDTH`].
    #[must_use]
    pub fn clamped(self) -> Self {
        let stroke_width = if self.stroke_width.is_finite() && self.stroke_width >= 0.0 {
            self.stroke_width
        } else {
            Self::DEFAULT_STROKE_WIDTH
        };

        Self {
            cell_size: self
                .cell_size
                .clamp(Self::MIN_CELL_SIZE, Self::MAX_CELL_SIZE),
            gradient_threshold: self
                .gradient_threshold
                .clamp(Self::MIN_GRADIENT_THRESHOLD, Self::MAX_GRADIENT_THRESHOLD),
            blur_radius: self.blur_radius.min(Self::MAX_BLUR_RADIUS),
            stroke_color: self.stroke_color,
            stroke_width,
        }
    }
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            cell_size: Self::DEFAULT_CELL_SIZE,
            gradient_threshold: Self::DEFAULT_GRADIENT_THRESHOLD,
            blur_radius: Self::DEFAULT_BLUR_RADIUS,
            stroke_color: Self::DEFAULT_STROKE_COLOR,
            stroke_width: Self::DEFAULT_STROKE_WIDTH,
        }
    }
}

/// A rendering primitive for the external renderer.
///
/// Commands are produced fresh every frame and must be painted in order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DrawCommand {
    /// Paint the whole surface with `color`.
    FillBackground {
        /// Fill color.
        color: Rgb,
    },

    /// Outline (never fill) the square with top-left corner `(x, y)`.
    StrokeSquare {
        /// Left edge in pixels, a multiple of the cell size.
        x: u32,
        /// Top edge in pixels, a multiple of the cell size.
        y: u32,
        /// Side length in pixels.
        size: u32,
        /// Stroke color.
        color: Rgb,
        /// Stroke width in pixels.
        width: f32,
    },
}

impl DrawCommand {
    /// Returns `true` for [`DrawCommand::StrokeSquare`].
    #[must_use]
    pub const fn is_stroke(&self) -> bool {
        matches!(self, Self::StrokeSquare { .. })
    }
}
