//! Frame diagnostics: timing and counts for each pipeline stage.
//!
//! [`Pipeline::process_with_diagnostics`](crate::Pipeline::process_with_diagnostics)
//! collects a [`FrameDiagnostics`] alongside the draw commands. Timing
//! goes through the [`Clock`] trait; [`InstantClock`] reads `web-time`,
//! which is `performance.now()` in the browser.
//!
//! In JSON, every duration is a number of seconds.

use std::fmt::Write as _;
use std::time::Duration;

use serde::{Deserialize, Serialize};

mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(duration.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs)
            .map_err(|e| serde::de::Error::custom(format!("bad duration {secs}s: {e}")))
    }
}

/// A monotonic time source.
pub trait Clock {
    /// Opaque timestamp type.
    type Instant;

    /// Current timestamp.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// [`Clock`] backed by [`web_time::Instant`].
#[derive(Debug, Clone, Copy, Default)]
pub struct InstantClock;

impl Clock for InstantClock {
    type Instant = web_time::Instant;

    fn now(&self) -> web_time::Instant {
        web_time::Instant::now()
    }

    fn elapsed(&self, since: &web_time::Instant) -> Duration {
        since.elapsed()
    }
}

/// Diagnostics collected from a single frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameDiagnostics {
    /// Stage 1: kernel lookup or regeneration.
    pub kernel: StageDiagnostics,
    /// Stage 2: grayscale reduction.
    pub grayscale: StageDiagnostics,
    /// Stage 3: convolution smoothing.
    pub blur: StageDiagnostics,
    /// Stage 4: Sobel edge detection.
    pub edge_detection: StageDiagnostics,
    /// Stage 5: grid rendering.
    pub grid: StageDiagnostics,
    /// Total wall-clock duration of the frame (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Summary counts for the frame.
    pub summary: FrameSummary,
}

/// Diagnostics for a single pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Kernel cache metrics.
    Kernel {
        /// Kernel radius.
        radius: u32,
        /// Kernel side length (`2r + 1`).
        side: usize,
        /// Whether the kernel had to be regenerated for this frame.
        rebuilt: bool,
    },
    /// Grayscale reduction metrics.
    Grayscale {
        /// Frame width in pixels.
        width: u32,
        /// Frame height in pixels.
        height: u32,
        /// Whether the scratch buffers were (re)allocated for this frame.
        reallocated: bool,
    },
    /// Convolution metrics.
    Blur {
        /// Kernel radius used.
        radius: u32,
        /// Multiply-adds performed (`w * h * side²`).
        taps: u64,
    },
    /// Edge detection metrics.
    EdgeDetection {
        /// Threshold the magnitude had to exceed.
        threshold: u32,
        /// Number of edge pixels (value == 255) in the mask.
        edge_pixel_count: u64,
        /// Total pixel count for computing edge density.
        total_pixel_count: u64,
    },
    /// Grid rendering metrics.
    Grid {
        /// Cell size in pixels.
        cell_size: u32,
        /// Number of cells sampled.
        cells_sampled: usize,
        /// Number of `StrokeSquare` commands emitted.
        stroke_count: usize,
    },
}

/// High-level summary counts for one frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameSummary {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Total pixel count.
    pub pixel_count: u64,
    /// Edge pixels in the mask.
    pub edge_pixel_count: u64,
    /// Total draw commands (background fill included).
    pub command_count: usize,
}

impl FrameDiagnostics {
    /// One line for the frame, then one per stage with its duration and
    /// metrics.
    #[must_use]
    pub fn report(&self) -> String {
        let FrameSummary {
            width,
            height,
            pixel_count,
            edge_pixel_count,
            command_count,
        } = self.summary;
        let mut out = format!(
            "frame {width}x{height} ({pixel_count} px) in {:.3}ms, \
             {edge_pixel_count} edge px, {command_count} commands",
            duration_ms(self.total_duration),
        );
        for (name, diag) in self.stages() {
            let _ = write!(
                out,
                "\n  {name:<15}{:>9.3}ms  {}",
                duration_ms(diag.duration),
                format_metrics(&diag.metrics),
            );
        }
        out
    }

    /// Stages in execution order, with display names.
    #[must_use]
    pub fn stages(&self) -> [(&'static str, &StageDiagnostics); 5] {
        [
            ("Kernel", &self.kernel),
            ("Grayscale", &self.grayscale),
            ("Blur", &self.blur),
            ("Edge Detection", &self.edge_detection),
            ("Grid", &self.grid),
        ]
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
#[must_use]
pub fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Kernel {
            radius,
            side,
            rebuilt,
        } => {
            let state = if *rebuilt { "rebuilt" } else { "cached" };
            format!("r={radius} {side}x{side} {state}")
        }
        StageMetrics::Grayscale {
            width,
            height,
            reallocated,
        } => {
            if *reallocated {
                format!("{width}x{height} (buffers reallocated)")
            } else {
                format!("{width}x{height}")
            }
        }
        StageMetrics::Blur { radius, taps } => format!("r={radius} taps={taps}"),
        StageMetrics::EdgeDetection {
            threshold,
            edge_pixel_count,
            total_pixel_count,
        } => {
            #[allow(clippy::cast_precision_loss)]
            let density = if *total_pixel_count > 0 {
                *edge_pixel_count as f64 / *total_pixel_count as f64 * 100.0
            } else {
                0.0
            };
            format!("threshold={threshold} edges={edge_pixel_count} ({density:.1}%)")
        }
        StageMetrics::Grid {
            cell_size,
            cells_sampled,
            stroke_count,
        } => format!("cell={cell_size} sampled={cells_sampled} strokes={stroke_count}"),
    }
}
