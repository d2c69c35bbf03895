//! Per-frame orchestration with a cached kernel and reusable buffers.
//!
//! A [`Pipeline`] is meant to live as long as the frame stream. It keeps
//! two pieces of state between calls:
//!
//! - the smoothing [`Kernel`], regenerated only when `blur_radius`
//!   changes;
//! - a workspace of intensity, blur and mask buffers, reallocated
//!   only when the frame dimensions change.
//!
//! Neither is observable in the output: a fresh pipeline and a warm one
//! produce the same commands for the same frame and parameters.
//!
//! ```
//! use pixline_pipeline::{Frame, Parameters, Pipeline};
//!
//! let pixels = vec![128u8; 16 * 16 * 4];
//! let frame = Frame::new(&pixels, 16, 16).unwrap();
//! let mut pipeline = Pipeline::new();
//! let commands = pipeline.process(&frame, &Parameters::default());
//! assert_eq!(commands.len(), 1); // flat frame: background only
//! ```

use image::GrayImage;

use crate::diagnostics::{Clock, FrameDiagnostics, FrameSummary, StageDiagnostics, StageMetrics};
use crate::kernel::Kernel;
use crate::types::{Dimensions, DrawCommand, Frame, Parameters};
use crate::{blur, edge, grayscale, grid};

/// Scratch buffers for one frame size.
#[derive(Debug, Clone)]
struct Workspace {
    dimensions: Dimensions,
    intensity: GrayImage,
    blurred: GrayImage,
    edges: GrayImage,
}

impl Workspace {
    fn new(dimensions: Dimensions) -> Self {
        let Dimensions { width, height } = dimensions;
        Self {
            dimensions,
            intensity: GrayImage::new(width, height),
            blurred: GrayImage::new(width, height),
            edges: GrayImage::new(width, height),
        }
    }

    /// Return the workspace for `dimensions`, allocating a new one if the
    /// slot is empty or sized for a different frame. The flag reports
    /// whether an allocation happened.
    fn fit(slot: &mut Option<Self>, dimensions: Dimensions) -> (&mut Self, bool) {
        let reallocated = slot.as_ref().is_none_or(|ws| ws.dimensions != dimensions);
        if reallocated {
            log::debug!(
                "allocating workspace for {}x{} frame",
                dimensions.width,
                dimensions.height,
            );
            *slot = Some(Self::new(dimensions));
        }
        (slot.get_or_insert_with(|| Self::new(dimensions)), reallocated)
    }
}

/// Return the cached kernel for `radius`, regenerating it if the slot is
/// empty or holds a different effective radius.
fn ensure_kernel(slot: &mut Option<Kernel>, radius: u32) -> (&Kernel, bool) {
    let effective = Kernel::effective_radius(radius);
    let rebuilt = !slot.as_ref().is_some_and(|k| k.radius() == effective);
    if rebuilt {
        log::debug!("regenerating smoothing kernel for radius {radius}");
        *slot = Some(Kernel::gaussian(radius));
    }
    (slot.get_or_insert_with(|| Kernel::gaussian(radius)), rebuilt)
}

/// Every intermediate product of one frame, for previews and tests.
#[derive(Debug, Clone, PartialEq)]
pub struct StagedFrame {
    /// Grayscale intensity.
    pub intensity: GrayImage,
    /// Smoothed intensity.
    pub blurred: GrayImage,
    /// Binary edge mask (0 or 255).
    pub edges: GrayImage,
    /// Draw commands produced by the grid renderer.
    pub commands: Vec<DrawCommand>,
}

/// Stateful per-frame pipeline.
///
/// Single-threaded and synchronous. Distinct pipelines share nothing.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    kernel: Option<Kernel>,
    workspace: Option<Workspace>,
}

impl Pipeline {
    /// Create a pipeline with an empty cache.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            kernel: None,
            workspace: None,
        }
    }

    /// Turn one frame into a draw-command sequence.
    ///
    /// The first command is always a white background fill.
    #[must_use = "returns the draw commands for this frame"]
    pub fn process(&mut self, frame: &Frame<'_>, params: &Parameters) -> Vec<DrawCommand> {
        self.run(frame, params).1
    }

    /// Run every stage into the workspace and return it with the
    /// commands.
    fn run(
        &mut self,
        frame: &Frame<'_>,
        params: &Parameters,
    ) -> (&Workspace, Vec<DrawCommand>) {
        let (kernel, _) = ensure_kernel(&mut self.kernel, params.blur_radius);
        let (ws, _) = Workspace::fit(&mut self.workspace, frame.dimensions());

        grayscale::grayscale_into(frame, &mut ws.intensity);
        blur::convolve_into(&ws.intensity, kernel, &mut ws.blurred);
        edge::detect_edges_into(&ws.blurred, params.gradient_threshold, &mut ws.edges);
        let commands = grid::render_grid(
            &ws.edges,
            params.cell_size,
            params.stroke_color,
            params.stroke_width,
        );

        log::trace!(
            "frame {}x{}: {} stroke(s)",
            frame.width(),
            frame.height(),
            commands.len().saturating_sub(1),
        );
        (&*ws, commands)
    }

    /// Validate a raw RGBA buffer and process it.
    ///
    /// A zero dimension or a buffer whose length is not
    /// `width * height * 4` yields an empty sequence and leaves the
    /// cache untouched.
    #[must_use = "returns the draw commands for this frame"]
    pub fn process_raw(
        &mut self,
        data: &[u8],
        width: u32,
        height: u32,
        params: &Parameters,
    ) -> Vec<DrawCommand> {
        match Frame::new(data, width, height) {
            Ok(frame) => self.process(&frame, params),
            Err(e) => {
                log::debug!("skipping frame: {e}");
                Vec::new()
            }
        }
    }

    /// Like [`process`](Self::process) but returns copies of every
    /// intermediate buffer alongside the commands.
    #[must_use = "returns the staged frame"]
    pub fn process_staged(&mut self, frame: &Frame<'_>, params: &Parameters) -> StagedFrame {
        let (ws, commands) = self.run(frame, params);
        StagedFrame {
            intensity: ws.intensity.clone(),
            blurred: ws.blurred.clone(),
            edges: ws.edges.clone(),
            commands,
        }
    }

    /// Like [`process`](Self::process) but also times each stage with
    /// `clock` and collects per-stage metrics.
    #[must_use = "returns the draw commands and diagnostics"]
    pub fn process_with_diagnostics<C: Clock>(
        &mut self,
        frame: &Frame<'_>,
        params: &Parameters,
        clock: &C,
    ) -> (Vec<DrawCommand>, FrameDiagnostics) {
        let total_start = clock.now();
        let dimensions = frame.dimensions();

        let start = clock.now();
        let (kernel, rebuilt) = ensure_kernel(&mut self.kernel, params.blur_radius);
        let kernel_diag = StageDiagnostics {
            duration: clock.elapsed(&start),
            metrics: StageMetrics::Kernel {
                radius: kernel.radius(),
                side: kernel.side(),
                rebuilt,
            },
        };

        let start = clock.now();
        let (ws, reallocated) = Workspace::fit(&mut self.workspace, dimensions);
        grayscale::grayscale_into(frame, &mut ws.intensity);
        let grayscale_diag = StageDiagnostics {
            duration: clock.elapsed(&start),
            metrics: StageMetrics::Grayscale {
                width: dimensions.width,
                height: dimensions.height,
                reallocated,
            },
        };

        let start = clock.now();
        blur::convolve_into(&ws.intensity, kernel, &mut ws.blurred);
        let side = u64::from(2 * kernel.radius() + 1);
        let blur_diag = StageDiagnostics {
            duration: clock.elapsed(&start),
            metrics: StageMetrics::Blur {
                radius: kernel.radius(),
                taps: dimensions.pixel_count() * side * side,
            },
        };

        let start = clock.now();
        edge::detect_edges_into(&ws.blurred, params.gradient_threshold, &mut ws.edges);
        let edge_pixel_count = edge::count_edge_pixels(&ws.edges);
        let edge_diag = StageDiagnostics {
            duration: clock.elapsed(&start),
            metrics: StageMetrics::EdgeDetection {
                threshold: params.gradient_threshold,
                edge_pixel_count,
                total_pixel_count: dimensions.pixel_count(),
            },
        };

        let start = clock.now();
        let commands = grid::render_grid(
            &ws.edges,
            params.cell_size,
            params.stroke_color,
            params.stroke_width,
        );
        let stroke_count = commands.iter().filter(|c| c.is_stroke()).count();
        let grid_diag = StageDiagnostics {
            duration: clock.elapsed(&start),
            metrics: StageMetrics::Grid {
                cell_size: params.cell_size.max(1),
                cells_sampled: grid::cell_count(
                    dimensions.width,
                    dimensions.height,
                    params.cell_size,
                ),
                stroke_count,
            },
        };

        let diagnostics = FrameDiagnostics {
            kernel: kernel_diag,
            grayscale: grayscale_diag,
            blur: blur_diag,
            edge_detection: edge_diag,
            grid: grid_diag,
            total_duration: clock.elapsed(&total_start),
            summary: FrameSummary {
                width: dimensions.width,
                height: dimensions.height,
                pixel_count: dimensions.pixel_count(),
                edge_pixel_count,
                command_count: commands.len(),
            },
        };

        (commands, diagnostics)
    }

    /// Drop the cached kernel and scratch buffers.
    pub fn reset(&mut self) {
        self.kernel = None;
        self.workspace = None;
    }

    /// The kernel used for the most recent frame, if any.
    #[must_use]
    pub const fn cached_kernel(&self) -> Option<&Kernel> {
        self.kernel.as_ref()
    }

    /// Dimensions the scratch buffers are currently sized for, if any.
    #[must_use]
    pub fn workspace_dimensions(&self) -> Option<Dimensions> {
        self.workspace.as_ref().map(|ws| ws.dimensions)
    }
}
