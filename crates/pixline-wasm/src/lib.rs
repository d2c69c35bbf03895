//! Browser binding for the pixline pipeline.
//!
//! Exposes a [`PixelOutliner`] class to JavaScript. The page owns the
//! camera and the animation loop: on every `requestAnimationFrame` it
//! draws the current video frame to an offscreen canvas, reads the pixels
//! back with `getImageData`, and hands them here. The outliner runs the
//! pipeline and either returns the draw commands as JSON or paints them
//! straight onto a visible `CanvasRenderingContext2d`.
//!
//! ```text
//! const outliner = new PixelOutliner();
//! outliner.setParams(JSON.stringify({ cellSize: 6, strokeColor: "#0f0" }));
//! const { data, width, height } = offscreen.getImageData(0, 0, w, h);
//! outliner.processAndDraw(visibleCtx, data, width, height);
//! ```
//!
//! Parameter JSON uses the camelCase keys of
//! [`Parameters`](pixline_pipeline::Parameters); out-of-range values are
//! clamped on the way in.

use pixline_pipeline::{
    DrawCommand, Frame, FrameDiagnostics, FrameError, InstantClock, Parameters, Pipeline, Rgb,
};
use wasm_bindgen::prelude::*;
use web_sys::CanvasRenderingContext2d;

/// Module entry point. Routes Rust panics to the browser console.
#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
}

/// A persistent pipeline plus the current parameter snapshot.
///
/// Keep one instance per video stream so the smoothing kernel and pixel
/// buffers are reused from frame to frame.
#[wasm_bindgen]
#[derive(Debug, Default)]
pub struct PixelOutliner {
    pipeline: Pipeline,
    params: Parameters,
    last_diagnostics: Option<FrameDiagnostics>,
}

#[wasm_bindgen]
impl PixelOutliner {
    /// Create an outliner with default parameters.
    #[wasm_bindgen(constructor)]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the parameters from a JSON object. Missing keys take their
    /// defaults; out-of-range values are clamped.
    ///
    /// # Errors
    ///
    /// Throws if the JSON does not parse.
    #[wasm_bindgen(js_name = setParams)]
    pub fn set_params(&mut self, json: &str) -> Result<(), JsValue> {
        self.params = parse_params(json).map_err(|e| JsValue::from_str(&e))?;
        Ok(())
    }

    /// The current parameters as JSON.
    ///
    /// # Errors
    ///
    /// Throws if serialization fails.
    #[wasm_bindgen(js_name = paramsJson)]
    pub fn params_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.params).map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Process one RGBA frame and return the draw commands as a JSON
    /// array. A malformed frame yields `[]` and a console warning.
    ///
    /// # Errors
    ///
    /// Throws if serialization fails.
    pub fn process(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<String, JsValue> {
        let commands = self.run_or_warn(pixels, width, height);
        serde_json::to_string(&commands).map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Process one RGBA frame and paint the result onto `ctx`.
    ///
    /// Returns the number of squares stroked. A malformed frame leaves
    /// the canvas untouched.
    #[wasm_bindgen(js_name = processAndDraw)]
    pub fn process_and_draw(
        &mut self,
        ctx: &CanvasRenderingContext2d,
        pixels: &[u8],
        width: u32,
        height: u32,
    ) -> usize {
        let commands = self.run_or_warn(pixels, width, height);
        draw(ctx, &commands, width, height)
    }

    /// Diagnostics for the most recent well-formed frame as JSON, or
    /// `undefined` if there is none.
    #[wasm_bindgen(js_name = lastDiagnosticsJson)]
    #[must_use]
    pub fn last_diagnostics_json(&self) -> Option<String> {
        self.last_diagnostics
            .as_ref()
            .and_then(|d| serde_json::to_string(d).ok())
    }

    /// Human-readable report for the most recent well-formed frame.
    #[wasm_bindgen(js_name = lastReport)]
    #[must_use]
    pub fn last_report(&self) -> Option<String> {
        self.last_diagnostics.as_ref().map(FrameDiagnostics::report)
    }

    /// Drop cached kernel, buffers and diagnostics, e.g. when the camera
    /// stops.
    pub fn reset(&mut self) {
        self.pipeline.reset();
        self.last_diagnostics = None;
    }
}

impl PixelOutliner {
    /// Run the pipeline on a raw frame, recording diagnostics.
    fn run(
        &mut self,
        pixels: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Vec<DrawCommand>, FrameError> {
        let frame = Frame::new(pixels, width, height).inspect_err(|_| {
            self.last_diagnostics = None;
        })?;
        let (commands, diagnostics) =
            self.pipeline
                .process_with_diagnostics(&frame, &self.params, &InstantClock);
        self.last_diagnostics = Some(diagnostics);
        Ok(commands)
    }

    fn run_or_warn(&mut self, pixels: &[u8], width: u32, height: u32) -> Vec<DrawCommand> {
        self.run(pixels, width, height).unwrap_or_else(|e| {
            let message = format!("pixline: skipping frame: {e}");
            web_sys::console::warn_1(&JsValue::from_str(&message));
            Vec::new()
        })
    }
}

/// Parse parameter JSON and clamp it into range.
fn parse_params(json: &str) -> Result<Parameters, String> {
    serde_json::from_str::<Parameters>(json)
        .map(Parameters::clamped)
        .map_err(|e| format!("invalid parameters: {e}"))
}

/// Paint `commands` onto a canvas 2D context, skipping redundant style
/// changes between consecutive strokes. Returns the stroke count.
fn draw(
    ctx: &CanvasRenderingContext2d,
    commands: &[DrawCommand],
    width: u32,
    height: u32,
) -> usize {
    let mut stroke_style: Option<(Rgb, f32)> = None;
    let mut strokes = 0;

    for command in commands {
        match *command {
            DrawCommand::FillBackground { color } => {
                ctx.set_fill_style_str(&color.to_string());
                ctx.fill_rect(0.0, 0.0, f64::from(width), f64::from(height));
            }
            DrawCommand::StrokeSquare {
                x,
                y,
                size,
                color,
                width: line_width,
            } => {
                if stroke_style != Some((color, line_width)) {
                    ctx.set_stroke_style_str(&color.to_string());
                    ctx.set_line_width(f64::from(line_width));
                    stroke_style = Some((color, line_width));
                }
                let side = f64::from(size);
                ctx.stroke_rect(f64::from(x), f64::from(y), side, side);
                strokes += 1;
            }
        }
    }

    strokes
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn params_parse_and_clamp() {
        let params =
            parse_params(r##"{"cellSize": 50, "blurRadius": 2, "strokeColor": "#0f0"}"##).unwrap();
        assert_eq!(params.cell_size, Parameters::MAX_CELL_SIZE);
        assert_eq!(params.blur_radius, 2);
        assert_eq!(params.stroke_color, Rgb::new(0, 255, 0));
        assert_eq!(params.gradient_threshold, Parameters::DEFAULT_GRADIENT_THRESHOLD);
    }

    #[test]
    fn bad_params_are_reported() {
        assert!(parse_params("not json").is_err());
        assert!(parse_params(r##"{"strokeColor": "#zzz"}"##).is_err());
    }

    #[test]
    fn run_records_diagnostics_and_clears_on_bad_frame() {
        let mut outliner = PixelOutliner::new();
        let pixels = vec![90u8; 12 * 10 * 4];

        let commands = outliner.run(&pixels, 12, 10).unwrap();
        assert_eq!(commands.len(), 1);
        assert!(outliner.last_diagnostics_json().is_some());

        assert!(outliner.run(&pixels, 13, 10).is_err());
        assert!(outliner.last_diagnostics_json().is_none());
    }
}
