//! pixline-bench: CLI tool for timing the pipeline over a frame stream.
//!
//! Decodes one or more still images and feeds them to a single
//! [`Pipeline`] as if they were consecutive camera frames, printing
//! per-stage diagnostics for every frame. Useful for:
//!
//! - Measuring per-stage durations at realistic frame sizes
//! - Seeing how the kernel cache and buffer reuse behave when the radius
//!   or frame size changes mid-stream
//! - Tuning cell size, threshold and blur radius against real footage
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin pixline-bench -- [OPTIONS] <IMAGE>...
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::Parser;
use pixline_pipeline::diagnostics::{Clock, FrameDiagnostics, duration_ms};
use pixline_pipeline::{Frame, Parameters, Pipeline, Rgb, RgbaImage};

/// Frame-stream timing and diagnostics for pixline.
///
/// Images are decoded once and cycled through as frames. Each frame is
/// processed by the same pipeline, so caches carry over between frames.
#[derive(Parser)]
#[command(name = "pixline-bench", version)]
struct Cli {
    /// Input images (PNG, JPEG, BMP, WebP), cycled as frames.
    #[arg(required = true)]
    images: Vec<PathBuf>,

    /// Grid cell size in pixels.
    #[arg(long, default_value_t = Parameters::DEFAULT_CELL_SIZE)]
    cell_size: u32,

    /// Gradient magnitude threshold.
    #[arg(long, default_value_t = Parameters::DEFAULT_GRADIENT_THRESHOLD)]
    threshold: u32,

    /// Smoothing kernel radius (0 disables smoothing).
    #[arg(long, default_value_t = Parameters::DEFAULT_BLUR_RADIUS)]
    blur_radius: u32,

    /// Outline color as CSS hex (`#00f`, `#0000ff`).
    #[arg(long, default_value_t = Parameters::DEFAULT_STROKE_COLOR)]
    stroke_color: Rgb,

    /// Outline width in pixels.
    #[arg(long, default_value_t = Parameters::DEFAULT_STROKE_WIDTH)]
    stroke_width: f32,

    /// Number of frames to process (defaults to one per image).
    #[arg(long, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    frames: Option<usize>,

    /// Also rasterize each frame's commands and time the renderer.
    #[arg(long)]
    render: bool,

    /// Output diagnostics as JSON instead of human-readable report.
    #[arg(long)]
    json: bool,

    /// Full parameter set as a JSON string.
    ///
    /// When provided, all other parameter flags are ignored. The JSON
    /// uses the same camelCase keys the browser parameter provider sends.
    #[arg(long)]
    params_json: Option<String>,
}

/// Build [`Parameters`] from CLI arguments.
///
/// If `--params-json` is provided, the JSON is parsed directly and all
/// individual parameter flags are ignored.
fn params_from_cli(cli: &Cli) -> Result<Parameters, String> {
    if let Some(ref json) = cli.params_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --params-json: {e}"));
    }

    Ok(Parameters {
        cell_size: cli.cell_size,
        gradient_threshold: cli.threshold,
        blur_radius: cli.blur_radius,
        stroke_color: cli.stroke_color,
        stroke_width: cli.stroke_width,
    })
}

fn load_frames(paths: &[PathBuf]) -> Result<Vec<RgbaImage>, String> {
    paths
        .iter()
        .map(|path| {
            let img = image::open(path)
                .map_err(|e| format!("Error decoding {}: {e}", path.display()))?
                .to_rgba8();
            log::debug!(
                "decoded {} as {}x{}",
                path.display(),
                img.width(),
                img.height()
            );
            Ok(img)
        })
        .collect()
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let requested = match params_from_cli(&cli) {
        Ok(p) => p,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };
    let params = requested.clamped();
    if params != requested {
        log::warn!("parameters out of range, clamped to {params:?}");
    }

    let images = match load_frames(&cli.images) {
        Ok(images) => images,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };
    let frame_count = cli.frames.unwrap_or(images.len());

    eprintln!("Images: {}", cli.images.len());
    eprintln!("Params: {params:#?}");
    eprintln!("Frames: {frame_count}");
    eprintln!();

    let mut pipeline = Pipeline::new();
    let mut all_diagnostics = Vec::with_capacity(frame_count);
    let mut render_durations = Vec::new();

    for (index, img) in images.iter().cycle().take(frame_count).enumerate() {
        if frame_count > 1 {
            eprintln!("--- Frame {}/{} ---", index + 1, frame_count);
        }

        let frame = match Frame::from_rgba(img) {
            Ok(frame) => frame,
            Err(e) => {
                eprintln!("Frame error: {e}");
                return ExitCode::FAILURE;
            }
        };

        let (commands, diagnostics) =
            pipeline.process_with_diagnostics(&frame, &params, &StdClock);

        if cli.json {
            match serde_json::to_string_pretty(&diagnostics) {
                Ok(json) => println!("{json}"),
                Err(e) => {
                    eprintln!("Error serializing diagnostics: {e}");
                    return ExitCode::FAILURE;
                }
            }
        } else {
            println!("{}", diagnostics.report());
        }

        if cli.render {
            let start = StdClock.now();
            match pixline_render::render(&commands, img.width(), img.height()) {
                Ok(_) => {
                    let elapsed = StdClock.elapsed(&start);
                    eprintln!("Render: {:.3}ms", duration_ms(elapsed));
                    render_durations.push(elapsed);
                }
                Err(e) => {
                    eprintln!("Render error: {e}");
                    return ExitCode::FAILURE;
                }
            }
        }

        all_diagnostics.push(diagnostics);

        if frame_count > 1 {
            eprintln!();
        }
    }

    if frame_count > 1 {
        print_multi_frame_summary(&all_diagnostics, &render_durations);
    }

    ExitCode::SUCCESS
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}

/// Min, mean and max of a set of millisecond samples.
#[allow(clippy::cast_precision_loss)]
fn spread(samples: &[f64]) -> (f64, f64, f64) {
    let min = samples.iter().copied().reduce(f64::min).unwrap_or(0.0);
    let max = samples.iter().copied().reduce(f64::max).unwrap_or(0.0);
    let mean = if samples.is_empty() {
        0.0
    } else {
        samples.iter().sum::<f64>() / samples.len() as f64
    };
    (min, mean, max)
}

/// Print aggregated statistics across all frames.
#[allow(clippy::cast_precision_loss)]
fn print_multi_frame_summary(all_diagnostics: &[FrameDiagnostics], render_durations: &[Duration]) {
    println!();
    println!(
        "Summary ({} frames)\n{}",
        all_diagnostics.len(),
        "=".repeat(60),
    );

    if all_diagnostics.is_empty() {
        println!("Warning: no diagnostics to summarize");
        return;
    }

    let totals: Vec<f64> = all_diagnostics
        .iter()
        .map(|d| duration_ms(d.total_duration))
        .collect();
    let (min, mean, max) = spread(&totals);
    println!("Frame duration: min={min:.3}ms  mean={mean:.3}ms  max={max:.3}ms");
    if mean > 0.0 {
        println!("Throughput: {:.1} frames/s", 1000.0 / mean);
    }

    if !render_durations.is_empty() {
        let renders: Vec<f64> = render_durations.iter().copied().map(duration_ms).collect();
        let (min, mean, max) = spread(&renders);
        println!("Render duration: min={min:.3}ms  mean={mean:.3}ms  max={max:.3}ms");
    }

    println!();
    println!("{:<24} {:>12}", "Stage", "Mean (ms)");
    println!("{}", "-".repeat(40));

    for (stage, (name, _)) in all_diagnostics[0].stages().into_iter().enumerate() {
        let samples: Vec<f64> = all_diagnostics
            .iter()
            .map(|d| duration_ms(d.stages()[stage].1.duration))
            .collect();
        let (_, stage_mean, _) = spread(&samples);
        println!("{name:<24} {stage_mean:>10.3}ms");
    }

    let strokes: Vec<f64> = all_diagnostics
        .iter()
        .map(|d| d.summary.command_count.saturating_sub(1) as f64)
        .collect();
    let (min, mean, max) = spread(&strokes);
    println!();
    println!("Strokes per frame: min={min:.0}  mean={mean:.1}  max={max:.0}");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn flags_build_parameters() {
        let cli = Cli::parse_from([
            "pixline-bench",
            "frame.png",
            "--cell-size",
            "4",
            "--threshold",
            "90",
            "--stroke-color",
            "#f80",
        ]);
        let params = params_from_cli(&cli).unwrap();
        assert_eq!(params.cell_size, 4);
        assert_eq!(params.gradient_threshold, 90);
        assert_eq!(params.blur_radius, Parameters::DEFAULT_BLUR_RADIUS);
        assert_eq!(params.stroke_color, Rgb::new(0xff, 0x88, 0x00));
    }

    #[test]
    fn params_json_overrides_flags() {
        let cli = Cli::parse_from([
            "pixline-bench",
            "a.png",
            "b.png",
            "--cell-size",
            "4",
            "--params-json",
            r#"{"cellSize": 12}"#,
        ]);
        assert_eq!(cli.images.len(), 2);
        let params = params_from_cli(&cli).unwrap();
        assert_eq!(params.cell_size, 12);
        assert_eq!(params.gradient_threshold, Parameters::DEFAULT_GRADIENT_THRESHOLD);
    }

    #[test]
    fn bad_color_is_rejected() {
        assert!(
            Cli::try_parse_from(["pixline-bench", "a.png", "--stroke-color", "blue"]).is_err()
        );
    }

    #[test]
    fn spread_of_samples() {
        assert_eq!(spread(&[2.0, 4.0, 6.0]), (2.0, 4.0, 6.0));
        assert_eq!(spread(&[]), (0.0, 0.0, 0.0));
    }
}
