//! Render the heat equation to a sequence of PNG frames.
//!
//! Usage: `render [--size 1080] [--impl parallel] [--frames N] [--steps N]`

use anyhow::Context;
use cgmath::vec2;
use clap::{Parser, ValueEnum};
use heatrs::d2::{default_field, estimate_dt, Solver};
use ndarray::{s, Array2};
use std::fs;
use std::path::PathBuf;
use std::process;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Size {
    #[value(name = "720")]
    Hd,
    #[value(name = "1080")]
    FullHd,
    #[value(name = "4k")]
    Uhd4k,
    #[value(name = "8k")]
    Uhd8k,
}

impl Size {
    fn dimensions(self) -> (usize, usize) {
        match self {
            Size::Hd => (1280, 720),
            Size::FullHd => (1920, 1080),
            Size::Uhd4k => (3840, 2160),
            Size::Uhd8k => (7680, 4320),
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Impl {
    Sequential,
    Parallel,
}

impl From<Impl> for Solver {
    fn from(i: Impl) -> Self {
        match i {
            Impl::Sequential => Solver::Sequential,
            Impl::Parallel => Solver::Parallel,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "render")]
#[command(about = "Render the 2D heat equation to PNG frames")]
struct Args {
    /// Width of the field
    #[arg(long, default_value_t = 640)]
    width: usize,

    /// Height of the field
    #[arg(long, default_value_t = 480)]
    height: usize,

    /// Preset size, overrides width and height
    #[arg(long, value_enum)]
    size: Option<Size>,

    /// Diffusion constant
    #[arg(long, default_value_t = 0.5)]
    diffusion: f64,

    /// Physical distance between neighbouring cells, both axes
    #[arg(long, default_value_t = 0.01)]
    spacing: f64,

    /// Evolver used to step the field
    #[arg(short, long = "impl", value_enum, default_value_t = Impl::Sequential)]
    implementation: Impl,

    /// Number of frames to render
    #[arg(long, default_value_t = 1000)]
    frames: usize,

    /// Evolution steps between frames
    #[arg(long, default_value_t = 10)]
    steps: usize,

    /// Directory the frames are written to
    #[arg(long = "out-dir", default_value = "out")]
    out_dir: PathBuf,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt().with_env_filter(filter).with_target(false).init();
}

fn interior_mean(field: &Array2<f64>) -> Option<f64> {
    let (w, h) = field.dim();
    if w < 3 || h < 3 {
        return None;
    }
    field.slice(s![1..-1, 1..-1]).mean()
}

fn run(args: &Args) -> anyhow::Result<()> {
    let (w, h) = args
        .size
        .map(Size::dimensions)
        .unwrap_or((args.width, args.height));
    let spacing = vec2(args.spacing, args.spacing);
    let solver = Solver::from(args.implementation);

    let dt = estimate_dt(spacing, args.diffusion)?;
    let mut field = default_field((w, h))?;

    // Fixed colour range so frames are comparable.
    let range = field
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &t| {
            (lo.min(t), hi.max(t))
        });

    fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("failed to create {}", args.out_dir.display()))?;

    info!(w, h, dt, ?solver, "rendering {} frames", args.frames);

    for f in 1..=args.frames {
        image_util::save_heatmap(&args.out_dir, "heat", f, &field, range)?;

        field = solver.evolve(&field, spacing, args.diffusion, dt, args.steps)?;

        if let Some(avg) = interior_mean(&field) {
            info!(frame = f, "avg temp: {:5.3}", avg);
        }
    }

    Ok(())
}

fn main() {
    init_logging();

    let args = Args::parse();

    if let Err(e) = run(&args) {
        error!("{:#}", e);
        process::exit(1);
    }
}
