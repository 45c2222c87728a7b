// ============================================================================
// TexPaint CLI: headless engine driver
// ============================================================================
//
// Usage examples:
//   texpaint --width 1920 --height 1080 --layers 4
//   texpaint -W 512 -H 512 --seed 10,10 --fill '#ff8000' --tolerance 40
//   texpaint --config texpaint.cfg --log session.log --verbose
//
// Builds a document in memory, paints a frame on each extra layer, runs the
// fill and magic-wand tools on the top layer, flattens the stack and prints a
// summary.  Nothing is written to disk except the optional session log.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::Parser;
use image::Rgba;

use crate::canvas::{PixelBuffer, Rect};
use crate::components::layers::LayerStack;
use crate::components::tools;
use crate::compositor;
use crate::error::Result;
use crate::settings::EngineSettings;
use crate::{log_err, log_info, logger};

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// TexPaint headless engine driver.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "texpaint",
    about = "TexPaint headless raster engine driver",
    long_about = "Build a layered document in memory, run the fill and magic-wand\n\
                  tools on it and composite the result. Prints a summary with a\n\
                  checksum of the flattened pixels; no image files are written."
)]
pub struct CliArgs {
    /// Document width in pixels.
    #[arg(short = 'W', long, default_value_t = 512)]
    pub width: u32,

    /// Document height in pixels.
    #[arg(short = 'H', long, default_value_t = 512)]
    pub height: u32,

    /// Total number of layers, including the background.
    #[arg(short, long, default_value_t = 3, value_parser = clap::value_parser!(u32).range(1..=256))]
    pub layers: u32,

    /// Seed point for the fill and magic-wand tools, as `X,Y`.
    #[arg(short, long, default_value = "0,0", value_parser = parse_point)]
    pub seed: (u32, u32),

    /// Magic-wand tolerance (0-255).  Defaults to the configured value.
    #[arg(short, long)]
    pub tolerance: Option<u8>,

    /// Fill colour as `#RRGGBB` or `#RRGGBBAA`.
    #[arg(short, long, default_value = "#3366ff", value_parser = parse_color)]
    pub fill: Rgba<u8>,

    /// Background colour as `#RRGGBB` or `#RRGGBBAA`.
    #[arg(short, long, default_value = "#ffffff", value_parser = parse_color)]
    pub background: Rgba<u8>,

    /// Settings file (`key=value` lines).  Missing files use defaults.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Write a session log to this file.
    #[arg(long, value_name = "FILE")]
    pub log: Option<PathBuf>,

    /// Print per-stage timing information.
    #[arg(short, long)]
    pub verbose: bool,
}

/// What one driver run produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Summary {
    pub width: u32,
    pub height: u32,
    pub layers: usize,
    pub filled: u64,
    pub selected: usize,
    pub selection_bounds: Rect,
    pub checksum: u64,
}

#[derive(Default, Debug)]
struct Timings {
    build: Duration,
    fill: Duration,
    select: Duration,
    composite: Duration,
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run the driver and return an OS exit code.
pub fn run(args: CliArgs) -> ExitCode {
    if let Some(path) = &args.log
        && let Err(e) = logger::init(path)
    {
        eprintln!("warning: could not open log '{}': {}", path.display(), e);
    }

    let settings = match &args.config {
        Some(path) => match EngineSettings::load(path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("error: could not read settings '{}': {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => EngineSettings::default(),
    };

    match execute(&args, &settings) {
        Ok((summary, timings)) => {
            print_summary(&summary);
            if args.verbose {
                print_timings(&timings);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            log_err!("driver failed: {}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

// ============================================================================
// Pipeline
// ============================================================================

fn execute(args: &CliArgs, settings: &EngineSettings) -> Result<(Summary, Timings)> {
    let mut timings = Timings::default();

    // -- Step 1: Build ---------------------------------------------------
    let start = Instant::now();
    let mut stack = build_document(args, settings)?;
    timings.build = start.elapsed();

    // -- Step 2: Tools ---------------------------------------------------
    let start = Instant::now();
    let outcome = tools::fill_active(&mut stack, args.seed, args.fill)?;
    timings.fill = start.elapsed();

    let start = Instant::now();
    let tolerance = args.tolerance.unwrap_or(settings.default_tolerance);
    let selection = tools::select_on_active(&stack, args.seed, tolerance, false)?;
    timings.select = start.elapsed();

    // -- Step 3: Flatten -------------------------------------------------
    let start = Instant::now();
    let flat = compositor::composite_with(&stack, settings)?;
    timings.composite = start.elapsed();

    let summary = Summary {
        width: stack.width(),
        height: stack.height(),
        layers: stack.len(),
        filled: outcome.filled,
        selected: selection.len(),
        selection_bounds: selection.bounds(),
        checksum: checksum(&flat),
    };
    log_info!(
        "driver run: {}x{}, {} layers, filled {} px, selected {} px, checksum {:016x}",
        summary.width,
        summary.height,
        summary.layers,
        summary.filled,
        summary.selected,
        summary.checksum
    );
    Ok((summary, timings))
}

/// Background in the requested colour plus one framed layer per extra layer,
/// each frame inset further than the one below.
fn build_document(args: &CliArgs, settings: &EngineSettings) -> Result<LayerStack> {
    let mut stack = LayerStack::with_settings(args.width, args.height, settings)?;
    stack.active_buffer_mut().fill(args.background);

    let radius = settings.default_brush_radius.max(1);
    for i in 1..args.layers {
        stack.add_layer(None);
        let inset = (i as i64) * (radius as i64 * 3);
        let (x0, y0) = (inset, inset);
        let (x1, y1) = (args.width as i64 - 1 - inset, args.height as i64 - 1 - inset);
        let color = frame_color(i);
        tools::brush_line(&mut stack, (x0, y0), (x1, y0), radius, color)?;
        tools::brush_line(&mut stack, (x1, y0), (x1, y1), radius, color)?;
        tools::brush_line(&mut stack, (x1, y1), (x0, y1), radius, color)?;
        tools::brush_line(&mut stack, (x0, y1), (x0, y0), radius, color)?;
        let index = stack.active_index();
        stack.set_opacity(index, 0.75)?;
    }
    Ok(stack)
}

fn frame_color(i: u32) -> Rgba<u8> {
    let v = (i.wrapping_mul(97) % 256) as u8;
    Rgba([v, 255 - v, v / 2 + 64, 255])
}

/// FNV-1a over the raw composite bytes.
fn checksum(buffer: &PixelBuffer) -> u64 {
    buffer
        .as_raw()
        .iter()
        .fold(0xcbf2_9ce4_8422_2325u64, |h, &b| (h ^ b as u64).wrapping_mul(0x0100_0000_01b3))
}

fn print_summary(s: &Summary) {
    println!("document   {}x{} ({} layers)", s.width, s.height, s.layers);
    println!("filled     {} px", s.filled);
    println!(
        "selected   {} px in ({}, {})..=({}, {})",
        s.selected,
        s.selection_bounds.x,
        s.selection_bounds.y,
        s.selection_bounds.max_x(),
        s.selection_bounds.max_y()
    );
    println!("checksum   {:016x}", s.checksum);
}

fn print_timings(t: &Timings) {
    let ms = |d: Duration| d.as_secs_f64() * 1000.0;
    println!("build      {:.2}ms", ms(t.build));
    println!("fill       {:.2}ms", ms(t.fill));
    println!("select     {:.2}ms", ms(t.select));
    println!("composite  {:.2}ms", ms(t.composite));
}

// ============================================================================
// Argument parsers
// ============================================================================

/// Parse `X,Y` into a pixel coordinate.
fn parse_point(s: &str) -> std::result::Result<(u32, u32), String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y but got '{}'", s))?;
    let x = x.trim().parse().map_err(|e| format!("bad X '{}': {}", x, e))?;
    let y = y.trim().parse().map_err(|e| format!("bad Y '{}': {}", y, e))?;
    Ok((x, y))
}

/// Parse `#RRGGBB` / `#RRGGBBAA` (leading `#` optional).
fn parse_color(s: &str) -> std::result::Result<Rgba<u8>, String> {
    let hex = s.trim().trim_start_matches('#');
    if !(hex.len() == 6 || hex.len() == 8) || !hex.is_ascii() {
        return Err(format!("expected #RRGGBB or #RRGGBBAA but got '{}'", s));
    }
    let channel = |i: usize| {
        u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).map_err(|e| format!("bad colour '{}': {}", s, e))
    };
    let a = if hex.len() == 8 { channel(3)? } else { 255 };
    Ok(Rgba([channel(0)?, channel(1)?, channel(2)?, a]))
}
