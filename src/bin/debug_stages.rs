//! Debug tool that dumps every pipeline stage to PNG
//! Writes NN-stage.png per stage into the output directory and prints timings

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use terrain_shaper::{select_engine, Bitmap, Stage, TerrainGenerator, TerrainOptions, TerrainTemplate};

#[derive(Parser, Debug)]
#[command(name = "debug_stages")]
#[command(about = "Dump each terrain pipeline stage to PNG")]
struct Args {
    /// Template image
    #[arg(short, long)]
    template: PathBuf,

    /// JSON options file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seed in [0, 1)
    #[arg(short, long, default_value = "0.5")]
    seed: f64,

    /// Directory for the stage images
    #[arg(short, long, default_value = "stages")]
    out_dir: PathBuf,

    /// Run convolutions on the GPU when one is available
    #[arg(long)]
    gpu: bool,

    /// Also mark this many surface points on the final image
    #[arg(short, long, default_value = "32")]
    points: usize,
}

fn main() {
    let args = Args::parse();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("terrain_shaper=debug"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Err(err) = run(&args) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> terrain_shaper::Result<()> {
    let options = match &args.config {
        Some(path) => TerrainOptions::from_file(path)?,
        None => TerrainOptions::default(),
    };
    let (w, h) = options.working_size();
    let template = Arc::new(TerrainTemplate::load(&args.template, w, h)?);
    let coverage = options.coverage_channel();
    let mut generator = TerrainGenerator::new(options, template, select_engine(args.gpu))?;

    fs::create_dir_all(&args.out_dir)?;
    println!("Dumping stages for seed {} into {}", args.seed, args.out_dir.display());

    let mut timings: Vec<(Stage, Duration)> = Vec::new();
    let mut save_error = None;
    let mut clock = Instant::now();
    let mask = generator.generate_with(args.seed, |stage, bitmap| {
        timings.push((stage, clock.elapsed()));
        let index = timings.len();
        let path = args.out_dir.join(format!("{:02}-{}.png", index, stage.name()));
        if let Err(err) = bitmap.save_png(&path) {
            if save_error.is_none() {
                save_error = Some(err);
            }
        }
        clock = Instant::now();
    })?;
    if let Some(err) = save_error {
        return Err(err);
    }

    let mut marked = mask.clone();
    for _ in 0..args.points {
        let (x, y) = generator.surface_point(0.0)?;
        mark(&mut marked, x, y);
    }
    let path = args.out_dir.join(format!("{:02}-surface-points.png", timings.len() + 1));
    marked.save_png(&path)?;

    let points = generator.sampler().map_or(0, |s| s.points().len());
    println!();
    println!("{:<18} {:>10}", "stage", "ms");
    let mut total = Duration::ZERO;
    for (stage, elapsed) in &timings {
        total += *elapsed;
        println!("{:<18} {:>10.2}", stage.name(), elapsed.as_secs_f64() * 1000.0);
    }
    println!("{:<18} {:>10.2}", "total", total.as_secs_f64() * 1000.0);
    println!("coverage channel {:?}, {} pickable surface points", coverage, points);
    Ok(())
}

/// Paint a small opaque green cross at (x, y).
fn mark(bitmap: &mut Bitmap, x: usize, y: usize) {
    let (w, h) = bitmap.dimensions();
    for d in -2isize..=2 {
        for (px, py) in [(x as isize + d, y as isize), (x as isize, y as isize + d)] {
            if px >= 0 && py >= 0 && (px as usize) < w && (py as usize) < h {
                bitmap.set_pixel(px as usize, py as usize, [0, 255, 0, 255]);
            }
        }
    }
}
