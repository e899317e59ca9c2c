use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use terrain_shaper::{select_engine, TemplateCache, TerrainGenerator, TerrainOptions};

#[derive(Parser, Debug)]
#[command(name = "terrain_shaper")]
#[command(about = "Generate a 2D terrain silhouette mask from a template image")]
struct Args {
    /// Template image (scaled to half the output size)
    #[arg(short, long)]
    template: PathBuf,

    /// Output mask width in pixels (even)
    #[arg(short = 'W', long)]
    width: Option<usize>,

    /// Output mask height in pixels (even)
    #[arg(short = 'H', long)]
    height: Option<usize>,

    /// Seed in [0, 1) (random if not specified)
    #[arg(short, long)]
    seed: Option<f64>,

    /// Noise feature size in template pixels
    #[arg(long)]
    noise_resolution: Option<f64>,

    /// Noise feature size over black template zones
    #[arg(long)]
    noise_resolution_black: Option<f64>,

    /// Noise wall threshold
    #[arg(long)]
    noise_threshold: Option<f64>,

    /// JSON options file; command-line flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output PNG path
    #[arg(short, long, default_value = "terrain.png")]
    output: PathBuf,

    /// Number of surface points to print
    #[arg(short, long, default_value = "0")]
    points: usize,

    /// Halton offset in [0, 1) for surface points (random if not specified)
    #[arg(long)]
    offset: Option<f64>,

    /// Run convolutions on the GPU when one is available
    #[arg(long)]
    gpu: bool,

    /// Keep the red mask instead of moving coverage to alpha
    #[arg(long)]
    keep_channels: bool,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn options(&self) -> terrain_shaper::Result<TerrainOptions> {
        let mut options = match &self.config {
            Some(path) => TerrainOptions::from_file(path)?,
            None => TerrainOptions::default(),
        };
        if let Some(width) = self.width {
            options.width = width;
        }
        if let Some(height) = self.height {
            options.height = height;
        }
        if let Some(res) = self.noise_resolution {
            options.noise_resolution = res;
        }
        if let Some(res) = self.noise_resolution_black {
            options.noise_resolution_black = res;
        }
        if let Some(threshold) = self.noise_threshold {
            options.noise_threshold = threshold;
        }
        if self.keep_channels {
            options.black_to_alpha = false;
        }
        options.validate()?;
        Ok(options)
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("terrain_shaper={level}")));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn run(args: &Args) -> terrain_shaper::Result<()> {
    let options = args.options()?;
    let seed = args.seed.unwrap_or_else(rand::random::<f64>);

    println!("Generating terrain with seed: {}", seed);
    println!("Mask size: {}x{}", options.width, options.height);

    let (w, h) = options.working_size();
    let templates = TemplateCache::new();
    let template = templates.get_or_load(&args.template, w, h)?;
    println!(
        "Template: {} ({} core contour points, {} border points)",
        args.template.display(),
        template.foreground_points().len(),
        template.background_points().len()
    );

    let engine = select_engine(args.gpu);
    println!("Convolution engine: {}", engine.name());

    let mut generator = TerrainGenerator::new(options, Arc::clone(&template), engine)?;
    let mask = generator.generate(seed)?;
    mask.save_png(&args.output)?;
    println!("Saved {}", args.output.display());

    if args.points > 0 {
        let offset = args.offset.unwrap_or_else(rand::random::<f64>);
        println!("Surface points (offset {}):", offset);
        for _ in 0..args.points {
            let (x, y) = generator.surface_point(offset)?;
            println!("  {} {}", x, y);
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
