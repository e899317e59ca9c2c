//! Terrain generation pipeline
//!
//! Turns a template and a seed into a final terrain mask:
//! noise walls, flood fills, morphological cleanup, then hq2x upscaling.
//! The last mask also backs a surface sampler for placing entities.

use std::sync::Arc;
use std::time::Instant;

use crate::bitmap::{Bitmap, Channel};
use crate::config::TerrainOptions;
use crate::convolution::{ConvolutionEngine, CpuConvolution};
use crate::error::{Result, TerrainError};
use crate::flood_fill::flood_fill;
use crate::hq2x;
use crate::morphology::MorphologyPipeline;
use crate::noise_field::{apply_noise_walls, NoiseField};
use crate::surface::SurfaceSampler;
use crate::template::TerrainTemplate;

/// Red value that stops a flood fill.
const FILL_THRESHOLD: u8 = 255;

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Copy of the template.
    Template,
    /// Noise walls scattered over open space.
    NoiseWalls,
    /// Open space reachable from the template core, filled.
    CoreFill,
    /// Remaining noise walls cleared.
    WallCleanup,
    /// Dilation passes.
    Dilation,
    /// Background reachable from the border, marked green.
    BackgroundFill,
    /// Background cleared, everything else made terrain.
    HoleRemoval,
    /// Erosion passes.
    Erosion,
    /// hq2x upscale to final size.
    Upscale,
    /// Coverage moved to alpha.
    BlackToAlpha,
}

impl Stage {
    pub const ALL: [Stage; 10] = [
        Stage::Template,
        Stage::NoiseWalls,
        Stage::CoreFill,
        Stage::WallCleanup,
        Stage::Dilation,
        Stage::BackgroundFill,
        Stage::HoleRemoval,
        Stage::Erosion,
        Stage::Upscale,
        Stage::BlackToAlpha,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Template => "template",
            Stage::NoiseWalls => "noise-walls",
            Stage::CoreFill => "core-fill",
            Stage::WallCleanup => "wall-cleanup",
            Stage::Dilation => "dilation",
            Stage::BackgroundFill => "background-fill",
            Stage::HoleRemoval => "hole-removal",
            Stage::Erosion => "erosion",
            Stage::Upscale => "upscale",
            Stage::BlackToAlpha => "black-to-alpha",
        }
    }
}

/// Builds terrain masks from one template.
pub struct TerrainGenerator {
    options: TerrainOptions,
    template: Arc<TerrainTemplate>,
    engine: Arc<dyn ConvolutionEngine>,
    morphology: MorphologyPipeline,
    sampler: Option<SurfaceSampler>,
}

impl TerrainGenerator {
    /// Validate `options` and check the template matches the working size.
    pub fn new(
        options: TerrainOptions,
        template: Arc<TerrainTemplate>,
        engine: Arc<dyn ConvolutionEngine>,
    ) -> Result<Self> {
        options.validate()?;
        let (width, height) = options.working_size();
        let (actual_width, actual_height) = template.dimensions();
        if (actual_width, actual_height) != (width, height) {
            return Err(TerrainError::TemplateSize {
                width,
                height,
                actual_width,
                actual_height,
            });
        }
        Ok(Self {
            options,
            template,
            morphology: MorphologyPipeline::new(Arc::clone(&engine)),
            engine,
            sampler: None,
        })
    }

    /// Generator running convolutions on the CPU.
    pub fn with_cpu(options: TerrainOptions, template: Arc<TerrainTemplate>) -> Result<Self> {
        Self::new(options, template, Arc::new(CpuConvolution::new()))
    }

    pub fn options(&self) -> &TerrainOptions {
        &self.options
    }

    pub fn template(&self) -> &TerrainTemplate {
        &self.template
    }

    /// Sampler built by the last successful generation.
    pub fn sampler(&self) -> Option<&SurfaceSampler> {
        self.sampler.as_ref()
    }

    /// Generate the final mask for `seed` in [0, 1).
    pub fn generate(&mut self, seed: f64) -> Result<Bitmap> {
        self.generate_with(seed, |_, _| {})
    }

    /// Like [`generate`](Self::generate), handing every intermediate bitmap to `observer`.
    pub fn generate_with<F>(&mut self, seed: f64, mut observer: F) -> Result<Bitmap>
    where
        F: FnMut(Stage, &Bitmap),
    {
        let field = NoiseField::new(seed)?;
        self.sampler = None;
        let started = Instant::now();
        let opts = &self.options;

        let mut clock = Instant::now();
        let mut finish = |stage: Stage, bitmap: &Bitmap, count: usize| {
            tracing::debug!(
                target: "terrain_shaper::generator",
                stage = stage.name(),
                elapsed_ms = clock.elapsed().as_secs_f64() * 1000.0,
                count,
                "stage done"
            );
            observer(stage, bitmap);
            clock = Instant::now();
        };

        let mut terrain = self.template.bitmap().clone();
        let core = terrain.count_where(Channel::R, |r| r >= 200);
        finish(Stage::Template, &terrain, core);

        let walls = apply_noise_walls(
            &mut terrain,
            &field,
            opts.noise_resolution,
            opts.noise_resolution_black,
            opts.noise_threshold,
        );
        finish(Stage::NoiseWalls, &terrain, walls);

        let filled = flood_fill(
            &mut terrain,
            self.template.foreground_points(),
            Channel::R,
            FILL_THRESHOLD,
        );
        finish(Stage::CoreFill, &terrain, filled);

        let cleared = clear_noise_walls(&mut terrain);
        finish(Stage::WallCleanup, &terrain, cleared);

        let mut terrain = self.morphology.dilate(terrain, opts.dilation_passes)?;
        let count = terrain.count_where(Channel::R, |r| r == 255);
        finish(Stage::Dilation, &terrain, count);

        let background = flood_fill(
            &mut terrain,
            self.template.background_points(),
            Channel::G,
            FILL_THRESHOLD,
        );
        finish(Stage::BackgroundFill, &terrain, background);

        let solid = remove_holes(&mut terrain);
        finish(Stage::HoleRemoval, &terrain, solid);

        let terrain = self.morphology.erode(terrain, opts.erosion_passes)?;
        let count = terrain.count_where(Channel::R, |r| r == 255);
        finish(Stage::Erosion, &terrain, count);

        let mut mask = hq2x::upscale(&terrain)?;
        let count = mask.count_where(Channel::R, |r| r > 127);
        finish(Stage::Upscale, &mask, count);

        if opts.black_to_alpha {
            hq2x::black_to_alpha(&mut mask);
            let count = mask.count_where(Channel::A, |a| a > 127);
            finish(Stage::BlackToAlpha, &mask, count);
        }

        let sampler = SurfaceSampler::new(
            &mask,
            opts.coverage_channel(),
            &opts.sampler,
            self.engine.as_ref(),
        )?;
        tracing::info!(
            target: "terrain_shaper::generator",
            seed,
            width = mask.width(),
            height = mask.height(),
            engine = self.engine.name(),
            surface_points = sampler.points().len(),
            elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
            "terrain generated"
        );
        self.sampler = Some(sampler);
        Ok(mask)
    }

    /// Next surface point of the last generated terrain.
    pub fn surface_point(&mut self, offset: f64) -> Result<(usize, usize)> {
        self.sampler
            .as_mut()
            .ok_or(TerrainError::NotReady("surface sampler"))?
            .surface_point(offset)
    }
}

/// Turn leftover walls back into open space, keeping template terrain.
fn clear_noise_walls(bitmap: &mut Bitmap) -> usize {
    let mut cleared = 0;
    for px in bitmap.pixels_mut() {
        if px[0] == 255 && px[1] == 255 {
            px[0] = if px[2] == 255 { 255 } else { 0 };
            px[1] = 0;
            cleared += 1;
        }
    }
    cleared
}

/// Clear background pixels and make every other pixel terrain, closing any
/// enclosed hole. Returns the terrain pixel count.
fn remove_holes(bitmap: &mut Bitmap) -> usize {
    let mut solid = 0;
    for px in bitmap.pixels_mut() {
        if px[0] == 255 && px[1] == 255 {
            px[0] = 0;
            px[1] = 0;
        } else {
            px[0] = 255;
            solid += 1;
        }
    }
    solid
}
