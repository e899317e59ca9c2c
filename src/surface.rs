//! Surface contour extraction and low-discrepancy point picking.

use crate::bitmap::{Bitmap, Channel};
use crate::config::SamplerOptions;
use crate::convolution::{ConvolutionEngine, KernelSpec};
use crate::error::{Result, TerrainError};

const HALTON_BASE: u64 = 2;

/// Largest step between two contour points that can still be walked.
const CHAIN_BREAKING_DIST: i64 = 5;

/// Radical inverse of `index` in `base`, in [0, 1).
pub fn halton(index: u64, base: u64) -> f64 {
    let mut result = 0.0;
    let mut f = 1.0 / base as f64;
    let mut i = index;
    while i > 0 {
        result += f * (i % base) as f64;
        i /= base;
        f /= base as f64;
    }
    result
}

type Point = (usize, usize);

fn delta(a: Point, b: Point) -> (i64, i64) {
    (b.0 as i64 - a.0 as i64, b.1 as i64 - a.1 as i64)
}

fn distance_sq(a: Point, b: Point) -> i64 {
    let (dx, dy) = delta(a, b);
    dx * dx + dy * dy
}

/// True when a walker could not get from `a` to `b` without jumping:
/// the slope is too steep or the gap too wide.
fn is_breaking(a: Point, b: Point) -> bool {
    let (dx, dy) = delta(a, b);
    if dx.abs() < dy.abs() - 1 {
        return true;
    }
    distance_sq(a, b) > CHAIN_BREAKING_DIST * CHAIN_BREAKING_DIST
}

/// Picks points on the top edge of a terrain mask.
#[derive(Debug, Clone)]
pub struct SurfaceSampler {
    contour: Vec<Point>,
    points: Vec<Point>,
    halton_index: u64,
}

impl SurfaceSampler {
    /// Extract the surface of `mask`, reading coverage from `coverage`.
    pub fn new(
        mask: &Bitmap,
        coverage: Channel,
        options: &SamplerOptions,
        engine: &dyn ConvolutionEngine,
    ) -> Result<Self> {
        let edges = engine.apply_kernels(
            mask.extract_channel(coverage),
            &[KernelSpec::named("surface")?, KernelSpec::named("threshold")?],
        )?;
        if edges.dimensions() != mask.dimensions() {
            return Err(TerrainError::Internal(format!(
                "edge image is {:?}, mask is {:?}",
                edges.dimensions(),
                mask.dimensions()
            )));
        }

        let candidates = surface_candidates(&edges, options);
        let contour = march(candidates);
        let points = filter_narrow(&contour, options.surface_point_min_width);

        tracing::debug!(
            target: "terrain_shaper::surface",
            contour = contour.len(),
            eligible = points.len(),
            "surface extracted"
        );

        Ok(Self {
            contour,
            points,
            halton_index: 0,
        })
    }

    /// Next surface point. `offset` in [0, 1) shifts the Halton sequence.
    pub fn surface_point(&mut self, offset: f64) -> Result<Point> {
        if !(0.0..1.0).contains(&offset) {
            return Err(TerrainError::InvalidOffset(offset));
        }
        if self.points.is_empty() {
            return Err(TerrainError::EmptySurface);
        }
        let r = (halton(self.halton_index, HALTON_BASE) + offset) % 1.0;
        self.halton_index += 1;
        let idx = ((r * self.points.len() as f64).floor() as usize).min(self.points.len() - 1);
        Ok(self.points[idx])
    }

    /// Rewind the Halton sequence.
    pub fn reset(&mut self) {
        self.halton_index = 0;
    }

    /// All surface points in walk order.
    pub fn contour(&self) -> &[Point] {
        &self.contour
    }

    /// Points wide enough to be picked.
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// `(min_x, min_y, max_x, max_y)` of the pickable points.
    pub fn bounds(&self) -> Option<(usize, usize, usize, usize)> {
        let first = *self.points.first()?;
        Some(self.points.iter().fold(
            (first.0, first.1, first.0, first.1),
            |(x0, y0, x1, y1), &(x, y)| (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
        ))
    }
}

/// Edge pixels inside the margins with nothing above them.
fn surface_candidates(edges: &Bitmap, options: &SamplerOptions) -> Vec<Point> {
    let (w, h) = edges.dimensions();
    let y_start = options.margin_top.max(1);
    let y_end = h.saturating_sub(options.margin_bottom);
    let x_end = w.saturating_sub(options.margin_right);

    let mut points = Vec::new();
    for y in y_start..y_end {
        for x in options.margin_left..x_end {
            if edges.get(x, y, Channel::R) > 100 && edges.get(x, y - 1, Channel::R) < 50 {
                points.push((x, y));
            }
        }
    }
    points
}

/// Order points by walking from (0, 0) to the nearest remaining point, or to
/// the leftmost one when the nearest is out of reach.
fn march(mut remaining: Vec<Point>) -> Vec<Point> {
    let mut ordered = Vec::with_capacity(remaining.len());
    let mut curr = (0, 0);
    while !remaining.is_empty() {
        let nearest = remaining
            .iter()
            .enumerate()
            .min_by_key(|&(_, p)| (distance_sq(curr, *p), p.0, p.1))
            .map(|(i, _)| i);
        let Some(mut pick) = nearest else { break };
        if is_breaking(curr, remaining[pick]) {
            if let Some(leftmost) = remaining
                .iter()
                .enumerate()
                .min_by_key(|&(_, p)| (p.0, p.1))
                .map(|(i, _)| i)
            {
                pick = leftmost;
            }
        }
        curr = remaining.swap_remove(pick);
        ordered.push(curr);
    }
    ordered
}

/// Keep points whose neighbourhood of `min_width` contour steps is unbroken.
fn filter_narrow(contour: &[Point], min_width: usize) -> Vec<Point> {
    let half = min_width.saturating_sub(1).div_ceil(2) as isize;
    let len = contour.len() as isize;
    contour
        .iter()
        .enumerate()
        .filter(|&(i, _)| {
            let i = i as isize;
            (i - half..i + half).all(|j| {
                j >= 0 && j + 1 < len && !is_breaking(contour[j as usize], contour[j as usize + 1])
            })
        })
        .map(|(_, &p)| p)
        .collect()
}
