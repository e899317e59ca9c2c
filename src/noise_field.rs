//! Seeded 2D gradient noise and the noise-wall shaping pass.

use noise::{NoiseFn, Perlin};
use rayon::prelude::*;

use crate::bitmap::Bitmap;
use crate::error::{Result, TerrainError};

/// Template red values at or above this survive shaping untouched.
const SOLID_TERRAIN: u8 = 200;

/// 2D Perlin noise reseeded from a float seed in [0, 1).
#[derive(Clone, Debug)]
pub struct NoiseField {
    perlin: Perlin,
}

impl NoiseField {
    pub fn new(seed: f64) -> Result<Self> {
        Ok(Self {
            perlin: Perlin::new(perlin_seed(seed)?),
        })
    }

    /// Replace the permutation table for a new seed.
    pub fn reseed(&mut self, seed: f64) -> Result<()> {
        self.perlin = Perlin::new(perlin_seed(seed)?);
        Ok(())
    }

    /// Noise value at (x, y), roughly within [-1, 1].
    #[inline]
    pub fn sample(&self, x: f64, y: f64) -> f64 {
        self.perlin.get([x, y])
    }
}

fn perlin_seed(seed: f64) -> Result<u32> {
    if !(0.0..1.0).contains(&seed) {
        return Err(TerrainError::InvalidSeed(seed));
    }
    Ok((seed * 4_294_967_296.0).floor() as u32)
}

/// Narrow ridge around the zero crossings of the noise: 200 at v = 0,
/// falling to 0 once |v| reaches 25/256.
#[inline]
pub fn ridge_value(v: f64) -> f64 {
    ((25.0 - v.abs() * 256.0) * 8.0).max(0.0)
}

/// Scatter noise walls over every non-solid pixel of `bitmap`.
///
/// Pixels with R below 200 lose their RGB and become walls (R = G = 255) where
/// the ridge value exceeds `threshold`. Black pixels (R = 0, B = 0) average in
/// a second, horizontally mirrored sample at `resolution_black`.
pub fn apply_noise_walls(
    bitmap: &mut Bitmap,
    field: &NoiseField,
    resolution: f64,
    resolution_black: f64,
    threshold: f64,
) -> usize {
    let width = bitmap.width();
    bitmap
        .par_rows_mut()
        .map(|(y, row)| {
            let mut walls = 0;
            for (x, px) in row.chunks_exact_mut(4).enumerate() {
                if px[0] >= SOLID_TERRAIN {
                    continue;
                }
                let black = px[0] == 0 && px[2] == 0;
                let mut value = ridge_value(field.sample(x as f64 / resolution, y as f64 / resolution));
                if black {
                    let mirrored = (width - x - 1) as f64;
                    let second = ridge_value(
                        field.sample(mirrored / resolution_black, y as f64 / resolution_black),
                    );
                    value = (value + second) / 2.0;
                }
                px[0] = 0;
                px[1] = 0;
                px[2] = 0;
                if value > threshold {
                    px[0] = 255;
                    px[1] = 255;
                    walls += 1;
                }
            }
            walls
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_range() {
        assert!(NoiseField::new(0.0).is_ok());
        assert!(NoiseField::new(0.999_999).is_ok());
        assert!(matches!(NoiseField::new(1.0), Err(TerrainError::InvalidSeed(_))));
        assert!(matches!(NoiseField::new(-0.1), Err(TerrainError::InvalidSeed(_))));
        assert!(NoiseField::new(f64::NAN).is_err());
    }

    #[test]
    fn test_sample_deterministic() {
        let a = NoiseField::new(0.42).unwrap();
        let mut b = NoiseField::new(0.1).unwrap();
        b.reseed(0.42).unwrap();
        for i in 0..50 {
            let (x, y) = (i as f64 * 0.37, i as f64 * 0.11);
            assert_eq!(a.sample(x, y), b.sample(x, y));
            assert!(a.sample(x, y).abs() <= 1.5);
        }
    }

    #[test]
    fn test_ridge_value() {
        assert_eq!(ridge_value(0.0), 200.0);
        assert_eq!(ridge_value(-0.5), 0.0);
        assert_eq!(ridge_value(25.0 / 256.0), 0.0);
        assert!(ridge_value(0.05) > 0.0);
    }

    #[test]
    fn test_walls_skip_solid_terrain() {
        let field = NoiseField::new(0.5).unwrap();
        let mut bitmap = Bitmap::new_with(16, 8, [0, 0, 0, 255]);
        for y in 0..8 {
            bitmap.set_pixel(0, y, [255, 255, 255, 255]);
        }
        // a threshold below every ridge value walls all non-solid pixels
        let walls = apply_noise_walls(&mut bitmap, &field, 35.0, 18.0, -1.0);
        assert_eq!(walls, 15 * 8);
        assert_eq!(bitmap.pixel(0, 3), [255, 255, 255, 255]);
        assert_eq!(bitmap.pixel(5, 3), [255, 255, 0, 255]);

        let mut clear = Bitmap::new_with(4, 4, [100, 7, 7, 255]);
        assert_eq!(apply_noise_walls(&mut clear, &field, 35.0, 18.0, 1000.0), 0);
        assert_eq!(clear.pixel(2, 2), [0, 0, 0, 255]);
    }
}
