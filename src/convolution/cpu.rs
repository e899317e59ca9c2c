//! Rayon-parallel convolution on the CPU.

use rayon::prelude::*;

use super::cache::KernelCache;
use super::kernel::KernelSpec;
use super::ConvolutionEngine;
use crate::bitmap::Bitmap;
use crate::error::Result;

/// Non-zero taps of one kernel, ready to run.
#[derive(Debug)]
pub struct TapList {
    taps: Vec<(isize, isize, f32)>,
    inverse: bool,
}

impl TapList {
    pub fn compile(spec: &KernelSpec) -> Self {
        Self {
            taps: spec.kernel.taps().collect(),
            inverse: spec.inverse,
        }
    }

    /// Convolve `src` into a new bitmap of the same size.
    pub fn apply(&self, src: &Bitmap) -> Bitmap {
        let (width, height) = src.dimensions();
        let mut out = Bitmap::new(width, height);
        out.par_rows_mut().for_each(|(y, row)| {
            for (x, px) in row.chunks_exact_mut(4).enumerate() {
                let mut acc = [0.0f32; 3];
                for &(dx, dy, weight) in &self.taps {
                    let sample = src.clamped_pixel(x as isize + dx, y as isize + dy);
                    for (c, total) in acc.iter_mut().enumerate() {
                        let mut s = f32::from(sample[c]) / 255.0;
                        if self.inverse {
                            s = 1.0 - s;
                        }
                        *total += weight * s;
                    }
                }
                for (c, total) in acc.iter().enumerate() {
                    let v = if self.inverse { 1.0 - total } else { *total };
                    px[c] = (v.clamp(0.0, 1.0) * 255.0).round() as u8;
                }
                px[3] = src.pixel(x, y)[3];
            }
        });
        out
    }
}

/// CPU engine. Tap lists are cached per kernel content.
#[derive(Default)]
pub struct CpuConvolution {
    cache: KernelCache<TapList>,
}

impl CpuConvolution {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct kernels compiled so far.
    pub fn compiled_kernels(&self) -> usize {
        self.cache.len()
    }
}

impl ConvolutionEngine for CpuConvolution {
    fn name(&self) -> &'static str {
        "cpu"
    }

    fn apply_kernels(&self, bitmap: Bitmap, kernels: &[KernelSpec]) -> Result<Bitmap> {
        let mut current = bitmap;
        for spec in kernels {
            let taps = self.cache.get_or_compile(spec, |s| Ok(TapList::compile(s)))?;
            current = taps.apply(&current);
        }
        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap::Channel;

    const WHITE: [u8; 4] = [255, 255, 255, 255];
    const BLACK: [u8; 4] = [0, 0, 0, 255];

    fn dot(size: usize, at: (usize, usize)) -> Bitmap {
        let mut bmp = Bitmap::new_with(size, size, BLACK);
        bmp.set_pixel(at.0, at.1, WHITE);
        bmp
    }

    fn run(bmp: Bitmap, names: &[&str]) -> Bitmap {
        let specs: Vec<KernelSpec> = names.iter().map(|n| KernelSpec::named(n).unwrap()).collect();
        CpuConvolution::new().apply_kernels(bmp, &specs).unwrap()
    }

    #[test]
    fn test_dilation_footprint() {
        let out = run(dot(9, (4, 4)), &["dilation"]);
        assert_eq!(out.count_where(Channel::R, |v| v == 255), 21);
        assert_eq!(out.count_where(Channel::R, |v| v == 0), 81 - 21);
        assert_eq!(out.pixel(2, 4), WHITE);
        assert_eq!(out.pixel(2, 2), BLACK);
        assert_eq!(out.count_where(Channel::A, |v| v == 255), 81);
    }

    #[test]
    fn test_erosion_removes_dot() {
        let out = run(dot(9, (4, 4)), &["erosion"]);
        assert_eq!(out.count_where(Channel::R, |v| v > 0), 0);
    }

    #[test]
    fn test_closing_restores_blob() {
        let mut blob = Bitmap::new_with(15, 15, BLACK);
        for y in 6..9 {
            for x in 5..10 {
                blob.set_pixel(x, y, WHITE);
            }
        }
        let out = run(blob.clone(), &["dilation", "erosion"]);
        assert_eq!(out, blob);
    }

    #[test]
    fn test_inverse_keeps_alpha() {
        let mut bmp = Bitmap::new_with(5, 5, [255, 255, 255, 128]);
        bmp.set_pixel(2, 2, [255, 255, 255, 77]);
        let out = run(bmp, &["erosion"]);
        assert_eq!(out.pixel(2, 2), [255, 255, 255, 77]);
        assert_eq!(out.pixel(0, 0)[3], 128);
    }

    #[test]
    fn test_surface_threshold_marks_top_edge() {
        let mut bmp = Bitmap::new_with(6, 6, BLACK);
        for y in 3..6 {
            for x in 1..5 {
                bmp.set_pixel(x, y, [255, 0, 0, 255]);
            }
        }
        let out = run(bmp, &["surface", "threshold"]);
        for x in 0..6 {
            for y in 0..6 {
                let expected = if y == 3 && (1..5).contains(&x) { 255 } else { 0 };
                assert_eq!(out.get(x, y, Channel::R), expected, "({x}, {y})");
            }
        }
    }

    #[test]
    fn test_smoothing_keeps_uniform_image() {
        let bmp = Bitmap::new_with(7, 5, [100, 40, 200, 255]);
        let out = run(bmp.clone(), &["avg3", "gaussian3", "gaussian5"]);
        assert_eq!(out, bmp);
    }

    #[test]
    fn test_empty_sequence_is_identity() {
        let bmp = dot(4, (1, 2));
        let out = CpuConvolution::new().apply_kernels(bmp.clone(), &[]).unwrap();
        assert_eq!(out, bmp);
    }

    #[test]
    fn test_kernels_cached() {
        let engine = CpuConvolution::new();
        let dilation = KernelSpec::named("dilation").unwrap();
        engine
            .apply_kernels(dot(5, (2, 2)), &[dilation.clone(), dilation.clone(), dilation])
            .unwrap();
        assert_eq!(engine.compiled_kernels(), 1);
    }
}
