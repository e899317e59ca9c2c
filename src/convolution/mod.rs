//! Image convolution engines
//!
//! Every engine follows the same numeric contract: RGB samples are normalised
//! to [0, 1] and clamped to the image edge, optionally complemented, weighted,
//! summed, complemented back, clamped and rounded to 8 bits. Alpha is copied
//! from the centre pixel.

pub mod cache;
pub mod cpu;
pub mod gpu;
pub mod kernel;

use std::sync::Arc;

pub use cache::KernelCache;
pub use cpu::CpuConvolution;
pub use gpu::GpuConvolution;
pub use kernel::{Kernel, KernelKey, KernelSpec, KERNEL_NAMES};

use crate::bitmap::Bitmap;
use crate::error::Result;

/// Something that can run a sequence of kernels over a bitmap.
pub trait ConvolutionEngine: Send + Sync {
    /// Short engine name for logs.
    fn name(&self) -> &'static str;

    /// Apply `kernels` in order, each pass reading the previous pass's output.
    fn apply_kernels(&self, bitmap: Bitmap, kernels: &[KernelSpec]) -> Result<Bitmap>;
}

/// GPU engine when requested and available, CPU engine otherwise.
pub fn select_engine(prefer_gpu: bool) -> Arc<dyn ConvolutionEngine> {
    if prefer_gpu {
        match GpuConvolution::new() {
            Ok(gpu) => return Arc::new(gpu),
            Err(err) => {
                tracing::warn!(target: "terrain_shaper::convolution", error = %err, "GPU unavailable, using CPU convolution");
            }
        }
    }
    Arc::new(CpuConvolution::new())
}
