//! Named-kernel sequences over a convolution engine.

use std::sync::Arc;

use crate::bitmap::Bitmap;
use crate::convolution::{ConvolutionEngine, KernelSpec};
use crate::error::Result;

/// Runs morphological passes through whichever engine it was built with.
#[derive(Clone)]
pub struct MorphologyPipeline {
    engine: Arc<dyn ConvolutionEngine>,
}

impl MorphologyPipeline {
    pub fn new(engine: Arc<dyn ConvolutionEngine>) -> Self {
        Self { engine }
    }

    /// Apply kernels by name, in order. Unknown names fail before any pass runs.
    pub fn apply_kernel_sequence<S: AsRef<str>>(&self, bitmap: Bitmap, names: &[S]) -> Result<Bitmap> {
        let specs = names
            .iter()
            .map(|name| KernelSpec::named(name.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        self.engine.apply_kernels(bitmap, &specs)
    }

    /// `passes` rounds of 5x5 dilation.
    pub fn dilate(&self, bitmap: Bitmap, passes: usize) -> Result<Bitmap> {
        self.repeat(bitmap, "dilation", passes)
    }

    /// `passes` rounds of 5x5 erosion.
    pub fn erode(&self, bitmap: Bitmap, passes: usize) -> Result<Bitmap> {
        self.repeat(bitmap, "erosion", passes)
    }

    fn repeat(&self, bitmap: Bitmap, name: &str, passes: usize) -> Result<Bitmap> {
        if passes == 0 {
            return Ok(bitmap);
        }
        let spec = KernelSpec::named(name)?;
        self.engine.apply_kernels(bitmap, &vec![spec; passes])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap::Channel;
    use crate::convolution::CpuConvolution;
    use crate::error::TerrainError;

    fn pipeline() -> MorphologyPipeline {
        MorphologyPipeline::new(Arc::new(CpuConvolution::new()))
    }

    fn blob() -> Bitmap {
        let mut bmp = Bitmap::new_with(30, 30, [0, 0, 0, 255]);
        for y in 12..18 {
            for x in 10..20 {
                bmp.set(x, y, Channel::R, 255);
            }
        }
        bmp
    }

    #[test]
    fn test_unknown_name_rejected() {
        let err = pipeline()
            .apply_kernel_sequence(blob(), &["dilation", "sharpen"])
            .unwrap_err();
        assert!(matches!(err, TerrainError::UnknownKernel(name) if name == "sharpen"));
    }

    #[test]
    fn test_sequence_matches_helpers() {
        let p = pipeline();
        let by_name = p
            .apply_kernel_sequence(blob(), &["dilation", "dilation", "erosion"])
            .unwrap();
        let by_helper = p.erode(p.dilate(blob(), 2).unwrap(), 1).unwrap();
        assert_eq!(by_name, by_helper);
    }

    #[test]
    fn test_closing_restores_interior_blob() {
        let p = pipeline();
        for passes in 1..=3 {
            let closed = p.erode(p.dilate(blob(), passes).unwrap(), passes).unwrap();
            assert_eq!(closed, blob(), "passes = {passes}");
        }
    }

    #[test]
    fn test_dilation_grows_area() {
        let p = pipeline();
        let before = blob().count_where(Channel::R, |v| v == 255);
        let after = p.dilate(blob(), 1).unwrap().count_where(Channel::R, |v| v == 255);
        assert!(after > before);
        assert_eq!(p.dilate(blob(), 0).unwrap(), blob());
    }
}
