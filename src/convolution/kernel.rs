//! Convolution kernels and the named kernel set.

use std::fmt;
use std::str::FromStr;

use crate::error::{Result, TerrainError};

/// Largest accepted kernel side.
pub const MAX_KERNEL_SIZE: usize = 31;

/// Names accepted by [`KernelSpec::named`].
pub const KERNEL_NAMES: &[&str] = &[
    "dilation",
    "erosion",
    "dilation3",
    "dilhor",
    "surface",
    "threshold",
    "thresholdblack",
    "avg3",
    "gaussian3",
    "gaussian5",
];

const ROUND5: [f32; 25] = [
    0.0, 1.0, 1.0, 1.0, 0.0, //
    1.0, 1.0, 1.0, 1.0, 1.0, //
    1.0, 1.0, 1.0, 1.0, 1.0, //
    1.0, 1.0, 1.0, 1.0, 1.0, //
    0.0, 1.0, 1.0, 1.0, 0.0,
];

const BOX3: [f32; 9] = [1.0; 9];

const ROW3: [f32; 9] = [
    0.0, 0.0, 0.0, //
    1.0, 1.0, 1.0, //
    0.0, 0.0, 0.0,
];

// Subtracts the pixel above so only pixels with an empty pixel above survive.
const TOP_EDGE: [f32; 9] = [
    0.0, -255.0, 0.0, //
    0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0,
];

const BOOST: [f32; 9] = [
    0.0, 0.0, 0.0, //
    0.0, 255.0, 0.0, //
    0.0, 0.0, 0.0,
];

const AVG3: [f32; 9] = [0.111_111_11; 9];

const GAUSSIAN3: [f32; 9] = [
    0.077847, 0.123317, 0.077847, //
    0.123317, 0.195346, 0.123317, //
    0.077847, 0.123317, 0.077847,
];

const GAUSSIAN5: [f32; 25] = [
    0.003765, 0.015019, 0.023792, 0.015019, 0.003765, //
    0.015019, 0.059912, 0.094907, 0.059912, 0.015019, //
    0.023792, 0.094907, 0.150342, 0.094907, 0.023792, //
    0.015019, 0.059912, 0.094907, 0.059912, 0.015019, //
    0.003765, 0.015019, 0.023792, 0.015019, 0.003765,
];

/// Square weight matrix with an odd side, stored row-major.
///
/// Row 0 weights the row above the output pixel, column 0 the column to its left.
#[derive(Clone, Debug, PartialEq)]
pub struct Kernel {
    size: usize,
    weights: Vec<f32>,
}

impl Kernel {
    pub fn new(weights: Vec<f32>) -> Result<Self> {
        let size = (weights.len() as f64).sqrt() as usize;
        if size * size != weights.len() || size == 0 {
            return Err(TerrainError::InvalidKernel(format!(
                "{} weights do not form a square matrix",
                weights.len()
            )));
        }
        if size % 2 == 0 {
            return Err(TerrainError::InvalidKernel(format!("side {size} is even")));
        }
        if size > MAX_KERNEL_SIZE {
            return Err(TerrainError::InvalidKernel(format!(
                "side {size} exceeds {MAX_KERNEL_SIZE}"
            )));
        }
        if let Some(w) = weights.iter().find(|w| !w.is_finite()) {
            return Err(TerrainError::InvalidKernel(format!("non-finite weight {w}")));
        }
        Ok(Self { size, weights })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn radius(&self) -> isize {
        (self.size / 2) as isize
    }

    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    /// Non-zero weights as `(dx, dy, weight)` offsets from the centre.
    pub fn taps(&self) -> impl Iterator<Item = (isize, isize, f32)> + '_ {
        let r = self.radius();
        let size = self.size;
        self.weights
            .iter()
            .enumerate()
            .filter(|(_, w)| **w != 0.0)
            .map(move |(i, &w)| ((i % size) as isize - r, (i / size) as isize - r, w))
    }
}

/// A kernel plus the inverse flag.
///
/// With `inverse` set every sample is complemented before weighting and the
/// sum is complemented again, which turns a dilation of white into an erosion.
#[derive(Clone, Debug, PartialEq)]
pub struct KernelSpec {
    pub kernel: Kernel,
    pub inverse: bool,
}

impl KernelSpec {
    pub fn new(kernel: Kernel, inverse: bool) -> Self {
        Self { kernel, inverse }
    }

    /// Look up one of [`KERNEL_NAMES`].
    pub fn named(name: &str) -> Result<Self> {
        let (weights, inverse): (&[f32], bool) = match name {
            "dilation" => (&ROUND5[..], false),
            "erosion" => (&ROUND5[..], true),
            "dilation3" => (&BOX3[..], false),
            "dilhor" => (&ROW3[..], true),
            "surface" => (&TOP_EDGE[..], false),
            "threshold" => (&BOOST[..], false),
            "thresholdblack" => (&BOOST[..], true),
            "avg3" => (&AVG3[..], false),
            "gaussian3" => (&GAUSSIAN3[..], false),
            "gaussian5" => (&GAUSSIAN5[..], false),
            other => return Err(TerrainError::UnknownKernel(other.to_string())),
        };
        Ok(Self::new(Kernel::new(weights.to_vec())?, inverse))
    }

    /// Content key identifying the compiled procedure for this spec.
    pub fn key(&self) -> KernelKey {
        KernelKey {
            weight_bits: self.kernel.weights.iter().map(|w| w.to_bits()).collect(),
            inverse: self.inverse,
        }
    }
}

impl FromStr for KernelSpec {
    type Err = TerrainError;

    fn from_str(s: &str) -> Result<Self> {
        Self::named(s)
    }
}

/// Hashable identity of a kernel spec: the exact weight bits and the inverse flag.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct KernelKey {
    weight_bits: Vec<u32>,
    inverse: bool,
}

impl fmt::Display for KernelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let side = (self.weight_bits.len() as f64).sqrt() as usize;
        write!(f, "{side}x{side}{}", if self.inverse { " inverse" } else { "" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_names_resolve() {
        for name in KERNEL_NAMES {
            let spec: KernelSpec = name.parse().unwrap();
            assert!(spec.kernel.size() == 3 || spec.kernel.size() == 5, "{name}");
        }
        assert!(matches!(KernelSpec::named("blur9"), Err(TerrainError::UnknownKernel(_))));
    }

    #[test]
    fn test_erosion_is_inverse_dilation() {
        let dilation = KernelSpec::named("dilation").unwrap();
        let erosion = KernelSpec::named("erosion").unwrap();
        assert_eq!(dilation.kernel, erosion.kernel);
        assert!(!dilation.inverse && erosion.inverse);
        assert_ne!(dilation.key(), erosion.key());
        assert_eq!(dilation.key(), KernelSpec::named("dilation").unwrap().key());
    }

    #[test]
    fn test_invalid_shapes() {
        assert!(Kernel::new(vec![1.0; 4]).is_err());
        assert!(Kernel::new(vec![1.0; 8]).is_err());
        assert!(Kernel::new(vec![]).is_err());
        assert!(Kernel::new(vec![1.0; 33 * 33]).is_err());
        assert!(Kernel::new(vec![1.0; 31 * 31]).is_ok());
        assert!(Kernel::new(vec![f32::NAN]).is_err());
    }

    #[test]
    fn test_taps_offsets() {
        let surface = KernelSpec::named("surface").unwrap();
        let taps: Vec<_> = surface.kernel.taps().collect();
        assert_eq!(taps, vec![(0, -1, -255.0), (0, 0, 1.0)]);
        assert_eq!(KernelSpec::named("dilation").unwrap().kernel.taps().count(), 21);
    }
}
