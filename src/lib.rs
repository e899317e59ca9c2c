//! Terrain silhouette generation library
//!
//! Grows a deterministic 2D terrain mask from a low-resolution template and a
//! seed, then picks evenly spread points along its top surface.
//! Re-exports modules for use by binaries and tools.

pub mod bitmap;
pub mod config;
pub mod convolution;
pub mod error;
pub mod flood_fill;
pub mod generator;
pub mod hq2x;
pub mod morphology;
pub mod noise_field;
pub mod surface;
pub mod template;

pub use bitmap::{Bitmap, Channel};
pub use config::{SamplerOptions, TerrainOptions};
pub use convolution::{select_engine, ConvolutionEngine, CpuConvolution, GpuConvolution, KernelSpec};
pub use error::{ErrorKind, Result, TerrainError};
pub use generator::{Stage, TerrainGenerator};
pub use surface::SurfaceSampler;
pub use template::{TemplateCache, TerrainTemplate};
