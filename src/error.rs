//! Error types for terrain generation.

use thiserror::Error;

/// Broad classes of failure, used by callers that only care about who is at fault.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller passed something out of range or malformed.
    InvalidArgument,
    /// A query arrived before the state it depends on was built.
    NotReady,
    /// A broken internal invariant. Never caused by caller input.
    Internal,
    /// Filesystem, image decoding or GPU device failures.
    Io,
}

/// Errors that can occur while building or sampling a terrain.
#[derive(Error, Debug)]
pub enum TerrainError {
    /// Seed outside the half-open range [0, 1).
    #[error("invalid seed {0}: must be in [0, 1)")]
    InvalidSeed(f64),

    /// Sampling offset outside the half-open range [0, 1).
    #[error("invalid offset {0}: must be in [0, 1)")]
    InvalidOffset(f64),

    /// Width or height is zero or odd.
    #[error("terrain width and height must be even and non-zero, got {width}x{height}")]
    InvalidDimensions {
        /// Requested width.
        width: usize,
        /// Requested height.
        height: usize,
    },

    /// Raw pixel buffer whose length does not match its dimensions.
    #[error("pixel buffer holds {actual} bytes, expected {expected}")]
    BufferSize {
        /// Bytes required by width * height * 4.
        expected: usize,
        /// Bytes supplied.
        actual: usize,
    },

    /// Kernel matrix that is not square, not odd-sized, or too large.
    #[error("invalid kernel: {0}")]
    InvalidKernel(String),

    /// Kernel name with no registered matrix.
    #[error("unknown kernel '{0}'")]
    UnknownKernel(String),

    /// An option value outside its valid range.
    #[error("invalid option {name}: {reason}")]
    InvalidOption {
        /// Option field name.
        name: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// Template bitmap whose size does not match the working resolution.
    #[error("template is {actual_width}x{actual_height}, expected {width}x{height}")]
    TemplateSize {
        /// Expected working width.
        width: usize,
        /// Expected working height.
        height: usize,
        /// Template width.
        actual_width: usize,
        /// Template height.
        actual_height: usize,
    },

    /// Query issued before the required setup ran.
    #[error("{0} is not ready")]
    NotReady(&'static str),

    /// The surface contour has no point wide enough to sample.
    #[error("surface has no eligible points")]
    EmptySurface,

    /// Broken internal invariant.
    #[error("internal error: {0}")]
    Internal(String),

    /// Filesystem error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decoding or encoding error.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// Malformed options file, including unknown keys.
    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),

    /// GPU device or buffer mapping failure.
    #[error("GPU error: {0}")]
    Gpu(String),
}

impl TerrainError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidSeed(_)
            | Self::InvalidOffset(_)
            | Self::InvalidDimensions { .. }
            | Self::BufferSize { .. }
            | Self::InvalidKernel(_)
            | Self::UnknownKernel(_)
            | Self::InvalidOption { .. }
            | Self::TemplateSize { .. }
            | Self::Config(_) => ErrorKind::InvalidArgument,
            Self::NotReady(_) | Self::EmptySurface => ErrorKind::NotReady,
            Self::Internal(_) => ErrorKind::Internal,
            Self::Io(_) | Self::Image(_) | Self::Gpu(_) => ErrorKind::Io,
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, TerrainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(TerrainError::InvalidSeed(1.0).kind(), ErrorKind::InvalidArgument);
        assert_eq!(
            TerrainError::InvalidDimensions { width: 1023, height: 612 }.kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(TerrainError::NotReady("surface sampler").kind(), ErrorKind::NotReady);
        assert_eq!(TerrainError::Internal("x".into()).kind(), ErrorKind::Internal);
        assert_eq!(TerrainError::Gpu("lost".into()).kind(), ErrorKind::Io);
    }

    #[test]
    fn test_messages() {
        let err = TerrainError::InvalidDimensions { width: 1023, height: 612 };
        assert_eq!(
            err.to_string(),
            "terrain width and height must be even and non-zero, got 1023x612"
        );
        assert_eq!(TerrainError::UnknownKernel("blur9".into()).to_string(), "unknown kernel 'blur9'");
    }
}
