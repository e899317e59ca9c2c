//! Generation options.
//!
//! Both structs deserialize from JSON with every field optional; missing fields
//! take the defaults below and unknown fields are rejected.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::bitmap::Channel;
use crate::error::{Result, TerrainError};

/// Margins and width filter used when picking surface points.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SamplerOptions {
    /// Rows at the top of the mask where no point is picked (default: 40)
    pub margin_top: usize,
    /// Columns at the right edge excluded (default: 1)
    pub margin_right: usize,
    /// Rows at the bottom excluded (default: 60)
    pub margin_bottom: usize,
    /// Columns at the left edge excluded (default: 1)
    pub margin_left: usize,
    /// Number of consecutive smooth contour points a pick must sit in (default: 4)
    pub surface_point_min_width: usize,
}

impl Default for SamplerOptions {
    fn default() -> Self {
        Self {
            margin_top: 40,
            margin_right: 1,
            margin_bottom: 60,
            margin_left: 1,
            surface_point_min_width: 4,
        }
    }
}

/// Everything that shapes one terrain besides the seed and the template.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TerrainOptions {
    /// Final mask width in pixels, even (default: 1024)
    pub width: usize,
    /// Final mask height in pixels, even (default: 612)
    pub height: usize,
    /// Noise feature size in working pixels (default: 35)
    pub noise_resolution: f64,
    /// Noise feature size over black template zones (default: 18)
    pub noise_resolution_black: f64,
    /// Mapped noise above this becomes a wall (default: 20)
    pub noise_threshold: f64,
    /// Move coverage into alpha and paint the mask red (default: true)
    pub black_to_alpha: bool,
    /// Dilation passes before hole removal (default: 5)
    pub dilation_passes: usize,
    /// Erosion passes after hole removal (default: 4)
    pub erosion_passes: usize,
    pub sampler: SamplerOptions,
}

impl Default for TerrainOptions {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 612,
            noise_resolution: 35.0,
            noise_resolution_black: 18.0,
            noise_threshold: 20.0,
            black_to_alpha: true,
            dilation_passes: 5,
            erosion_passes: 4,
            sampler: SamplerOptions::default(),
        }
    }
}

impl TerrainOptions {
    /// Parse options from a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    /// Read and parse a JSON options file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Check every field is in range.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 || self.width % 2 != 0 || self.height % 2 != 0 {
            return Err(TerrainError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        positive("noise_resolution", self.noise_resolution)?;
        positive("noise_resolution_black", self.noise_resolution_black)?;
        if !self.noise_threshold.is_finite() {
            return Err(TerrainError::InvalidOption {
                name: "noise_threshold",
                reason: format!("must be finite, got {}", self.noise_threshold),
            });
        }
        if self.sampler.surface_point_min_width == 0 {
            return Err(TerrainError::InvalidOption {
                name: "surface_point_min_width",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }

    /// Template and pipeline resolution, half the final size.
    pub fn working_size(&self) -> (usize, usize) {
        (self.width / 2, self.height / 2)
    }

    /// Channel of the final mask that carries terrain coverage.
    pub fn coverage_channel(&self) -> Channel {
        if self.black_to_alpha {
            Channel::A
        } else {
            Channel::R
        }
    }
}

fn positive(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(TerrainError::InvalidOption {
            name,
            reason: format!("must be a positive number, got {value}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let options = TerrainOptions::default();
        assert!(options.validate().is_ok());
        assert_eq!(options.working_size(), (512, 306));
        assert_eq!(options.coverage_channel(), Channel::A);
    }

    #[test]
    fn test_odd_width_rejected() {
        let options = TerrainOptions { width: 1023, ..Default::default() };
        assert!(matches!(
            options.validate(),
            Err(TerrainError::InvalidDimensions { width: 1023, height: 612 })
        ));
        let options = TerrainOptions { height: 0, ..Default::default() };
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_margins_larger_than_mask_accepted() {
        // margins only narrow the surface candidates, they never block generation
        let options = TerrainOptions { width: 128, height: 76, ..Default::default() };
        assert!(options.validate().is_ok());
        let options = TerrainOptions {
            width: 2,
            height: 2,
            sampler: SamplerOptions { margin_left: 5, margin_right: 5, ..Default::default() },
            ..Default::default()
        };
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_bad_resolution_rejected() {
        let options = TerrainOptions { noise_resolution: 0.0, ..Default::default() };
        assert!(matches!(
            options.validate(),
            Err(TerrainError::InvalidOption { name: "noise_resolution", .. })
        ));
    }

    #[test]
    fn test_json_partial_and_nested() {
        let options = TerrainOptions::from_json_str(
            r#"{ "width": 256, "height": 200, "sampler": { "margin_top": 10, "margin_bottom": 10 } }"#,
        )
        .unwrap();
        assert_eq!(options.width, 256);
        assert_eq!(options.sampler.margin_top, 10);
        assert_eq!(options.sampler.margin_left, 1);
        assert_eq!(options.erosion_passes, 4);
    }

    #[test]
    fn test_json_unknown_key_rejected() {
        let err = TerrainOptions::from_json_str(r#"{ "widht": 256 }"#).unwrap_err();
        assert!(matches!(err, TerrainError::Config(_)));
        let err = TerrainOptions::from_json_str(r#"{ "sampler": { "margin": 3 } }"#).unwrap_err();
        assert!(matches!(err, TerrainError::Config(_)));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("options.json");
        fs::write(&path, r#"{ "black_to_alpha": false }"#).unwrap();
        let options = TerrainOptions::from_file(&path).unwrap();
        assert!(!options.black_to_alpha);
        assert_eq!(options.coverage_channel(), Channel::R);

        let missing = TerrainOptions::from_file(dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(missing, TerrainError::Io(_)));
    }
}
