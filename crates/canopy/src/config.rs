//! Pipeline configuration, loadable from JSON.
//!
//! Every section is `#[serde(default)]`, so a config file only needs the
//! fields it overrides:
//!
//! ```json
//! { "align": { "homography": { "min_matches": 50 } } }
//! ```

use std::path::Path;

use crate::align::AlignConfig;
use crate::vegetation::VegetationBand;

/// Top-level configuration for [`crate::ChangeDetector`].
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub vegetation: VegetationBand,
    pub align: AlignConfig,
}

impl PipelineConfig {
    /// Load a config from a JSON file; missing fields keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json_str(&data)
    }

    pub fn from_json_str(data: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: Self = serde_json::from_str(data)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), String> {
        let orb = &self.align.orb;
        if orb.max_features == 0 {
            return Err("align.orb.max_features must be positive".into());
        }
        if orb.scale_factor.is_nan() || orb.scale_factor <= 1.0 {
            return Err(format!(
                "align.orb.scale_factor must be > 1 (got {})",
                orb.scale_factor
            ));
        }
        let ransac = &self.align.homography.ransac;
        if ransac.inlier_threshold.is_nan() || ransac.inlier_threshold <= 0.0 {
            return Err("align.homography.ransac.inlier_threshold must be positive".into());
        }
        if self.vegetation.hue_min > self.vegetation.hue_max {
            return Err("vegetation.hue_min exceeds vegetation.hue_max".into());
        }
        Ok(())
    }
}
