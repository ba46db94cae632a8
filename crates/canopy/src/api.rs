//! High-level change-detection API.
//!
//! [`ChangeDetector`] is the primary entry point. It wraps a
//! [`PipelineConfig`] and runs the full align → segment → analyze pipeline
//! on before/after image pairs.

use std::path::Path;

use image::{DynamicImage, RgbImage};

use crate::config::PipelineConfig;
use crate::error::InvalidImageError;
use crate::pipeline::{self, PipelineResult};

/// Primary change-detection interface.
///
/// Holds only immutable configuration. Create once, analyze many pairs.
///
/// # Examples
///
/// ```no_run
/// use canopy::ChangeDetector;
///
/// let before = image::open("before.png").unwrap().to_rgb8();
/// let after = image::open("after.png").unwrap().to_rgb8();
/// let detector = ChangeDetector::default();
/// let result = detector.analyze_pair(&before, &after).unwrap();
/// println!("vegetation change: {:+.2}%", result.stats.change_percentage);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ChangeDetector {
    config: PipelineConfig,
}

impl ChangeDetector {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Load a JSON config and create a detector in one step.
    pub fn from_config_json_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self::new(PipelineConfig::from_json_file(path)?))
    }

    /// Access the current configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Mutable access to configuration for post-construction tuning.
    pub fn config_mut(&mut self) -> &mut PipelineConfig {
        &mut self.config
    }

    /// Align `after` onto `before` and measure vegetation change.
    pub fn analyze_pair(
        &self,
        before: &RgbImage,
        after: &RgbImage,
    ) -> Result<PipelineResult, InvalidImageError> {
        pipeline::run(before, after, &self.config)
    }

    /// Same as [`Self::analyze_pair`] for decoded images of any color type.
    pub fn analyze_dynamic(
        &self,
        before: &DynamicImage,
        after: &DynamicImage,
    ) -> Result<PipelineResult, InvalidImageError> {
        self.analyze_pair(&before.to_rgb8(), &after.to_rgb8())
    }
}
