//! canopy — vegetation change detection between two photographs of the
//! same area.
//!
//! The pipeline stages are:
//!
//! 1. **Align** – oriented FAST/rotated BRIEF features, cross-checked Hamming
//!    matching, and a RANSAC homography warp the "after" image onto the
//!    "before" canvas. When that is not possible the larger image is
//!    area-resized to the smaller one.
//! 2. **Segment** – each aligned image becomes a binary vegetation mask by
//!    thresholding 8-bit HSV.
//! 3. **Change** – saturating mask differences give loss and gain masks,
//!    area statistics, and a red/green overlay on the after image.
//!
//! # Public API
//! - [`ChangeDetector`] and [`PipelineConfig`] as primary entry points
//! - [`PipelineResult`] / [`PipelineSummary`] and [`ChangeStats`] as results
//! - the stage modules for callers that need one stage on its own

mod api;
pub mod align;
pub mod change;
mod config;
mod error;
pub mod features;
pub mod homography;
pub mod pipeline;
pub mod transform;
pub mod vegetation;

#[cfg(test)]
mod test_utils;

pub use align::{AlignConfig, AlignmentDiagnostics, AlignmentResult, AlignmentStatus};
pub use api::ChangeDetector;
pub use change::{ChangeAnalysis, ChangeStats};
pub use config::PipelineConfig;
pub use error::{AlignmentFailure, InvalidImageError};
pub use features::OrbConfig;
pub use homography::{HomographyConfig, RansacHomographyConfig};
pub use pipeline::{PipelineResult, PipelineSummary};
pub use vegetation::VegetationBand;
