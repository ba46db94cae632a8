use image::{GrayImage, RgbImage};

use crate::align::{AlignmentDiagnostics, AlignmentStatus};
use crate::change::ChangeStats;

/// Everything produced for one before/after pair. All images share the
/// same dimensions.
#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub alignment_status: AlignmentStatus,
    pub alignment_message: String,
    pub alignment_diagnostics: Option<AlignmentDiagnostics>,
    pub processed_before: RgbImage,
    pub processed_after: RgbImage,
    pub mask_before: GrayImage,
    pub mask_after: GrayImage,
    pub loss_mask: GrayImage,
    pub gain_mask: GrayImage,
    pub visualization: RgbImage,
    pub stats: ChangeStats,
}

/// Serializable record of a [`PipelineResult`] without the pixel data.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PipelineSummary {
    pub alignment_status: AlignmentStatus,
    pub alignment_message: String,
    /// Image dimensions [width, height] after alignment.
    pub image_size: [u32; 2],
    pub stats: ChangeStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alignment: Option<AlignmentDiagnostics>,
}

impl PipelineResult {
    pub fn image_size(&self) -> [u32; 2] {
        [self.processed_before.width(), self.processed_before.height()]
    }

    pub fn summary(&self) -> PipelineSummary {
        PipelineSummary {
            alignment_status: self.alignment_status,
            alignment_message: self.alignment_message.clone(),
            image_size: self.image_size(),
            stats: self.stats,
            alignment: self.alignment_diagnostics.clone(),
        }
    }
}
