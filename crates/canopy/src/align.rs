//! Bring two images onto a common pixel grid.
//!
//! Equal-size inputs pass through untouched. Otherwise the aligner tries a
//! feature-based homography and warps the companion image onto the reference
//! canvas; if that fails for any reason it falls back to shrinking the
//! larger image to the smaller one's dimensions.

use image::RgbImage;

use crate::error::{AlignmentFailure, InvalidImageError};
use crate::features::{extract_and_match, OrbConfig};
use crate::homography::{estimate_homography, matrix3_to_array, HomographyConfig};
use crate::transform::{resize_area, warp_perspective};

/// How the two outputs of [`align`] were produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignmentStatus {
    DimensionsAlreadyMatched,
    AlignedByFeatures,
    ResizedFallback,
}

/// Aligner configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AlignConfig {
    /// Attempt feature-based alignment before resizing.
    pub feature_alignment: bool,
    pub orb: OrbConfig,
    pub homography: HomographyConfig,
}

impl Default for AlignConfig {
    fn default() -> Self {
        Self {
            feature_alignment: true,
            orb: OrbConfig::default(),
            homography: HomographyConfig::default(),
        }
    }
}

/// What feature alignment saw, whether or not it succeeded.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AlignmentDiagnostics {
    pub keypoints_reference: usize,
    pub keypoints_to_align: usize,
    pub matches: usize,
    pub inliers: Option<usize>,
    pub mean_reprojection_error_px: Option<f64>,
    /// To-align → reference transform, row-major.
    pub homography: Option<[[f64; 3]; 3]>,
    /// Failure text when feature alignment was abandoned.
    pub failure: Option<String>,
}

/// Two images sharing the same dimensions.
#[derive(Debug, Clone)]
pub struct AlignmentResult {
    pub reference: RgbImage,
    /// The to-align image, warped or resized as needed.
    pub companion: RgbImage,
    pub status: AlignmentStatus,
    pub message: String,
    /// Present whenever feature alignment was attempted.
    pub diagnostics: Option<AlignmentDiagnostics>,
}

/// Align `to_align` to `reference`.
///
/// The reference is the "before" image of a change-detection pair, the
/// to-align image the "after" image; fallback messages use those names.
pub fn align(
    reference: &RgbImage,
    to_align: &RgbImage,
    config: &AlignConfig,
) -> Result<AlignmentResult, InvalidImageError> {
    InvalidImageError::check_non_empty("align", reference.dimensions())?;
    InvalidImageError::check_non_empty("align", to_align.dimensions())?;

    if reference.dimensions() == to_align.dimensions() {
        tracing::debug!("align: dimensions already match");
        return Ok(AlignmentResult {
            reference: reference.clone(),
            companion: to_align.clone(),
            status: AlignmentStatus::DimensionsAlreadyMatched,
            message: "Images have the same dimensions.".to_string(),
            diagnostics: None,
        });
    }

    if !config.feature_alignment {
        tracing::info!("align: feature alignment disabled, resizing");
        return Ok(resize_fallback(
            reference,
            to_align,
            "Feature alignment disabled",
            None,
        ));
    }

    let mut diagnostics = AlignmentDiagnostics::default();
    match align_by_features(reference, to_align, config, &mut diagnostics) {
        Ok(companion) => {
            tracing::info!(
                "align: feature-based alignment with {}/{} inliers",
                diagnostics.inliers.unwrap_or(0),
                diagnostics.matches
            );
            Ok(AlignmentResult {
                reference: reference.clone(),
                companion,
                status: AlignmentStatus::AlignedByFeatures,
                message: "Feature-based alignment successful.".to_string(),
                diagnostics: Some(diagnostics),
            })
        }
        Err(failure) => {
            tracing::warn!("align: {failure}, falling back to resize");
            let reason = format!("Feature alignment failed: {failure}");
            diagnostics.failure = Some(failure.to_string());
            Ok(resize_fallback(reference, to_align, &reason, Some(diagnostics)))
        }
    }
}

fn align_by_features(
    reference: &RgbImage,
    to_align: &RgbImage,
    config: &AlignConfig,
    diagnostics: &mut AlignmentDiagnostics,
) -> Result<RgbImage, AlignmentFailure> {
    let matches = extract_and_match(reference, to_align, &config.orb).map_err(|e| {
        if let AlignmentFailure::DescriptorComputationFailed {
            reference_keypoints,
            to_align_keypoints,
        } = e
        {
            diagnostics.keypoints_reference = reference_keypoints;
            diagnostics.keypoints_to_align = to_align_keypoints;
        }
        e
    })?;
    diagnostics.keypoints_reference = matches.keypoints_ref.len();
    diagnostics.keypoints_to_align = matches.keypoints_src.len();
    diagnostics.matches = matches.matches.len();

    let estimate = estimate_homography(&matches, &config.homography)?;
    diagnostics.inliers = Some(estimate.n_inliers);
    diagnostics.mean_reprojection_error_px = Some(estimate.mean_err_px);
    diagnostics.homography = Some(matrix3_to_array(&estimate.h));

    let (w, h) = reference.dimensions();
    warp_perspective(to_align, &estimate.h, w, h).ok_or_else(|| {
        AlignmentFailure::HomographyEstimationFailed {
            reason: "transform cannot be applied as a warp".into(),
        }
    })
}

/// Shrink the larger-area image to the smaller one's dimensions. Equal
/// areas resize the reference.
fn resize_fallback(
    reference: &RgbImage,
    to_align: &RgbImage,
    reason: &str,
    diagnostics: Option<AlignmentDiagnostics>,
) -> AlignmentResult {
    let (rw, rh) = reference.dimensions();
    let (tw, th) = to_align.dimensions();
    let reference_area = rw as u64 * rh as u64;
    let to_align_area = tw as u64 * th as u64;

    let (reference_out, companion, message) = if reference_area < to_align_area {
        (
            reference.clone(),
            resize_area(to_align, rw, rh),
            format!("{reason}. 'After' image resized to {rw}x{rh}."),
        )
    } else {
        (
            resize_area(reference, tw, th),
            to_align.clone(),
            format!("{reason}. 'Before' image resized to {tw}x{th}."),
        )
    };
    tracing::debug!("align: {message}");

    AlignmentResult {
        reference: reference_out,
        companion,
        status: AlignmentStatus::ResizedFallback,
        message,
        diagnostics,
    }
}
