//! Robust homography estimation from feature matches.
//!
//! The match-count gate runs before any fitting: with fewer correspondences
//! than `min_matches` the fit is too unstable to trust, so the estimator
//! reports [`AlignmentFailure::InsufficientMatches`] without sampling.

use nalgebra::Matrix3;

use super::core::{
    fit_homography_ransac, is_valid_homography, HomographyError, RansacHomographyConfig,
};
use crate::error::AlignmentFailure;
use crate::features::FeatureMatches;

/// Configuration for match-based homography estimation.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct HomographyConfig {
    /// Minimum number of cross-checked matches required to attempt a fit.
    pub min_matches: usize,
    /// RANSAC parameters.
    pub ransac: RansacHomographyConfig,
}

impl Default for HomographyConfig {
    fn default() -> Self {
        Self {
            min_matches: 30,
            ransac: RansacHomographyConfig::default(),
        }
    }
}

/// A fitted to-align → reference transform with its consensus statistics.
#[derive(Debug, Clone)]
pub struct HomographyEstimate {
    pub h: Matrix3<f64>,
    /// Per-match inlier flags, in match order.
    pub inlier_mask: Vec<bool>,
    pub n_inliers: usize,
    /// Mean reprojection error of inliers in reference pixels.
    pub mean_err_px: f64,
}

/// Capability seam: anything that turns point correspondences into a
/// homography with the same numeric contract as [`RansacHomography`].
pub trait HomographyEstimator {
    /// `src` are to-align points, `dst` the matching reference points.
    fn fit(&self, src: &[[f64; 2]], dst: &[[f64; 2]]) -> Result<HomographyEstimate, HomographyError>;
}

/// DLT-in-RANSAC estimator.
#[derive(Debug, Clone, Default)]
pub struct RansacHomography {
    config: RansacHomographyConfig,
}

impl RansacHomography {
    pub fn new(config: RansacHomographyConfig) -> Self {
        Self { config }
    }
}

impl HomographyEstimator for RansacHomography {
    fn fit(&self, src: &[[f64; 2]], dst: &[[f64; 2]]) -> Result<HomographyEstimate, HomographyError> {
        let result = fit_homography_ransac(src, dst, &self.config)?;
        tracing::debug!(
            "RANSAC: {}/{} inliers after {} iterations",
            result.n_inliers,
            src.len(),
            result.iterations
        );
        let mean_err_px = result.mean_inlier_error();
        Ok(HomographyEstimate {
            h: result.h,
            inlier_mask: result.inlier_mask,
            n_inliers: result.n_inliers,
            mean_err_px,
        })
    }
}

/// Estimate the to-align → reference homography with the default RANSAC
/// estimator.
pub fn estimate_homography(
    matches: &FeatureMatches,
    config: &HomographyConfig,
) -> Result<HomographyEstimate, AlignmentFailure> {
    let estimator = RansacHomography::new(config.ransac.clone());
    estimate_homography_with(matches, config.min_matches, &estimator)
}

/// Estimate the to-align → reference homography with a caller-supplied
/// estimator.
pub fn estimate_homography_with(
    matches: &FeatureMatches,
    min_matches: usize,
    estimator: &dyn HomographyEstimator,
) -> Result<HomographyEstimate, AlignmentFailure> {
    let found = matches.matches.len();
    if found < min_matches {
        return Err(AlignmentFailure::InsufficientMatches {
            found,
            required: min_matches,
        });
    }

    let (src, dst) = matches.correspondences();
    let estimate = estimator
        .fit(&src, &dst)
        .map_err(|e| AlignmentFailure::HomographyEstimationFailed {
            reason: e.to_string(),
        })?;

    if !is_valid_homography(&estimate.h) {
        return Err(AlignmentFailure::HomographyEstimationFailed {
            reason: "transform is not invertible".into(),
        });
    }
    Ok(estimate)
}
