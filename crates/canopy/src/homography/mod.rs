//! Homography estimation, projection, and the robust estimator seam used by
//! the aligner.

mod core;
mod estimator;

pub use self::core::{
    estimate_homography_dlt, fit_homography_ransac, is_valid_homography, project,
    reprojection_error, HomographyError, RansacHomographyConfig, RansacHomographyResult,
};
pub use self::estimator::{
    estimate_homography, estimate_homography_with, HomographyConfig, HomographyEstimate,
    HomographyEstimator, RansacHomography,
};

pub(crate) fn matrix3_to_array(m: &nalgebra::Matrix3<f64>) -> [[f64; 3]; 3] {
    [
        [m[(0, 0)], m[(0, 1)], m[(0, 2)]],
        [m[(1, 0)], m[(1, 1)], m[(1, 2)]],
        [m[(2, 0)], m[(2, 1)], m[(2, 2)]],
    ]
}
