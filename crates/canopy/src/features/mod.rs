//! Keypoint detection, binary descriptors, and cross-checked matching.
//!
//! [`OrbExtractor`] detects oriented FAST corners over a scale pyramid and
//! describes them with rotation-steered BRIEF strings. [`match_cross_checked`]
//! pairs descriptors by mutual nearest Hamming neighbour.

mod matching;
mod orb;
mod pattern;
mod pyramid;

use image::{GrayImage, RgbImage};

use crate::error::AlignmentFailure;

pub use matching::{hamming_distance, match_cross_checked};
pub use orb::{OrbConfig, OrbExtractor};

/// Descriptor length in bytes (256 binary tests).
pub const DESCRIPTOR_BYTES: usize = 32;

/// 256-bit binary descriptor.
pub type Descriptor = [u8; DESCRIPTOR_BYTES];

/// A detected keypoint in full-resolution pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    /// Orientation in degrees, `[0, 360)`.
    pub angle: f32,
    /// Corner strength (Harris response at the detection level).
    pub response: f32,
    /// Pyramid level the keypoint was detected on.
    pub octave: u8,
    /// Diameter of the described patch in full-resolution pixels.
    pub size: f32,
}

impl Keypoint {
    pub fn xy(&self) -> [f64; 2] {
        [self.x as f64, self.y as f64]
    }
}

/// Keypoints and their descriptors (parallel vectors).
#[derive(Debug, Clone, Default)]
pub struct Features {
    pub keypoints: Vec<Keypoint>,
    pub descriptors: Vec<Descriptor>,
}

impl Features {
    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }
}

/// One correspondence: `query_idx` indexes the image being aligned,
/// `train_idx` the reference image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    pub query_idx: usize,
    pub train_idx: usize,
    /// Hamming distance between the two descriptors.
    pub distance: u32,
}

/// Output of [`extract_and_match`]: both keypoint sets plus mutual matches
/// sorted ascending by distance.
#[derive(Debug, Clone, Default)]
pub struct FeatureMatches {
    pub keypoints_ref: Vec<Keypoint>,
    pub keypoints_src: Vec<Keypoint>,
    pub matches: Vec<Match>,
}

impl FeatureMatches {
    /// Point pairs `(src, dst)` in match order: to-align points and their
    /// reference counterparts.
    pub fn correspondences(&self) -> (Vec<[f64; 2]>, Vec<[f64; 2]>) {
        self.matches
            .iter()
            .map(|m| {
                (
                    self.keypoints_src[m.query_idx].xy(),
                    self.keypoints_ref[m.train_idx].xy(),
                )
            })
            .unzip()
    }
}

/// Capability seam for keypoint + descriptor extraction.
///
/// Implementations must report location and orientation for every keypoint
/// and produce rotation-invariant 256-bit descriptors.
pub trait FeatureExtractor {
    fn detect_and_compute(&self, gray: &GrayImage) -> Features;
}

/// Detect, describe, and cross-check match features of two RGB images.
pub fn extract_and_match(
    reference: &RgbImage,
    to_align: &RgbImage,
    config: &OrbConfig,
) -> Result<FeatureMatches, AlignmentFailure> {
    let extractor = OrbExtractor::new(config.clone());
    let reference_gray = image::imageops::grayscale(reference);
    let to_align_gray = image::imageops::grayscale(to_align);
    extract_and_match_with(&reference_gray, &to_align_gray, &extractor)
}

/// Same as [`extract_and_match`] on grayscale inputs with any extractor.
pub fn extract_and_match_with(
    reference: &GrayImage,
    to_align: &GrayImage,
    extractor: &dyn FeatureExtractor,
) -> Result<FeatureMatches, AlignmentFailure> {
    let reference_features = extractor.detect_and_compute(reference);
    let to_align_features = extractor.detect_and_compute(to_align);
    tracing::debug!(
        "features: reference={} to_align={}",
        reference_features.len(),
        to_align_features.len()
    );

    if reference_features.is_empty() || to_align_features.is_empty() {
        return Err(AlignmentFailure::DescriptorComputationFailed {
            reference_keypoints: reference_features.len(),
            to_align_keypoints: to_align_features.len(),
        });
    }

    let matches = match_cross_checked(
        &to_align_features.descriptors,
        &reference_features.descriptors,
    );
    tracing::debug!("cross-checked matches: {}", matches.len());

    Ok(FeatureMatches {
        keypoints_ref: reference_features.keypoints,
        keypoints_src: to_align_features.keypoints,
        matches,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{crop_rgb, solid_rgb, textured_rgb};
    use image::Rgb;

    #[test]
    fn blank_image_signals_descriptor_failure() {
        let blank = solid_rgb(120, 90, Rgb([128, 128, 128]));
        let textured = textured_rgb(120, 90, 5);
        let err = extract_and_match(&textured, &blank, &OrbConfig::default()).unwrap_err();
        match err {
            AlignmentFailure::DescriptorComputationFailed {
                reference_keypoints,
                to_align_keypoints,
            } => {
                assert!(reference_keypoints > 0);
                assert_eq!(to_align_keypoints, 0);
            }
            other => panic!("unexpected failure: {other}"),
        }
    }

    #[test]
    fn crop_matches_reference_at_offset() {
        let reference = textured_rgb(240, 180, 11);
        let crop = crop_rgb(&reference, 20, 15, 200, 150);
        let fm = extract_and_match(&reference, &crop, &OrbConfig::default())
            .expect("textured images must produce features");
        assert!(fm.matches.len() >= 30, "only {} matches", fm.matches.len());

        // Matches are sorted best-first.
        assert!(fm.matches.windows(2).all(|w| w[0].distance <= w[1].distance));

        // The best matches sit exactly at the crop offset.
        let (src, dst) = fm.correspondences();
        let good = src
            .iter()
            .zip(&dst)
            .take(20)
            .filter(|(s, d)| ((d[0] - s[0]) - 20.0).abs() < 1.5 && ((d[1] - s[1]) - 15.0).abs() < 1.5)
            .count();
        assert!(good >= 15, "only {good} of the best 20 matches are consistent");
    }

    #[test]
    fn correspondences_follow_match_indices() {
        let kp = |x: f32| Keypoint {
            x,
            y: 2.0 * x,
            angle: 0.0,
            response: 0.0,
            octave: 0,
            size: 31.0,
        };
        let fm = FeatureMatches {
            keypoints_ref: vec![kp(1.0), kp(2.0)],
            keypoints_src: vec![kp(10.0), kp(20.0), kp(30.0)],
            matches: vec![Match {
                query_idx: 2,
                train_idx: 0,
                distance: 3,
            }],
        };
        let (src, dst) = fm.correspondences();
        assert_eq!(src, vec![[30.0, 60.0]]);
        assert_eq!(dst, vec![[1.0, 2.0]]);
    }
}
