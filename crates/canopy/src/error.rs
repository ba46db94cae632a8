//! Error taxonomy shared by the pipeline stages.
//!
//! [`InvalidImageError`] is the only error that escapes the pipeline.
//! [`AlignmentFailure`] is always recovered inside the aligner, which falls
//! back to resizing and reports the failure text in its message.

/// Malformed input for a pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidImageError {
    /// The grid has zero width or zero height.
    Empty {
        stage: &'static str,
        width: u32,
        height: u32,
    },
    /// Two grids that must share dimensions do not.
    DimensionMismatch {
        stage: &'static str,
        expected: [u32; 2],
        got: [u32; 2],
    },
}

impl InvalidImageError {
    pub(crate) fn check_non_empty(
        stage: &'static str,
        (width, height): (u32, u32),
    ) -> Result<(), Self> {
        if width == 0 || height == 0 {
            return Err(Self::Empty {
                stage,
                width,
                height,
            });
        }
        Ok(())
    }

    pub(crate) fn check_same_size(
        stage: &'static str,
        expected: (u32, u32),
        got: (u32, u32),
    ) -> Result<(), Self> {
        if expected != got {
            return Err(Self::DimensionMismatch {
                stage,
                expected: [expected.0, expected.1],
                got: [got.0, got.1],
            });
        }
        Ok(())
    }
}

impl std::fmt::Display for InvalidImageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty {
                stage,
                width,
                height,
            } => write!(f, "{stage}: image has zero area ({width}x{height})"),
            Self::DimensionMismatch {
                stage,
                expected,
                got,
            } => write!(
                f,
                "{stage}: dimension mismatch, expected {}x{}, got {}x{}",
                expected[0], expected[1], got[0], got[1]
            ),
        }
    }
}

impl std::error::Error for InvalidImageError {}

/// Recoverable reasons why feature-based alignment could not be used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlignmentFailure {
    /// One or both images produced no descriptors (e.g. blank or uniform).
    DescriptorComputationFailed {
        reference_keypoints: usize,
        to_align_keypoints: usize,
    },
    /// Fewer cross-checked matches than the configured minimum.
    InsufficientMatches { found: usize, required: usize },
    /// RANSAC found no valid, invertible consensus transform.
    HomographyEstimationFailed { reason: String },
}

impl std::fmt::Display for AlignmentFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DescriptorComputationFailed {
                reference_keypoints,
                to_align_keypoints,
            } => write!(
                f,
                "Could not compute descriptors (reference: {reference_keypoints} keypoints, \
                 to align: {to_align_keypoints} keypoints)"
            ),
            Self::InsufficientMatches { found, required } => {
                write!(f, "Not enough matches found ({found}/{required})")
            }
            Self::HomographyEstimationFailed { reason } => {
                write!(f, "Homography estimation failed: {reason}")
            }
        }
    }
}

impl std::error::Error for AlignmentFailure {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_matches_reports_counts() {
        let msg = AlignmentFailure::InsufficientMatches {
            found: 10,
            required: 30,
        }
        .to_string();
        assert_eq!(msg, "Not enough matches found (10/30)");
    }

    #[test]
    fn empty_check_rejects_zero_width_and_height() {
        assert!(InvalidImageError::check_non_empty("segment", (0, 5)).is_err());
        assert!(InvalidImageError::check_non_empty("segment", (5, 0)).is_err());
        assert!(InvalidImageError::check_non_empty("segment", (1, 1)).is_ok());
    }

    #[test]
    fn mismatch_message_names_both_sizes() {
        let err = InvalidImageError::check_same_size("change", (4, 3), (3, 4)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "change: dimension mismatch, expected 4x3, got 3x4"
        );
    }
}
