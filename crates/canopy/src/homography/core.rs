//! Homography estimation via DLT with Hartley normalization.
//!
//! Provides:
//! - Direct Linear Transform (DLT) from ≥4 point correspondences.
//! - RANSAC wrapper with a capped, confidence-adaptive iteration budget.
//! - Reprojection error and validity checks.

use nalgebra::{DMatrix, Matrix3, Vector3};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Minimal sample size for a homography.
const SAMPLE_SIZE: usize = 4;
/// Attempts to draw a non-degenerate minimal sample per iteration.
const MAX_SAMPLE_ATTEMPTS: usize = 100;
/// |sin| of the angle below which three sample points count as collinear.
const COLLINEAR_SIN_EPS: f64 = 1e-3;
/// Smallest accepted |det(H)| once H is normalized to h22 = 1.
const MIN_ABS_DET: f64 = 1e-8;

// ── Error type ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum HomographyError {
    TooFewPoints { needed: usize, got: usize },
    NumericalFailure(String),
    InsufficientInliers { needed: usize, found: usize },
}

impl std::fmt::Display for HomographyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooFewPoints { needed, got } => {
                write!(f, "too few points: need {}, got {}", needed, got)
            }
            Self::NumericalFailure(msg) => write!(f, "numerical failure: {}", msg),
            Self::InsufficientInliers { needed, found } => {
                write!(f, "insufficient inliers: need {}, found {}", needed, found)
            }
        }
    }
}

impl std::error::Error for HomographyError {}

// ── Projection ───────────────────────────────────────────────────────────

/// Project a 2D point through a 3×3 homography: H * [x, y, 1]^T → [u, v].
pub fn project(h: &Matrix3<f64>, x: f64, y: f64) -> [f64; 2] {
    let p = h * Vector3::new(x, y, 1.0);
    if p[2].abs() < 1e-15 {
        return [f64::NAN, f64::NAN];
    }
    [p[0] / p[2], p[1] / p[2]]
}

/// Reprojection error: ||project(H, src) - dst||.
pub fn reprojection_error(h: &Matrix3<f64>, src: &[f64; 2], dst: &[f64; 2]) -> f64 {
    let p = project(h, src[0], src[1]);
    let dx = p[0] - dst[0];
    let dy = p[1] - dst[1];
    (dx * dx + dy * dy).sqrt()
}

/// `true` when every entry is finite and the matrix is safely invertible.
pub fn is_valid_homography(h: &Matrix3<f64>) -> bool {
    if h.iter().any(|v| !v.is_finite()) {
        return false;
    }
    let scale = h[(2, 2)];
    let normalized = if scale.abs() > 1e-15 { h / scale } else { *h };
    normalized.determinant().abs() > MIN_ABS_DET && normalized.try_inverse().is_some()
}

// ── Hartley normalization ────────────────────────────────────────────────

/// Compute a normalizing transform: translate centroid to origin, scale so
/// mean distance from origin is sqrt(2).
fn normalize_points(pts: &[[f64; 2]]) -> (Matrix3<f64>, Vec<[f64; 2]>) {
    let n = pts.len() as f64;
    let cx: f64 = pts.iter().map(|p| p[0]).sum::<f64>() / n;
    let cy: f64 = pts.iter().map(|p| p[1]).sum::<f64>() / n;

    let mean_dist: f64 = pts
        .iter()
        .map(|p| ((p[0] - cx).powi(2) + (p[1] - cy).powi(2)).sqrt())
        .sum::<f64>()
        / n;

    let s = if mean_dist > 1e-15 {
        std::f64::consts::SQRT_2 / mean_dist
    } else {
        1.0
    };

    let t = Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0);
    let normalized: Vec<[f64; 2]> = pts
        .iter()
        .map(|p| [s * (p[0] - cx), s * (p[1] - cy)])
        .collect();

    (t, normalized)
}

// ── DLT ──────────────────────────────────────────────────────────────────

/// Estimate homography from ≥4 point correspondences using DLT.
///
/// `src`: points in the image being aligned.
/// `dst`: corresponding points in the reference image.
///
/// Returns the 3×3 homography H such that dst ≈ project(H, src), scaled so
/// that `H[(2, 2)] == 1` whenever that entry is not vanishing.
pub fn estimate_homography_dlt(
    src: &[[f64; 2]],
    dst: &[[f64; 2]],
) -> Result<Matrix3<f64>, HomographyError> {
    let n = src.len();
    if n < SAMPLE_SIZE || dst.len() < SAMPLE_SIZE {
        return Err(HomographyError::TooFewPoints {
            needed: SAMPLE_SIZE,
            got: n.min(dst.len()),
        });
    }
    if src.len() != dst.len() {
        return Err(HomographyError::NumericalFailure(
            "src and dst must have the same length".into(),
        ));
    }

    let (t_src, src_n) = normalize_points(src);
    let (t_dst, dst_n) = normalize_points(dst);

    // Build 2n × 9 matrix A
    let mut a = DMatrix::zeros(2 * n, 9);
    for i in 0..n {
        let (sx, sy) = (src_n[i][0], src_n[i][1]);
        let (dx, dy) = (dst_n[i][0], dst_n[i][1]);

        // Row 2i:   [  0  0  0 | -sx -sy -1 | dy*sx  dy*sy  dy ]
        a[(2 * i, 3)] = -sx;
        a[(2 * i, 4)] = -sy;
        a[(2 * i, 5)] = -1.0;
        a[(2 * i, 6)] = dy * sx;
        a[(2 * i, 7)] = dy * sy;
        a[(2 * i, 8)] = dy;

        // Row 2i+1: [ sx  sy  1 |  0  0  0 | -dx*sx -dx*sy -dx ]
        a[(2 * i + 1, 0)] = sx;
        a[(2 * i + 1, 1)] = sy;
        a[(2 * i + 1, 2)] = 1.0;
        a[(2 * i + 1, 6)] = -dx * sx;
        a[(2 * i + 1, 7)] = -dx * sy;
        a[(2 * i + 1, 8)] = -dx;
    }

    // Null vector of A = eigenvector of AᵀA with the smallest eigenvalue.
    let ata = a.transpose() * &a;
    let eig = nalgebra::SymmetricEigen::new(ata);
    let min_idx = eig
        .eigenvalues
        .iter()
        .enumerate()
        .min_by(|(_, x), (_, y)| x.abs().total_cmp(&y.abs()))
        .map(|(i, _)| i)
        .unwrap_or(0);
    let v = eig.eigenvectors.column(min_idx);
    let h_norm = Matrix3::new(v[0], v[1], v[2], v[3], v[4], v[5], v[6], v[7], v[8]);

    // Denormalize: H = T_dst^-1 * H_norm * T_src
    let t_dst_inv = t_dst
        .try_inverse()
        .ok_or_else(|| HomographyError::NumericalFailure("T_dst not invertible".into()))?;
    let h = t_dst_inv * h_norm * t_src;

    let scale = h[(2, 2)];
    if scale.abs() < 1e-15 {
        Ok(h)
    } else {
        Ok(h / scale)
    }
}

// ── Sample degeneracy ────────────────────────────────────────────────────

fn cross(o: [f64; 2], a: [f64; 2], b: [f64; 2]) -> (f64, f64) {
    let (ax, ay) = (a[0] - o[0], a[1] - o[1]);
    let (bx, by) = (b[0] - o[0], b[1] - o[1]);
    let c = ax * by - ay * bx;
    let norm = (ax * ax + ay * ay).sqrt() * (bx * bx + by * by).sqrt();
    (c, norm)
}

/// A minimal sample is unusable when any three of its points are (nearly)
/// collinear in either image, or when its triangles disagree on whether the
/// mapping flips orientation (no single homography can explain that).
fn sample_is_degenerate(src: &[[f64; 2]; SAMPLE_SIZE], dst: &[[f64; 2]; SAMPLE_SIZE]) -> bool {
    const TRIPLES: [[usize; 3]; 4] = [[0, 1, 2], [0, 1, 3], [0, 2, 3], [1, 2, 3]];
    let mut orientation = 0.0f64;
    for [i, j, k] in TRIPLES {
        let (cs, ns) = cross(src[i], src[j], src[k]);
        let (cd, nd) = cross(dst[i], dst[j], dst[k]);
        if cs.abs() <= COLLINEAR_SIN_EPS * ns || cd.abs() <= COLLINEAR_SIN_EPS * nd {
            return true;
        }
        let sign = (cs * cd).signum();
        if orientation == 0.0 {
            orientation = sign;
        } else if sign != orientation {
            return true;
        }
    }
    false
}

// ── RANSAC ───────────────────────────────────────────────────────────────

/// RANSAC configuration for homography fitting.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RansacHomographyConfig {
    /// Maximum number of RANSAC iterations.
    pub max_iters: usize,
    /// Inlier threshold (reprojection error in pixels).
    pub inlier_threshold: f64,
    /// Desired probability that at least one sample is outlier-free; drives
    /// early termination. Values outside `(0, 1)` disable early termination.
    pub confidence: f64,
    /// Minimum number of inliers for a valid model.
    pub min_inliers: usize,
    /// Random seed.
    pub seed: u64,
}

impl Default for RansacHomographyConfig {
    fn default() -> Self {
        Self {
            max_iters: 2000,
            inlier_threshold: 5.0,
            confidence: 0.995,
            min_inliers: SAMPLE_SIZE,
            seed: 0,
        }
    }
}

/// Result of RANSAC homography fitting.
#[derive(Debug, Clone)]
pub struct RansacHomographyResult {
    /// The fitted homography.
    pub h: Matrix3<f64>,
    /// Boolean mask: true for inliers.
    pub inlier_mask: Vec<bool>,
    /// Number of inliers.
    pub n_inliers: usize,
    /// Per-correspondence reprojection errors under `h`.
    pub errors: Vec<f64>,
    /// RANSAC iterations actually run.
    pub iterations: usize,
}

impl RansacHomographyResult {
    /// Mean reprojection error over inliers (NaN when there are none).
    pub fn mean_inlier_error(&self) -> f64 {
        let (sum, n) = self
            .errors
            .iter()
            .zip(&self.inlier_mask)
            .filter(|(_, &m)| m)
            .fold((0.0f64, 0usize), |(s, n), (e, _)| (s + e, n + 1));
        if n == 0 {
            f64::NAN
        } else {
            sum / n as f64
        }
    }
}

/// Number of iterations needed to reach `confidence` given the current
/// inlier ratio, capped at `max_iters`.
fn adaptive_iteration_bound(
    confidence: f64,
    inlier_ratio: f64,
    max_iters: usize,
) -> usize {
    if !(confidence > 0.0 && confidence < 1.0) {
        return max_iters;
    }
    let num = (1.0 - confidence).max(f64::MIN_POSITIVE);
    let denom = 1.0 - inlier_ratio.powi(SAMPLE_SIZE as i32);
    if denom < f64::MIN_POSITIVE {
        return 0;
    }
    let (num, denom) = (num.ln(), denom.ln());
    if denom >= 0.0 || -num >= max_iters as f64 * -denom {
        max_iters
    } else {
        (num / denom).round() as usize
    }
}

fn score(h: &Matrix3<f64>, src: &[[f64; 2]], dst: &[[f64; 2]], thresh: f64) -> (usize, Vec<bool>) {
    let mask: Vec<bool> = src
        .iter()
        .zip(dst)
        .map(|(s, d)| reprojection_error(h, s, d) < thresh)
        .collect();
    let count = mask.iter().filter(|&&m| m).count();
    (count, mask)
}

/// Fit homography with RANSAC.
///
/// `src`: points in the image being aligned.
/// `dst`: corresponding points in the reference image.
pub fn fit_homography_ransac(
    src: &[[f64; 2]],
    dst: &[[f64; 2]],
    config: &RansacHomographyConfig,
) -> Result<RansacHomographyResult, HomographyError> {
    let n = src.len();
    if n < SAMPLE_SIZE {
        return Err(HomographyError::TooFewPoints {
            needed: SAMPLE_SIZE,
            got: n,
        });
    }
    if dst.len() != n {
        return Err(HomographyError::NumericalFailure(
            "src and dst must have the same length".into(),
        ));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);

    let mut best_inliers = 0usize;
    let mut best_mask: Vec<bool> = vec![false; n];
    let mut best_h: Option<Matrix3<f64>> = None;

    let mut iter_bound = config.max_iters;
    let mut iterations = 0usize;
    while iterations < iter_bound {
        iterations += 1;

        let mut sample = None;
        for _ in 0..MAX_SAMPLE_ATTEMPTS {
            let idx = rand::seq::index::sample(&mut rng, n, SAMPLE_SIZE);
            let mut s4 = [[0.0; 2]; SAMPLE_SIZE];
            let mut d4 = [[0.0; 2]; SAMPLE_SIZE];
            for (slot, i) in idx.iter().enumerate() {
                s4[slot] = src[i];
                d4[slot] = dst[i];
            }
            if !sample_is_degenerate(&s4, &d4) {
                sample = Some((s4, d4));
                break;
            }
        }
        let Some((s4, d4)) = sample else {
            continue;
        };

        let h = match estimate_homography_dlt(&s4, &d4) {
            Ok(h) if is_valid_homography(&h) => h,
            _ => continue,
        };

        let (count, mask) = score(&h, src, dst, config.inlier_threshold);
        if count > best_inliers {
            best_inliers = count;
            best_mask = mask;
            best_h = Some(h);

            let bound = adaptive_iteration_bound(
                config.confidence,
                best_inliers as f64 / n as f64,
                config.max_iters,
            );
            iter_bound = iter_bound.min(bound);
        }
    }

    let min_inliers = config.min_inliers.max(SAMPLE_SIZE);
    let best_h = match best_h {
        Some(h) if best_inliers >= min_inliers => h,
        _ => {
            return Err(HomographyError::InsufficientInliers {
                needed: min_inliers,
                found: best_inliers,
            })
        }
    };

    // Refit using all inliers; keep the refit only if consensus holds.
    let inlier_src: Vec<[f64; 2]> = (0..n).filter(|&i| best_mask[i]).map(|i| src[i]).collect();
    let inlier_dst: Vec<[f64; 2]> = (0..n).filter(|&i| best_mask[i]).map(|i| dst[i]).collect();

    let mut h_final = best_h;
    let mut final_mask = best_mask;
    let mut final_inliers = best_inliers;
    if let Ok(h_refit) = estimate_homography_dlt(&inlier_src, &inlier_dst) {
        if is_valid_homography(&h_refit) {
            let (count, mask) = score(&h_refit, src, dst, config.inlier_threshold);
            if count >= best_inliers {
                h_final = h_refit;
                final_mask = mask;
                final_inliers = count;
            }
        }
    }

    if !is_valid_homography(&h_final) {
        return Err(HomographyError::NumericalFailure(
            "consensus homography is degenerate".into(),
        ));
    }

    let errors = src
        .iter()
        .zip(dst)
        .map(|(s, d)| reprojection_error(&h_final, s, d))
        .collect();

    Ok(RansacHomographyResult {
        h: h_final,
        inlier_mask: final_mask,
        n_inliers: final_inliers,
        errors,
        iterations,
    })
}

// ── Tests ────────────────────────────────────────────────────────────────
