//! Oriented FAST + rotated BRIEF feature extraction.
//!
//! Per pyramid level: FAST-9 corners away from the border, 3×3 non-maximum
//! suppression on the FAST score, Harris-response ranking, intensity-centroid
//! orientation, then 256 steered intensity comparisons on a smoothed copy of
//! the level.

use image::GrayImage;
use imageproc::corners::{corners_fast9, Corner};

use super::pattern::{brief_pattern, PATTERN_RADIUS};
use super::pyramid::{build_pyramid, level_quotas};
use super::{Descriptor, FeatureExtractor, Features, Keypoint, DESCRIPTOR_BYTES};

/// Radius of the disc used for the intensity-centroid orientation.
const ORIENTATION_RADIUS: i32 = 15;
/// Keypoints closer than this to a level border are discarded.
const EDGE_BORDER: u32 = ORIENTATION_RADIUS as u32 + 1;
/// Side of the Harris structure-tensor window.
const HARRIS_BLOCK: i32 = 7;
/// Nominal described patch diameter at level 0.
const PATCH_SIZE: f32 = (2 * ORIENTATION_RADIUS + 1) as f32;

/// ORB detector/descriptor parameters.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct OrbConfig {
    /// Upper bound on keypoints per image, across all levels.
    pub max_features: usize,
    /// Number of pyramid levels.
    pub n_levels: usize,
    /// Downscale ratio between consecutive levels (> 1).
    pub scale_factor: f32,
    /// FAST intensity threshold.
    pub fast_threshold: u8,
    /// Harris detector free parameter.
    pub harris_k: f32,
    /// Gaussian σ applied before sampling descriptor tests.
    pub blur_sigma: f32,
}

impl Default for OrbConfig {
    fn default() -> Self {
        Self {
            max_features: 2000,
            n_levels: 8,
            scale_factor: 1.2,
            fast_threshold: 20,
            harris_k: 0.04,
            blur_sigma: 2.0,
        }
    }
}

/// ORB feature extractor. Holds only configuration; create one per call
/// site or share it freely across threads.
#[derive(Debug, Clone, Default)]
pub struct OrbExtractor {
    config: OrbConfig,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    x: u32,
    y: u32,
    fast_score: f32,
    response: f32,
}

impl OrbExtractor {
    pub fn new(config: OrbConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OrbConfig {
        &self.config
    }

    fn effective_levels(&self) -> usize {
        if self.config.scale_factor > 1.0 {
            self.config.n_levels.max(1)
        } else {
            1
        }
    }

    fn detect_level(&self, img: &GrayImage, quota: usize) -> Vec<Candidate> {
        let (w, h) = img.dimensions();
        let inside: Vec<Corner> = corners_fast9(img, self.config.fast_threshold)
            .into_iter()
            .filter(|c| {
                c.x >= EDGE_BORDER
                    && c.y >= EDGE_BORDER
                    && c.x < w - EDGE_BORDER
                    && c.y < h - EDGE_BORDER
            })
            .collect();

        let mut candidates = suppress_non_maximum(&inside, w, h);
        retain_best(&mut candidates, 2 * quota, |c| c.fast_score);
        for c in candidates.iter_mut() {
            c.response = harris_response(img, c.x, c.y, self.config.harris_k);
        }
        retain_best(&mut candidates, quota, |c| c.response);
        candidates
    }
}

impl FeatureExtractor for OrbExtractor {
    fn detect_and_compute(&self, gray: &GrayImage) -> Features {
        let n_levels = self.effective_levels();
        let levels = build_pyramid(
            gray,
            n_levels,
            self.config.scale_factor,
            2 * EDGE_BORDER + 1,
        );
        let quotas = level_quotas(self.config.max_features, levels.len(), self.config.scale_factor);

        let mut features = Features::default();
        for (octave, (level, quota)) in levels.iter().zip(quotas).enumerate() {
            if quota == 0 {
                continue;
            }
            let candidates = self.detect_level(&level.image, quota);
            if candidates.is_empty() {
                continue;
            }
            let smoothed = if self.config.blur_sigma > 0.0 {
                imageproc::filter::gaussian_blur_f32(&level.image, self.config.blur_sigma)
            } else {
                level.image.clone()
            };

            for c in candidates {
                let angle = intensity_centroid_angle(&level.image, c.x, c.y);
                features.descriptors.push(steered_brief(&smoothed, c.x, c.y, angle));
                features.keypoints.push(Keypoint {
                    x: c.x as f32 * level.scale,
                    y: c.y as f32 * level.scale,
                    angle,
                    response: c.response,
                    octave: octave as u8,
                    size: PATCH_SIZE * level.scale,
                });
            }
        }
        features
    }
}

/// Keep corners whose FAST score is a strict 3×3 maximum; ties go to the
/// earlier corner in raster order.
fn suppress_non_maximum(corners: &[Corner], w: u32, h: u32) -> Vec<Candidate> {
    let (w, h) = (w as usize, h as usize);
    let mut scores = vec![0.0f32; w * h];
    for c in corners {
        scores[c.y as usize * w + c.x as usize] = c.score;
    }

    corners
        .iter()
        .filter(|c| {
            let (x, y) = (c.x as usize, c.y as usize);
            let own = y * w + x;
            for ny in y.saturating_sub(1)..=(y + 1).min(h - 1) {
                for nx in x.saturating_sub(1)..=(x + 1).min(w - 1) {
                    let idx = ny * w + nx;
                    if idx == own {
                        continue;
                    }
                    let s = scores[idx];
                    if s > c.score || (s == c.score && idx < own) {
                        return false;
                    }
                }
            }
            true
        })
        .map(|c| Candidate {
            x: c.x,
            y: c.y,
            fast_score: c.score,
            response: 0.0,
        })
        .collect()
}

fn retain_best(candidates: &mut Vec<Candidate>, n: usize, key: impl Fn(&Candidate) -> f32) {
    if candidates.len() <= n {
        return;
    }
    candidates.sort_by(|a, b| key(b).total_cmp(&key(a)));
    candidates.truncate(n);
}

#[inline]
fn px(img: &GrayImage, x: i32, y: i32) -> i32 {
    img.get_pixel(x as u32, y as u32)[0] as i32
}

/// Harris corner response over a `HARRIS_BLOCK`² window of Sobel gradients.
fn harris_response(img: &GrayImage, x: u32, y: u32, k: f32) -> f32 {
    let r = HARRIS_BLOCK / 2;
    let (cx, cy) = (x as i32, y as i32);
    let (mut a, mut b, mut c) = (0i64, 0i64, 0i64);
    for v in cy - r..=cy + r {
        for u in cx - r..=cx + r {
            let ix = (px(img, u + 1, v) - px(img, u - 1, v)) * 2
                + (px(img, u + 1, v - 1) - px(img, u - 1, v - 1))
                + (px(img, u + 1, v + 1) - px(img, u - 1, v + 1));
            let iy = (px(img, u, v + 1) - px(img, u, v - 1)) * 2
                + (px(img, u - 1, v + 1) - px(img, u - 1, v - 1))
                + (px(img, u + 1, v + 1) - px(img, u + 1, v - 1));
            a += (ix * ix) as i64;
            b += (iy * iy) as i64;
            c += (ix * iy) as i64;
        }
    }
    let scale = 1.0 / (4.0 * HARRIS_BLOCK as f64 * 255.0);
    let s2 = scale * scale;
    let (a, b, c) = (a as f64 * s2, b as f64 * s2, c as f64 * s2);
    ((a * b - c * c) - k as f64 * (a + b) * (a + b)) as f32
}

/// Orientation (degrees, `[0, 360)`) of the vector from the keypoint to the
/// intensity centroid of the surrounding disc.
fn intensity_centroid_angle(img: &GrayImage, x: u32, y: u32) -> f32 {
    let r = ORIENTATION_RADIUS;
    let (cx, cy) = (x as i32, y as i32);
    let (mut m01, mut m10) = (0i64, 0i64);
    for v in -r..=r {
        let u_max = ((r * r - v * v) as f64).sqrt().floor() as i32;
        for u in -u_max..=u_max {
            let p = px(img, cx + u, cy + v) as i64;
            m10 += u as i64 * p;
            m01 += v as i64 * p;
        }
    }
    let deg = (m01 as f64).atan2(m10 as f64).to_degrees();
    let deg = if deg < 0.0 { deg + 360.0 } else { deg };
    if deg >= 360.0 {
        0.0
    } else {
        deg as f32
    }
}

/// BRIEF descriptor with the test pattern rotated by `angle_deg`.
fn steered_brief(smoothed: &GrayImage, x: u32, y: u32, angle_deg: f32) -> Descriptor {
    debug_assert!(PATTERN_RADIUS + 1 < EDGE_BORDER as i32);
    let (sin, cos) = angle_deg.to_radians().sin_cos();
    let (cx, cy) = (x as i32, y as i32);
    let sample = |p: [i8; 2]| {
        let (fx, fy) = (p[0] as f32, p[1] as f32);
        let rx = (cos * fx - sin * fy).round() as i32;
        let ry = (sin * fx + cos * fy).round() as i32;
        px(smoothed, cx + rx, cy + ry)
    };

    let mut descriptor = [0u8; DESCRIPTOR_BYTES];
    for (i, test) in brief_pattern().iter().enumerate() {
        if sample(test.a) < sample(test.b) {
            descriptor[i / 8] |= 1 << (i % 8);
        }
    }
    descriptor
}
