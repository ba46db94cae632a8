//! Scale pyramid and per-level feature budgets.

use image::imageops::{self, FilterType};
use image::GrayImage;

pub(crate) struct PyramidLevel {
    pub image: GrayImage,
    /// Full-resolution pixels per level pixel.
    pub scale: f32,
}

/// Build up to `n_levels` levels, each `scale_factor` smaller than the
/// previous one. Stops early once a level would be narrower than `min_side`.
pub(crate) fn build_pyramid(
    gray: &GrayImage,
    n_levels: usize,
    scale_factor: f32,
    min_side: u32,
) -> Vec<PyramidLevel> {
    let mut levels = Vec::with_capacity(n_levels.max(1));
    if gray.width() < min_side || gray.height() < min_side {
        return levels;
    }
    levels.push(PyramidLevel {
        image: gray.clone(),
        scale: 1.0,
    });

    let (w0, h0) = gray.dimensions();
    for level in 1..n_levels {
        let scale = scale_factor.powi(level as i32);
        let w = (w0 as f32 / scale).round() as u32;
        let h = (h0 as f32 / scale).round() as u32;
        if w < min_side || h < min_side {
            break;
        }
        let prev = &levels[level - 1].image;
        let image = imageops::resize(prev, w, h, FilterType::Triangle);
        levels.push(PyramidLevel { image, scale });
    }
    levels
}

/// Split `total` features across `n_levels` geometrically, so each level's
/// share shrinks with its area. The last level absorbs rounding leftovers.
pub(crate) fn level_quotas(total: usize, n_levels: usize, scale_factor: f32) -> Vec<usize> {
    if n_levels == 0 {
        return Vec::new();
    }
    if n_levels == 1 {
        return vec![total];
    }
    let factor = 1.0 / scale_factor as f64;
    let mut desired =
        total as f64 * (1.0 - factor) / (1.0 - factor.powi(n_levels as i32));

    let mut quotas = Vec::with_capacity(n_levels);
    let mut assigned = 0usize;
    for _ in 0..n_levels - 1 {
        let q = (desired.round() as usize).min(total - assigned);
        quotas.push(q);
        assigned += q;
        desired *= factor;
    }
    quotas.push(total - assigned);
    quotas
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotas_sum_to_total_and_decrease() {
        let q = level_quotas(2000, 8, 1.2);
        assert_eq!(q.len(), 8);
        assert_eq!(q.iter().sum::<usize>(), 2000);
        assert!(q[0] > q[1] && q[1] > q[2]);
    }

    #[test]
    fn single_level_gets_everything() {
        assert_eq!(level_quotas(500, 1, 1.2), vec![500]);
        assert!(level_quotas(500, 0, 1.2).is_empty());
    }

    #[test]
    fn pyramid_stops_at_min_side() {
        let img = GrayImage::new(100, 80);
        let levels = build_pyramid(&img, 8, 1.2, 40);
        // 80 / 1.2^k >= 40  ⇒  k <= 3
        assert_eq!(levels.len(), 4);
        assert_eq!(levels[1].image.dimensions(), (83, 67));
        assert!(levels.iter().all(|l| l.image.height() >= 40));
    }

    #[test]
    fn tiny_image_has_no_levels() {
        let img = GrayImage::new(20, 20);
        assert!(build_pyramid(&img, 8, 1.2, 33).is_empty());
    }
}
