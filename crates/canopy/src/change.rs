//! Vegetation loss/gain between two aligned masks.

use image::{DynamicImage, GrayImage, Rgb, RgbImage};

use crate::error::InvalidImageError;
use crate::vegetation::count_set;

/// Overlay color for vegetation present before but not after.
pub const LOSS_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
/// Overlay color for vegetation present after but not before.
pub const GAIN_COLOR: Rgb<u8> = Rgb([0, 255, 0]);

/// Pixel counts and percentages of total area, rounded to two decimals.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ChangeStats {
    pub total_pixels: u64,
    pub forest_pixels_before: u64,
    pub forest_pixels_after: u64,
    pub percentage_before: f64,
    pub percentage_after: f64,
    /// `percentage_after − percentage_before`, from unrounded values.
    pub change_percentage: f64,
    pub pixels_lost: u64,
    pub pixels_gained: u64,
    pub percentage_loss: f64,
    pub percentage_gain: f64,
}

#[derive(Debug, Clone)]
pub struct ChangeAnalysis {
    pub stats: ChangeStats,
    pub loss_mask: GrayImage,
    pub gain_mask: GrayImage,
    /// The after image with loss painted red and gain painted green.
    pub visualization: RgbImage,
}

/// Per-pixel `a − b` saturating at zero.
pub fn saturating_difference(a: &GrayImage, b: &GrayImage) -> Result<GrayImage, InvalidImageError> {
    InvalidImageError::check_same_size("difference", a.dimensions(), b.dimensions())?;
    let data = a
        .as_raw()
        .iter()
        .zip(b.as_raw())
        .map(|(&x, &y)| x.saturating_sub(y))
        .collect();
    GrayImage::from_raw(a.width(), a.height(), data).ok_or(InvalidImageError::DimensionMismatch {
        stage: "difference",
        expected: [a.width(), a.height()],
        got: [b.width(), b.height()],
    })
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn percentage(count: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

/// Statistics from the two vegetation masks and their loss/gain masks.
pub fn compute_stats(
    mask_before: &GrayImage,
    mask_after: &GrayImage,
    loss_mask: &GrayImage,
    gain_mask: &GrayImage,
) -> ChangeStats {
    let total_pixels = mask_before.width() as u64 * mask_before.height() as u64;
    let forest_pixels_before = count_set(mask_before);
    let forest_pixels_after = count_set(mask_after);
    let pixels_lost = count_set(loss_mask);
    let pixels_gained = count_set(gain_mask);

    let before = percentage(forest_pixels_before, total_pixels);
    let after = percentage(forest_pixels_after, total_pixels);

    ChangeStats {
        total_pixels,
        forest_pixels_before,
        forest_pixels_after,
        percentage_before: round2(before),
        percentage_after: round2(after),
        change_percentage: round2(after - before),
        pixels_lost,
        pixels_gained,
        percentage_loss: round2(percentage(pixels_lost, total_pixels)),
        percentage_gain: round2(percentage(pixels_gained, total_pixels)),
    }
}

/// Loss/gain masks, statistics, and the change overlay on `after`.
pub fn analyze(
    mask_before: &GrayImage,
    mask_after: &GrayImage,
    after: &DynamicImage,
) -> Result<ChangeAnalysis, InvalidImageError> {
    analyze_onto(mask_before, mask_after, after.to_rgb8())
}

pub(crate) fn analyze_onto(
    mask_before: &GrayImage,
    mask_after: &GrayImage,
    mut canvas: RgbImage,
) -> Result<ChangeAnalysis, InvalidImageError> {
    InvalidImageError::check_same_size("change", mask_before.dimensions(), mask_after.dimensions())?;
    InvalidImageError::check_same_size("change", mask_before.dimensions(), canvas.dimensions())?;

    let loss_mask = saturating_difference(mask_before, mask_after)?;
    let gain_mask = saturating_difference(mask_after, mask_before)?;
    let stats = compute_stats(mask_before, mask_after, &loss_mask, &gain_mask);

    for (mask, color) in [(&loss_mask, LOSS_COLOR), (&gain_mask, GAIN_COLOR)] {
        for (px, m) in canvas.pixels_mut().zip(mask.pixels()) {
            if m[0] == 255 {
                *px = color;
            }
        }
    }
    tracing::debug!(
        "change: lost={} gained={} of {}",
        stats.pixels_lost,
        stats.pixels_gained,
        stats.total_pixels
    );

    Ok(ChangeAnalysis {
        stats,
        loss_mask,
        gain_mask,
        visualization: canvas,
    })
}
