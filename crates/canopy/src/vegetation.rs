//! Vegetation segmentation by hue/saturation/value band.
//!
//! HSV follows the usual 8-bit convention: `V = max(R,G,B)`,
//! `S = 255·(V − min)/V`, and hue halved onto `0..180`. Both divisions use
//! 12-bit fixed-point reciprocal tables, so results are bit-exact with the
//! common computer-vision libraries.

use std::sync::OnceLock;

use image::{GrayImage, Luma, RgbImage};

use crate::error::InvalidImageError;

const HSV_SHIFT: u32 = 12;
const HSV_ROUND: i32 = 1 << (HSV_SHIFT - 1);

/// Inclusive HSV band classified as vegetation (8-bit HSV, hue on 0..180).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct VegetationBand {
    pub hue_min: u8,
    pub hue_max: u8,
    pub sat_min: u8,
    pub val_min: u8,
}

impl Default for VegetationBand {
    fn default() -> Self {
        Self {
            hue_min: 35,
            hue_max: 90,
            sat_min: 40,
            val_min: 40,
        }
    }
}

impl VegetationBand {
    #[inline]
    pub fn contains(&self, [h, s, v]: [u8; 3]) -> bool {
        (self.hue_min..=self.hue_max).contains(&h) && s >= self.sat_min && v >= self.val_min
    }
}

struct DivTables {
    sat: [i32; 256],
    hue: [i32; 256],
}

fn div_tables() -> &'static DivTables {
    static TABLES: OnceLock<DivTables> = OnceLock::new();
    TABLES.get_or_init(|| {
        let mut sat = [0i32; 256];
        let mut hue = [0i32; 256];
        for i in 1..256 {
            sat[i] = ((255 << HSV_SHIFT) as f64 / i as f64).round() as i32;
            hue[i] = ((180 << HSV_SHIFT) as f64 / (6 * i) as f64).round() as i32;
        }
        DivTables { sat, hue }
    })
}

/// Convert one RGB pixel to 8-bit `[H, S, V]` with `H ∈ 0..180`.
pub fn rgb_to_hsv([r, g, b]: [u8; 3]) -> [u8; 3] {
    let t = div_tables();
    let (r, g, b) = (r as i32, g as i32, b as i32);
    let v = r.max(g).max(b);
    let diff = v - r.min(g).min(b);

    let s = (diff * t.sat[v as usize] + HSV_ROUND) >> HSV_SHIFT;
    let h = if v == r {
        g - b
    } else if v == g {
        b - r + 2 * diff
    } else {
        r - g + 4 * diff
    };
    let mut h = (h * t.hue[diff as usize] + HSV_ROUND) >> HSV_SHIFT;
    if h < 0 {
        h += 180;
    }
    [h as u8, s as u8, v as u8]
}

/// Vegetation mask with the default band.
pub fn segment(image: &RgbImage) -> Result<GrayImage, InvalidImageError> {
    segment_with(image, &VegetationBand::default())
}

/// Binary mask (0 or 255) of pixels whose HSV value lies inside `band`.
pub fn segment_with(image: &RgbImage, band: &VegetationBand) -> Result<GrayImage, InvalidImageError> {
    InvalidImageError::check_non_empty("segment", image.dimensions())?;
    let mask = GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let hsv = rgb_to_hsv(image.get_pixel(x, y).0);
        Luma([if band.contains(hsv) { 255 } else { 0 }])
    });
    tracing::debug!(
        "segment: {}x{}, {} vegetation pixels",
        image.width(),
        image.height(),
        count_set(&mask)
    );
    Ok(mask)
}

/// Number of mask pixels equal to 255.
pub fn count_set(mask: &GrayImage) -> u64 {
    mask.as_raw().iter().filter(|&&v| v == 255).count() as u64
}
