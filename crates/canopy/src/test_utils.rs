//! Shared synthetic images for unit tests.

use image::{Rgb, RgbImage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub(crate) fn solid_rgb(w: u32, h: u32, color: Rgb<u8>) -> RgbImage {
    RgbImage::from_pixel(w, h, color)
}

/// Random overlapping rectangles on a muted background: plenty of
/// well-separated corners for feature detection.
pub(crate) fn textured_rgb(w: u32, h: u32, seed: u64) -> RgbImage {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut img = RgbImage::from_pixel(w, h, Rgb([90, 110, 70]));
    let n_rects = (w * h / 400).max(20);
    for _ in 0..n_rects {
        let rw = rng.gen_range(4..24);
        let rh = rng.gen_range(4..24);
        let x0 = rng.gen_range(0..w);
        let y0 = rng.gen_range(0..h);
        let color = Rgb([rng.gen(), rng.gen(), rng.gen()]);
        for y in y0..(y0 + rh).min(h) {
            for x in x0..(x0 + rw).min(w) {
                img.put_pixel(x, y, color);
            }
        }
    }
    img
}

pub(crate) fn crop_rgb(img: &RgbImage, x: u32, y: u32, w: u32, h: u32) -> RgbImage {
    image::imageops::crop_imm(img, x, y, w, h).to_image()
}
