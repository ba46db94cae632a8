//! End-to-end scenarios through the public API.

use canopy::homography::project;
use canopy::{AlignmentStatus, ChangeDetector, PipelineConfig, PipelineResult};
use image::imageops::{self, FilterType};
use image::{GrayImage, Rgb, RgbImage};
use nalgebra::Matrix3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const FOREST: Rgb<u8> = Rgb([34, 139, 34]);
const BARE: Rgb<u8> = Rgb([128, 128, 128]);

fn solid(w: u32, h: u32, color: Rgb<u8>) -> RgbImage {
    RgbImage::from_pixel(w, h, color)
}

fn textured(w: u32, h: u32, seed: u64) -> RgbImage {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut img = RgbImage::from_pixel(w, h, Rgb([60, 120, 50]));
    for _ in 0..(w * h / 400).max(20) {
        let (x0, y0) = (rng.gen_range(0..w), rng.gen_range(0..h));
        let (rw, rh) = (rng.gen_range(4..24), rng.gen_range(4..24));
        let color = Rgb([rng.gen(), rng.gen(), rng.gen()]);
        for y in y0..(y0 + rh).min(h) {
            for x in x0..(x0 + rw).min(w) {
                img.put_pixel(x, y, color);
            }
        }
    }
    img
}

fn is_binary(mask: &GrayImage) -> bool {
    mask.pixels().all(|p| p[0] == 0 || p[0] == 255)
}

fn check_invariants(r: &PipelineResult) {
    let dims = r.processed_before.dimensions();
    for d in [
        r.processed_after.dimensions(),
        r.mask_before.dimensions(),
        r.mask_after.dimensions(),
        r.loss_mask.dimensions(),
        r.gain_mask.dimensions(),
        r.visualization.dimensions(),
    ] {
        assert_eq!(d, dims);
    }
    for m in [&r.mask_before, &r.mask_after, &r.loss_mask, &r.gain_mask] {
        assert!(is_binary(m));
    }
    for (l, g) in r.loss_mask.pixels().zip(r.gain_mask.pixels()) {
        assert!(l[0] == 0 || g[0] == 0, "loss and gain overlap");
    }
    let s = &r.stats;
    assert_eq!(s.total_pixels, dims.0 as u64 * dims.1 as u64);
    assert!(s.pixels_lost <= s.forest_pixels_before);
    assert!(s.pixels_gained <= s.total_pixels - s.forest_pixels_before);
}

#[test]
fn scenario_unchanged_forest() {
    let img = solid(100, 100, FOREST);
    let r = ChangeDetector::default().analyze_pair(&img, &img).unwrap();
    check_invariants(&r);
    assert_eq!(r.alignment_status, AlignmentStatus::DimensionsAlreadyMatched);
    assert_eq!(r.stats.forest_pixels_before, 10_000);
    assert_eq!(r.stats.forest_pixels_after, 10_000);
    assert_eq!(r.stats.percentage_before, 100.0);
    assert_eq!(r.stats.change_percentage, 0.0);
    assert_eq!(r.stats.pixels_lost, 0);
    assert_eq!(r.stats.pixels_gained, 0);
}

#[test]
fn scenario_complete_clearing() {
    let before = solid(100, 100, FOREST);
    let after = solid(100, 100, BARE);
    let r = ChangeDetector::default().analyze_pair(&before, &after).unwrap();
    check_invariants(&r);
    assert_eq!(r.stats.pixels_lost, 10_000);
    assert_eq!(r.stats.pixels_gained, 0);
    assert_eq!(r.stats.percentage_loss, 100.0);
    assert_eq!(r.stats.percentage_gain, 0.0);
    assert_eq!(r.stats.change_percentage, -100.0);
    assert!(r.visualization.pixels().all(|p| *p == Rgb([255, 0, 0])));
}

#[test]
fn scenario_textureless_size_mismatch_falls_back() {
    let before = solid(200, 100, FOREST);
    let after = solid(100, 100, FOREST);
    let r = ChangeDetector::default().analyze_pair(&before, &after).unwrap();
    check_invariants(&r);
    assert_eq!(r.alignment_status, AlignmentStatus::ResizedFallback);
    assert_eq!(r.processed_before.dimensions(), (100, 100));
    assert_eq!(r.processed_after, after);
    assert!(r.alignment_message.contains("'Before' image resized to 100x100."));
    assert_eq!(r.stats.forest_pixels_before, 10_000);
    assert_eq!(r.stats.change_percentage, 0.0);
}

#[test]
fn same_size_outputs_are_byte_identical() {
    let before = textured(90, 70, 1);
    let after = textured(90, 70, 2);
    let r = ChangeDetector::default().analyze_pair(&before, &after).unwrap();
    check_invariants(&r);
    assert_eq!(r.processed_before, before);
    assert_eq!(r.processed_after, after);
}

#[test]
fn analysis_is_idempotent() {
    let before = textured(120, 90, 3);
    let after = textured(120, 90, 4);
    let det = ChangeDetector::default();
    let a = det.analyze_pair(&before, &after).unwrap();
    let b = det.analyze_pair(&before, &after).unwrap();
    assert_eq!(a.summary(), b.summary());
    assert_eq!(a.visualization, b.visualization);
}

#[test]
fn scaled_copy_aligns_by_features() {
    let before = textured(240, 180, 7);
    let after = imageops::resize(&before, 200, 150, FilterType::Triangle);
    let r = ChangeDetector::default().analyze_pair(&before, &after).unwrap();
    check_invariants(&r);
    assert_eq!(
        r.alignment_status,
        AlignmentStatus::AlignedByFeatures,
        "{}",
        r.alignment_message
    );
    assert_eq!(r.processed_after.dimensions(), (240, 180));

    let diag = r.alignment_diagnostics.expect("diagnostics after feature alignment");
    let rows = diag.homography.expect("homography after feature alignment");
    let h = Matrix3::from_fn(|i, j| rows[i][j]);
    for (x, y) in [(20.0, 20.0), (100.0, 75.0), (180.0, 130.0)] {
        let p = project(&h, x, y);
        assert!(
            (p[0] - 1.2 * x).abs() < 2.0 && (p[1] - 1.2 * y).abs() < 2.0,
            "({x}, {y}) -> {p:?}"
        );
    }
}

#[test]
fn disabled_feature_alignment_resizes_larger_image() {
    let before = textured(160, 120, 8);
    let after = textured(320, 240, 9);
    let mut config = PipelineConfig::default();
    config.align.feature_alignment = false;
    let r = ChangeDetector::new(config).analyze_pair(&before, &after).unwrap();
    check_invariants(&r);
    assert_eq!(r.alignment_status, AlignmentStatus::ResizedFallback);
    assert_eq!(r.processed_before, before);
    assert_eq!(r.processed_after.dimensions(), (160, 120));
    assert_eq!(
        r.alignment_message,
        "Feature alignment disabled. 'After' image resized to 160x120."
    );
}

#[test]
fn summary_json_has_snake_case_stats() {
    let r = ChangeDetector::default()
        .analyze_pair(&solid(10, 10, FOREST), &solid(10, 10, BARE))
        .unwrap();
    let json = serde_json::to_value(r.summary()).unwrap();
    let stats = &json["stats"];
    for key in [
        "total_pixels",
        "forest_pixels_before",
        "forest_pixels_after",
        "percentage_before",
        "percentage_after",
        "change_percentage",
        "pixels_lost",
        "pixels_gained",
        "percentage_loss",
        "percentage_gain",
    ] {
        assert!(stats.get(key).is_some(), "missing {key}");
    }
    assert_eq!(stats["pixels_lost"], 100);
}
