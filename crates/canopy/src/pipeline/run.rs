use image::RgbImage;

use super::PipelineResult;
use crate::align::align;
use crate::change::analyze_onto;
use crate::config::PipelineConfig;
use crate::error::InvalidImageError;
use crate::vegetation::segment_with;

/// Align `after` onto `before`, segment both, and measure the change.
pub fn run(
    before: &RgbImage,
    after: &RgbImage,
    config: &PipelineConfig,
) -> Result<PipelineResult, InvalidImageError> {
    let alignment = align(before, after, &config.align)?;
    tracing::info!(
        "alignment: {:?}: {}",
        alignment.status,
        alignment.message
    );

    let mask_before = segment_with(&alignment.reference, &config.vegetation)?;
    let mask_after = segment_with(&alignment.companion, &config.vegetation)?;
    let change = analyze_onto(&mask_before, &mask_after, alignment.companion.clone())?;
    tracing::info!(
        "vegetation: {:.2}% -> {:.2}% (change {:+.2}%)",
        change.stats.percentage_before,
        change.stats.percentage_after,
        change.stats.change_percentage
    );

    Ok(PipelineResult {
        alignment_status: alignment.status,
        alignment_message: alignment.message,
        alignment_diagnostics: alignment.diagnostics,
        processed_before: alignment.reference,
        processed_after: alignment.companion,
        mask_before,
        mask_after,
        loss_mask: change.loss_mask,
        gain_mask: change.gain_mask,
        visualization: change.visualization,
        stats: change.stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::AlignmentStatus;
    use crate::test_utils::solid_rgb;
    use image::Rgb;

    #[test]
    fn half_cleared_pair() {
        let before = solid_rgb(20, 10, Rgb([34, 139, 34]));
        let mut after = before.clone();
        for y in 0..10 {
            for x in 10..20 {
                after.put_pixel(x, y, Rgb([150, 120, 90]));
            }
        }
        let r = run(&before, &after, &PipelineConfig::default()).unwrap();
        assert_eq!(r.alignment_status, AlignmentStatus::DimensionsAlreadyMatched);
        assert_eq!(r.stats.pixels_lost, 100);
        assert_eq!(r.stats.pixels_gained, 0);
        assert_eq!(r.stats.percentage_after, 50.0);
        assert_eq!(r.stats.change_percentage, -50.0);
        assert_eq!(*r.visualization.get_pixel(15, 5), Rgb([255, 0, 0]));
        assert_eq!(*r.visualization.get_pixel(5, 5), Rgb([34, 139, 34]));
    }

    #[test]
    fn summary_serializes_snake_case() {
        let img = solid_rgb(8, 8, Rgb([34, 139, 34]));
        let r = run(&img, &img, &PipelineConfig::default()).unwrap();
        let json = serde_json::to_value(r.summary()).unwrap();
        assert_eq!(json["alignment_status"], "dimensions_already_matched");
        assert_eq!(json["image_size"], serde_json::json!([8, 8]));
        assert_eq!(json["stats"]["forest_pixels_before"], 64);
        assert!(json.get("alignment").is_none());
    }
}
