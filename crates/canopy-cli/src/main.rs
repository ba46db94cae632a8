//! canopy CLI — vegetation change detection between two images.

use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

use canopy::{ChangeDetector, PipelineConfig, PipelineSummary};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "canopy")]
#[command(about = "Align two photographs of the same area and measure vegetation change")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Align a before/after pair and write masks, overlay, and a JSON report.
    Analyze(CliAnalyzeArgs),

    /// Write the vegetation mask of a single image.
    Segment {
        /// Path to the input image.
        #[arg(long)]
        image: PathBuf,

        /// Path to write the mask (PNG).
        #[arg(long)]
        out: PathBuf,

        /// Optional pipeline config (JSON); only the vegetation band is used.
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Print the default pipeline configuration as JSON.
    DefaultConfig,
}

#[derive(Debug, Clone, Args)]
struct CliAnalyzeArgs {
    /// Path to the earlier image (alignment reference).
    #[arg(long)]
    before: PathBuf,

    /// Path to the later image.
    #[arg(long)]
    after: PathBuf,

    /// Directory to write output images and report.json into.
    #[arg(long)]
    out_dir: PathBuf,

    /// Pipeline config (JSON). Flags below override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Maximum keypoints per image.
    #[arg(long)]
    max_features: Option<usize>,

    /// Minimum cross-checked matches required to fit a homography.
    #[arg(long)]
    min_matches: Option<usize>,

    /// RANSAC inlier threshold in pixels.
    #[arg(long)]
    ransac_thresh_px: Option<f64>,

    /// Maximum RANSAC iterations.
    #[arg(long)]
    ransac_iters: Option<usize>,

    /// Skip feature alignment and resize mismatched images directly.
    #[arg(long)]
    no_feature_align: bool,
}

impl CliAnalyzeArgs {
    fn apply_overrides(&self, config: &mut PipelineConfig) {
        if let Some(n) = self.max_features {
            config.align.orb.max_features = n;
        }
        if let Some(n) = self.min_matches {
            config.align.homography.min_matches = n;
        }
        if let Some(t) = self.ransac_thresh_px {
            config.align.homography.ransac.inlier_threshold = t;
        }
        if let Some(n) = self.ransac_iters {
            config.align.homography.ransac.max_iters = n;
        }
        if self.no_feature_align {
            config.align.feature_alignment = false;
        }
    }
}

/// File names written by `analyze`, relative to the output directory.
#[derive(Debug, Clone, serde::Serialize)]
struct ReportImages {
    processed_before: &'static str,
    processed_after: &'static str,
    mask_before: &'static str,
    mask_after: &'static str,
    change_visualization: &'static str,
}

const REPORT_IMAGES: ReportImages = ReportImages {
    processed_before: "processed_before.png",
    processed_after: "processed_after.png",
    mask_before: "mask_before.png",
    mask_after: "mask_after.png",
    change_visualization: "change_visualization.png",
};

#[derive(Debug, Clone, serde::Serialize)]
struct Report {
    message: &'static str,
    #[serde(flatten)]
    summary: PipelineSummary,
    images: ReportImages,
}

fn load_config(path: Option<&Path>) -> CliResult<PipelineConfig> {
    match path {
        Some(p) => {
            tracing::info!("Loading config: {}", p.display());
            PipelineConfig::from_json_file(p)
                .map_err(|e| -> CliError { format!("Failed to load config {}: {}", p.display(), e).into() })
        }
        None => Ok(PipelineConfig::default()),
    }
}

fn open_rgb(path: &Path) -> CliResult<image::RgbImage> {
    tracing::info!("Loading image: {}", path.display());
    let img = image::open(path).map_err(|e| -> CliError {
        format!("Failed to open image {}: {}", path.display(), e).into()
    })?;
    Ok(img.to_rgb8())
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze(args) => run_analyze(&args),
        Commands::Segment { image, out, config } => run_segment(&image, &out, config.as_deref()),
        Commands::DefaultConfig => run_default_config(),
    }
}

// ── default-config ─────────────────────────────────────────────────────

fn run_default_config() -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(&PipelineConfig::default())?);
    Ok(())
}

// ── segment ────────────────────────────────────────────────────────────

fn run_segment(image: &Path, out: &Path, config: Option<&Path>) -> CliResult<()> {
    let config = load_config(config)?;
    let rgb = open_rgb(image)?;
    let mask = canopy::vegetation::segment_with(&rgb, &config.vegetation)?;

    let total = mask.width() as u64 * mask.height() as u64;
    let set = canopy::vegetation::count_set(&mask);
    tracing::info!(
        "Vegetation: {} of {} pixels ({:.2}%)",
        set,
        total,
        set as f64 / total as f64 * 100.0
    );

    mask.save(out)?;
    tracing::info!("Mask written to {}", out.display());
    Ok(())
}

// ── analyze ────────────────────────────────────────────────────────────

fn run_analyze(args: &CliAnalyzeArgs) -> CliResult<()> {
    let mut config = load_config(args.config.as_deref())?;
    args.apply_overrides(&mut config);

    let before = open_rgb(&args.before)?;
    let after = open_rgb(&args.after)?;
    tracing::info!(
        "Image sizes: before {}x{}, after {}x{}",
        before.width(),
        before.height(),
        after.width(),
        after.height()
    );

    let detector = ChangeDetector::new(config);
    let result = detector.analyze_pair(&before, &after)?;

    if let Some(ref diag) = result.alignment_diagnostics {
        tracing::info!(
            "Features: {} / {} keypoints, {} matches, {} inliers",
            diag.keypoints_reference,
            diag.keypoints_to_align,
            diag.matches,
            diag.inliers.unwrap_or(0)
        );
    }
    let s = &result.stats;
    tracing::info!(
        "Lost {} px ({:.2}%), gained {} px ({:.2}%)",
        s.pixels_lost,
        s.percentage_loss,
        s.pixels_gained,
        s.percentage_gain
    );

    std::fs::create_dir_all(&args.out_dir)?;
    let dir = &args.out_dir;
    result
        .processed_before
        .save(dir.join(REPORT_IMAGES.processed_before))?;
    result
        .processed_after
        .save(dir.join(REPORT_IMAGES.processed_after))?;
    result.mask_before.save(dir.join(REPORT_IMAGES.mask_before))?;
    result.mask_after.save(dir.join(REPORT_IMAGES.mask_after))?;
    result
        .visualization
        .save(dir.join(REPORT_IMAGES.change_visualization))?;

    let report = Report {
        message: "Analysis successful",
        summary: result.summary(),
        images: REPORT_IMAGES,
    };
    let json = serde_json::to_string_pretty(&report)?;
    let report_path = dir.join("report.json");
    std::fs::write(&report_path, &json)?;
    tracing::info!("Results written to {}", report_path.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).expect("valid command line")
    }

    #[test]
    fn analyze_flags_override_config() {
        let cli = parse(&[
            "canopy",
            "analyze",
            "--before",
            "a.png",
            "--after",
            "b.png",
            "--out-dir",
            "out",
            "--min-matches",
            "12",
            "--ransac-thresh-px",
            "3.5",
            "--no-feature-align",
        ]);
        let Commands::Analyze(args) = cli.command else {
            panic!("expected analyze");
        };
        let mut config = PipelineConfig::default();
        args.apply_overrides(&mut config);
        assert_eq!(config.align.homography.min_matches, 12);
        assert_eq!(config.align.homography.ransac.inlier_threshold, 3.5);
        assert_eq!(config.align.homography.ransac.max_iters, 2000);
        assert_eq!(config.align.orb.max_features, 2000);
        assert!(!config.align.feature_alignment);
    }

    #[test]
    fn report_flattens_summary() {
        let img = image::RgbImage::from_pixel(4, 4, image::Rgb([34, 139, 34]));
        let result = ChangeDetector::default().analyze_pair(&img, &img).unwrap();
        let report = Report {
            message: "Analysis successful",
            summary: result.summary(),
            images: REPORT_IMAGES,
        };
        let v = serde_json::to_value(&report).unwrap();
        assert_eq!(v["message"], "Analysis successful");
        assert_eq!(v["alignment_status"], "dimensions_already_matched");
        assert_eq!(v["stats"]["total_pixels"], 16);
        assert_eq!(v["images"]["mask_after"], "mask_after.png");
    }
}
