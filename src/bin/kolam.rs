use clap::{ArgGroup, Parser};
use std::error::Error;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use kolam_reader::config::KolamConfig;
use kolam_reader::dataset::DatasetIndex;
use kolam_reader::phash::average_hash;
use kolam_reader::{analyze, dot_report, overlay, perceptual_hash};

#[derive(Parser, Debug)]
#[command(
    name = "kolam",
    about = "Analyze kolam images: dot grid, symmetry, style label, overlays and hashes",
    version,
    group(
        ArgGroup::new("action")
            .required(true)
            .multiple(true)
            .args(["analyze", "overlay", "dots", "hash"])
    )
)]
struct Cli {
    /// Directory containing input images
    #[arg(short = 'd', long = "dir")]
    dir: PathBuf,

    /// Directory for generated files
    #[arg(long = "out", default_value = ".")]
    out: PathBuf,

    /// Reference corpus used for nearest-neighbour matching
    #[arg(long = "dataset")]
    dataset: Option<PathBuf>,

    /// JSON file overriding pipeline parameters
    #[arg(long = "config")]
    config: Option<PathBuf>,

    /// Write <stem>_analysis.json
    #[arg(long = "analyze", short = 'a')]
    analyze: bool,

    /// Write <stem>_overlay.png with detected dots painted in
    #[arg(long = "overlay", short = 'o')]
    overlay: bool,

    /// Write <stem>_dots.json with dot centroids
    #[arg(long = "dots")]
    dots: bool,

    /// Print the perceptual and average hash of every image
    #[arg(long = "hash")]
    hash: bool,
}

fn is_image_file(path: &Path) -> bool {
    let Some(ext) = path.extension().and_then(OsStr::to_str) else {
        return false;
    };
    matches!(
        ext.to_ascii_lowercase().as_str(),
        "png" | "jpg" | "jpeg" | "bmp" | "gif" | "tif" | "tiff" | "webp"
    )
}

fn write_output(path: &Path, contents: &[u8]) -> Result<(), Box<dyn Error>> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)?;
    Ok(())
}

fn process_image(
    cli: &Cli,
    image_path: &Path,
    dataset: Option<&DatasetIndex>,
    config: &KolamConfig,
) -> Result<(), Box<dyn Error>> {
    let bytes = fs::read(image_path)?;
    let stem = image_path
        .file_stem()
        .and_then(OsStr::to_str)
        .unwrap_or("image");

    if cli.analyze {
        let result = analyze(&bytes, dataset, config)?;
        tracing::info!(
            "{}: {} ({:.2}, {:?}), {} dots",
            image_path.display(),
            result.classification.label,
            result.classification.confidence,
            result.classification.source,
            result.grid.dot_count
        );
        let json = serde_json::to_string_pretty(&result)?;
        write_output(&cli.out.join(format!("{stem}_analysis.json")), json.as_bytes())?;
    }

    if cli.overlay {
        let annotated = overlay(&bytes, config)?;
        write_output(&cli.out.join(format!("{stem}_overlay.png")), &annotated.png)?;
    }

    if cli.dots {
        let report = dot_report(&bytes, config)?;
        let json = serde_json::to_string_pretty(&report)?;
        write_output(&cli.out.join(format!("{stem}_dots.json")), json.as_bytes())?;
    }

    if cli.hash {
        let hash = perceptual_hash(&bytes, config.phash_size, config.phash_low_size)?;
        let ahash = average_hash(&bytes, config.ahash_size)?;
        println!("{}\t{hash}\t{ahash}", image_path.display());
    }

    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    if !cli.dir.is_dir() {
        return Err(format!("Not a directory: {}", cli.dir.display()).into());
    }

    let config = match &cli.config {
        Some(path) => KolamConfig::from_json_file(path)?,
        None => KolamConfig::default(),
    };

    let dataset = match &cli.dataset {
        Some(root) => match DatasetIndex::build(root, &config) {
            Ok(index) => Some(index),
            Err(e) => {
                tracing::warn!("{e}; classifying without dataset");
                None
            }
        },
        None => None,
    };

    let mut images: Vec<PathBuf> = fs::read_dir(&cli.dir)?
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_file() && is_image_file(p))
        .collect();

    images.sort();

    if images.is_empty() {
        tracing::warn!("No images found in {}", cli.dir.display());
        return Ok(());
    }

    for image_path in &images {
        if let Err(e) = process_image(&cli, image_path, dataset.as_ref(), &config) {
            tracing::error!("Failed on {}: {e}", image_path.display());
        }
    }

    Ok(())
}
