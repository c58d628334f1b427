//! Request-level entry points: one image in, one self-contained result out.

use std::path::Path;

use image::DynamicImage;
use serde::Serialize;

use crate::classify::{ClassificationResult, CvEvidence, classify};
use crate::config::KolamConfig;
use crate::dataset::{DatasetIndex, SharedDatasetIndex};
use crate::error::{AnalysisError, Result};
use crate::grid::estimate_grid;
use crate::phash::hash_luma;
use crate::symmetry::{SymmetryFlag, score_symmetry};
use crate::vision::blobs::{Blob, extract_blobs};
use crate::vision::greyscale::{Bitmap, decode};
use crate::vision::histogram::compute_threshold;
use crate::vision::overlay::{DotReport, OverlayImage, draw_dots, encode_png};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridSummary {
    pub rows: usize,
    pub cols: usize,
    pub dot_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub grid: GridSummary,
    pub symmetry: Vec<SymmetryFlag>,
    pub classification: ClassificationResult,
}

fn detect_dots(bitmap: &Bitmap, config: &KolamConfig) -> Result<Vec<Blob>> {
    let threshold = compute_threshold(&bitmap.luma, config);
    let blobs = extract_blobs(bitmap, threshold.operational, config)?;
    tracing::debug!(
        "otsu {} -> threshold {}, {} dots",
        threshold.otsu,
        threshold.operational,
        blobs.len()
    );
    Ok(blobs)
}

/// Full analysis of encoded image bytes.
///
/// `dataset` is consulted only when present and non-empty; without it the
/// classification rests on CV heuristics alone.
pub fn analyze(bytes: &[u8], dataset: Option<&DatasetIndex>, config: &KolamConfig) -> Result<AnalysisResult> {
    analyze_image(&decode(bytes)?, dataset, config)
}

pub fn analyze_image(
    source: &DynamicImage,
    dataset: Option<&DatasetIndex>,
    config: &KolamConfig,
) -> Result<AnalysisResult> {
    let bitmap = Bitmap::from_image(source)?;
    let blobs = detect_dots(&bitmap, config)?;
    let grid = estimate_grid(blobs.len());
    let symmetry = score_symmetry(&bitmap.luma, config);
    tracing::debug!(
        "grid {}x{}, symmetry h={} v={}",
        grid.rows,
        grid.cols,
        symmetry.horizontal_matches,
        symmetry.vertical_matches
    );

    let query_hash = match dataset {
        Some(index) if !index.is_empty() => Some(hash_luma(
            &bitmap.luma,
            config.phash_size,
            config.phash_low_size,
        )),
        _ => None,
    };
    let nearest = dataset
        .zip(query_hash.as_ref())
        .and_then(|(index, hash)| index.nearest(hash));
    if let Some(found) = &nearest {
        tracing::debug!(
            "nearest {} at distance {}",
            found.entry.path.display(),
            found.distance
        );
    }

    let evidence = CvEvidence {
        dot_count: blobs.len(),
        grid,
        symmetry: &symmetry.flags,
    };
    let classification = classify(&evidence, nearest.as_ref(), &config.cascade);

    Ok(AnalysisResult {
        grid: GridSummary {
            rows: grid.rows,
            cols: grid.cols,
            dot_count: blobs.len(),
        },
        symmetry: symmetry.flags,
        classification,
    })
}

/// Like [`analyze`], building the shared index from `corpus_root` on first use.
///
/// An unavailable corpus degrades to CV-only classification instead of failing.
pub fn analyze_with_corpus(
    bytes: &[u8],
    shared: &SharedDatasetIndex,
    corpus_root: &Path,
    config: &KolamConfig,
) -> Result<AnalysisResult> {
    let dataset = match shared.get_or_build(corpus_root, config) {
        Ok(index) => Some(index),
        Err(e @ AnalysisError::DatasetUnavailable { .. }) => {
            tracing::warn!("{e}; continuing without dataset");
            None
        }
        Err(e) => return Err(e),
    };
    analyze(bytes, dataset, config)
}

/// Annotated PNG with a disc at every detected dot.
pub fn overlay(bytes: &[u8], config: &KolamConfig) -> Result<OverlayImage> {
    let bitmap = Bitmap::from_bytes(bytes)?;
    let blobs = detect_dots(&bitmap, config)?;
    let png = encode_png(draw_dots(&bitmap, &blobs, config))?;
    Ok(OverlayImage {
        png,
        dot_count: blobs.len(),
    })
}

pub fn dot_report(bytes: &[u8], config: &KolamConfig) -> Result<DotReport> {
    let bitmap = Bitmap::from_bytes(bytes)?;
    Ok(DotReport::new(detect_dots(&bitmap, config)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn result_serializes_with_camel_case_keys() {
        let image = RgbaImage::from_pixel(30, 30, Rgba([0, 0, 0, 255]));
        let result = analyze_image(&DynamicImage::ImageRgba8(image), None, &KolamConfig::default())
            .expect("analysis");
        let json = serde_json::to_value(&result).expect("json");
        assert_eq!(json["grid"]["dotCount"], 0);
        assert_eq!(json["grid"]["rows"], 0);
        // a flat image mirrors itself both ways
        assert_eq!(json["symmetry"][0], "Horizontal Mirror");
        assert_eq!(json["classification"]["source"], "cv");
        assert_eq!(json["classification"]["label"], "Sikku");
        assert_eq!(json["classification"]["needsExternalReview"], false);
        assert!(json["classification"].get("details").is_none());
    }
}
