//! Tunable parameters for the kolam analysis pipeline.
//!
//! The defaults reproduce the reference behaviour exactly; a JSON file can
//! override any subset of the keys:
//!
//! ```no_run
//! use kolam_reader::config::KolamConfig;
//! use std::path::Path;
//!
//! let config = KolamConfig::from_json_file(Path::new("kolam.json"))?;
//! # Ok::<(), kolam_reader::error::AnalysisError>(())
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{AnalysisError, Result};

pub const OTSU_BIAS: u8 = 10;
pub const OTSU_DEFAULT: u8 = 127;
pub const MIN_BLOB_PIXELS: usize = 12;
pub const MAX_BLOB_PIXELS: usize = 8000;
pub const MAX_BLOB_FRACTION_DIVISOR: usize = 6;
pub const SYMMETRY_TOLERANCE: u8 = 15;
pub const SYMMETRY_COVERAGE: f64 = 0.2;
pub const PHASH_SIZE: u32 = 32;
pub const PHASH_LOW_SIZE: u32 = 8;
pub const AHASH_SIZE: u32 = 16;
pub const DATASET_CAP: usize = 500;
const OVERLAY_RADIUS_FRACTION: f64 = 0.01;
const OVERLAY_MIN_RADIUS: i32 = 3;
const OVERLAY_DOT_COLOR: [u8; 4] = [220, 50, 50, 255];
const OVERLAY_CENTER_COLOR: [u8; 4] = [255, 255, 255, 220];

/// Constants of the classification cascade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CascadeConfig {
    /// Starting confidence, and the floor for dataset-sourced results.
    pub base_confidence: f64,
    /// Ceiling for dataset-sourced confidence.
    pub dataset_ceiling: f64,
    /// Weight applied to the normalized hash similarity.
    pub similarity_weight: f64,
    /// Below this the CV heuristics are consulted and external review is suggested.
    pub review_threshold: f64,
    pub cv_freehand_confidence: f64,
    pub cv_pulli_confidence: f64,
    pub cv_sikku_confidence: f64,
    /// Minimum confidence granted by an external reviewer.
    pub external_floor: f64,
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            base_confidence: 0.55,
            dataset_ceiling: 0.95,
            similarity_weight: 0.45,
            review_threshold: 0.75,
            cv_freehand_confidence: 0.6,
            cv_pulli_confidence: 0.7,
            cv_sikku_confidence: 0.75,
            external_floor: 0.85,
        }
    }
}

/// Full pipeline configuration.
///
/// Controls thresholding bias, blob size filtering, symmetry sampling, hash
/// geometry, dataset ingestion and overlay rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KolamConfig {
    pub otsu_bias: u8,
    /// Threshold reported when Otsu's variance never rises above zero.
    pub otsu_default: u8,
    /// Blobs must be strictly larger than this.
    pub min_blob_pixels: usize,
    /// Absolute cap on blob size; the effective cap also scales with the image.
    pub max_blob_pixels: usize,
    pub max_blob_fraction_divisor: usize,
    pub symmetry_tolerance: u8,
    pub symmetry_coverage: f64,
    pub phash_size: u32,
    pub phash_low_size: u32,
    pub ahash_size: u32,
    pub dataset_cap: usize,
    pub overlay_radius_fraction: f64,
    pub overlay_min_radius: i32,
    /// RGBA fill of the dot markers.
    pub overlay_dot_color: [u8; 4],
    /// RGBA of the single pixel painted at each centroid.
    pub overlay_center_color: [u8; 4],
    pub cascade: CascadeConfig,
}

impl Default for KolamConfig {
    fn default() -> Self {
        Self {
            otsu_bias: OTSU_BIAS,
            otsu_default: OTSU_DEFAULT,
            min_blob_pixels: MIN_BLOB_PIXELS,
            max_blob_pixels: MAX_BLOB_PIXELS,
            max_blob_fraction_divisor: MAX_BLOB_FRACTION_DIVISOR,
            symmetry_tolerance: SYMMETRY_TOLERANCE,
            symmetry_coverage: SYMMETRY_COVERAGE,
            phash_size: PHASH_SIZE,
            phash_low_size: PHASH_LOW_SIZE,
            ahash_size: AHASH_SIZE,
            dataset_cap: DATASET_CAP,
            overlay_radius_fraction: OVERLAY_RADIUS_FRACTION,
            overlay_min_radius: OVERLAY_MIN_RADIUS,
            overlay_dot_color: OVERLAY_DOT_COLOR,
            overlay_center_color: OVERLAY_CENTER_COLOR,
            cascade: CascadeConfig::default(),
        }
    }
}

impl KolamConfig {
    /// Loads a configuration from JSON. Missing keys keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| AnalysisError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| AnalysisError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Upper (exclusive) blob size bound for a `width` x `height` image.
    pub fn max_blob_size(&self, width: u32, height: u32) -> usize {
        let area = width as usize * height as usize;
        self.max_blob_pixels
            .min(area / self.max_blob_fraction_divisor.max(1))
    }

    /// Overlay circle radius for a `width` x `height` image.
    pub fn overlay_radius(&self, width: u32, height: u32) -> i32 {
        let scaled = (width.min(height) as f64 * self.overlay_radius_fraction).round() as i32;
        scaled.max(self.overlay_min_radius)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_blob_size_scales_with_small_images() {
        let config = KolamConfig::default();
        assert_eq!(config.max_blob_size(100, 100), 1666);
        assert_eq!(config.max_blob_size(1000, 1000), 8000);
        assert_eq!(config.max_blob_size(2, 2), 0);
    }

    #[test]
    fn overlay_radius_has_a_floor() {
        let config = KolamConfig::default();
        assert_eq!(config.overlay_radius(100, 100), 3);
        assert_eq!(config.overlay_radius(1200, 800), 8);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: KolamConfig =
            serde_json::from_str(r#"{ "otsu_bias": 4, "cascade": { "review_threshold": 0.8 } }"#)
                .expect("parse config");
        assert_eq!(config.otsu_bias, 4);
        assert_eq!(config.min_blob_pixels, MIN_BLOB_PIXELS);
        assert_eq!(config.cascade.review_threshold, 0.8);
        assert_eq!(config.cascade.base_confidence, 0.55);
    }
}
