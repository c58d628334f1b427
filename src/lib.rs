//! Kolam/Rangoli image analysis: dot-grid estimation, mirror symmetry,
//! perceptual hashing and a nearest-neighbour style classifier.

pub mod analysis;
pub mod classify;
pub mod config;
pub mod dataset;
pub mod error;
pub mod grid;
pub mod phash;
pub mod symmetry;
pub mod vision;

pub use analysis::{AnalysisResult, GridSummary, analyze, analyze_with_corpus, dot_report, overlay};
pub use classify::{ClassificationResult, Source};
pub use config::KolamConfig;
pub use dataset::{DatasetIndex, KolamLabel, SharedDatasetIndex};
pub use error::{AnalysisError, Result};
pub use phash::{ImageHash, hamming_distance, perceptual_hash};
