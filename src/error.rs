//! Error types for the kolam analysis pipeline.

use std::path::PathBuf;

use kornia::image::ImageError;

/// Result type alias for kolam_reader operations
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Errors that can occur while analyzing an image or building the dataset index.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// Input bytes are not a decodable raster image.
    #[error("failed to decode image: {0}")]
    Decode(#[source] image::ImageError),

    /// Image has a zero dimension, or is too small for any blob to pass the size filter.
    #[error("degenerate image: {width}x{height}")]
    DegenerateImage { width: u32, height: u32 },

    /// Reference corpus root is missing or unreadable.
    #[error("dataset unavailable at {}: {source}", root.display())]
    DatasetUnavailable {
        root: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("kornia image error: {0}")]
    Kornia(#[from] ImageError),

    /// Overlay could not be encoded as PNG.
    #[error("failed to encode overlay: {0}")]
    Encode(#[source] image::ImageError),

    #[error("invalid config {}: {source}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
