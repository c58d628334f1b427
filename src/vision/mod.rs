pub mod blobs;
pub use blobs::{Blob, extract_blobs};
pub mod greyscale;
pub use greyscale::Bitmap;
pub mod histogram;
pub use histogram::{Histogram, Threshold, compute_threshold};
pub mod overlay;
pub use overlay::{DotReport, OverlayImage};
