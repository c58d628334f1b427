//! Visualization of detected dots on the original color image.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use imageproc::drawing::draw_filled_circle_mut;
use serde::Serialize;

use crate::config::KolamConfig;
use crate::error::{AnalysisError, Result};
use crate::vision::blobs::Blob;
use crate::vision::greyscale::Bitmap;

/// Dot count plus centroids, for callers that only want the numbers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DotReport {
    pub dot_count: usize,
    pub centroids: Vec<Blob>,
}

impl DotReport {
    pub fn new(blobs: Vec<Blob>) -> Self {
        Self {
            dot_count: blobs.len(),
            centroids: blobs,
        }
    }
}

/// Annotated PNG and the number of dots painted on it.
#[derive(Debug, Clone)]
pub struct OverlayImage {
    pub png: Vec<u8>,
    pub dot_count: usize,
}

/// Paints a filled disc at every blob centroid on a copy of the color image,
/// with a single contrasting pixel at the centre.
///
/// Discs use imageproc's midpoint-circle rasterization, which is slightly
/// fuller than `dx² + dy² <= r²`: at radius 3 it also covers the eight
/// offsets `(±1, ±3)` and `(±3, ±1)`.
pub fn draw_dots(bitmap: &Bitmap, blobs: &[Blob], config: &KolamConfig) -> RgbaImage {
    let mut canvas = bitmap.color.clone();
    let radius = config.overlay_radius(canvas.width(), canvas.height());
    let fill = Rgba(config.overlay_dot_color);
    let centre = Rgba(config.overlay_center_color);

    for blob in blobs {
        draw_filled_circle_mut(&mut canvas, (blob.x as i32, blob.y as i32), radius, fill);
        if blob.x < canvas.width() && blob.y < canvas.height() {
            canvas.put_pixel(blob.x, blob.y, centre);
        }
    }

    canvas
}

pub fn encode_png(canvas: RgbaImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    DynamicImage::ImageRgba8(canvas)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(AnalysisError::Encode)?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn black_bitmap(width: u32, height: u32) -> Bitmap {
        let rgba = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 255]));
        Bitmap::from_image(&DynamicImage::ImageRgba8(rgba)).expect("bitmap")
    }

    #[test]
    fn dots_are_painted_with_a_white_centre() {
        let bitmap = black_bitmap(60, 60);
        let config = KolamConfig::default();
        let blob = Blob { x: 30, y: 30, size: 20 };
        let canvas = draw_dots(&bitmap, &[blob], &config);

        assert_eq!(*canvas.get_pixel(30, 30), Rgba(config.overlay_center_color));
        assert_eq!(*canvas.get_pixel(32, 30), Rgba(config.overlay_dot_color));
        assert_eq!(*canvas.get_pixel(30, 28), Rgba(config.overlay_dot_color));
        assert_eq!(*canvas.get_pixel(40, 40), Rgba([0, 0, 0, 255]));
        // source bitmap is untouched
        assert_eq!(*bitmap.color.get_pixel(32, 30), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn disc_follows_midpoint_rasterization() {
        let bitmap = black_bitmap(60, 60);
        let config = KolamConfig::default();
        let canvas = draw_dots(&bitmap, &[Blob { x: 30, y: 30, size: 20 }], &config);
        let fill = Rgba(config.overlay_dot_color);
        let black = Rgba([0, 0, 0, 255]);

        assert_eq!(config.overlay_radius(60, 60), 3);
        assert_eq!(*canvas.get_pixel(32, 32), fill);
        // dx² + dy² = 10, outside the Euclidean disc but on the midpoint outline
        assert_eq!(*canvas.get_pixel(33, 31), fill);
        assert_eq!(*canvas.get_pixel(29, 27), fill);
        assert_eq!(*canvas.get_pixel(33, 32), black);
        assert_eq!(*canvas.get_pixel(34, 30), black);
    }

    #[test]
    fn dots_near_the_border_are_clipped() {
        let bitmap = black_bitmap(20, 20);
        let canvas = draw_dots(&bitmap, &[Blob { x: 0, y: 19, size: 15 }], &KolamConfig::default());
        assert_eq!(canvas.dimensions(), (20, 20));
        assert_eq!(*canvas.get_pixel(1, 19), Rgba(KolamConfig::default().overlay_dot_color));
    }

    #[test]
    fn encoded_overlay_decodes_back() {
        let bitmap = black_bitmap(16, 8);
        let png = encode_png(draw_dots(&bitmap, &[], &KolamConfig::default())).expect("encode");
        let decoded = image::load_from_memory(&png).expect("decode");
        assert_eq!((decoded.width(), decoded.height()), (16, 8));
    }

    #[test]
    fn report_counts_centroids() {
        let report = DotReport::new(vec![Blob { x: 1, y: 2, size: 13 }, Blob { x: 9, y: 9, size: 40 }]);
        assert_eq!(report.dot_count, 2);
        let json = serde_json::to_value(&report).expect("json");
        assert_eq!(json["dotCount"], 2);
        assert_eq!(json["centroids"][1]["size"], 40);
    }
}
