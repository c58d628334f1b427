//! Decoding and luminance conversion.

use image::{DynamicImage, GrayImage, RgbaImage};
use kornia::{
    image::{Image, ImageSize, allocator::CpuAllocator},
    imgproc,
};

use crate::error::{AnalysisError, Result};

type CpuImage<T, const C: usize> = Image<T, C, CpuAllocator>;

/// A decoded image owned by a single analysis run.
///
/// Keeps the color pixels for the overlay and a single-channel luminance
/// plane for every numeric stage.
#[derive(Debug, Clone)]
pub struct Bitmap {
    pub color: RgbaImage,
    pub luma: GrayImage,
}

impl Bitmap {
    /// Decodes raw PNG/JPEG/... bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let source = decode(bytes)?;
        Self::from_image(&source)
    }

    /// Rejects zero-sized images, then converts to luminance.
    pub fn from_image(source: &DynamicImage) -> Result<Self> {
        let (width, height) = (source.width(), source.height());
        if width == 0 || height == 0 {
            return Err(AnalysisError::DegenerateImage { width, height });
        }
        Ok(Self {
            color: source.to_rgba8(),
            luma: to_luminance(source)?,
        })
    }

    pub fn width(&self) -> u32 {
        self.luma.width()
    }

    pub fn height(&self) -> u32 {
        self.luma.height()
    }
}

pub fn decode(bytes: &[u8]) -> Result<DynamicImage> {
    image::load_from_memory(bytes).map_err(AnalysisError::Decode)
}

/// Converts any decoded image to 8-bit luminance.
pub fn to_luminance(source: &DynamicImage) -> Result<GrayImage> {
    let rgb = source.to_rgb8();
    let (width, height) = rgb.dimensions();
    if width == 0 || height == 0 {
        return Err(AnalysisError::DegenerateImage { width, height });
    }

    let image = CpuImage::<u8, 3>::new(
        ImageSize {
            width: width as usize,
            height: height as usize,
        },
        rgb.into_raw(),
        CpuAllocator,
    )?;
    let mut gray = CpuImage::<u8, 1>::from_size_val(image.size(), 0u8, CpuAllocator)?;
    imgproc::color::gray_from_rgb_u8(&image, &mut gray)?;

    GrayImage::from_raw(width, height, gray.as_slice().to_vec())
        .ok_or(AnalysisError::DegenerateImage { width, height })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgba};

    #[test]
    fn black_and_white_survive_conversion() {
        let mut rgba = RgbaImage::from_pixel(4, 3, Rgba([0, 0, 0, 255]));
        rgba.put_pixel(1, 1, Rgba([255, 255, 255, 255]));
        let bitmap = Bitmap::from_image(&DynamicImage::ImageRgba8(rgba)).expect("bitmap");
        assert_eq!((bitmap.width(), bitmap.height()), (4, 3));
        assert_eq!(*bitmap.luma.get_pixel(0, 0), Luma([0]));
        assert_eq!(*bitmap.luma.get_pixel(1, 1), Luma([255]));
    }

    #[test]
    fn zero_sized_image_is_degenerate() {
        let err = Bitmap::from_image(&DynamicImage::new_rgba8(0, 5)).unwrap_err();
        assert!(matches!(err, AnalysisError::DegenerateImage { width: 0, height: 5 }));
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let err = Bitmap::from_bytes(b"definitely not an image").unwrap_err();
        assert!(matches!(err, AnalysisError::Decode(_)));
    }
}
