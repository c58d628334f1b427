//! Connected-component dot extraction.

use kornia::{
    image::{Image, ImageSize, allocator::CpuAllocator},
    imgproc,
};
use serde::Serialize;

use crate::config::KolamConfig;
use crate::error::{AnalysisError, Result};
use crate::vision::greyscale::Bitmap;

type CpuImage<T, const C: usize> = Image<T, C, CpuAllocator>;

const NEIGHBOURS: [(isize, isize); 8] = [
    (1, 0),
    (-1, 0),
    (0, 1),
    (0, -1),
    (1, 1),
    (1, -1),
    (-1, 1),
    (-1, -1),
];

/// A bright connected region accepted as a dot candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Blob {
    /// Rounded mean pixel coordinate.
    pub x: u32,
    pub y: u32,
    /// Pixel count.
    pub size: usize,
}

/// Inclusive-exclusive size window `min < size < max` a component must fall in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeFilter {
    pub min: usize,
    pub max: usize,
}

impl SizeFilter {
    pub fn for_image(width: u32, height: u32, config: &KolamConfig) -> Result<Self> {
        let max = config.max_blob_size(width, height);
        if max == 0 {
            return Err(AnalysisError::DegenerateImage { width, height });
        }
        Ok(Self {
            min: config.min_blob_pixels,
            max,
        })
    }

    pub fn accepts(&self, size: usize) -> bool {
        size > self.min && size < self.max
    }
}

/// Binarizes `bitmap` at `threshold` (strictly greater is "on") and returns
/// the accepted 8-connected components in row-major discovery order.
pub fn extract_blobs(bitmap: &Bitmap, threshold: u8, config: &KolamConfig) -> Result<Vec<Blob>> {
    let (width, height) = (bitmap.width(), bitmap.height());
    let filter = SizeFilter::for_image(width, height, config)?;

    let gray = CpuImage::<u8, 1>::new(
        ImageSize {
            width: width as usize,
            height: height as usize,
        },
        bitmap.luma.as_raw().clone(),
        CpuAllocator,
    )?;
    let mut binary = CpuImage::<u8, 1>::from_size_val(gray.size(), 0u8, CpuAllocator)?;
    imgproc::threshold::threshold_binary(&gray, &mut binary, threshold, 255)?;

    Ok(label_components(
        binary.as_slice(),
        width as usize,
        height as usize,
        filter,
    ))
}

/// Iterative flood fill over non-zero mask pixels.
///
/// Every pixel is pushed at most once; rejected components are still
/// consumed so their pixels are never revisited.
pub fn label_components(mask: &[u8], width: usize, height: usize, filter: SizeFilter) -> Vec<Blob> {
    let mut visited = vec![false; mask.len()];
    let mut out = Vec::new();
    let mut stack = Vec::new();

    for start in 0..mask.len().min(width * height) {
        if mask[start] == 0 || visited[start] {
            continue;
        }

        stack.push(start);
        visited[start] = true;

        let mut sum_x = 0u64;
        let mut sum_y = 0u64;
        let mut count = 0usize;

        while let Some(idx) = stack.pop() {
            let y = idx / width;
            let x = idx % width;
            sum_x += x as u64;
            sum_y += y as u64;
            count += 1;

            for (dx, dy) in NEIGHBOURS {
                let nx = x as isize + dx;
                let ny = y as isize + dy;
                if nx < 0 || ny < 0 {
                    continue;
                }
                let nxu = nx as usize;
                let nyu = ny as usize;
                if nxu >= width || nyu >= height {
                    continue;
                }
                let next_idx = nyu * width + nxu;
                if mask[next_idx] == 0 || visited[next_idx] {
                    continue;
                }
                visited[next_idx] = true;
                stack.push(next_idx);
            }
        }

        if !filter.accepts(count) {
            continue;
        }

        out.push(Blob {
            x: (sum_x as f64 / count as f64).round() as u32,
            y: (sum_y as f64 / count as f64).round() as u32,
            size: count,
        });
    }

    out
}
