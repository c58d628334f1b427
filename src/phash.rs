//! Image fingerprints compared by Hamming distance.
//!
//! Bits are packed LSB-first: bit `i` lives in byte `i / 8` at position `i % 8`.
//! Output is a pure function of the input bytes, so hashes can be persisted
//! and compared across runs.

use std::f64::consts::{FRAC_1_SQRT_2, PI};
use std::fmt;

use image::{DynamicImage, GrayImage, imageops::FilterType};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::vision::greyscale::{decode, to_luminance};

/// Fixed-length bit vector.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageHash {
    bytes: Vec<u8>,
}

impl ImageHash {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    fn from_bits(bits: impl Iterator<Item = bool>, bit_count: usize) -> Self {
        let mut bytes = vec![0u8; bit_count.div_ceil(8)];
        for (i, set) in bits.enumerate().take(bit_count) {
            if set {
                bytes[i / 8] |= 1 << (i % 8);
            }
        }
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of bits the buffer can hold (`8 * len`).
    pub fn bit_len(&self) -> usize {
        self.bytes.len() * 8
    }

    pub fn distance(&self, other: &ImageHash) -> u32 {
        hamming_distance(&self.bytes, &other.bytes)
    }

    pub fn to_hex(&self) -> String {
        self.bytes.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Display for ImageHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Popcount of the XOR over the common prefix, plus every set bit in the
/// surplus tail of the longer buffer.
pub fn hamming_distance(a: &[u8], b: &[u8]) -> u32 {
    let common = a.len().min(b.len());
    let shared: u32 = a[..common]
        .iter()
        .zip(&b[..common])
        .map(|(x, y)| (x ^ y).count_ones())
        .sum();
    let tail = if a.len() > b.len() { &a[common..] } else { &b[common..] };
    shared + tail.iter().map(|x| x.count_ones()).sum::<u32>()
}

/// DCT-based perceptual hash of encoded image bytes.
pub fn perceptual_hash(bytes: &[u8], size: u32, low_size: u32) -> Result<ImageHash> {
    perceptual_hash_image(&decode(bytes)?, size, low_size)
}

pub fn perceptual_hash_image(source: &DynamicImage, size: u32, low_size: u32) -> Result<ImageHash> {
    Ok(hash_luma(&to_luminance(source)?, size, low_size))
}

/// Hashes a luminance plane: downsample to `size x size`, take the
/// `low_size x low_size` low-frequency DCT block minus the DC term, and set
/// each bit whose coefficient is strictly above the block median.
pub fn hash_luma(luma: &GrayImage, size: u32, low_size: u32) -> ImageHash {
    let size = size.max(1);
    let low = low_size.min(size) as usize;
    let n = size as usize;

    let pixels = sample_square(luma, size);
    let dct = dct_2d(&pixels, n);

    let mut coeffs = Vec::with_capacity((low * low).saturating_sub(1));
    for v in 0..low {
        for u in 0..low {
            if u == 0 && v == 0 {
                continue;
            }
            coeffs.push(dct[v * n + u]);
        }
    }
    if coeffs.is_empty() {
        return ImageHash::from_bytes(Vec::new());
    }

    let mut sorted = coeffs.clone();
    sorted.sort_by(f64::total_cmp);
    let median = sorted[sorted.len() / 2];

    ImageHash::from_bits(coeffs.iter().map(|&c| c > median), coeffs.len())
}

/// Legacy average hash: bit set iff the downsampled pixel is above the mean.
pub fn average_hash(bytes: &[u8], size: u32) -> Result<ImageHash> {
    let luma = to_luminance(&decode(bytes)?)?;
    let size = size.max(1);
    let pixels = sample_square(&luma, size);
    let mean = pixels.iter().sum::<f64>() / pixels.len() as f64;
    Ok(ImageHash::from_bits(
        pixels.iter().map(|&p| p > mean),
        pixels.len(),
    ))
}

fn sample_square(luma: &GrayImage, size: u32) -> Vec<f64> {
    let resized;
    let square = if luma.dimensions() == (size, size) {
        luma
    } else {
        resized = image::imageops::resize(luma, size, size, FilterType::Triangle);
        &resized
    };
    square.as_raw().iter().map(|&p| p as f64).collect()
}

/// Naive type-II 2-D DCT, `out[v * n + u]`, scaled by `0.25 * c(u) * c(v)`.
pub fn dct_2d(pixels: &[f64], n: usize) -> Vec<f64> {
    // cosines[k * n + i] = cos((2i + 1) k pi / 2n)
    let mut cosines = vec![0f64; n * n];
    for k in 0..n {
        for i in 0..n {
            cosines[k * n + i] = ((2 * i + 1) as f64 * k as f64 * PI / (2 * n) as f64).cos();
        }
    }
    let c = |k: usize| if k == 0 { FRAC_1_SQRT_2 } else { 1.0 };

    let mut out = vec![0f64; n * n];
    for u in 0..n {
        for v in 0..n {
            let mut sum = 0f64;
            for x in 0..n {
                let cx = cosines[u * n + x];
                for y in 0..n {
                    sum += pixels[y * n + x] * cx * cosines[v * n + y];
                }
            }
            out[v * n + u] = 0.25 * c(u) * c(v) * sum;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn textured(size: u32, offset: u8) -> GrayImage {
        let mut state = 0x2545_f491u32;
        GrayImage::from_fn(size, size, |_, _| {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            Luma([20 + (state >> 24) as u8 % 200 + offset])
        })
    }

    #[test]
    fn hamming_is_symmetric_and_zero_on_self() {
        let a = [0b1011_0001u8, 0xff, 0x00];
        let b = [0b0011_0000u8, 0x0f];
        assert_eq!(hamming_distance(&a, &a), 0);
        assert_eq!(hamming_distance(&a, &b), hamming_distance(&b, &a));
        // 2 differing bits + 4 differing bits, no tail bits set in 0x00
        assert_eq!(hamming_distance(&a, &b), 6);
    }

    #[test]
    fn hamming_counts_the_surplus_tail() {
        assert_eq!(hamming_distance(&[0x00], &[0x00, 0b0000_0111]), 3);
        assert_eq!(hamming_distance(&[], &[0xff, 0xff]), 16);
    }

    #[test]
    fn phash_has_63_bits_in_8_bytes() {
        let hash = hash_luma(&textured(32, 0), 32, 8);
        assert_eq!(hash.as_bytes().len(), 8);
        assert_eq!(hash.as_bytes()[7] & 0x80, 0, "bit 63 is padding");
        // the median splits 63 coefficients into 31 above and 32 at-or-below
        let ones: u32 = hash.as_bytes().iter().map(|b| b.count_ones()).sum();
        assert_eq!(ones, 31);
    }

    #[test]
    fn uniform_brightness_shift_keeps_the_hash() {
        let base = hash_luma(&textured(32, 0), 32, 8);
        let shifted = hash_luma(&textured(32, 1), 32, 8);
        assert_eq!(base.distance(&shifted), 0);
    }

    #[test]
    fn dct_of_constant_has_only_dc() {
        let n = 8;
        let dct = dct_2d(&vec![10.0; n * n], n);
        assert!((dct[0] - 0.25 * 0.5 * 640.0).abs() < 1e-9);
        assert!(dct.iter().skip(1).all(|c| c.abs() < 1e-9));
    }

    #[test]
    fn hex_is_lowercase_byte_pairs() {
        let hash = ImageHash::from_bytes(vec![0x0a, 0xff]);
        assert_eq!(hash.to_hex(), "0aff");
        assert_eq!(hash.to_string(), "0aff");
        assert_eq!(hash.bit_len(), 16);
    }
}
