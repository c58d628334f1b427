#![allow(dead_code)]
//! Synthetic kolam-like images for the integration tests.

use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;

pub const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);
pub const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Black canvas with `rows x cols` white squares of side `square`, the first
/// one at `origin` and the rest `spacing` pixels apart.
pub fn dot_grid(
    width: u32,
    height: u32,
    rows: u32,
    cols: u32,
    square: u32,
    spacing: u32,
    origin: u32,
) -> RgbaImage {
    let mut img = RgbaImage::from_pixel(width, height, BLACK);
    for r in 0..rows {
        for c in 0..cols {
            let x0 = origin + c * spacing;
            let y0 = origin + r * spacing;
            for y in y0..(y0 + square).min(height) {
                for x in x0..(x0 + square).min(width) {
                    img.put_pixel(x, y, WHITE);
                }
            }
        }
    }
    img
}

/// Left half is a pattern whose rows brighten downwards; the right half is
/// its mirror image, so only the left/right axis is symmetric.
pub fn left_right_mirror(width: u32, height: u32) -> RgbaImage {
    let mut img = RgbaImage::new(width, height);
    for y in 0..height {
        for x in 0..width.div_ceil(2) {
            let v = ((x * 5 + y * 2) % 200) as u8;
            let px = Rgba([v, v, v, 255]);
            img.put_pixel(x, y, px);
            img.put_pixel(width - 1 - x, y, px);
        }
    }
    img
}

/// Deterministic noise texture, optionally brightened by a uniform offset.
pub fn texture(width: u32, height: u32, seed: u32, offset: u8) -> RgbaImage {
    let mut state = seed;
    RgbaImage::from_fn(width, height, |_, _| {
        state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        let v = 20 + (state >> 24) as u8 % 200 + offset;
        Rgba([v, v, v, 255])
    })
}

pub fn png_bytes(img: &RgbaImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    DynamicImage::ImageRgba8(img.clone())
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .expect("encode test png");
    bytes
}
