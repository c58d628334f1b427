//! Mirror-symmetry indicators.
//!
//! Only the middle row and the middle column are sampled. This is a cheap
//! one-dimensional proxy for two-dimensional symmetry; callers treat the
//! flags as a weak hint, never as ground truth.

use image::GrayImage;
use serde::{Deserialize, Serialize};

use crate::config::KolamConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SymmetryFlag {
    /// Left and right halves of the middle row mirror each other.
    #[serde(rename = "Horizontal Mirror")]
    HorizontalMirror,
    /// Top and bottom halves of the middle column mirror each other.
    #[serde(rename = "Vertical Mirror")]
    VerticalMirror,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymmetryScore {
    pub horizontal_matches: u32,
    pub vertical_matches: u32,
    pub flags: Vec<SymmetryFlag>,
}

impl SymmetryScore {
    pub fn has(&self, flag: SymmetryFlag) -> bool {
        self.flags.contains(&flag)
    }
}

pub fn score_symmetry(luma: &GrayImage, config: &KolamConfig) -> SymmetryScore {
    let (width, height) = luma.dimensions();
    let tolerance = config.symmetry_tolerance;

    let row = height / 2;
    let horizontal_matches = (0..width / 2)
        .filter(|&x| {
            close(
                luma.get_pixel(x, row)[0],
                luma.get_pixel(width - 1 - x, row)[0],
                tolerance,
            )
        })
        .count() as u32;

    let col = width / 2;
    let vertical_matches = (0..height / 2)
        .filter(|&y| {
            close(
                luma.get_pixel(col, y)[0],
                luma.get_pixel(col, height - 1 - y)[0],
                tolerance,
            )
        })
        .count() as u32;

    let mut flags = Vec::new();
    if horizontal_matches as f64 > config.symmetry_coverage * width as f64 {
        flags.push(SymmetryFlag::HorizontalMirror);
    }
    if vertical_matches as f64 > config.symmetry_coverage * height as f64 {
        flags.push(SymmetryFlag::VerticalMirror);
    }

    SymmetryScore {
        horizontal_matches,
        vertical_matches,
        flags,
    }
}

fn close(a: u8, b: u8, tolerance: u8) -> bool {
    a.abs_diff(b) < tolerance
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn perfect_left_right_mirror_matches_every_sample() {
        let luma = GrayImage::from_fn(41, 30, |x, y| {
            let d = x.min(40 - x);
            Luma([(d * 6 + y * 4) as u8])
        });
        let score = score_symmetry(&luma, &KolamConfig::default());
        assert_eq!(score.horizontal_matches, 20);
        assert!(score.has(SymmetryFlag::HorizontalMirror));
        assert!(!score.has(SymmetryFlag::VerticalMirror));
    }

    #[test]
    fn flat_image_is_symmetric_both_ways() {
        let luma = GrayImage::from_pixel(10, 10, Luma([90]));
        let score = score_symmetry(&luma, &KolamConfig::default());
        assert_eq!(
            score.flags,
            vec![SymmetryFlag::HorizontalMirror, SymmetryFlag::VerticalMirror]
        );
    }

    #[test]
    fn tolerance_is_strict() {
        // left half 0, right half exactly 15 apart
        let luma = GrayImage::from_fn(10, 10, |x, _| Luma([if x < 5 { 0 } else { 15 }]));
        let score = score_symmetry(&luma, &KolamConfig::default());
        assert_eq!(score.horizontal_matches, 0);
        assert!(!score.has(SymmetryFlag::HorizontalMirror));
    }

    #[test]
    fn flags_serialize_with_display_names() {
        let json = serde_json::to_string(&[SymmetryFlag::HorizontalMirror, SymmetryFlag::VerticalMirror])
            .expect("json");
        assert_eq!(json, r#"["Horizontal Mirror","Vertical Mirror"]"#);
    }
}
