use image::GrayImage;

use crate::config::KolamConfig;

/// 256-bin intensity histogram of a luminance plane.
#[derive(Debug, Clone)]
pub struct Histogram {
    bins: [u32; 256],
    total: u64,
}

/// Binarization threshold: the raw Otsu cut and the biased value used downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Threshold {
    pub otsu: u8,
    pub operational: u8,
}

impl Histogram {
    pub fn from_pixels(pixels: &[u8]) -> Self {
        let mut bins = [0u32; 256];
        for &value in pixels {
            bins[value as usize] += 1;
        }
        Self {
            bins,
            total: pixels.len() as u64,
        }
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// Otsu's method over an ascending scan of cuts.
    ///
    /// The first cut reaching the maximum between-class variance wins. When
    /// the variance never exceeds zero (flat images) `default` is returned.
    pub fn otsu(&self, default: u8) -> u8 {
        let total_pixels = self.total as f64;
        let mut sum_total = 0f64;
        for (value, &count) in self.bins.iter().enumerate() {
            sum_total += value as f64 * count as f64;
        }

        let mut sum_background = 0f64;
        let mut weight_background = 0f64;
        let mut max_variance = 0f64;
        let mut threshold = default;

        for (value, &count) in self.bins.iter().enumerate() {
            weight_background += count as f64;
            if weight_background == 0.0 {
                continue;
            }

            let weight_foreground = total_pixels - weight_background;
            if weight_foreground == 0.0 {
                break;
            }

            sum_background += value as f64 * count as f64;

            let mean_background = sum_background / weight_background;
            let mean_foreground = (sum_total - sum_background) / weight_foreground;
            let variance =
                weight_background * weight_foreground * (mean_background - mean_foreground).powi(2);

            if variance > max_variance {
                max_variance = variance;
                threshold = value as u8;
            }
        }

        threshold
    }
}

/// Adds the fixed bias to a raw Otsu cut, saturating at 255.
pub fn operational_threshold(otsu: u8, bias: u8) -> u8 {
    otsu.saturating_add(bias)
}

pub fn compute_threshold(luma: &GrayImage, config: &KolamConfig) -> Threshold {
    let otsu = Histogram::from_pixels(luma.as_raw()).otsu(config.otsu_default);
    Threshold {
        otsu,
        operational: operational_threshold(otsu, config.otsu_bias),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bimodal(low: u8, high: u8, low_count: usize, high_count: usize) -> Vec<u8> {
        let mut pixels = vec![low; low_count];
        pixels.extend(std::iter::repeat_n(high, high_count));
        pixels
    }

    #[test]
    fn otsu_splits_two_levels_at_the_lower_one() {
        let hist = Histogram::from_pixels(&bimodal(20, 200, 900, 100));
        assert_eq!(hist.total(), 1000);
        assert_eq!(hist.otsu(127), 20);
    }

    #[test]
    fn otsu_is_deterministic() {
        let pixels: Vec<u8> = (0..5000u32).map(|i| ((i * 7919) % 251) as u8).collect();
        let hist = Histogram::from_pixels(&pixels);
        let first = hist.otsu(127);
        for _ in 0..10 {
            assert_eq!(Histogram::from_pixels(&pixels).otsu(127), first);
        }
    }

    #[test]
    fn flat_image_falls_back_to_default() {
        assert_eq!(Histogram::from_pixels(&[0u8; 2500]).otsu(127), 127);
        assert_eq!(Histogram::from_pixels(&[255u8; 64]).otsu(127), 127);
        assert_eq!(Histogram::from_pixels(&[]).otsu(127), 127);
    }

    #[test]
    fn bias_is_exact_below_saturation() {
        for raw in 0..=245u8 {
            assert_eq!(operational_threshold(raw, 10), raw + 10);
        }
        assert_eq!(operational_threshold(250, 10), 255);
        assert_eq!(operational_threshold(255, 10), 255);
    }

    #[test]
    fn compute_threshold_applies_config_bias() {
        let luma = GrayImage::from_raw(10, 10, bimodal(30, 220, 80, 20)).expect("luma");
        let threshold = compute_threshold(&luma, &KolamConfig::default());
        assert_eq!(threshold.otsu, 30);
        assert_eq!(threshold.operational, 40);
    }
}
