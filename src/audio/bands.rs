//! Maps smoothed FFT magnitudes onto per-LED colors via logarithmically
//! spaced frequency bands.
//!
//! Grounded in `original_source/server/tcp_audio_sync.py::AudioReceiver.compute_led_colors`.

use crate::audio::{MIN_FREQ_HZ, SAMPLE_RATE, VIS_CHUNK};
use crate::color::Color;
use crate::palette::Palette;

/// Precomputed logarithmic bin edges for a strip of `led_count` LEDs.
pub struct BandMapper {
    freq_bins: Vec<f64>,
    freq_per_bin: f64,
}

impl BandMapper {
    pub fn new(led_count: usize) -> Self {
        let nyquist = SAMPLE_RATE as f64 / 2.0;
        let led_count = led_count.max(1);
        let log_min = MIN_FREQ_HZ.log10();
        let log_max = nyquist.log10();
        let freq_bins = (0..=led_count)
            .map(|i| {
                let t = i as f64 / led_count as f64;
                10f64.powf(log_min + (log_max - log_min) * t)
            })
            .collect();
        Self {
            freq_bins,
            freq_per_bin: SAMPLE_RATE as f64 / VIS_CHUNK as f64,
        }
    }

    /// Averages `mags` over each LED's band and multiplies by `palette[i mod len]`,
    /// normalizing by `max_mag`. Returns one color per LED.
    pub fn map(&self, mags: &[f32], max_mag: f32, palette: &Palette) -> Vec<Color> {
        let led_count = self.freq_bins.len().saturating_sub(1);
        let max_mag = max_mag.max(1e-6);
        (0..led_count)
            .map(|i| {
                let start = (self.freq_bins[i] / self.freq_per_bin) as usize;
                let mut end = (self.freq_bins[i + 1] / self.freq_per_bin) as usize;
                if end <= start {
                    end = start + 1;
                }
                let end = end.min(mags.len());
                let start = start.min(end);
                let band_mag = if start < end {
                    mags[start..end].iter().sum::<f32>() / (end - start) as f32
                } else {
                    0.0
                };
                let brightness = (band_mag / max_mag).clamp(0.0, 1.0);
                palette.at(i).scale_f32(brightness)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::default_color_scheme;

    #[test]
    fn zero_magnitudes_map_to_black() {
        let mapper = BandMapper::new(10);
        let mags = vec![0.0f32; VIS_CHUNK / 2];
        let colors = mapper.map(&mags, 1.0, &default_color_scheme());
        assert_eq!(colors.len(), 10);
        assert!(colors.iter().all(|&c| c == Color::BLACK));
    }

    #[test]
    fn single_led_strip_does_not_panic() {
        let mapper = BandMapper::new(1);
        let mags = vec![1.0f32; VIS_CHUNK / 2];
        let colors = mapper.map(&mags, 1.0, &default_color_scheme());
        assert_eq!(colors.len(), 1);
    }

    #[test]
    fn bin_edges_are_nondecreasing() {
        let mapper = BandMapper::new(50);
        for w in mapper.freq_bins.windows(2) {
            assert!(w[1] >= w[0]);
        }
    }
}
