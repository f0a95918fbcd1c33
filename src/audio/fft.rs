//! Hann-windowed FFT with exponential magnitude smoothing.
//!
//! Grounded in `original_source/server/tcp_audio_sync.py::AudioReceiver.perform_fft`.

use std::sync::Arc;

use rustfft::num_complex::Complex32;
use rustfft::{Fft, FftPlanner};

use crate::audio::VIS_CHUNK;

const SMOOTHING_NEW: f32 = 0.25;
const SMOOTHING_OLD: f32 = 0.75;
const MAX_MAG_DECAY: f32 = 0.999;
const SILENCE_MAG_DECAY: f32 = 0.9;
const SILENCE_PREV_DECAY: f32 = 0.8;
const MAX_MAG_EPSILON: f32 = 1e-6;

/// Stateful FFT analyzer carrying smoothing state across sub-windows.
pub struct FftAnalyzer {
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    prev_mags: Vec<f32>,
    max_mag: f32,
}

impl FftAnalyzer {
    pub fn new() -> Self {
        let mut planner = FftPlanner::<f32>::new();
        Self {
            fft: planner.plan_fft_forward(VIS_CHUNK),
            window: hann_window(VIS_CHUNK),
            prev_mags: vec![0.0; VIS_CHUNK / 2],
            max_mag: MAX_MAG_EPSILON,
        }
    }

    /// Resets smoothing state — called on every IDLE↔CONNECTED transition.
    pub fn reset(&mut self) {
        self.prev_mags.fill(0.0);
        self.max_mag = MAX_MAG_EPSILON;
    }

    pub fn max_mag(&self) -> f32 {
        self.max_mag
    }

    /// Runs one sub-window through the Hann/FFT/smoothing pipeline, zero-padding
    /// to `VIS_CHUNK` if `mono` is shorter, and returns the smoothed positive-
    /// frequency magnitudes (length `VIS_CHUNK / 2`).
    pub fn analyze(&mut self, mono: &[f32]) -> &[f32] {
        if mono.iter().all(|&x| x == 0.0) {
            self.max_mag *= SILENCE_MAG_DECAY;
            for m in &mut self.prev_mags {
                *m *= SILENCE_PREV_DECAY;
            }
            return &self.prev_mags;
        }

        let mut buffer: Vec<Complex32> = (0..VIS_CHUNK)
            .map(|i| {
                let sample = mono.get(i).copied().unwrap_or(0.0);
                Complex32::new(sample * self.window[i], 0.0)
            })
            .collect();
        self.fft.process(&mut buffer);

        let half = VIS_CHUNK / 2;
        let mut peak = 0.0f32;
        for i in 0..half {
            let mag = buffer[i].norm();
            let smoothed = SMOOTHING_NEW * mag + SMOOTHING_OLD * self.prev_mags[i];
            self.prev_mags[i] = smoothed;
            peak = peak.max(smoothed);
        }
        self.max_mag = (self.max_mag * MAX_MAG_DECAY).max(peak);
        &self.prev_mags
    }
}

impl Default for FftAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

fn hann_window(len: usize) -> Vec<f32> {
    if len <= 1 {
        return vec![1.0; len];
    }
    (0..len)
        .map(|i| {
            let x = (std::f32::consts::PI * i as f32 / (len as f32 - 1.0)).sin();
            x * x
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_decays_max_mag_and_prev_mags() {
        let mut fft = FftAnalyzer::new();
        fft.prev_mags.fill(10.0);
        fft.max_mag = 5.0;
        let silence = vec![0.0f32; VIS_CHUNK];
        let out = fft.analyze(&silence).to_vec();
        assert!(out.iter().all(|&m| (m - 8.0).abs() < 1e-6));
        assert!((fft.max_mag - 4.5).abs() < 1e-6);
    }

    #[test]
    fn sine_input_produces_a_dominant_bin() {
        let mut fft = FftAnalyzer::new();
        let freq = 1000.0f32;
        let sample_rate = crate::audio::SAMPLE_RATE as f32;
        let mono: Vec<f32> = (0..VIS_CHUNK)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate).sin() * 1000.0)
            .collect();
        let mags = fft.analyze(&mono).to_vec();
        let peak_bin = mags
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(i, _)| i)
            .unwrap();
        let bin_hz = peak_bin as f32 * sample_rate / VIS_CHUNK as f32;
        assert!((bin_hz - freq).abs() < (sample_rate / VIS_CHUNK as f32) * 2.0);
    }

    #[test]
    fn zero_length_input_never_panics() {
        let mut fft = FftAnalyzer::new();
        let _ = fft.analyze(&[]);
    }
}
