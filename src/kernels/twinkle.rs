//! Seeded per-pixel twinkle: brightness follows a triangular wave driven by
//! a phase offset unique to each pixel.
//!
//! Grounded in `original_source/server/animation.py::Twinkle`.

use std::time::Duration;

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::buffer::PixelBuffer;
use crate::error::LumenError;
use crate::kernels::{scaled_period, EffectParams, Kernel};
use crate::numerics::{dim8_lin, triwave8};
use crate::palette::Palette;

const BASE_PERIOD: Duration = Duration::from_millis(20);

pub struct Twinkle {
    palette: Palette,
    phases: Vec<u8>,
    delta: u8,
    period: Duration,
}

impl Twinkle {
    pub fn new(pixel_count: usize, params: EffectParams) -> Result<Self, LumenError> {
        let mut rng = StdRng::seed_from_u64(params.seed);
        let phases = (0..pixel_count).map(|_| rng.gen::<u8>()).collect();
        Ok(Self {
            palette: params.palette,
            phases,
            delta: params.delta,
            period: scaled_period(BASE_PERIOD, params.speed)?,
        })
    }
}

impl Kernel for Twinkle {
    fn tick(&mut self, buffer: &mut PixelBuffer) {
        let len = self.palette.len();
        for (i, phase) in self.phases.iter_mut().enumerate() {
            *phase = phase.wrapping_add(self.delta);
            let brightness = dim8_lin(triwave8(*phase));
            let color = self.palette.at(i % len).scale(brightness as u32, 255);
            let _ = buffer.set(i, color);
        }
    }

    fn effective_period(&self) -> Duration {
        self.period
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;

    #[test]
    fn same_seed_is_deterministic() {
        let palette = Palette::new(vec![Color::new(255, 255, 255)]).unwrap();
        let mut params = EffectParams::new(palette.clone(), 1.0);
        params.seed = 7;
        let mut b1 = PixelBuffer::new(8);
        let mut k1 = Twinkle::new(8, params.clone()).unwrap();
        let mut b2 = PixelBuffer::new(8);
        let mut k2 = Twinkle::new(8, params).unwrap();
        for _ in 0..5 {
            k1.tick(&mut b1);
            k2.tick(&mut b2);
        }
        assert_eq!(b1.as_slice(), b2.as_slice());
    }

    #[test]
    fn single_pixel_never_panics() {
        let palette = Palette::new(vec![Color::new(255, 255, 255)]).unwrap();
        let mut buffer = PixelBuffer::new(1);
        let mut k = Twinkle::new(1, EffectParams::new(palette, 1.0)).unwrap();
        for _ in 0..50 {
            k.tick(&mut buffer);
        }
    }
}
