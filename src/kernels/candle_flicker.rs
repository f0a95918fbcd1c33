//! Per-pixel candle flicker: each LED picks a base color and drifts its
//! brightness toward a randomly re-rolled target.
//!
//! Grounded in `original_source/server/animation.py::CandleFlicker`.

use std::time::Duration;

use rand::Rng;

use crate::buffer::PixelBuffer;
use crate::color::Color;
use crate::error::LumenError;
use crate::kernels::{scaled_period, EffectParams, Kernel};

const BASE_PERIOD: Duration = Duration::from_millis(50);
const DRIFT: f32 = 0.3;

struct Flame {
    base: Color,
    brightness: f32,
    target: f32,
}

pub struct CandleFlicker {
    flames: Vec<Flame>,
    min_brightness: f32,
    max_brightness: f32,
    period: Duration,
}

impl CandleFlicker {
    pub fn new(pixel_count: usize, params: EffectParams) -> Result<Self, LumenError> {
        let mut rng = rand::thread_rng();
        let min_brightness = params.min_brightness.clamp(0.0, 1.0);
        let max_brightness = params.max_brightness.clamp(min_brightness, 1.0);
        let flames = (0..pixel_count)
            .map(|_| Flame {
                base: params.palette.at(rng.gen_range(0..params.palette.len())),
                brightness: rng.gen_range(min_brightness..=max_brightness),
                target: rng.gen_range(min_brightness..=max_brightness),
            })
            .collect();
        Ok(Self {
            flames,
            min_brightness,
            max_brightness,
            period: scaled_period(BASE_PERIOD, params.speed)?,
        })
    }
}

impl Kernel for CandleFlicker {
    fn tick(&mut self, buffer: &mut PixelBuffer) {
        let mut rng = rand::thread_rng();
        for (i, flame) in self.flames.iter_mut().enumerate() {
            flame.brightness += (flame.target - flame.brightness) * DRIFT;
            if (flame.brightness - flame.target).abs() < 0.01 {
                flame.target = rng.gen_range(self.min_brightness..=self.max_brightness);
            }
            let color = flame.base.scale_f32(flame.brightness);
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
    use crate::palette::Palette;

    #[test]
    fn brightness_stays_within_bounds() {
        let palette = Palette::new(vec![Color::new(255, 180, 0)]).unwrap();
        let mut params = EffectParams::new(palette, 1.0);
        params.min_brightness = 0.2;
        params.max_brightness = 0.8;
        let mut buffer = PixelBuffer::new(10);
        let mut k = CandleFlicker::new(10, params).unwrap();
        for _ in 0..200 {
            k.tick(&mut buffer);
            for f in &k.flames {
                assert!(f.brightness >= 0.0 && f.brightness <= 1.0);
            }
        }
    }

    #[test]
    fn single_pixel_does_not_panic() {
        let palette = Palette::new(vec![Color::new(255, 180, 0)]).unwrap();
        let mut buffer = PixelBuffer::new(1);
        let mut k = CandleFlicker::new(1, EffectParams::new(palette, 1.0)).unwrap();
        for _ in 0..20 {
            k.tick(&mut buffer);
        }
    }
}
