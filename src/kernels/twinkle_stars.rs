//! Each pixel independently twinkles with probability `rate` each tick.
//!
//! Grounded in `original_source/server/animation.py::TwinkleStars`.

use std::time::Duration;

use rand::Rng;

use crate::buffer::PixelBuffer;
use crate::error::LumenError;
use crate::kernels::{scaled_period, EffectParams, Kernel};
use crate::palette::Palette;

const BASE_PERIOD: Duration = Duration::from_millis(100);

pub struct TwinkleStars {
    base_color: crate::color::Color,
    twinkle_color: crate::color::Color,
    rate: f32,
    period: Duration,
}

impl TwinkleStars {
    pub fn new(pixel_count: usize, buffer: &mut PixelBuffer, params: EffectParams) -> Result<Self, LumenError> {
        let base_color = params.palette.at(0);
        let twinkle_color = params.palette.at(1 % params.palette.len().max(1));
        buffer.fill(base_color);
        let _ = pixel_count;
        let _: &Palette = &params.palette;
        Ok(Self {
            base_color,
            twinkle_color,
            rate: params.twinkle_rate.clamp(0.0, 1.0),
            period: scaled_period(BASE_PERIOD, params.speed)?,
        })
    }
}

impl Kernel for TwinkleStars {
    fn tick(&mut self, buffer: &mut PixelBuffer) {
        let mut rng = rand::thread_rng();
        for i in 0..buffer.len() {
            let color = if rng.gen::<f32>() < self.rate {
                self.twinkle_color
            } else {
                self.base_color
            };
            let _ = buffer.set(i, color);
        }
    }

    fn effective_period(&self) -> Duration {
        self.period
    }
}
