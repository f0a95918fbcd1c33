//! Per-pixel palette fade that rotates the palette left on each full ramp.
//!
//! Grounded in `original_source/server/animation.py::Fade`.

use std::time::Duration;

use crate::buffer::PixelBuffer;
use crate::error::LumenError;
use crate::kernels::{scaled_period, EffectParams, Kernel};
use crate::palette::Palette;

const BASE_PERIOD: Duration = Duration::from_millis(10);

pub struct Fade {
    palette: Palette,
    steps: u32,
    brightness: i32,
    direction: i32,
    pixel_count: usize,
    period: Duration,
}

impl Fade {
    pub fn new(pixel_count: usize, params: EffectParams) -> Result<Self, LumenError> {
        Ok(Self {
            palette: params.palette,
            steps: params.fade_steps.max(1),
            brightness: 0,
            direction: 1,
            pixel_count,
            period: scaled_period(BASE_PERIOD, params.speed)?,
        })
    }
}

impl Kernel for Fade {
    fn tick(&mut self, buffer: &mut PixelBuffer) {
        self.brightness += self.direction;
        if self.brightness >= self.steps as i32 {
            self.brightness = self.steps as i32;
            self.direction = -1;
        } else if self.brightness <= 0 {
            self.brightness = 0;
            self.direction = 1;
            self.palette.rotate_left_one();
        }

        for i in 0..self.pixel_count {
            let base = self.palette.at(i);
            let color = base.scale(self.brightness as u32, self.steps);
            let _ = buffer.set(i, color);
        }
    }

    fn effective_period(&self) -> Duration {
        self.period
    }
}
