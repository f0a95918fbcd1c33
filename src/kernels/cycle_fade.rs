//! Whole-strip brightness ramp that advances the palette at the bottom of the ramp.
//!
//! Grounded in `original_source/server/animation.py::CycleFade`.

use std::time::Duration;

use crate::buffer::PixelBuffer;
use crate::error::LumenError;
use crate::kernels::{scaled_period, EffectParams, Kernel};
use crate::palette::Palette;

const BASE_PERIOD: Duration = Duration::from_millis(10);

pub struct CycleFade {
    palette: Palette,
    steps: u32,
    brightness: i32,
    direction: i32,
    color_index: usize,
    period: Duration,
}

impl CycleFade {
    pub fn new(params: EffectParams) -> Result<Self, LumenError> {
        Ok(Self {
            palette: params.palette,
            steps: params.fade_steps.max(1),
            brightness: 0,
            direction: 1,
            color_index: 0,
            period: scaled_period(BASE_PERIOD, params.speed)?,
        })
    }
}

impl Kernel for CycleFade {
    fn tick(&mut self, buffer: &mut PixelBuffer) {
        self.brightness += self.direction;
        if self.brightness >= self.steps as i32 {
            self.brightness = self.steps as i32;
            self.direction = -1;
        } else if self.brightness <= 0 {
            self.brightness = 0;
            self.direction = 1;
            self.color_index = (self.color_index + 1) % self.palette.len();
        }

        let base = self.palette.at(self.color_index);
        let color = base.scale(self.brightness as u32, self.steps);
        buffer.fill(color);
    }

    fn effective_period(&self) -> Duration {
        self.period
    }
}
