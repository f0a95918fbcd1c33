//! A block of `block_size` LEDs chases around the strip over a background color.
//!
//! Grounded in `original_source/server/animation.py::Chase`. Resolves
//! spec.md §9's open question in favor of the incremental erase-head /
//! paint-tail update (as opposed to repainting the whole block every tick).

use std::time::Duration;

use crate::buffer::PixelBuffer;
use crate::error::LumenError;
use crate::kernels::{scaled_period, EffectParams, Kernel};
use crate::palette::Palette;

const BASE_PERIOD: Duration = Duration::from_millis(100);

pub struct Chase {
    palette: Palette,
    index: usize,
    block_size: usize,
    pixel_count: usize,
    period: Duration,
}

impl Chase {
    pub fn new(pixel_count: usize, buffer: &mut PixelBuffer, params: EffectParams) -> Result<Self, LumenError> {
        let block_size = params.block_size.max(1);
        buffer.fill(params.palette.at(1));
        for i in 0..block_size {
            let _ = buffer.set(i % pixel_count, params.palette.at(0));
        }
        Ok(Self {
            palette: params.palette,
            index: 0,
            block_size,
            pixel_count,
            period: scaled_period(BASE_PERIOD, params.speed)?,
        })
    }
}

impl Kernel for Chase {
    fn tick(&mut self, buffer: &mut PixelBuffer) {
        let _ = buffer.set(self.index % self.pixel_count, self.palette.at(1));
        let new_tail = (self.index + self.block_size) % self.pixel_count;
        let _ = buffer.set(new_tail, self.palette.at(0));
        self.index = (self.index + 1) % self.pixel_count;
    }

    fn effective_period(&self) -> Duration {
        self.period
    }
}
