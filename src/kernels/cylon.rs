//! A single head LED walks back and forth while the whole strip fades
//! toward black each tick.
//!
//! No surviving reference implementation exists in `original_source/` for
//! this effect; authored from spec.md's behavioral description in the same
//! idiom as [`Bouncing`](crate::kernels::bouncing).

use std::time::Duration;

use crate::buffer::PixelBuffer;
use crate::error::LumenError;
use crate::kernels::{scaled_period, EffectParams, Kernel};
use crate::palette::Palette;

const BASE_PERIOD: Duration = Duration::from_millis(20);

pub struct Cylon {
    palette: Palette,
    pixel_count: usize,
    position: i64,
    direction: i64,
    color_index: usize,
    fade_amount: f32,
    period: Duration,
}

impl Cylon {
    pub fn new(pixel_count: usize, params: EffectParams) -> Result<Self, LumenError> {
        Ok(Self {
            palette: params.palette,
            pixel_count,
            position: 0,
            direction: 1,
            color_index: 0,
            fade_amount: params.fade_amount.clamp(0.0, 1.0),
            period: scaled_period(BASE_PERIOD, params.speed)?,
        })
    }
}

impl Kernel for Cylon {
    fn tick(&mut self, buffer: &mut PixelBuffer) {
        for i in 0..buffer.len() {
            if let Some(current) = buffer.get(i) {
                let _ = buffer.set(i, current.scale_f32(self.fade_amount));
            }
        }

        let head = self.position.rem_euclid(self.pixel_count.max(1) as i64) as usize;
        let color = self.palette.at(self.color_index);
        let _ = buffer.set(head, color);

        if self.pixel_count > 1 {
            let last = (self.pixel_count - 1) as i64;
            self.position += self.direction;
            if self.position >= last {
                self.position = last;
                self.direction = -1;
            } else if self.position <= 0 {
                self.position = 0;
                self.direction = 1;
            }
        }
        self.color_index = (self.color_index + 1) % self.palette.len();
    }

    fn effective_period(&self) -> Duration {
        self.period
    }
}
