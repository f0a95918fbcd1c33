//! Sweeping cover effect: LEDs light up sequentially, advancing the palette
//! color on each full wrap of the strip.
//!
//! Grounded in `original_source/server/animation.py::Cover`.

use std::time::Duration;

use crate::buffer::PixelBuffer;
use crate::error::LumenError;
use crate::kernels::{scaled_period, EffectParams, Kernel};
use crate::palette::Palette;

const BASE_PERIOD: Duration = Duration::from_millis(50);

pub struct Cover {
    palette: Palette,
    position: usize,
    color_index: usize,
    period: Duration,
}

impl Cover {
    pub fn new(params: EffectParams) -> Result<Self, LumenError> {
        Ok(Self {
            palette: params.palette,
            position: 0,
            color_index: 0,
            period: scaled_period(BASE_PERIOD, params.speed)?,
        })
    }
}

impl Kernel for Cover {
    fn tick(&mut self, buffer: &mut PixelBuffer) {
        if buffer.is_empty() {
            return;
        }
        let color = self.palette.at(self.color_index);
        let _ = buffer.set(self.position, color);
        self.position += 1;
        if self.position >= buffer.len() {
            self.position = 0;
            self.color_index = (self.color_index + 1) % self.palette.len();
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
    fn single_pixel_strip_wraps_every_tick() {
        let palette = Palette::new(vec![Color::new(1, 0, 0), Color::new(0, 1, 0)]).unwrap();
        let mut buffer = PixelBuffer::new(1);
        let mut k = Cover::new(EffectParams::new(palette, 1.0)).unwrap();
        k.tick(&mut buffer);
        assert_eq!(buffer.get(0).unwrap(), Color::new(1, 0, 0));
        k.tick(&mut buffer);
        assert_eq!(buffer.get(0).unwrap(), Color::new(0, 1, 0));
    }

    #[test]
    fn fills_sequentially_before_advancing_color() {
        let palette = Palette::new(vec![Color::new(1, 0, 0), Color::new(0, 1, 0)]).unwrap();
        let mut buffer = PixelBuffer::new(3);
        let mut k = Cover::new(EffectParams::new(palette, 1.0)).unwrap();
        for _ in 0..3 {
            k.tick(&mut buffer);
        }
        for i in 0..3 {
            assert_eq!(buffer.get(i).unwrap(), Color::new(1, 0, 0));
        }
        k.tick(&mut buffer);
        assert_eq!(buffer.get(0).unwrap(), Color::new(0, 1, 0));
    }
}
