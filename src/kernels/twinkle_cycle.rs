//! Like [`Twinkle`](crate::kernels::twinkle), but each pixel's palette index
//! advances by one every time its brightness returns to zero.
//!
//! Grounded in `original_source/server/animation.py::TwinkleCycle`.

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

struct Pixel {
    phase: u8,
    color_index: usize,
    was_dark: bool,
}

pub struct TwinkleCycle {
    palette: Palette,
    pixels: Vec<Pixel>,
    delta: u8,
    period: Duration,
}

impl TwinkleCycle {
    pub fn new(pixel_count: usize, params: EffectParams) -> Result<Self, LumenError> {
        let mut rng = StdRng::seed_from_u64(params.seed);
        let pixels = (0..pixel_count)
            .map(|i| Pixel {
                phase: rng.gen::<u8>(),
                color_index: i % params.palette.len(),
                was_dark: true,
            })
            .collect();
        Ok(Self {
            palette: params.palette,
            pixels,
            delta: params.delta,
            period: scaled_period(BASE_PERIOD, params.speed)?,
        })
    }
}

impl Kernel for TwinkleCycle {
    fn tick(&mut self, buffer: &mut PixelBuffer) {
        let len = self.palette.len();
        for (i, pixel) in self.pixels.iter_mut().enumerate() {
            pixel.phase = pixel.phase.wrapping_add(self.delta);
            let brightness = dim8_lin(triwave8(pixel.phase));
            if brightness == 0 {
                if !pixel.was_dark {
                    pixel.color_index = (pixel.color_index + 1) % len;
                }
                pixel.was_dark = true;
            } else {
                pixel.was_dark = false;
            }
            let color = self.palette.at(pixel.color_index).scale(brightness as u32, 255);
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
    fn single_pixel_never_panics() {
        let palette = Palette::new(vec![Color::new(255, 0, 0), Color::new(0, 255, 0)]).unwrap();
        let mut buffer = PixelBuffer::new(1);
        let mut k = TwinkleCycle::new(1, EffectParams::new(palette, 1.0)).unwrap();
        for _ in 0..200 {
            k.tick(&mut buffer);
        }
    }

    #[test]
    fn color_index_eventually_advances() {
        let palette = Palette::new(vec![Color::new(255, 0, 0), Color::new(0, 255, 0)]).unwrap();
        let mut buffer = PixelBuffer::new(4);
        let mut k = TwinkleCycle::new(4, EffectParams::new(palette, 1.0)).unwrap();
        let before: Vec<usize> = k.pixels.iter().map(|p| p.color_index).collect();
        let mut advanced = false;
        for _ in 0..2000 {
            k.tick(&mut buffer);
            if k.pixels.iter().map(|p| p.color_index).collect::<Vec<_>>() != before {
                advanced = true;
                break;
            }
        }
        assert!(advanced, "some pixel's color index should advance");
    }
}
