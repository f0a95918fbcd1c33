//! Animation kernels: procedural effects sharing a common frame-update contract.
//!
//! Every kernel satisfies the same small interface (construct, `tick`,
//! `effective_period`) rather than sitting in an inheritance chain — a single
//! capability instead of a deep class hierarchy, per spec.md §9.

mod bouncing;
mod candle_flicker;
mod chase;
mod cover;
mod cycle_fade;
mod cylon;
mod fade;
mod twinkle;
mod twinkle_cycle;
mod twinkle_stars;

pub use bouncing::Bouncing;
pub use candle_flicker::CandleFlicker;
pub use chase::Chase;
pub use cover::Cover;
pub use cycle_fade::CycleFade;
pub use cylon::Cylon;
pub use fade::Fade;
pub use twinkle::Twinkle;
pub use twinkle_cycle::TwinkleCycle;
pub use twinkle_stars::TwinkleStars;

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::buffer::PixelBuffer;
use crate::error::LumenError;
use crate::palette::{candle_colors, default_color_scheme, Palette};

/// Every animation kernel writes into the pixel buffer on `tick` and reports
/// the frame period it wants driven at the given speed.
///
/// `tick` must be pure with respect to wall-clock time: it advances internal
/// state by exactly one frame and never sleeps.
pub trait Kernel: Send {
    /// Advances internal state by one frame, writing into `buffer`.
    fn tick(&mut self, buffer: &mut PixelBuffer);

    /// `base_period / speed`, the duration the runtime should wait between ticks.
    fn effective_period(&self) -> Duration;
}

/// Blink-style standalone effect (bundled here for catalog completeness).
struct Blink {
    palette: Palette,
    index: usize,
    period: Duration,
}

impl Blink {
    fn new(palette: Palette, speed: f32) -> Result<Self, LumenError> {
        Ok(Self {
            palette,
            index: 0,
            period: scaled_period(Duration::from_millis(500), speed)?,
        })
    }
}

impl Kernel for Blink {
    fn tick(&mut self, buffer: &mut PixelBuffer) {
        let color = self.palette.at(self.index);
        buffer.fill(color);
        self.index = (self.index + 1) % self.palette.len();
    }

    fn effective_period(&self) -> Duration {
        self.period
    }
}

pub use Blink as BlinkKernel;

/// Divides `base` by `speed`, rejecting non-positive speeds with `INVALID_PARAMS`.
pub(crate) fn scaled_period(base: Duration, speed: f32) -> Result<Duration, LumenError> {
    if !(speed > 0.0) {
        return Err(LumenError::InvalidParams(format!(
            "speed must be positive, got {speed}"
        )));
    }
    Ok(Duration::from_secs_f64(base.as_secs_f64() / speed as f64))
}

/// Identifies a kernel (or catalog-only, unimplemented effect) by stable id.
///
/// Ids and names are grounded in
/// `original_source/server/animation_constants.py::AnimationId`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum EffectId {
    CycleFade = 1,
    Fade = 2,
    Blink = 3,
    Chase = 4,
    TwinkleStars = 5,
    CandleFlicker = 6,
    Bouncing = 7,
    Twinkle = 8,
    TwinkleCycle = 9,
    Cover = 10,
    Cylon = 11,
    RainbowWave = 12,
    SparkleGlitter = 13,
    BurstingSparkle = 14,
    Fireworks = 15,
}

impl EffectId {
    /// Resolves a raw id from the wire into an [`EffectId`].
    pub fn from_u8(id: u8) -> Option<Self> {
        use EffectId::*;
        Some(match id {
            1 => CycleFade,
            2 => Fade,
            3 => Blink,
            4 => Chase,
            5 => TwinkleStars,
            6 => CandleFlicker,
            7 => Bouncing,
            8 => Twinkle,
            9 => TwinkleCycle,
            10 => Cover,
            11 => Cylon,
            12 => RainbowWave,
            13 => SparkleGlitter,
            14 => BurstingSparkle,
            15 => Fireworks,
            _ => return None,
        })
    }

    /// Whether this id has a constructible kernel (the remainder are
    /// catalog-only entries inherited from the original's dead revisions).
    pub fn is_implemented(self) -> bool {
        !matches!(
            self,
            EffectId::RainbowWave | EffectId::SparkleGlitter | EffectId::BurstingSparkle | EffectId::Fireworks
        )
    }
}

/// The enumerable catalog entry surfaced to clients via `get_effects`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EffectDescriptor {
    pub id: u8,
    pub name: String,
    pub description: String,
}

/// Builds the full effect catalog, keyed by display name, matching
/// `animation_constants.py::ANIMATIONS`.
pub fn catalog() -> BTreeMap<String, EffectDescriptor> {
    let entries: &[(&str, EffectId, &str)] = &[
        ("Cycle Fade", EffectId::CycleFade, "Gradually fades through a cycle of colors in a smooth transition."),
        ("Fade", EffectId::Fade, "Fades LEDs in and out through a specified set of colors."),
        ("Blink", EffectId::Blink, "Alternates LEDs between colors in color palette in a blinking pattern."),
        ("Chase", EffectId::Chase, "Creates a chasing light effect where a color moves across the LEDs."),
        ("Twinkle Stars", EffectId::TwinkleStars, "Simulates a starry night with LEDs twinkling at random intervals."),
        ("Candle Flicker", EffectId::CandleFlicker, "Mimics the natural flicker of a candle flame with subtle brightness variations."),
        ("Bouncing", EffectId::Bouncing, "Creates a bouncing light effect as if a ball is moving across the LEDs."),
        ("Twinkle", EffectId::Twinkle, "Randomly twinkles individual LEDs with subtle fades on and off."),
        ("Twinkle Cycle", EffectId::TwinkleCycle, "Combines twinkling with a color cycling effect."),
        ("Cover", EffectId::Cover, "Simulates a sweeping cover effect where LEDs turn on sequentially."),
        ("Cylon", EffectId::Cylon, "Moving lights that fade as they move forward."),
        ("Rainbow Wave", EffectId::RainbowWave, "Rainbow wave moving across lights"),
        ("Sparkle Glitter", EffectId::SparkleGlitter, "Random flashes (sparkles) across the LED strip"),
        ("Bursting Sparkle", EffectId::BurstingSparkle, "Sparkle fire bursts across the LED strip."),
        ("Fireworks", EffectId::Fireworks, "Group of \"fireworks\" bursting."),
    ];
    entries
        .iter()
        .map(|(name, id, desc)| {
            (
                name.to_string(),
                EffectDescriptor {
                    id: *id as u8,
                    name: name.to_string(),
                    description: desc.to_string(),
                },
            )
        })
        .collect()
}

/// Effect-specific construction parameters. Unused fields are ignored by
/// kernels that don't need them; each kernel validates only what it uses.
#[derive(Clone, Debug)]
pub struct EffectParams {
    pub palette: Palette,
    pub speed: f32,
    pub block_size: usize,
    pub twinkle_rate: f32,
    pub fade_steps: u32,
    pub min_brightness: f32,
    pub max_brightness: f32,
    pub seed: u64,
    pub delta: u8,
    pub fade_amount: f32,
}

impl EffectParams {
    /// Defaults matching the per-kernel defaults in `animation.py`.
    pub fn new(palette: Palette, speed: f32) -> Self {
        Self {
            palette,
            speed,
            block_size: 1,
            twinkle_rate: 0.05,
            fade_steps: 255,
            min_brightness: 0.0,
            max_brightness: 1.0,
            seed: 42,
            delta: 1,
            fade_amount: 0.9,
        }
    }
}

/// The default color scheme for an effect when the caller supplies none,
/// matching `json_rpc.py::_trigger_effect`'s `CandleFlicker`-vs-default split.
pub fn candle_default(id: EffectId) -> Palette {
    if id == EffectId::CandleFlicker {
        candle_colors()
    } else {
        default_color_scheme()
    }
}

/// Constructs a kernel for `id`, pre-seeding `buffer` as needed.
///
/// Rejects unimplemented catalog-only ids and non-positive speeds with
/// `INVALID_PARAMS`; an empty palette is rejected earlier by [`Palette::new`].
pub fn construct(
    id: EffectId,
    pixel_count: usize,
    buffer: &mut PixelBuffer,
    params: EffectParams,
) -> Result<Box<dyn Kernel>, LumenError> {
    if !id.is_implemented() {
        return Err(LumenError::InvalidParams(format!(
            "effect {id:?} has no running implementation"
        )));
    }
    let kernel: Box<dyn Kernel> = match id {
        EffectId::CycleFade => Box::new(CycleFade::new(params)?),
        EffectId::Fade => Box::new(Fade::new(pixel_count, params)?),
        EffectId::Blink => Box::new(Blink::new(params.palette, params.speed)?),
        EffectId::Chase => Box::new(Chase::new(pixel_count, buffer, params)?),
        EffectId::TwinkleStars => Box::new(TwinkleStars::new(pixel_count, buffer, params)?),
        EffectId::CandleFlicker => Box::new(CandleFlicker::new(pixel_count, params)?),
        EffectId::Bouncing => Box::new(Bouncing::new(pixel_count, params)?),
        EffectId::Twinkle => Box::new(Twinkle::new(pixel_count, params)?),
        EffectId::TwinkleCycle => Box::new(TwinkleCycle::new(pixel_count, params)?),
        EffectId::Cover => Box::new(Cover::new(params)?),
        EffectId::Cylon => Box::new(Cylon::new(pixel_count, params)?),
        EffectId::RainbowWave | EffectId::SparkleGlitter | EffectId::BurstingSparkle | EffectId::Fireworks => {
            unreachable!("filtered by is_implemented above")
        }
    };
    Ok(kernel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::default_color_scheme;

    #[test]
    fn unimplemented_ids_are_rejected() {
        let mut buffer = PixelBuffer::new(10);
        let params = EffectParams::new(default_color_scheme(), 1.0);
        let err = construct(EffectId::RainbowWave, 10, &mut buffer, params).unwrap_err();
        assert!(matches!(err, LumenError::InvalidParams(_)));
    }

    #[test]
    fn nonpositive_speed_rejected() {
        let err = scaled_period(Duration::from_millis(10), 0.0).unwrap_err();
        assert!(matches!(err, LumenError::InvalidParams(_)));
        let err = scaled_period(Duration::from_millis(10), -1.0).unwrap_err();
        assert!(matches!(err, LumenError::InvalidParams(_)));
    }

    #[test]
    fn effective_period_scales_inversely_with_speed() {
        let base = Duration::from_millis(100);
        let doubled = scaled_period(base, 2.0).unwrap();
        assert!((doubled.as_secs_f64() - 0.05).abs() < 1e-9);
        let halved = scaled_period(base, 0.5).unwrap();
        assert!((halved.as_secs_f64() - 0.2).abs() < 1e-9);
    }

    #[test]
    fn catalog_covers_all_effect_ids() {
        let cat = catalog();
        assert_eq!(cat.len(), 15);
    }

    #[test]
    fn single_pixel_strip_never_panics_for_any_kernel() {
        for id in [
            EffectId::CycleFade,
            EffectId::Fade,
            EffectId::Blink,
            EffectId::Chase,
            EffectId::TwinkleStars,
            EffectId::CandleFlicker,
            EffectId::Bouncing,
            EffectId::Twinkle,
            EffectId::TwinkleCycle,
            EffectId::Cover,
            EffectId::Cylon,
        ] {
            let mut buffer = PixelBuffer::new(1);
            let params = EffectParams::new(default_color_scheme(), 1.0);
            let mut kernel = construct(id, 1, &mut buffer, params).expect("construct");
            for _ in 0..50 {
                kernel.tick(&mut buffer);
                for i in 0..buffer.len() {
                    let _ = buffer.get(i).unwrap();
                }
            }
        }
    }
}
