//! Palettes: non-empty ordered color sequences, plus the named catalog.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::color::{Color, ColorWire};
use crate::error::LumenError;

/// A non-empty ordered sequence of colors, indexed modulo its length.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Palette(Vec<Color>);

impl Palette {
    /// Builds a palette, rejecting empty input with `INVALID_PARAMS`.
    pub fn new(colors: Vec<Color>) -> Result<Self, LumenError> {
        if colors.is_empty() {
            return Err(LumenError::InvalidParams("palette must not be empty".into()));
        }
        Ok(Self(colors))
    }

    /// Builds a palette from wire colors (hex/int/tuple), normalizing each entry.
    pub fn from_wire(colors: Vec<ColorWire>) -> Result<Self, LumenError> {
        if colors.is_empty() {
            return Err(LumenError::InvalidParams("palette must not be empty".into()));
        }
        let mut out = Vec::with_capacity(colors.len());
        for c in colors {
            out.push(c.into_color().map_err(LumenError::InvalidParams)?);
        }
        Ok(Self(out))
    }

    /// Number of colors in the palette.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the palette has no colors (never true for a constructed palette).
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Indexes the palette modulo its length.
    pub fn at(&self, i: usize) -> Color {
        self.0[i % self.0.len()]
    }

    /// Rotates the palette left by one position (used by [`Fade`](crate::kernels::fade)).
    pub fn rotate_left_one(&mut self) {
        if self.0.len() > 1 {
            self.0.rotate_left(1);
        }
    }

    /// Borrows the underlying colors.
    pub fn colors(&self) -> &[Color] {
        &self.0
    }
}

/// Builds the named, read-only palette catalog.
///
/// Grounded in `original_source/server/color_palettes.py::COLOR_PALETTES`.
pub fn builtin_palettes() -> BTreeMap<String, Palette> {
    let raw: &[(&str, &[u32])] = &[
        ("American Palette", &[0xFF0000, 0xFFFFFF, 0x0000FF]),
        (
            "Classic Fireworks",
            &[0xFFAA00, 0xFFFF66, 0xFF0000, 0xFFFFFF, 0xAAAAAA],
        ),
        (
            "Festival Multicolor Fireworks",
            &[0xFF0000, 0xFF7F00, 0xFFFF00, 0x00FF00, 0x0000FF, 0x4B0082, 0x8B00FF],
        ),
        ("Wicked", &[0x39FF14, 0x8B00FF, 0x39FF14, 0xFF0080]),
        (
            "Christmas Tree Palette",
            &[0x1E7C20, 0xB60000, 0x0037FB, 0xDF6500, 0x8100DB],
        ),
        (
            "Christmas Snow",
            &[0xdb0404, 0x169f48, 0x8cd4ff, 0xc6efff, 0xffffff],
        ),
        (
            "Generic Christmas",
            &[0xff0000, 0xff7878, 0xffffff, 0x74d680, 0x378b29],
        ),
        (
            "Christmas Palette Traditional",
            &[0x1E7C20, 0xB60000, 0xFFFFFF, 0xDF6500, 0x00FF00],
        ),
        (
            "Christmas Palette Winter",
            &[0xA7C7E7, 0xFFFFFF, 0xA9A9A9, 0x3E9E9D, 0xFF0000],
        ),
        (
            "Christmas Palette Cozy",
            &[0x8B4513, 0xFFD700, 0xA52A2A, 0x006400, 0xFFFFFF],
        ),
        (
            "Christmas Palette Classic",
            &[0x006400, 0xB60000, 0xFFD700, 0xFFFFFF, 0x0044FF],
        ),
        (
            "Christmas Palette Elegant",
            &[0x6A5ACD, 0xFFFFFF, 0xFFD700, 0xFF00FF, 0xB22222, 0x228B22],
        ),
        (
            "Christmas Palette Elegant II",
            &[0x6A5ACD, 0xFFFFFF, 0xFF00FF, 0xB22222, 0x228B22],
        ),
        (
            "Hawaiian Christmas",
            &[0x007D04, 0xB60000, 0x00A6FB, 0xFFD700, 0xFF007F, 0xFF6000],
        ),
        ("Brat Palette", &[0x22FF00, 0xFFFFFF, 0xFF10F0]),
        (
            "Spiderman Palette",
            &[0xDF0002, 0x0053C0, 0xFFFFFF, 0xB10000, 0x0000B1, 0xFFFFFF],
        ),
        ("Red Green White Colors", &[0x006400, 0xB60000, 0xFFFFFF]),
        ("Blue and White", &[0x0000FF, 0xFFFFFF]),
        ("Blue", &[0x0000FF]),
        ("Candle Colors", &[0xFF6414, 0xFF5000, 0xC85000, 0xC81E00, 0xFF0A00]),
    ];

    raw.iter()
        .map(|(name, colors)| {
            let palette = Palette::new(colors.iter().map(|&c| Color::from_u32(c)).collect())
                .expect("builtin palettes are non-empty");
            (name.to_string(), palette)
        })
        .collect()
}

/// Default palette used by `stop_animation_playlist` and as a params fallback,
/// matching `json_rpc.py::DEFAULT_COLOR_PALLETE`.
pub fn default_palette() -> Palette {
    Palette::new(
        [0x1E7C20u32, 0xB60000, 0x0037FB, 0xDF6500, 0x8100DB]
            .into_iter()
            .map(Color::from_u32)
            .collect(),
    )
    .expect("default palette is non-empty")
}

/// The candle-flavored color set used as `CandleFlicker`'s fallback scheme.
pub fn candle_colors() -> Palette {
    Palette::new(
        [0xFF6414u32, 0xFF5000, 0xC85000, 0xC81E00, 0xFF0A00]
            .into_iter()
            .map(Color::from_u32)
            .collect(),
    )
    .expect("candle palette is non-empty")
}

/// The generic two-color scheme used as most kernels' fallback, matching
/// `json_rpc.py::DEFAULT_COLOR_SCHEME`.
pub fn default_color_scheme() -> Palette {
    Palette::new(vec![Color::new(255, 0, 0), Color::new(0, 255, 0)])
        .expect("default scheme is non-empty")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_palette_rejected() {
        let err = Palette::new(vec![]).unwrap_err();
        assert!(matches!(err, LumenError::InvalidParams(_)));
    }

    #[test]
    fn indexing_wraps_modulo_len() {
        let p = Palette::new(vec![Color::new(1, 0, 0), Color::new(0, 1, 0)]).unwrap();
        assert_eq!(p.at(0), Color::new(1, 0, 0));
        assert_eq!(p.at(1), Color::new(0, 1, 0));
        assert_eq!(p.at(2), Color::new(1, 0, 0));
        assert_eq!(p.at(5), Color::new(0, 1, 0));
    }

    #[test]
    fn rotate_left_moves_first_to_back() {
        let mut p = Palette::new(vec![Color::new(1, 0, 0), Color::new(0, 1, 0), Color::new(0, 0, 1)]).unwrap();
        p.rotate_left_one();
        assert_eq!(p.colors(), &[Color::new(0, 1, 0), Color::new(0, 0, 1), Color::new(1, 0, 0)]);
    }

    #[test]
    fn builtin_catalog_is_nonempty_and_all_valid() {
        let catalog = builtin_palettes();
        assert_eq!(catalog.len(), 20);
        for (name, palette) in &catalog {
            assert!(!palette.is_empty(), "palette {name} must be non-empty");
        }
    }

    #[test]
    fn builtin_catalog_includes_candle_colors() {
        let catalog = builtin_palettes();
        assert_eq!(catalog.get("Candle Colors").expect("must include Candle Colors"), &candle_colors());
    }
}
