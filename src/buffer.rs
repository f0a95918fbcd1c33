//! The fixed-length pixel buffer and the hardware adapter trait it commits to.

use std::ops::Range;

use crate::color::Color;
use crate::error::LumenError;

/// Collaborator interface for the physical LED strip.
///
/// Implementors are the sole code path permitted to touch hardware; `commit`
/// must push the buffer contents to the strip as a single atomic write. A
/// commit failure is treated as unrecoverable at the adapter layer (spec.md
/// §7) — implementations should panic or abort rather than return from
/// `commit` in a half-written state.
pub trait LedStrip: Send {
    /// Number of addressable LEDs on the strip.
    fn len(&self) -> usize;

    /// Whether the strip has zero LEDs (never true for a real deployment).
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pushes the current buffer contents to the hardware.
    fn commit(&mut self, pixels: &[Color]);
}

/// A no-op strip used in tests and headless operation; records the last
/// committed frame instead of writing to hardware.
#[derive(Default)]
pub struct RecordingStrip {
    len: usize,
    pub commits: Vec<Vec<Color>>,
}

impl RecordingStrip {
    /// Creates a recording strip with `len` pixels.
    pub fn new(len: usize) -> Self {
        Self {
            len,
            commits: Vec::new(),
        }
    }

    /// Returns the most recently committed frame, if any.
    pub fn last_commit(&self) -> Option<&[Color]> {
        self.commits.last().map(|v| v.as_slice())
    }
}

impl LedStrip for RecordingStrip {
    fn len(&self) -> usize {
        self.len
    }

    fn commit(&mut self, pixels: &[Color]) {
        self.commits.push(pixels.to_vec());
    }
}

/// Fixed-length linear RGB frame buffer.
///
/// Length is fixed at construction; writes beyond the end are errors rather
/// than panics, since they arrive over the wire from untrusted clients.
pub struct PixelBuffer {
    pixels: Vec<Color>,
}

impl PixelBuffer {
    /// Creates a buffer of `len` black pixels.
    pub fn new(len: usize) -> Self {
        Self {
            pixels: vec![Color::BLACK; len],
        }
    }

    /// Number of pixels in the buffer. Fixed for the buffer's lifetime.
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    /// Whether the buffer has zero pixels.
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Reads the color at `i`.
    pub fn get(&self, i: usize) -> Option<Color> {
        self.pixels.get(i).copied()
    }

    /// Writes `color` at index `i`.
    pub fn set(&mut self, i: usize, color: Color) -> Result<(), LumenError> {
        let slot = self
            .pixels
            .get_mut(i)
            .ok_or_else(|| LumenError::InvalidParams(format!("pixel index {i} out of range")))?;
        *slot = color;
        Ok(())
    }

    /// Fills every pixel with `color`.
    pub fn fill(&mut self, color: Color) {
        self.pixels.fill(color);
    }

    /// Writes `colors` into `range`, erroring if the range exceeds the buffer.
    pub fn slice_assign(&mut self, range: Range<usize>, colors: &[Color]) -> Result<(), LumenError> {
        if range.end > self.pixels.len() || range.len() != colors.len() {
            return Err(LumenError::InvalidParams(format!(
                "slice_assign range {range:?} invalid for buffer of length {} and {} colors",
                self.pixels.len(),
                colors.len()
            )));
        }
        self.pixels[range].copy_from_slice(colors);
        Ok(())
    }

    /// Writes a palette cyclically across the full buffer: `palette[i mod len]`.
    pub fn fill_palette_cyclic(&mut self, palette: &crate::palette::Palette) {
        for (i, slot) in self.pixels.iter_mut().enumerate() {
            *slot = palette.at(i);
        }
    }

    /// Borrows the buffer contents.
    pub fn as_slice(&self) -> &[Color] {
        &self.pixels
    }

    /// Pushes the buffer to hardware via the given strip adapter.
    pub fn commit(&self, strip: &mut dyn LedStrip) {
        strip.commit(&self.pixels);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_out_of_range_is_error() {
        let mut buf = PixelBuffer::new(4);
        assert!(buf.set(4, Color::BLACK).is_err());
        assert!(buf.set(3, Color::new(1, 2, 3)).is_ok());
    }

    #[test]
    fn fill_sets_every_pixel() {
        let mut buf = PixelBuffer::new(3);
        buf.fill(Color::new(9, 9, 9));
        assert!(buf.as_slice().iter().all(|&c| c == Color::new(9, 9, 9)));
    }

    #[test]
    fn commit_pushes_current_contents_atomically() {
        let mut strip = RecordingStrip::new(2);
        let mut buf = PixelBuffer::new(2);
        buf.fill(Color::new(5, 5, 5));
        buf.commit(&mut strip);
        assert_eq!(strip.last_commit().unwrap(), &[Color::new(5, 5, 5); 2]);
    }

    #[test]
    fn single_pixel_buffer_is_well_formed() {
        let buf = PixelBuffer::new(1);
        assert_eq!(buf.len(), 1);
    }
}
