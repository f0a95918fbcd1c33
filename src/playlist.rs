//! The Playlist Scheduler: rotates through `{effect_id, speed}` pairs with
//! randomized, non-repeating palette selection and a dwell time.
//!
//! Grounded in `original_source/server/animation_playlist.py`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex as PLMutex;
use rand::Rng;

use crate::buffer::{LedStrip, PixelBuffer};
use crate::error::LumenError;
use crate::kernels::{construct, EffectId, EffectParams};
use crate::palette::Palette;
use crate::runtime::AnimationRuntime;

/// One step of the playlist's animation sequence.
#[derive(Clone, Debug)]
pub struct PlaylistStep {
    pub effect_id: EffectId,
    pub speed: f32,
}

pub struct Playlist {
    handle: Mutex<Option<JoinHandle<()>>>,
    stop_flag: Arc<AtomicBool>,
    running: AtomicBool,
}

impl Default for Playlist {
    fn default() -> Self {
        Self::new()
    }
}

impl Playlist {
    pub fn new() -> Self {
        Self {
            handle: Mutex::new(None),
            stop_flag: Arc::new(AtomicBool::new(false)),
            running: AtomicBool::new(false),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Starts the playlist worker. Returns an error if `steps` or `palettes`
    /// is empty, or any step's speed is non-positive.
    pub fn start(
        &self,
        steps: Vec<PlaylistStep>,
        palettes: Vec<Palette>,
        dwell: Duration,
        pixel_count: usize,
        buffer: Arc<PLMutex<PixelBuffer>>,
        strip: Arc<PLMutex<Box<dyn LedStrip>>>,
    ) -> Result<(), LumenError> {
        if steps.is_empty() {
            return Err(LumenError::InvalidParams("playlist must have at least one animation".into()));
        }
        if palettes.is_empty() {
            return Err(LumenError::InvalidParams("playlist must have at least one color scheme".into()));
        }

        self.stop_flag.store(false, Ordering::Release);
        let stop_flag = self.stop_flag.clone();
        self.running.store(true, Ordering::Release);

        let join = thread::spawn(move || {
            let runtime = AnimationRuntime::new();
            let mut previous_index: Option<usize> = None;

            'outer: loop {
                for step in &steps {
                    if stop_flag.load(Ordering::Acquire) {
                        break 'outer;
                    }
                    if runtime.is_running() {
                        runtime.stop();
                    }

                    let mut rng = rand::thread_rng();
                    let mut index = rng.gen_range(0..palettes.len());
                    if palettes.len() > 1 {
                        if let Some(prev) = previous_index {
                            if index == prev {
                                index = (index + 1) % palettes.len();
                            }
                        }
                    }
                    previous_index = Some(index);

                    let params = EffectParams::new(palettes[index].clone(), step.speed);
                    let mut seed_buffer = PixelBuffer::new(pixel_count);
                    let kernel = match construct(step.effect_id, pixel_count, &mut seed_buffer, params) {
                        Ok(k) => k,
                        Err(e) => {
                            log::warn!("playlist failed to construct effect {:?}: {e}", step.effect_id);
                            continue;
                        }
                    };
                    *buffer.lock() = seed_buffer;
                    runtime.start(kernel, buffer.clone(), strip.clone());

                    let waited = wait_with_stop(dwell, &stop_flag);
                    if !waited {
                        break 'outer;
                    }
                }
            }

            if runtime.is_running() {
                runtime.stop();
            }
        });

        *self.handle.lock().expect("playlist handle mutex poisoned") = Some(join);
        Ok(())
    }

    /// Stops the playlist worker, joining it before returning. No-op if
    /// nothing is running.
    pub fn stop(&self) {
        self.stop_flag.store(true, Ordering::Release);
        if let Some(handle) = self.handle.lock().expect("playlist handle mutex poisoned").take() {
            let _ = handle.join();
        }
        self.running.store(false, Ordering::Release);
    }
}

/// Sleeps for `dwell` in short slices, returning `false` early if `stop_flag`
/// is set (so stop latency is bounded regardless of dwell length).
fn wait_with_stop(dwell: Duration, stop_flag: &AtomicBool) -> bool {
    const SLICE: Duration = Duration::from_millis(50);
    let mut remaining = dwell;
    while remaining > Duration::ZERO {
        if stop_flag.load(Ordering::Acquire) {
            return false;
        }
        let nap = remaining.min(SLICE);
        thread::sleep(nap);
        remaining = remaining.saturating_sub(nap);
    }
    !stop_flag.load(Ordering::Acquire)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::RecordingStrip;
    use crate::palette::default_color_scheme;

    #[test]
    fn rejects_empty_steps() {
        let playlist = Playlist::new();
        let buffer = Arc::new(PLMutex::new(PixelBuffer::new(4)));
        let strip: Arc<PLMutex<Box<dyn LedStrip>>> = Arc::new(PLMutex::new(Box::new(RecordingStrip::new(4))));
        let err = playlist
            .start(vec![], vec![default_color_scheme()], Duration::from_millis(10), 4, buffer, strip)
            .unwrap_err();
        assert!(matches!(err, LumenError::InvalidParams(_)));
    }

    #[test]
    fn start_then_stop_leaves_no_worker_running() {
        let playlist = Playlist::new();
        let buffer = Arc::new(PLMutex::new(PixelBuffer::new(4)));
        let strip: Arc<PLMutex<Box<dyn LedStrip>>> = Arc::new(PLMutex::new(Box::new(RecordingStrip::new(4))));
        let steps = vec![
            PlaylistStep { effect_id: EffectId::Blink, speed: 4.0 },
            PlaylistStep { effect_id: EffectId::Cover, speed: 4.0 },
        ];
        let palettes = vec![default_color_scheme(), default_color_scheme()];
        playlist
            .start(steps, palettes, Duration::from_millis(30), 4, buffer, strip)
            .unwrap();
        assert!(playlist.is_running());
        thread::sleep(Duration::from_millis(60));
        playlist.stop();
        assert!(!playlist.is_running());
    }
}
