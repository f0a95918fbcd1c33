//! The Animation Runtime: hosts a single running Effect Instance on a
//! dedicated worker thread, decoupling kernel tick rate from the hardware
//! commit rate.
//!
//! Grounded in spec.md §4.3 and modeled on the teacher's worker-thread
//! lifecycle (`crates/04-services/audio/src/lib.rs`'s start/stop pair).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex as PLMutex;

use crate::buffer::{LedStrip, PixelBuffer};
use crate::kernels::Kernel;

const COMMIT_INTERVAL: Duration = Duration::from_micros(16_667);

/// Drives a single [`Kernel`] on its own thread until stopped.
pub struct AnimationRuntime {
    handle: Mutex<Option<JoinHandle<()>>>,
    stop_flag: Arc<AtomicBool>,
    running: AtomicBool,
}

impl Default for AnimationRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl AnimationRuntime {
    pub fn new() -> Self {
        Self {
            handle: Mutex::new(None),
            stop_flag: Arc::new(AtomicBool::new(false)),
            running: AtomicBool::new(false),
        }
    }

    /// Whether a kernel is currently running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Spawns the worker driving `kernel`. No-op if already running —
    /// callers must `stop()` first (the Dispatcher's teardown sequence
    /// guarantees this).
    pub fn start(
        &self,
        mut kernel: Box<dyn Kernel>,
        buffer: Arc<PLMutex<PixelBuffer>>,
        strip: Arc<PLMutex<Box<dyn LedStrip>>>,
    ) {
        if self.is_running() {
            log::warn!("AnimationRuntime::start called while already running; ignoring");
            return;
        }
        self.stop_flag.store(false, Ordering::Release);
        let stop_flag = self.stop_flag.clone();
        self.running.store(true, Ordering::Release);

        let join = thread::spawn(move || {
            let mut last_tick = Instant::now();
            let mut last_commit = Instant::now();

            loop {
                if stop_flag.load(Ordering::Acquire) {
                    break;
                }

                let now = Instant::now();
                let period = kernel.effective_period();

                if now.saturating_duration_since(last_tick) >= period {
                    let tick_start = Instant::now();
                    {
                        let mut buf = buffer.lock();
                        kernel.tick(&mut buf);
                    }
                    let elapsed = tick_start.elapsed();
                    if elapsed > period {
                        log::warn!("kernel tick exceeded its frame budget: {elapsed:?} > {period:?}");
                    }
                    last_tick = now;
                }

                let now = Instant::now();
                if now.saturating_duration_since(last_commit) >= COMMIT_INTERVAL {
                    let buf = buffer.lock();
                    let mut strip = strip.lock();
                    buf.commit(&mut **strip);
                    last_commit = now;
                }

                if stop_flag.load(Ordering::Acquire) {
                    break;
                }

                let next_tick = last_tick + period;
                let next_commit = last_commit + COMMIT_INTERVAL;
                let deadline = next_tick.min(next_commit);
                let sleep_for = deadline.saturating_duration_since(Instant::now());
                if sleep_for > Duration::ZERO {
                    thread::sleep(sleep_for.min(Duration::from_millis(20)));
                }
            }
        });

        *self.handle.lock().expect("runtime handle mutex poisoned") = Some(join);
    }

    /// Signals the worker, joins it, and releases the instance. Blocks until
    /// the worker exits. No-op if nothing is running.
    pub fn stop(&self) {
        self.stop_flag.store(true, Ordering::Release);
        if let Some(handle) = self.handle.lock().expect("runtime handle mutex poisoned").take() {
            let _ = handle.join();
        }
        self.running.store(false, Ordering::Release);
    }
}

impl Drop for AnimationRuntime {
    fn drop(&mut self) {
        debug_assert!(!self.is_running(), "AnimationRuntime dropped while still running; call stop() first");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::RecordingStrip;
    use crate::color::Color;
    use crate::kernels::{construct, EffectId, EffectParams};
    use crate::palette::default_color_scheme;

    #[test]
    fn start_then_stop_leaves_no_worker_running() {
        let runtime = AnimationRuntime::new();
        let mut seed_buffer = PixelBuffer::new(4);
        let kernel = construct(
            EffectId::Blink,
            4,
            &mut seed_buffer,
            EffectParams::new(default_color_scheme(), 8.0),
        )
        .unwrap();
        let buffer = Arc::new(PLMutex::new(seed_buffer));
        let strip: Arc<PLMutex<Box<dyn LedStrip>>> = Arc::new(PLMutex::new(Box::new(RecordingStrip::new(4))));

        runtime.start(kernel, buffer.clone(), strip.clone());
        assert!(runtime.is_running());
        thread::sleep(Duration::from_millis(50));
        runtime.stop();
        assert!(!runtime.is_running());

        let strip_guard = strip.lock();
        let _ = strip_guard;
        let buf = buffer.lock();
        for i in 0..buf.len() {
            let c = buf.get(i).unwrap();
            assert!(matches!(c, Color { .. }));
        }
    }
}
