//! Owns the audio ingress TCP listener, the audio sink, the FFT/band
//! workers, and the Pixel Buffer while audio-reactive output is active.
//!
//! Grounded in `original_source/server/tcp_audio_sync.py::AudioReceiver`;
//! the bounded-queue drop-newest discipline (spec.md §4.4) is implemented
//! with `crossbeam_channel::bounded` + `try_send`, per SPEC_FULL.md §5.

use std::io::Read;
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::Mutex as PLMutex;

use crate::adapters::AudioSink;
use crate::audio::{BandMapper, FftAnalyzer, AUDIO_CHUNK, AUDIO_CHUNK_BYTES, CHANNELS};
use crate::buffer::{LedStrip, PixelBuffer};
use crate::color::Color;
use crate::palette::{default_color_scheme, Palette};

const PCM_QUEUE_CAPACITY: usize = 256;
const LED_QUEUE_CAPACITY: usize = 2;
const QUEUE_POLL_TIMEOUT: Duration = Duration::from_millis(100);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Connected,
    Active,
}

struct SharedState {
    palette: Palette,
    enabled: bool,
    state: ConnectionState,
    volume: u8,
}

/// Owns the audio ingress listener and its four persistent workers
/// (connection manager, network/parser, audio+FFT, LED).
pub struct AudioPipeline {
    shared: Arc<Mutex<SharedState>>,
    running: Arc<AtomicBool>,
    pixel_count: usize,
    buffer: Arc<PLMutex<PixelBuffer>>,
    strip: Arc<PLMutex<Box<dyn LedStrip>>>,
}

impl AudioPipeline {
    /// Binds the ingress listener and starts the persistent worker set.
    /// Workers run for the lifetime of the process; `set_enabled` toggles
    /// whether they actually drive the strip.
    pub fn spawn(
        port: u16,
        pixel_count: usize,
        sink: Box<dyn AudioSink>,
        buffer: Arc<PLMutex<PixelBuffer>>,
        strip: Arc<PLMutex<Box<dyn LedStrip>>>,
    ) -> std::io::Result<Self> {
        let listener = TcpListener::bind(("0.0.0.0", port))?;
        let shared = Arc::new(Mutex::new(SharedState {
            palette: default_color_scheme(),
            enabled: false,
            state: ConnectionState::Idle,
            volume: sink.volume(),
        }));
        let running = Arc::new(AtomicBool::new(true));

        let (pcm_tx, pcm_rx) = bounded::<Vec<i16>>(PCM_QUEUE_CAPACITY);
        let (led_tx, led_rx) = bounded::<Vec<Color>>(LED_QUEUE_CAPACITY);
        let (conn_tx, conn_rx) = bounded::<TcpStream>(1);

        spawn_connection_acceptor(listener, running.clone(), conn_tx);
        spawn_connection_handler(running.clone(), shared.clone(), pcm_tx, conn_rx);
        spawn_audio_fft_worker(running.clone(), shared.clone(), sink, pcm_rx, led_tx, pixel_count);
        spawn_led_worker(running.clone(), led_rx, buffer.clone(), strip.clone());

        Ok(Self {
            shared,
            running,
            pixel_count,
            buffer,
            strip,
        })
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.lock().expect("audio pipeline mutex poisoned").state
    }

    pub fn is_enabled(&self) -> bool {
        self.shared.lock().expect("audio pipeline mutex poisoned").enabled
    }

    /// Safe to call at any time; see spec.md §4.4. Disabling commits an
    /// all-black frame immediately rather than waiting for the FFT worker's
    /// next chunk, which may never arrive if no PCM source is connected.
    pub fn set_enabled(&self, enabled: bool) {
        let mut guard = self.shared.lock().expect("audio pipeline mutex poisoned");
        guard.enabled = enabled;
        drop(guard);
        log::info!("audio-reactive output {}", if enabled { "enabled" } else { "disabled" });

        if !enabled {
            let mut buf = self.buffer.lock();
            buf.fill(Color::BLACK);
            let mut strip = self.strip.lock();
            buf.commit(&mut **strip);
        }
    }

    /// Atomically replaces the palette used by the next LED frame.
    pub fn set_palette(&self, palette: Palette) {
        self.shared.lock().expect("audio pipeline mutex poisoned").palette = palette;
    }

    /// Requests a sink gain change, applied by the audio worker on its next chunk.
    pub fn set_volume(&self, volume: u8) {
        self.shared.lock().expect("audio pipeline mutex poisoned").volume = volume.min(100);
    }

    pub fn volume(&self) -> u8 {
        self.shared.lock().expect("audio pipeline mutex poisoned").volume
    }

    pub fn pixel_count(&self) -> usize {
        self.pixel_count
    }
}

impl Drop for AudioPipeline {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

/// The connection manager: accepts inbound PCM sources and hands each one
/// off to the network/parser worker over a channel, so `accept()` is never
/// blocked behind an in-progress connection's read loop.
fn spawn_connection_acceptor(listener: TcpListener, running: Arc<AtomicBool>, conn_tx: Sender<TcpStream>) {
    listener
        .set_nonblocking(true)
        .expect("audio listener must support non-blocking mode");
    thread::spawn(move || {
        while running.load(Ordering::Acquire) {
            match listener.accept() {
                Ok((stream, addr)) => {
                    if let Err(TrySendError::Full(_)) = conn_tx.try_send(stream) {
                        log::debug!("audio ingress already has a connection queued; rejecting {addr}");
                    }
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(QUEUE_POLL_TIMEOUT);
                }
                Err(e) => {
                    log::warn!("audio ingress accept error: {e}");
                    thread::sleep(QUEUE_POLL_TIMEOUT);
                }
            }
        }
    });
}

/// The network/parser worker: pulls accepted streams off the connection
/// manager's channel and runs each one's read/parse loop to completion.
fn spawn_connection_handler(
    running: Arc<AtomicBool>,
    shared: Arc<Mutex<SharedState>>,
    pcm_tx: Sender<Vec<i16>>,
    conn_rx: Receiver<TcpStream>,
) {
    thread::spawn(move || {
        while running.load(Ordering::Acquire) {
            match conn_rx.recv_timeout(QUEUE_POLL_TIMEOUT) {
                Ok(stream) => {
                    transition(&shared, ConnectionState::Connected);
                    handle_connection(stream, &running, &shared, &pcm_tx);
                    transition(&shared, ConnectionState::Idle);
                }
                Err(crossbeam_channel::RecvTimeoutError::Timeout) => continue,
                Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
            }
        }
    });
}

fn transition(shared: &Arc<Mutex<SharedState>>, state: ConnectionState) {
    let mut guard = shared.lock().expect("audio pipeline mutex poisoned");
    guard.state = state;
}

fn handle_connection(
    mut stream: TcpStream,
    running: &Arc<AtomicBool>,
    shared: &Arc<Mutex<SharedState>>,
    pcm_tx: &Sender<Vec<i16>>,
) {
    stream
        .set_read_timeout(Some(QUEUE_POLL_TIMEOUT))
        .expect("audio stream must support read timeouts");
    let mut carry = Vec::new();
    let mut recv_buf = vec![0u8; 8192];

    while running.load(Ordering::Acquire) {
        match stream.read(&mut recv_buf) {
            Ok(0) => break,
            Ok(n) => {
                carry.extend_from_slice(&recv_buf[..n]);
                while carry.len() >= AUDIO_CHUNK_BYTES {
                    let chunk: Vec<u8> = carry.drain(0..AUDIO_CHUNK_BYTES).collect();
                    let pcm: Vec<i16> = chunk
                        .chunks_exact(2)
                        .map(|b| i16::from_le_bytes([b[0], b[1]]))
                        .collect();
                    if let Err(TrySendError::Full(_)) = pcm_tx.try_send(pcm) {
                        log::debug!("PCM queue full, dropping newest chunk");
                    }
                }
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock || e.kind() == std::io::ErrorKind::TimedOut => {
                continue;
            }
            Err(e) => {
                log::warn!("audio ingress read error: {e}");
                break;
            }
        }
    }

    let mut guard = shared.lock().expect("audio pipeline mutex poisoned");
    guard.state = ConnectionState::Idle;
}

#[allow(clippy::too_many_arguments)]
fn spawn_audio_fft_worker(
    running: Arc<AtomicBool>,
    shared: Arc<Mutex<SharedState>>,
    mut sink: Box<dyn AudioSink>,
    pcm_rx: Receiver<Vec<i16>>,
    led_tx: Sender<Vec<Color>>,
    pixel_count: usize,
) {
    thread::spawn(move || {
        let mut fft = FftAnalyzer::new();
        let mapper = BandMapper::new(pixel_count);
        let mut last_state = ConnectionState::Idle;

        while running.load(Ordering::Acquire) {
            let current_state = shared.lock().expect("audio pipeline mutex poisoned").state;
            if current_state != last_state
                && matches!((last_state, current_state), (ConnectionState::Idle, ConnectionState::Connected) | (ConnectionState::Connected, ConnectionState::Idle))
            {
                fft.reset();
                while pcm_rx.try_recv().is_ok() {}
            }
            last_state = current_state;

            let pcm = match pcm_rx.recv_timeout(QUEUE_POLL_TIMEOUT) {
                Ok(pcm) => pcm,
                Err(_) => continue,
            };

            let (enabled, palette, volume) = {
                let guard = shared.lock().expect("audio pipeline mutex poisoned");
                (guard.enabled, guard.palette.clone(), guard.volume)
            };
            sink.set_volume(volume);

            if !enabled {
                let silence = vec![0i16; AUDIO_CHUNK * CHANNELS];
                sink.write(&silence);
                continue;
            }

            sink.write(&pcm);

            for sub in pcm.chunks(crate::audio::VIS_CHUNK * CHANNELS) {
                let mono = downmix_mono(sub);
                let mags = fft.analyze(&mono).to_vec();
                let colors = mapper.map(&mags, fft.max_mag(), &palette);
                if let Err(TrySendError::Full(_)) = led_tx.try_send(colors) {
                    log::debug!("LED queue full, dropping newest frame");
                }
            }
        }
    });
}

fn downmix_mono(interleaved: &[i16]) -> Vec<f32> {
    interleaved
        .chunks(CHANNELS)
        .map(|frame| {
            let sum: i32 = frame.iter().map(|&s| s as i32).sum();
            sum as f32 / frame.len().max(1) as f32
        })
        .collect()
}

fn spawn_led_worker(
    running: Arc<AtomicBool>,
    led_rx: Receiver<Vec<Color>>,
    buffer: Arc<PLMutex<PixelBuffer>>,
    strip: Arc<PLMutex<Box<dyn LedStrip>>>,
) {
    thread::spawn(move || {
        while running.load(Ordering::Acquire) {
            match led_rx.recv_timeout(QUEUE_POLL_TIMEOUT) {
                Ok(colors) => {
                    let mut buf = buffer.lock();
                    let len = colors.len().min(buf.len());
                    for (i, color) in colors.into_iter().take(len).enumerate() {
                        let _ = buf.set(i, color);
                    }
                    let mut strip = strip.lock();
                    buf.commit(&mut **strip);
                }
                Err(crossbeam_channel::RecvTimeoutError::Timeout) => continue,
                Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::RecordingStrip;

    #[test]
    fn disabling_blanks_the_strip_immediately() {
        let buffer = Arc::new(PLMutex::new(PixelBuffer::new(4)));
        buffer.lock().fill(Color::new(9, 9, 9));
        let strip: Arc<PLMutex<Box<dyn LedStrip>>> = Arc::new(PLMutex::new(Box::new(RecordingStrip::new(4))));
        let pipeline = AudioPipeline::spawn(0, 4, Box::new(crate::adapters::SilentSink::default()), buffer.clone(), strip)
            .expect("pipeline must spawn");
        assert!(!pipeline.is_enabled());
        pipeline.set_enabled(true);
        assert!(pipeline.is_enabled());
        // enabling alone must not touch the buffer; only a committed frame does.
        assert!(buffer.lock().as_slice().iter().all(|&c| c == Color::new(9, 9, 9)));

        pipeline.set_enabled(false);
        assert!(!pipeline.is_enabled());
        // no PCM source is connected, so only the synchronous blank in
        // `set_enabled` can be responsible for this — the FFT worker never runs.
        assert!(buffer.lock().as_slice().iter().all(|&c| c == Color::BLACK));
    }

    #[test]
    fn downmix_averages_channels() {
        let interleaved = [100i16, -100, 50, 50];
        let mono = downmix_mono(&interleaved);
        assert_eq!(mono, vec![0.0, 50.0]);
    }
}
