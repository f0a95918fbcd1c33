//! The audio-reactive pipeline: a TCP PCM sink, FFT analyzer, and
//! frequency-to-LED mapper producing frames in lockstep with the incoming
//! stream.
//!
//! Grounded in `original_source/server/tcp_audio_sync.py`.

mod bands;
mod fft;
pub mod pipeline;

pub use bands::BandMapper;
pub use fft::FftAnalyzer;
pub use pipeline::{AudioPipeline, ConnectionState};

pub const SAMPLE_RATE: u32 = 44_100;
pub const CHANNELS: usize = 2;
pub const AUDIO_CHUNK: usize = 4096;
pub const VIS_CHUNK: usize = 1024;
pub const AUDIO_CHUNK_BYTES: usize = AUDIO_CHUNK * CHANNELS * 2;
pub const MIN_FREQ_HZ: f64 = 30.0;
