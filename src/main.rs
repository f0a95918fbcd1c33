//! Entry point: wires the configuration, hardware/song adapters, and the
//! Dispatcher/Session Server pair, then runs the accept loop forever.

use std::sync::Arc;

use lumenctl::adapters::{InMemorySongLibrary, SilentSink};
use lumenctl::buffer::LedStrip;
use lumenctl::color::Color;
use lumenctl::config::Config;
use lumenctl::dispatcher::Dispatcher;
use lumenctl::server::SessionServer;

/// A strip adapter that logs frame commits instead of touching hardware.
/// Swap in a real hardware adapter (e.g. over SPI/PWM) at the same seam.
struct LoggingStrip {
    pixels: Vec<Color>,
}

impl LoggingStrip {
    fn new(len: usize) -> Self {
        Self {
            pixels: vec![Color::BLACK; len],
        }
    }
}

impl LedStrip for LoggingStrip {
    fn len(&self) -> usize {
        self.pixels.len()
    }

    fn commit(&mut self, pixels: &[Color]) {
        self.pixels.copy_from_slice(pixels);
        log::debug!("committed {} pixels", self.pixels.len());
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = Config::default();
    log::info!(
        "starting lumenctl: {} LEDs, control port {}, audio port {}",
        config.led_count,
        config.control_port,
        config.audio_port
    );

    let strip = Box::new(LoggingStrip::new(config.led_count));
    let sink = Box::new(SilentSink::default());
    let songs = Box::new(InMemorySongLibrary::default());

    let dispatcher = Arc::new(Dispatcher::new(config.led_count, strip, config.audio_port, sink, songs)?);

    let server = SessionServer::bind(config.control_port, dispatcher, config.max_clients)?;
    server.run()?;
    Ok(())
}
