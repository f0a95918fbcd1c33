//! Collaborator interfaces the core consumes through narrow boundaries:
//! the audio output sink and the song library (spec.md §6). Both are
//! out-of-scope externals here — the real implementations are hardware- or
//! network-backed and live outside this crate.

use std::collections::BTreeMap;
use std::sync::Mutex;

/// Blocking audio output sink accepting interleaved int16 PCM.
pub trait AudioSink: Send {
    /// Writes one chunk of interleaved PCM, blocking on device backpressure.
    fn write(&mut self, pcm: &[i16]);

    /// Adjusts output gain, `0..=100`.
    fn set_volume(&mut self, volume: u8);

    /// Current output gain, `0..=100`.
    fn volume(&self) -> u8;
}

/// A sink that discards audio, used in headless/test operation.
pub struct SilentSink {
    volume: u8,
}

impl Default for SilentSink {
    fn default() -> Self {
        Self { volume: 50 }
    }
}

impl AudioSink for SilentSink {
    fn write(&mut self, _pcm: &[i16]) {}

    fn set_volume(&mut self, volume: u8) {
        self.volume = volume.min(100);
    }

    fn volume(&self) -> u8 {
        self.volume
    }
}

/// Metadata for one downloaded song, matching `{id: {title, artist, album, file}}`.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct SongMetadata {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub file: String,
}

/// The song scraper/downloader collaborator (spec.md §6). Out of scope for
/// the core; this trait keeps `get_songs`/`download_song` dispatchable
/// without depending on network or filesystem machinery.
pub trait SongLibrary: Send {
    fn list(&self) -> BTreeMap<String, SongMetadata>;
    fn download(&self, url: &str, title: &str, artist: &str) -> Result<SongMetadata, String>;
}

/// Process-local in-memory library used in tests and standalone operation.
#[derive(Default)]
pub struct InMemorySongLibrary {
    songs: Mutex<BTreeMap<String, SongMetadata>>,
}

impl SongLibrary for InMemorySongLibrary {
    fn list(&self) -> BTreeMap<String, SongMetadata> {
        self.songs.lock().expect("song library mutex poisoned").clone()
    }

    fn download(&self, url: &str, title: &str, artist: &str) -> Result<SongMetadata, String> {
        let metadata = SongMetadata {
            title: title.to_string(),
            artist: artist.to_string(),
            album: String::new(),
            file: format!("{title}.m4a"),
        };
        let id = format!("{artist}-{title}");
        self.songs
            .lock()
            .expect("song library mutex poisoned")
            .insert(id, metadata.clone());
        log::info!("recorded song download request for {url}");
        Ok(metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_library_roundtrips_a_download() {
        let lib = InMemorySongLibrary::default();
        lib.download("https://example.invalid/song", "Carol of the Bells", "Traditional").unwrap();
        let songs = lib.list();
        assert_eq!(songs.len(), 1);
        let entry = songs.values().next().unwrap();
        assert_eq!(entry.title, "Carol of the Bells");
    }

    #[test]
    fn silent_sink_clamps_volume() {
        let mut sink = SilentSink::default();
        sink.set_volume(250);
        assert_eq!(sink.volume(), 100);
    }
}
