//! The Command Dispatcher: routes decoded requests to the render-state
//! transitions they describe, holding the ownership mutex that serializes
//! them (spec.md §4.6–§4.7).
//!
//! Method names, params, and defaults are grounded in
//! `original_source/server/json_rpc.py`.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use parking_lot::Mutex as PLMutex;
use serde::Deserialize;
use serde_json::Value;

use crate::adapters::{AudioSink, SongLibrary};
use crate::audio::AudioPipeline;
use crate::buffer::{LedStrip, PixelBuffer};
use crate::color::{Color, ColorWire};
use crate::error::LumenError;
use crate::kernels::{candle_default, construct, EffectId, EffectParams};
use crate::palette::{builtin_palettes, default_color_scheme, default_palette, Palette};
use crate::playlist::{Playlist, PlaylistStep};
use crate::protocol::Request;
use crate::runtime::AnimationRuntime;

/// The process-wide "current owner" of the Pixel Buffer (spec.md §3).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Owner {
    None,
    SolidFill,
    Animation,
    Playlist,
    AudioReactive,
}

pub struct Dispatcher {
    buffer: Arc<PLMutex<PixelBuffer>>,
    strip: Arc<PLMutex<Box<dyn LedStrip>>>,
    runtime: AnimationRuntime,
    playlist: Playlist,
    audio: Option<AudioPipeline>,
    songs: Box<dyn SongLibrary>,
    pixel_count: usize,
    /// Serializes ownership transitions; guards `owner` itself.
    owner: Mutex<Owner>,
}

impl Dispatcher {
    pub fn new(
        pixel_count: usize,
        strip: Box<dyn LedStrip>,
        audio_port: u16,
        audio_sink: Box<dyn AudioSink>,
        songs: Box<dyn SongLibrary>,
    ) -> anyhow::Result<Self> {
        let buffer = Arc::new(PLMutex::new(PixelBuffer::new(pixel_count)));
        let strip = Arc::new(PLMutex::new(strip));
        let audio = AudioPipeline::spawn(audio_port, pixel_count, audio_sink, buffer.clone(), strip.clone())?;

        Ok(Self {
            buffer,
            strip,
            runtime: AnimationRuntime::new(),
            playlist: Playlist::new(),
            audio: Some(audio),
            songs,
            pixel_count,
            owner: Mutex::new(Owner::None),
        })
    }

    /// Tears down the previous owner and routes `request`, returning a JSON
    /// result value for a success response. Validation/routing errors never
    /// trigger a teardown (spec.md §7).
    pub fn dispatch(&self, request: Request) -> Result<Value, LumenError> {
        match request.method.as_str() {
            "set_light" => self.set_light(request.params),
            "set_pallete" => self.set_pallete(request.params),
            "trigger_effect" => self.trigger_effect(request.params),
            "start_animation_playlist" => self.start_animation_playlist(request.params),
            "stop_animation_playlist" => self.stop_animation_playlist(),
            "audio_sync_is_enabled" => self.audio_sync_is_enabled(request.params),
            "set_volume" => self.set_volume(request.params),
            "get_volume" => self.get_volume(),
            "get_palettes" => self.get_palettes(),
            "get_effects" => self.get_effects(),
            "get_songs" => self.get_songs(),
            "download_song" => self.download_song(request.params),
            _ => Err(LumenError::MethodNotFound),
        }
    }

    /// Stops the Animation Runtime and Playlist if running and marks
    /// Audio-Reactive inactive; the audio listener itself is never torn
    /// down, since it's persistent (spec.md §4.7), only disabled so it stops
    /// writing into the shared buffer/strip.
    fn teardown(&self, owner_guard: &mut Owner) {
        if self.runtime.is_running() {
            self.runtime.stop();
        }
        if self.playlist.is_running() {
            self.playlist.stop();
        }
        self.audio.as_ref().expect("audio pipeline always present after construction").set_enabled(false);
        *owner_guard = Owner::None;
    }

    fn set_light(&self, params: Value) -> Result<Value, LumenError> {
        #[derive(Deserialize)]
        struct Params {
            color: ColorWire,
        }
        let params: Params = serde_json::from_value(params)
            .map_err(|_| LumenError::InvalidParams("missing or invalid `color`".into()))?;
        let color = params.color.into_color().map_err(LumenError::InvalidParams)?;

        let mut owner = self.owner.lock().expect("ownership mutex poisoned");
        self.teardown(&mut owner);
        self.buffer.lock().fill(color);
        self.commit_once();
        *owner = Owner::SolidFill;
        Ok(Value::Bool(true))
    }

    fn set_pallete(&self, params: Value) -> Result<Value, LumenError> {
        #[derive(Deserialize)]
        struct Params {
            pallete: Option<Vec<ColorWire>>,
        }
        let params: Params = serde_json::from_value(params)
            .map_err(|_| LumenError::InvalidParams("missing or invalid `pallete`".into()))?;
        let palette = match params.pallete {
            None => default_palette(),
            Some(colors) => Palette::from_wire(colors)?,
        };

        let mut owner = self.owner.lock().expect("ownership mutex poisoned");
        self.teardown(&mut owner);
        self.buffer.lock().fill_palette_cyclic(&palette);
        self.commit_once();
        *owner = Owner::SolidFill;
        Ok(Value::Bool(true))
    }

    fn trigger_effect(&self, params: Value) -> Result<Value, LumenError> {
        #[derive(Deserialize)]
        struct Params {
            animation_id: u8,
            color_scheme: Option<Vec<ColorWire>>,
            speed: Option<f32>,
        }
        let params: Params = serde_json::from_value(params)
            .map_err(|_| LumenError::InvalidParams("missing or invalid `animation_id`".into()))?;
        let id = EffectId::from_u8(params.animation_id)
            .ok_or_else(|| LumenError::InvalidParams(format!("unknown animation id {}", params.animation_id)))?;

        let palette = match params.color_scheme {
            None => candle_default(id),
            Some(colors) => Palette::from_wire(colors)?,
        };
        let speed = params.speed.unwrap_or(1.0);
        let effect_params = EffectParams::new(palette, speed);

        let mut owner = self.owner.lock().expect("ownership mutex poisoned");
        self.teardown(&mut owner);

        let mut seed_buffer = PixelBuffer::new(self.pixel_count);
        let kernel = construct(id, self.pixel_count, &mut seed_buffer, effect_params)?;
        *self.buffer.lock() = seed_buffer;
        self.runtime.start(kernel, self.buffer.clone(), self.strip.clone());
        *owner = Owner::Animation;
        Ok(Value::Bool(true))
    }

    fn start_animation_playlist(&self, params: Value) -> Result<Value, LumenError> {
        #[derive(Deserialize)]
        struct StepWire {
            animation_id: u8,
            speed: Option<f32>,
        }
        #[derive(Deserialize)]
        struct Params {
            animations: Vec<StepWire>,
            #[serde(default)]
            color_schemes: Vec<Vec<ColorWire>>,
            time_delay: Option<u64>,
        }
        let params: Params = serde_json::from_value(params)
            .map_err(|_| LumenError::InvalidParams("missing or invalid playlist params".into()))?;

        let mut steps = Vec::with_capacity(params.animations.len());
        for step in params.animations {
            let id = EffectId::from_u8(step.animation_id)
                .ok_or_else(|| LumenError::InvalidParams(format!("unknown animation id {}", step.animation_id)))?;
            steps.push(PlaylistStep {
                effect_id: id,
                speed: step.speed.unwrap_or(1.0),
            });
        }

        let mut palettes = Vec::with_capacity(params.color_schemes.len());
        for scheme in params.color_schemes {
            palettes.push(Palette::from_wire(scheme)?);
        }
        if palettes.is_empty() {
            palettes.push(default_color_scheme());
        }

        let dwell = Duration::from_secs(params.time_delay.unwrap_or(60));

        let mut owner = self.owner.lock().expect("ownership mutex poisoned");
        self.teardown(&mut owner);
        self.playlist.start(
            steps,
            palettes,
            dwell,
            self.pixel_count,
            self.buffer.clone(),
            self.strip.clone(),
        )?;
        *owner = Owner::Playlist;
        Ok(Value::Bool(true))
    }

    fn stop_animation_playlist(&self) -> Result<Value, LumenError> {
        let mut owner = self.owner.lock().expect("ownership mutex poisoned");
        if !self.playlist.is_running() {
            return Err(LumenError::NoPlaylistPlaying);
        }
        self.playlist.stop();
        self.buffer.lock().fill_palette_cyclic(&default_palette());
        self.commit_once();
        *owner = Owner::SolidFill;
        Ok(Value::Bool(true))
    }

    fn audio_sync_is_enabled(&self, params: Value) -> Result<Value, LumenError> {
        #[derive(Deserialize)]
        struct Params {
            is_enabled: bool,
        }
        let params: Params = serde_json::from_value(params)
            .map_err(|_| LumenError::InvalidParams("missing or invalid `is_enabled`".into()))?;

        let mut owner = self.owner.lock().expect("ownership mutex poisoned");
        if params.is_enabled {
            self.teardown(&mut owner);
            self.audio.as_ref().expect("audio pipeline always present after construction").set_enabled(true);
            *owner = Owner::AudioReactive;
        } else {
            self.audio.as_ref().expect("audio pipeline always present after construction").set_enabled(false);
            *owner = Owner::None;
        }
        Ok(Value::Bool(true))
    }

    fn set_volume(&self, params: Value) -> Result<Value, LumenError> {
        #[derive(Deserialize)]
        struct Params {
            volume: u8,
        }
        let params: Params = serde_json::from_value(params)
            .map_err(|_| LumenError::InvalidParams("missing or invalid `volume`".into()))?;
        if params.volume > 100 {
            return Err(LumenError::InvalidParams("volume must be 0..=100".into()));
        }
        self.audio
            .as_ref()
            .expect("audio pipeline always present after construction")
            .set_volume(params.volume);
        Ok(Value::Bool(true))
    }

    fn get_volume(&self) -> Result<Value, LumenError> {
        let volume = self.audio.as_ref().expect("audio pipeline always present after construction").volume();
        Ok(serde_json::json!({ "volume": volume }))
    }

    fn get_palettes(&self) -> Result<Value, LumenError> {
        Ok(serde_json::to_value(builtin_palettes()).expect("palette catalog must serialize"))
    }

    fn get_effects(&self) -> Result<Value, LumenError> {
        Ok(serde_json::to_value(crate::kernels::catalog()).expect("effect catalog must serialize"))
    }

    fn get_songs(&self) -> Result<Value, LumenError> {
        Ok(serde_json::to_value(self.songs.list()).expect("song catalog must serialize"))
    }

    fn download_song(&self, params: Value) -> Result<Value, LumenError> {
        #[derive(Deserialize)]
        struct Params {
            url: String,
            title: String,
            artist: String,
        }
        let params: Params = serde_json::from_value(params)
            .map_err(|_| LumenError::InvalidParams("missing or invalid song download params".into()))?;
        self.songs
            .download(&params.url, &params.title, &params.artist)
            .map_err(LumenError::InvalidParams)?;
        Ok(Value::Bool(true))
    }

    fn commit_once(&self) {
        let buf = self.buffer.lock();
        let mut strip = self.strip.lock();
        buf.commit(&mut **strip);
    }

    #[cfg(test)]
    pub(crate) fn current_owner(&self) -> Owner {
        *self.owner.lock().expect("ownership mutex poisoned")
    }

    #[cfg(test)]
    pub(crate) fn buffer_snapshot(&self) -> Vec<Color> {
        self.buffer.lock().as_slice().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{InMemorySongLibrary, SilentSink};
    use crate::buffer::RecordingStrip;

    fn test_dispatcher(pixel_count: usize) -> Dispatcher {
        Dispatcher::new(
            pixel_count,
            Box::new(RecordingStrip::new(pixel_count)),
            0,
            Box::new(SilentSink::default()),
            Box::new(InMemorySongLibrary::default()),
        )
        .expect("dispatcher construction must succeed in tests")
    }

    #[test]
    fn set_light_fills_buffer_and_becomes_solid_fill_owner() {
        let d = test_dispatcher(4);
        let req = Request {
            method: "set_light".into(),
            params: serde_json::json!({"color": "0xFF0000"}),
        };
        let result = d.dispatch(req).unwrap();
        assert_eq!(result, Value::Bool(true));
        assert_eq!(d.current_owner(), Owner::SolidFill);
        assert!(d.buffer_snapshot().iter().all(|&c| c == Color::new(255, 0, 0)));
    }

    #[test]
    fn unknown_method_is_method_not_found() {
        let d = test_dispatcher(4);
        let req = Request {
            method: "nope".into(),
            params: serde_json::json!({}),
        };
        let err = d.dispatch(req).unwrap_err();
        assert!(matches!(err, LumenError::MethodNotFound));
    }

    #[test]
    fn stop_playlist_when_idle_is_no_playlist_playing() {
        let d = test_dispatcher(4);
        let err = d.stop_animation_playlist().unwrap_err();
        assert!(matches!(err, LumenError::NoPlaylistPlaying));
    }

    #[test]
    fn trigger_effect_with_unknown_id_is_invalid_params() {
        let d = test_dispatcher(4);
        let req = Request {
            method: "trigger_effect".into(),
            params: serde_json::json!({"animation_id": 200}),
        };
        let err = d.dispatch(req).unwrap_err();
        assert!(matches!(err, LumenError::InvalidParams(_)));
    }

    #[test]
    fn trigger_effect_then_set_light_tears_down_the_runtime() {
        let d = test_dispatcher(4);
        let req = Request {
            method: "trigger_effect".into(),
            params: serde_json::json!({"animation_id": 3, "speed": 8.0}),
        };
        d.dispatch(req).unwrap();
        assert_eq!(d.current_owner(), Owner::Animation);

        let req = Request {
            method: "set_light".into(),
            params: serde_json::json!({"color": "0x00FF00"}),
        };
        d.dispatch(req).unwrap();
        assert_eq!(d.current_owner(), Owner::SolidFill);
        assert!(!d.runtime.is_running());
    }

    #[test]
    fn enabling_audio_tears_down_a_running_animation() {
        let d = test_dispatcher(4);
        let req = Request {
            method: "trigger_effect".into(),
            params: serde_json::json!({"animation_id": 3, "speed": 8.0}),
        };
        d.dispatch(req).unwrap();
        assert_eq!(d.current_owner(), Owner::Animation);

        let req = Request {
            method: "audio_sync_is_enabled".into(),
            params: serde_json::json!({"is_enabled": true}),
        };
        d.dispatch(req).unwrap();
        assert_eq!(d.current_owner(), Owner::AudioReactive);
        assert!(!d.runtime.is_running());
        assert!(d.audio.as_ref().unwrap().is_enabled());
    }

    #[test]
    fn installing_an_effect_disables_a_running_audio_sync() {
        let d = test_dispatcher(4);
        let req = Request {
            method: "audio_sync_is_enabled".into(),
            params: serde_json::json!({"is_enabled": true}),
        };
        d.dispatch(req).unwrap();
        assert_eq!(d.current_owner(), Owner::AudioReactive);
        assert!(d.audio.as_ref().unwrap().is_enabled());

        let req = Request {
            method: "set_light".into(),
            params: serde_json::json!({"color": "0x00FF00"}),
        };
        d.dispatch(req).unwrap();
        assert_eq!(d.current_owner(), Owner::SolidFill);
        assert!(!d.audio.as_ref().unwrap().is_enabled());
    }
}
