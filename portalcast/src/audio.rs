use std::{collections::HashMap, fs, io::Cursor, path::Path, sync::Arc};

use anyhow::{anyhow, Context, Result};
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};

use crate::math::{clip_number, distance, Point, Range};

/// Distance beyond which positional sounds are silent.
pub const DEFAULT_AUDIBLE_RANGE: f64 = 2000.0;

/// Linear falloff: 1 at the listener, 0 at `range` and beyond.
pub fn attenuation(distance: f64, range: f64) -> f64 {
    if range <= 0.0 {
        return 0.0;
    }
    let (d, _) = clip_number(distance, Range::new(0.0, range));
    1.0 - d / range
}

struct SoundEffect {
    bytes: Arc<[u8]>,
    volume: f64,
}

/// Mixes named sound effects and a looping music track.
///
/// Sound data is held in memory and decoded on every play. Without an
/// output device the service still keeps its volume bookkeeping but plays
/// nothing.
pub struct AudioService {
    _stream: Option<OutputStream>,
    stream_handle: Option<OutputStreamHandle>,
    sounds: HashMap<String, SoundEffect>,
    music_tracks: HashMap<String, Arc<[u8]>>,
    music_sink: Option<Sink>,
    current_music: Option<String>,
    master_volume: f64,
    music_volume: f64,
    audible_range: f64,
    listener: Point,
}

impl AudioService {
    /// Open the default output device.
    ///
    /// If that fails the service is created silent and a warning is logged.
    pub fn new() -> Self {
        match OutputStream::try_default() {
            Ok((stream, stream_handle)) => Self::with_output(Some(stream), Some(stream_handle)),
            Err(e) => {
                log::warn!("Failed to initialize audio: {}. Audio will be unavailable.", e);
                Self::headless()
            }
        }
    }

    /// A service with no output device.
    pub fn headless() -> Self {
        Self::with_output(None, None)
    }

    fn with_output(stream: Option<OutputStream>, stream_handle: Option<OutputStreamHandle>) -> Self {
        Self {
            _stream: stream,
            stream_handle,
            sounds: HashMap::new(),
            music_tracks: HashMap::new(),
            music_sink: None,
            current_music: None,
            master_volume: 0.5,
            music_volume: 0.5,
            audible_range: DEFAULT_AUDIBLE_RANGE,
            listener: Point::ZERO,
        }
    }

    /// Check if audio is available and working.
    pub fn is_available(&self) -> bool {
        self.stream_handle.is_some()
    }

    pub fn set_audible_range(&mut self, range: f64) {
        self.audible_range = range;
    }

    /// Where positional sounds are heard from, usually the camera.
    pub fn set_listener_pos(&mut self, pos: Point) {
        self.listener = pos;
    }

    pub fn listener_pos(&self) -> Point {
        self.listener
    }

    /// Register a sound effect from a file.
    pub fn add_sound<P: AsRef<Path>>(&mut self, name: &str, path: P) -> Result<()> {
        let path = path.as_ref();
        let bytes = fs::read(path)
            .with_context(|| format!("Failed to open sound file {path:?}"))?;
        self.add_sound_from_bytes(name, bytes);
        Ok(())
    }

    /// Register a sound effect from encoded bytes (useful for embedded assets).
    pub fn add_sound_from_bytes(&mut self, name: &str, bytes: impl Into<Arc<[u8]>>) {
        self.sounds.insert(
            name.to_string(),
            SoundEffect {
                bytes: bytes.into(),
                volume: 1.0,
            },
        );
    }

    /// Per-sound volume, multiplied with the master volume on every play.
    pub fn set_sound_volume(&mut self, name: &str, volume: f64) {
        match self.sounds.get_mut(name) {
            Some(sound) => sound.volume = volume,
            None => log::warn!("No sound named '{name}'"),
        }
    }

    pub fn add_music_track<P: AsRef<Path>>(&mut self, name: &str, path: P) -> Result<()> {
        let path = path.as_ref();
        let bytes = fs::read(path)
            .with_context(|| format!("Failed to open music file {path:?}"))?;
        self.music_tracks.insert(name.to_string(), bytes.into());
        Ok(())
    }

    pub fn add_music_track_from_bytes(&mut self, name: &str, bytes: impl Into<Arc<[u8]>>) {
        self.music_tracks.insert(name.to_string(), bytes.into());
    }

    /// Volume `name` would play at, or `None` if there is no such sound.
    pub fn sound_volume(&self, name: &str) -> Option<f64> {
        self.sounds.get(name).map(|s| self.master_volume * s.volume)
    }

    /// Volume `name` would play at from `pos`.
    pub fn sound_volume_at(&self, name: &str, pos: Point) -> Option<f64> {
        let falloff = attenuation(distance(self.listener, pos), self.audible_range);
        self.sound_volume(name).map(|v| v * falloff)
    }

    /// Play a sound effect once. Several sounds can play at the same time.
    pub fn play_sound(&self, name: &str) -> Result<()> {
        match self.sound_volume(name) {
            Some(volume) => self.play_effect(name, volume),
            None => {
                log::warn!("No sound named '{name}'");
                Ok(())
            }
        }
    }

    /// Play a sound effect attenuated by its distance from the listener.
    pub fn play_sound_at_pos(&self, name: &str, pos: Point) -> Result<()> {
        match self.sound_volume_at(name, pos) {
            Some(volume) if volume > 0.0 => self.play_effect(name, volume),
            Some(_) => Ok(()),
            None => {
                log::warn!("No sound named '{name}'");
                Ok(())
            }
        }
    }

    fn play_effect(&self, name: &str, volume: f64) -> Result<()> {
        let (Some(stream_handle), Some(sound)) = (&self.stream_handle, self.sounds.get(name)) else {
            return Ok(());
        };

        let source = Decoder::new(Cursor::new(Arc::clone(&sound.bytes)))
            .map_err(|e| anyhow!("Failed to decode sound '{}': {}", name, e))?;

        let sink = Sink::try_new(stream_handle)
            .map_err(|e| anyhow!("Failed to create audio sink: {}", e))?;
        sink.set_volume(volume as f32);
        sink.append(source);
        sink.detach(); // Let it play and clean up automatically

        Ok(())
    }

    /// Loop a music track on its own channel, replacing whatever is playing.
    pub fn play_music(&mut self, name: &str) -> Result<()> {
        let Some(bytes) = self.music_tracks.get(name).cloned() else {
            log::warn!("No music track named '{name}'");
            return Ok(());
        };

        self.stop_music();
        self.current_music = Some(name.to_string());

        let Some(stream_handle) = &self.stream_handle else {
            return Ok(());
        };

        let source = Decoder::new(Cursor::new(bytes))
            .map_err(|e| anyhow!("Failed to decode music '{}': {}", name, e))?
            .repeat_infinite();

        let sink = Sink::try_new(stream_handle)
            .map_err(|e| anyhow!("Failed to create audio sink: {}", e))?;
        sink.append(source);
        sink.set_volume(self.music_sink_volume() as f32);

        self.music_sink = Some(sink);
        Ok(())
    }

    /// Stop the currently playing background music.
    pub fn stop_music(&mut self) {
        self.current_music = None;
        if let Some(sink) = self.music_sink.take() {
            sink.stop();
        }
    }

    pub fn current_music(&self) -> Option<&str> {
        self.current_music.as_deref()
    }

    pub fn master_volume(&self) -> f64 {
        self.master_volume
    }

    pub fn music_volume(&self) -> f64 {
        self.music_volume
    }

    /// Volume the music channel plays at.
    pub fn music_sink_volume(&self) -> f64 {
        self.master_volume * self.music_volume
    }

    pub fn set_music_volume(&mut self, volume: f64) {
        self.music_volume = volume;
        if let Some(sink) = &self.music_sink {
            sink.set_volume(self.music_sink_volume() as f32);
        }
    }

    pub fn set_master_volume(&mut self, volume: f64) {
        self.master_volume = volume;
        self.set_music_volume(self.music_volume);
    }
}

impl Default for AudioService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falloff_is_linear_and_clipped() {
        assert_eq!(attenuation(0.0, 2000.0), 1.0);
        assert!((attenuation(500.0, 2000.0) - 0.75).abs() < 1e-12);
        assert_eq!(attenuation(2000.0, 2000.0), 0.0);
        assert_eq!(attenuation(5000.0, 2000.0), 0.0);
        assert_eq!(attenuation(-10.0, 2000.0), 1.0);
    }

    #[test]
    fn positional_volume_combines_master_sound_and_distance() {
        let mut audio = AudioService::headless();
        audio.add_sound_from_bytes("shot", vec![0u8; 4]);
        audio.set_sound_volume("shot", 0.8);
        audio.set_master_volume(0.5);
        audio.set_listener_pos(Point::new(100.0, 0.0));

        assert!((audio.sound_volume("shot").unwrap() - 0.4).abs() < 1e-12);
        let v = audio.sound_volume_at("shot", Point::new(1100.0, 0.0)).unwrap();
        assert!((v - 0.2).abs() < 1e-12);
        assert_eq!(audio.sound_volume_at("shot", Point::new(3000.0, 0.0)), Some(0.0));
        assert_eq!(audio.sound_volume("missing"), None);
    }

    #[test]
    fn music_volume_follows_master() {
        let mut audio = AudioService::headless();
        assert_eq!(audio.music_sink_volume(), 0.25);

        audio.set_music_volume(0.8);
        audio.set_master_volume(0.5);
        assert!((audio.music_sink_volume() - 0.4).abs() < 1e-12);
    }

    #[test]
    fn headless_service_tracks_music_without_playing() {
        let mut audio = AudioService::headless();
        assert!(!audio.is_available());

        audio.add_music_track_from_bytes("theme", vec![1u8, 2, 3]);
        audio.play_music("theme").unwrap();
        assert_eq!(audio.current_music(), Some("theme"));
        audio.play_sound("nothing").unwrap();

        audio.stop_music();
        assert_eq!(audio.current_music(), None);
    }
}
