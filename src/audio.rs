use std::fs;
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use rodio::decoder::DecoderError;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source, StreamError};
use thiserror::Error;

use crate::config::AppPaths;
use crate::storage::{
    SettingsRecord, SettingsStore, DEFAULT_VOLUME, KEY_ALARM_SOUND_PATH, KEY_ALARM_VOLUME,
    KEY_TICK_SOUND_PATH, KEY_TICK_VOLUME,
};

/// Tick playback is cut after this long and faded out.
const TICK_LENGTH: Duration = Duration::from_secs(1);

#[derive(Error, Debug)]
pub enum AudioError {
    #[error("can't read sound file: {0}")]
    Io(#[from] io::Error),

    #[error("unsupported or corrupt sound file: {0}")]
    Decode(#[from] DecoderError),

    #[error("no audio output: {0}")]
    Stream(#[from] StreamError),
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum SoundKind {
    Tick,
    Alarm,
}

/// A sound file held in memory so each playback decodes a fresh copy.
#[derive(Clone)]
struct SoundClip {
    path: PathBuf,
    bytes: Arc<[u8]>,
}

impl SoundClip {
    fn load(path: &Path) -> Result<Self, AudioError> {
        let bytes: Arc<[u8]> = fs::read(path)?.into();
        // Reject files rodio can't decode up front rather than at play time
        Decoder::new(Cursor::new(Arc::clone(&bytes)))?;
        Ok(Self {
            path: path.to_path_buf(),
            bytes,
        })
    }

    fn decoder(&self) -> Result<Decoder<Cursor<Arc<[u8]>>>, AudioError> {
        Ok(Decoder::new(Cursor::new(Arc::clone(&self.bytes)))?)
    }
}

struct Output {
    _stream: OutputStream,
    handle: OutputStreamHandle,
}

impl Output {
    fn open() -> Result<Self, AudioError> {
        let (stream, handle) = OutputStream::try_default()?;
        Ok(Self {
            _stream: stream,
            handle,
        })
    }
}

/// Use the stored sound only if it still exists on disk.
pub fn resolve_sound_path(stored: Option<&Path>, bundled: &Path) -> PathBuf {
    match stored {
        Some(path) if path.exists() => path.to_path_buf(),
        _ => bundled.to_path_buf(),
    }
}

/// Value to persist for a newly chosen sound: its canonical path, or `None`
/// when it is the bundled default.
pub fn stored_sound_path(chosen: &Path, bundled: &Path) -> Option<PathBuf> {
    let chosen = fs::canonicalize(chosen).unwrap_or_else(|_| chosen.to_path_buf());
    let bundled = fs::canonicalize(bundled).unwrap_or_else(|_| bundled.to_path_buf());
    if chosen == bundled {
        None
    } else {
        Some(chosen)
    }
}

/// Tick and alarm playback. Runs silently when there is no output device or
/// a sound can't be loaded.
pub struct AudioManager {
    output: Option<Output>,
    default_tick: PathBuf,
    default_alarm: PathBuf,
    tick: Option<SoundClip>,
    alarm: Option<SoundClip>,
    tick_volume: f64,
    alarm_volume: f64,
    tick_sink: Option<Sink>,
    alarm_sink: Option<Sink>,
}

impl AudioManager {
    pub fn new(paths: &AppPaths, record: &SettingsRecord) -> Self {
        let output = match Output::open() {
            Ok(output) => Some(output),
            Err(e) => {
                log::warn!("Audio disabled: {}", e);
                None
            }
        };
        Self::with_output(output, paths, record)
    }

    /// Manager that never touches an audio device.
    pub fn silent(paths: &AppPaths, record: &SettingsRecord) -> Self {
        Self::with_output(None, paths, record)
    }

    fn with_output(output: Option<Output>, paths: &AppPaths, record: &SettingsRecord) -> Self {
        let tick_path = resolve_sound_path(record.tick_sound_path.as_deref(), &paths.tick_sound);
        let alarm_path = resolve_sound_path(record.alarm_sound_path.as_deref(), &paths.alarm_sound);
        Self {
            output,
            default_tick: paths.tick_sound.clone(),
            default_alarm: paths.alarm_sound.clone(),
            tick: load_or_warn(&tick_path),
            alarm: load_or_warn(&alarm_path),
            tick_volume: record.tick_volume,
            alarm_volume: record.alarm_volume,
            tick_sink: None,
            alarm_sink: None,
        }
    }

    pub fn tick_volume(&self) -> f64 {
        self.tick_volume
    }

    pub fn alarm_volume(&self) -> f64 {
        self.alarm_volume
    }

    pub fn sound_path(&self, kind: SoundKind) -> Option<&Path> {
        let clip = match kind {
            SoundKind::Tick => &self.tick,
            SoundKind::Alarm => &self.alarm,
        };
        clip.as_ref().map(|c| c.path.as_path())
    }

    pub fn play_tick(&mut self) {
        self.stop_tick();
        let Some(clip) = &self.tick else { return };
        let Some(sink) = self.new_sink(self.tick_volume) else { return };
        match clip.decoder() {
            Ok(source) => {
                let mut source = source.take_duration(TICK_LENGTH);
                source.set_filter_fadeout();
                sink.append(source);
                self.tick_sink = Some(sink);
            }
            Err(e) => log::warn!("Can't play tick: {}", e),
        }
    }

    pub fn stop_tick(&mut self) {
        if let Some(sink) = self.tick_sink.take() {
            sink.stop();
        }
    }

    /// Play the alarm once unless it is already sounding.
    pub fn play_alarm(&mut self) {
        if self.alarm_playing() {
            return;
        }
        let Some(clip) = &self.alarm else { return };
        let Some(sink) = self.new_sink(self.alarm_volume) else { return };
        match clip.decoder() {
            Ok(source) => {
                sink.append(source);
                self.alarm_sink = Some(sink);
            }
            Err(e) => log::warn!("Can't play alarm: {}", e),
        }
    }

    pub fn play_alarm_loop(&mut self) {
        if self.alarm_playing() {
            return;
        }
        let Some(clip) = &self.alarm else { return };
        let Some(sink) = self.new_sink(self.alarm_volume) else { return };
        match clip.decoder() {
            Ok(source) => {
                sink.append(source.repeat_infinite());
                self.alarm_sink = Some(sink);
            }
            Err(e) => log::warn!("Can't play alarm: {}", e),
        }
    }

    pub fn stop_alarm(&mut self) {
        if let Some(sink) = self.alarm_sink.take() {
            sink.stop();
        }
    }

    pub fn alarm_playing(&self) -> bool {
        self.alarm_sink.as_ref().map(|s| !s.empty()).unwrap_or(false)
    }

    pub fn set_tick_volume(&mut self, store: &mut SettingsStore, value: f64) {
        self.tick_volume = value.clamp(0.0, 1.0);
        if let Some(sink) = &self.tick_sink {
            sink.set_volume(self.tick_volume as f32);
        }
        store.set(KEY_TICK_VOLUME, self.tick_volume);
    }

    pub fn set_alarm_volume(&mut self, store: &mut SettingsStore, value: f64) {
        self.alarm_volume = value.clamp(0.0, 1.0);
        if let Some(sink) = &self.alarm_sink {
            sink.set_volume(self.alarm_volume as f32);
        }
        store.set(KEY_ALARM_VOLUME, self.alarm_volume);
    }

    pub fn change_tick_sound(
        &mut self,
        store: &mut SettingsStore,
        path: &Path,
    ) -> Result<(), AudioError> {
        let clip = SoundClip::load(path)?;
        self.stop_tick();
        self.tick = Some(clip);
        store.set(KEY_TICK_SOUND_PATH, stored_sound_path(path, &self.default_tick));
        log::info!("Tick sound set to {}", path.display());
        Ok(())
    }

    pub fn change_alarm_sound(
        &mut self,
        store: &mut SettingsStore,
        path: &Path,
    ) -> Result<(), AudioError> {
        let clip = SoundClip::load(path)?;
        self.stop_alarm();
        self.alarm = Some(clip);
        store.set(KEY_ALARM_SOUND_PATH, stored_sound_path(path, &self.default_alarm));
        log::info!("Alarm sound set to {}", path.display());
        Ok(())
    }

    /// Back to bundled sounds and default volumes, and reset the store.
    pub fn reset_to_defaults(&mut self, store: &mut SettingsStore) {
        self.stop_tick();
        self.stop_alarm();
        self.tick_volume = DEFAULT_VOLUME;
        self.alarm_volume = DEFAULT_VOLUME;
        self.tick = load_or_warn(&self.default_tick);
        self.alarm = load_or_warn(&self.default_alarm);
        store.clear();
    }

    fn new_sink(&self, volume: f64) -> Option<Sink> {
        let output = self.output.as_ref()?;
        match Sink::try_new(&output.handle) {
            Ok(sink) => {
                sink.set_volume(volume as f32);
                Some(sink)
            }
            Err(e) => {
                log::warn!("Can't open audio sink: {}", e);
                None
            }
        }
    }
}

fn load_or_warn(path: &Path) -> Option<SoundClip> {
    match SoundClip::load(path) {
        Ok(clip) => Some(clip),
        Err(e) => {
            log::warn!("Can't load sound {}: {}", path.display(), e);
            None
        }
    }
}
