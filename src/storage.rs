use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::{FromPrimitive, ToPrimitive};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub const KEY_TICK_VOLUME: &str = "tick_volume";
pub const KEY_ALARM_VOLUME: &str = "alarm_volume";
pub const KEY_TICK_SOUND_PATH: &str = "tick_sound_path";
pub const KEY_ALARM_SOUND_PATH: &str = "alarm_sound_path";
pub const KEY_APPEARANCE_MODE: &str = "appearance_mode";

pub const DEFAULT_VOLUME: f64 = 0.5;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("settings file does not hold a JSON object")]
    NotAnObject,
}

#[derive(
    Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize, FromPrimitive, ToPrimitive,
)]
pub enum AppearanceMode {
    Light = 0,
    Dark,
    #[default]
    System,
}

impl AppearanceMode {
    const COUNT: u8 = 3;

    /// Light -> Dark -> System -> Light
    pub fn next(self) -> Self {
        self.to_u8()
            .map(|i| (i + 1) % Self::COUNT)
            .and_then(Self::from_u8)
            .unwrap_or_default()
    }

    pub fn label(self) -> &'static str {
        match self {
            AppearanceMode::Light => "Light",
            AppearanceMode::Dark => "Dark",
            AppearanceMode::System => "System",
        }
    }
}

/// Typed view of the persisted settings.
#[derive(Clone, Debug, PartialEq)]
pub struct SettingsRecord {
    pub tick_volume: f64,
    pub alarm_volume: f64,
    pub tick_sound_path: Option<PathBuf>,
    pub alarm_sound_path: Option<PathBuf>,
    pub appearance_mode: AppearanceMode,
}

fn default_settings() -> Map<String, Value> {
    let mut map = Map::new();
    map.insert(KEY_TICK_VOLUME.into(), Value::from(DEFAULT_VOLUME));
    map.insert(KEY_ALARM_VOLUME.into(), Value::from(DEFAULT_VOLUME));
    map.insert(KEY_TICK_SOUND_PATH.into(), Value::Null);
    map.insert(KEY_ALARM_SOUND_PATH.into(), Value::Null);
    map.insert(
        KEY_APPEARANCE_MODE.into(),
        Value::from(AppearanceMode::System.label()),
    );
    map
}

/// Key-value settings backed by a pretty-printed JSON file.
///
/// Every mutation is written through to disk immediately. Read and write
/// failures are logged and never surface to the caller; the in-memory map
/// stays authoritative for the rest of the session.
pub struct SettingsStore {
    path: PathBuf,
    settings: Map<String, Value>,
}

impl SettingsStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let mut store = Self {
            path: path.into(),
            settings: Map::new(),
        };
        store.load();
        store
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&mut self) {
        self.settings = match read_settings(&self.path) {
            Ok(map) => map,
            Err(StorageError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
                log::info!("No settings at {}, using defaults", self.path.display());
                Map::new()
            }
            Err(e) => {
                log::warn!("Ignoring settings at {}: {}", self.path.display(), e);
                Map::new()
            }
        };
        self.ensure_defaults();
    }

    /// Stored value for `key`, or `default` when it is absent or has the wrong type.
    pub fn get<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.settings
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or(default)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.settings.contains_key(key)
    }

    pub fn set<T: Serialize>(&mut self, key: &str, value: T) {
        match serde_json::to_value(value) {
            Ok(v) => {
                self.settings.insert(key.to_string(), v);
                self.persist();
            }
            Err(e) => log::error!("Can't encode setting {}: {}", key, e),
        }
    }

    pub fn clear(&mut self) {
        self.settings = default_settings();
        self.persist();
    }

    pub fn record(&self) -> SettingsRecord {
        SettingsRecord {
            tick_volume: self.get(KEY_TICK_VOLUME, DEFAULT_VOLUME).clamp(0.0, 1.0),
            alarm_volume: self.get(KEY_ALARM_VOLUME, DEFAULT_VOLUME).clamp(0.0, 1.0),
            tick_sound_path: self.get::<Option<PathBuf>>(KEY_TICK_SOUND_PATH, None),
            alarm_sound_path: self.get::<Option<PathBuf>>(KEY_ALARM_SOUND_PATH, None),
            appearance_mode: self.get(KEY_APPEARANCE_MODE, AppearanceMode::System),
        }
    }

    fn ensure_defaults(&mut self) {
        let mut changed = false;
        for (key, value) in default_settings() {
            if !self.settings.contains_key(&key) {
                self.settings.insert(key, value);
                changed = true;
            }
        }
        if changed {
            self.persist();
        }
    }

    fn persist(&self) {
        if let Err(e) = self.save() {
            log::error!("Failed to save settings to {}: {}", self.path.display(), e);
        }
    }

    fn save(&self) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.settings.serialize(&mut ser)?;
        fs::write(&self.path, buf)?;
        Ok(())
    }
}

fn read_settings(path: &Path) -> Result<Map<String, Value>, StorageError> {
    let content = fs::read_to_string(path)?;
    match serde_json::from_str::<Value>(&content)? {
        Value::Object(map) => Ok(map),
        _ => Err(StorageError::NotAnObject),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn settings_path(dir: &TempDir) -> PathBuf {
        dir.path().join("user_settings.json")
    }

    fn on_disk(path: &Path) -> Map<String, Value> {
        let text = fs::read_to_string(path).unwrap();
        match serde_json::from_str(&text).unwrap() {
            Value::Object(map) => map,
            other => panic!("not an object: {}", other),
        }
    }

    #[test]
    fn test_missing_file_gets_defaults_and_is_written() {
        let dir = TempDir::new().unwrap();
        let path = settings_path(&dir);
        let store = SettingsStore::open(&path);

        assert_eq!(store.get(KEY_TICK_VOLUME, 0.0f64), 0.5);
        assert_eq!(store.get(KEY_ALARM_VOLUME, 0.0f64), 0.5);
        assert_eq!(store.get::<Option<String>>(KEY_TICK_SOUND_PATH, Some("x".into())), None);
        assert_eq!(store.get(KEY_APPEARANCE_MODE, String::new()), "System");

        let disk = on_disk(&path);
        assert_eq!(disk, default_settings());
    }

    #[test]
    fn test_corrupt_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let path = settings_path(&dir);
        fs::write(&path, "{ not json").unwrap();

        let store = SettingsStore::open(&path);
        assert_eq!(store.record(), SettingsStore::open(dir.path().join("fresh.json")).record());
        assert_eq!(store.record().appearance_mode, AppearanceMode::System);
        assert_eq!(on_disk(&path), default_settings());
    }

    #[test]
    fn test_non_object_is_treated_as_empty() {
        let dir = TempDir::new().unwrap();
        let path = settings_path(&dir);
        fs::write(&path, "[1, 2, 3]").unwrap();

        let store = SettingsStore::open(&path);
        assert_eq!(store.get(KEY_TICK_VOLUME, 0.0f64), DEFAULT_VOLUME);
    }

    #[test]
    fn test_partial_file_is_filled_and_kept() {
        let dir = TempDir::new().unwrap();
        let path = settings_path(&dir);
        fs::write(&path, r#"{ "tick_volume": 0.25, "window": "wide" }"#).unwrap();

        let store = SettingsStore::open(&path);
        assert_eq!(store.get(KEY_TICK_VOLUME, 0.0f64), 0.25);
        assert_eq!(store.get(KEY_ALARM_VOLUME, 0.0f64), 0.5);
        assert_eq!(store.get("window", String::new()), "wide");

        let disk = on_disk(&path);
        assert_eq!(disk.len(), 6);
        assert_eq!(disk["tick_volume"], Value::from(0.25));
    }

    #[test]
    fn test_complete_file_is_not_rewritten() {
        let dir = TempDir::new().unwrap();
        let path = settings_path(&dir);
        let compact = serde_json::to_string(&default_settings()).unwrap();
        fs::write(&path, &compact).unwrap();

        SettingsStore::open(&path);
        assert_eq!(fs::read_to_string(&path).unwrap(), compact);
    }

    #[test]
    fn test_set_round_trips_through_fresh_store() {
        let dir = TempDir::new().unwrap();
        let path = settings_path(&dir);

        let mut store = SettingsStore::open(&path);
        store.set(KEY_ALARM_VOLUME, 0.8f64);
        store.set(KEY_TICK_SOUND_PATH, Some("/sounds/click.wav"));
        store.set(KEY_APPEARANCE_MODE, AppearanceMode::Dark);

        let reopened = SettingsStore::open(&path);
        assert_eq!(reopened.get(KEY_ALARM_VOLUME, 0.0f64), 0.8);
        assert_eq!(
            reopened.get::<Option<String>>(KEY_TICK_SOUND_PATH, None).as_deref(),
            Some("/sounds/click.wav")
        );
        assert_eq!(reopened.record().appearance_mode, AppearanceMode::Dark);
    }

    #[test]
    fn test_file_is_pretty_printed() {
        let dir = TempDir::new().unwrap();
        let path = settings_path(&dir);
        SettingsStore::open(&path);

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("{\n    \""));
    }

    #[test]
    fn test_clear_restores_defaults() {
        let dir = TempDir::new().unwrap();
        let path = settings_path(&dir);

        let mut store = SettingsStore::open(&path);
        store.set(KEY_TICK_VOLUME, 0.1f64);
        store.set(KEY_ALARM_SOUND_PATH, Some("/a.mp3"));
        store.set("extra", true);
        store.clear();

        let rec = store.record();
        assert_eq!(rec.tick_volume, DEFAULT_VOLUME);
        assert_eq!(rec.alarm_sound_path, None);
        assert!(!store.contains("extra"));
        assert_eq!(on_disk(&path), default_settings());
    }

    #[test]
    fn test_get_falls_back_on_wrong_type() {
        let dir = TempDir::new().unwrap();
        let mut store = SettingsStore::open(settings_path(&dir));
        store.set(KEY_TICK_VOLUME, "loud");
        assert_eq!(store.get(KEY_TICK_VOLUME, 0.3f64), 0.3);
        assert_eq!(store.get("missing", 7u32), 7);
    }

    #[test]
    fn test_record_sanitises_values() {
        let dir = TempDir::new().unwrap();
        let path = settings_path(&dir);
        fs::write(
            &path,
            r#"{ "tick_volume": 3.0, "alarm_volume": -1.0, "appearance_mode": "Neon" }"#,
        )
        .unwrap();

        let rec = SettingsStore::open(&path).record();
        assert_eq!(rec.tick_volume, 1.0);
        assert_eq!(rec.alarm_volume, 0.0);
        assert_eq!(rec.appearance_mode, AppearanceMode::System);
    }

    #[test]
    fn test_write_failure_is_not_raised() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "file, not a directory").unwrap();

        let mut store = SettingsStore::open(blocker.join("user_settings.json"));
        store.set(KEY_TICK_VOLUME, 0.9f64);
        assert_eq!(store.get(KEY_TICK_VOLUME, 0.0f64), 0.9);
    }

    #[test]
    fn test_appearance_cycle() {
        assert_eq!(AppearanceMode::Light.next(), AppearanceMode::Dark);
        assert_eq!(AppearanceMode::Dark.next(), AppearanceMode::System);
        assert_eq!(AppearanceMode::System.next(), AppearanceMode::Light);
    }
}
