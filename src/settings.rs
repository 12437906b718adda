use crate::message::{Timing, DEFAULT_DOT_MS};
use crate::runtime::RuntimeConfig;
use crate::tone::{ToneShape, DEFAULT_DECAY_FLOOR, DEFAULT_FREQUENCY_HZ};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const SETTINGS_FILE: &str = "settings.json";
const FALLBACK_FILE: &str = "morseflow_settings.json";
/// Longest accepted idle-suspend delay (one day).
const MAX_IDLE_SUSPEND_SECS: f32 = 86_400.0;

/// Persisted playback settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_dot_ms")]
    pub dot_ms: u64,
    #[serde(default = "default_frequency_hz")]
    pub frequency_hz: f32,
    #[serde(default = "default_volume")]
    pub volume: f32,
    /// Gain left at the end of each tone (0.001 ≈ -60 dB).
    #[serde(default = "default_decay_floor")]
    pub decay_floor: f32,
    /// Seconds without playback before the output device is released (0 = never).
    #[serde(default)]
    pub idle_suspend_secs: f32,
}

fn default_dot_ms() -> u64 {
    DEFAULT_DOT_MS
}

fn default_frequency_hz() -> f32 {
    DEFAULT_FREQUENCY_HZ
}

fn default_volume() -> f32 {
    1.0
}

fn default_decay_floor() -> f32 {
    DEFAULT_DECAY_FLOOR
}

impl Settings {
    pub fn new() -> Self {
        Settings {
            dot_ms: DEFAULT_DOT_MS,
            frequency_hz: DEFAULT_FREQUENCY_HZ,
            volume: 1.0,
            decay_floor: DEFAULT_DECAY_FLOOR,
            idle_suspend_secs: 0.0,
        }
    }

    /// Default settings location: the user config dir, or the working
    /// directory when there is none.
    pub fn default_path() -> PathBuf {
        match dirs::config_dir() {
            Some(dir) => dir.join("morseflow").join(SETTINGS_FILE),
            None => PathBuf::from(FALLBACK_FILE),
        }
    }

    /// Load settings from `path`, or defaults if missing or unreadable.
    pub fn load_from(path: &Path) -> Self {
        if path.exists() {
            match fs::read_to_string(path) {
                Ok(data) => match serde_json::from_str::<Settings>(&data) {
                    Ok(settings) => match settings.validate() {
                        Ok(()) => return settings,
                        Err(e) => log::warn!(
                            "Invalid settings in '{}', using defaults: {}",
                            path.display(),
                            e
                        ),
                    },
                    Err(e) => log::warn!(
                        "Corrupt settings file '{}', using defaults: {}",
                        path.display(),
                        e
                    ),
                },
                Err(e) => log::warn!("Could not read settings file '{}': {}", path.display(), e),
            }
        }
        Settings::new()
    }

    /// Persist settings as JSON, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Cannot create '{}': {}", parent.display(), e))?;
        }
        let json =
            serde_json::to_string_pretty(self).map_err(|e| format!("Serialize error: {}", e))?;
        fs::write(path, json).map_err(|e| format!("Write error: {}", e))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.dot_ms == 0 {
            return Err("dot length must be > 0 ms".into());
        }
        if !(self.frequency_hz > 0.0 && self.frequency_hz < 20_000.0) {
            return Err(format!("frequency {} Hz out of range (0–20000)", self.frequency_hz));
        }
        if !(0.0..=1.0).contains(&self.volume) {
            return Err(format!("volume {} out of range (0.0–1.0)", self.volume));
        }
        if !(self.decay_floor > 0.0 && self.decay_floor <= 1.0) {
            return Err(format!("decay floor {} out of range (0.0–1.0]", self.decay_floor));
        }
        if !(0.0..=MAX_IDLE_SUSPEND_SECS).contains(&self.idle_suspend_secs) {
            return Err(format!(
                "idle suspend {}s out of range (0–{})",
                self.idle_suspend_secs, MAX_IDLE_SUSPEND_SECS
            ));
        }
        Ok(())
    }

    /// Set the dot length from a speed in words per minute.
    pub fn set_wpm(&mut self, wpm: u32) {
        self.dot_ms = Timing::from_wpm(wpm).dot.as_millis() as u64;
    }

    /// Approximate speed for the current dot length.
    pub fn wpm(&self) -> u32 {
        (1200 / self.dot_ms.max(1)) as u32
    }

    pub fn timing(&self) -> Timing {
        Timing::from_dot_ms(self.dot_ms)
    }

    pub fn tone_shape(&self) -> ToneShape {
        ToneShape {
            frequency_hz: self.frequency_hz,
            volume: self.volume,
            decay_floor: self.decay_floor,
        }
    }

    pub fn runtime_config(&self) -> RuntimeConfig {
        // Out-of-range values mean "never", same as 0.
        let idle_suspend = Duration::try_from_secs_f32(self.idle_suspend_secs)
            .ok()
            .filter(|d| !d.is_zero());
        RuntimeConfig {
            timing: self.timing(),
            shape: self.tone_shape(),
            idle_suspend,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_classic_trainer() {
        let s = Settings::new();
        assert_eq!(s.dot_ms, 80);
        assert_eq!(s.frequency_hz, 600.0);
        assert_eq!(s.volume, 1.0);
        assert_eq!(s.decay_floor, 0.001);
        assert_eq!(s.idle_suspend_secs, 0.0);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn missing_fields_take_defaults() {
        let s: Settings = serde_json::from_str(r#"{"dot_ms":60}"#).unwrap();
        assert_eq!(s.dot_ms, 60);
        assert_eq!(s.frequency_hz, 600.0);
        assert_eq!(s.decay_floor, 0.001);
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let mut s = Settings::new();
        s.dot_ms = 50;
        s.frequency_hz = 700.0;
        s.save_to(&path).unwrap();
        assert_eq!(Settings::load_from(&path), s);
    }

    #[test]
    fn load_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let s = Settings::load_from(&dir.path().join("none.json"));
        assert_eq!(s, Settings::new());
    }

    #[test]
    fn load_corrupt_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(Settings::load_from(&path), Settings::new());
    }

    #[test]
    fn load_invalid_values_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"dot_ms":0}"#).unwrap();
        assert_eq!(Settings::load_from(&path), Settings::new());
    }

    #[test]
    fn validate_rejects_out_of_range() {
        let mut s = Settings::new();
        s.volume = 1.5;
        assert!(s.validate().is_err());
        let mut s = Settings::new();
        s.frequency_hz = 0.0;
        assert!(s.validate().is_err());
        let mut s = Settings::new();
        s.decay_floor = 0.0;
        assert!(s.validate().is_err());
    }

    #[test]
    fn idle_suspend_must_be_finite_and_bounded() {
        for secs in [-1.0, 1e30, f32::INFINITY, f32::NAN] {
            let s = Settings {
                idle_suspend_secs: secs,
                ..Settings::new()
            };
            assert!(s.validate().is_err(), "{} accepted", secs);
            assert_eq!(s.runtime_config().idle_suspend, None);
        }
        let s = Settings {
            idle_suspend_secs: MAX_IDLE_SUSPEND_SECS,
            ..Settings::new()
        };
        assert!(s.validate().is_ok());
    }

    #[test]
    fn wpm_conversion() {
        let mut s = Settings::new();
        s.set_wpm(20);
        assert_eq!(s.dot_ms, 60);
        assert_eq!(s.wpm(), 20);
    }

    #[test]
    fn runtime_config_carries_settings() {
        let mut s = Settings::new();
        s.dot_ms = 40;
        s.idle_suspend_secs = 2.0;
        let cfg = s.runtime_config();
        assert_eq!(cfg.timing.dot, Duration::from_millis(40));
        assert_eq!(cfg.shape.frequency_hz, 600.0);
        assert_eq!(cfg.idle_suspend, Some(Duration::from_secs(2)));
        assert_eq!(Settings::new().runtime_config().idle_suspend, None);
    }
}
