//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Break interval, duration and pre-notification lead time
//! - Skip/postpone permissions
//! - Water reminder interval and break messages
//! - Pomodoro durations
//! - The todo list
//!
//! Configuration is stored at `~/.config/eyerest/config.toml`.

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::{ConfigError, CoreError, Result};
use crate::pomodoro::PomodoroConfig;
use crate::timer::BreakTimerConfig;
use crate::todo::TodoItem;

pub const FALLBACK_BREAK_MESSAGE: &str = "Time to rest!";

const DEFAULT_MESSAGES: [&str; 5] = [
    "Time to rest your eyes!\nLook at something 6 meters away.",
    "Stand up and stretch your body!",
    "Take a deep breath and relax your shoulders.",
    "Blink several times to moisten your eyes.",
    "Look out the window and rest your sight.",
];

/// Break timer preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreaksConfig {
    #[serde(default = "default_interval_min")]
    pub interval_min: u32,
    #[serde(default = "default_duration_secs")]
    pub duration_secs: u32,
    #[serde(default = "default_true")]
    pub show_pre_notification: bool,
    #[serde(default = "default_pre_notification_secs")]
    pub pre_notification_secs: u32,
    #[serde(default = "default_true")]
    pub allow_skip: bool,
    #[serde(default = "default_true")]
    pub allow_postpone: bool,
    #[serde(default = "default_postpone_min")]
    pub postpone_min: u32,
    /// 0 disables the water reminder.
    #[serde(default)]
    pub water_reminder_interval_min: u32,
    #[serde(default)]
    pub play_sound: bool,
    #[serde(default = "default_messages")]
    pub messages: Vec<String>,
}

/// Startup behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartupConfig {
    #[serde(default = "default_true")]
    pub start_minimized: bool,
    #[serde(default)]
    pub start_with_system: bool,
}

/// Pomodoro durations, in minutes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PomodoroSettings {
    #[serde(default = "default_work_min")]
    pub work_min: u32,
    #[serde(default = "default_short_break_min")]
    pub short_break_min: u32,
    #[serde(default = "default_long_break_min")]
    pub long_break_min: u32,
    #[serde(default = "default_cycles_before_long_break")]
    pub cycles_before_long_break: u32,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/eyerest/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub breaks: BreaksConfig,
    #[serde(default)]
    pub startup: StartupConfig,
    #[serde(default)]
    pub pomodoro: PomodoroSettings,
    #[serde(default)]
    pub todos: Vec<TodoItem>,
}

// Default functions
fn default_interval_min() -> u32 {
    20
}
fn default_duration_secs() -> u32 {
    20
}
fn default_pre_notification_secs() -> u32 {
    30
}
fn default_postpone_min() -> u32 {
    5
}
fn default_work_min() -> u32 {
    25
}
fn default_short_break_min() -> u32 {
    5
}
fn default_long_break_min() -> u32 {
    15
}
fn default_cycles_before_long_break() -> u32 {
    4
}
fn default_true() -> bool {
    true
}
fn default_messages() -> Vec<String> {
    DEFAULT_MESSAGES.iter().map(|m| m.to_string()).collect()
}

impl Default for BreaksConfig {
    fn default() -> Self {
        Self {
            interval_min: default_interval_min(),
            duration_secs: default_duration_secs(),
            show_pre_notification: true,
            pre_notification_secs: default_pre_notification_secs(),
            allow_skip: true,
            allow_postpone: true,
            postpone_min: default_postpone_min(),
            water_reminder_interval_min: 0,
            play_sound: false,
            messages: default_messages(),
        }
    }
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            start_minimized: true,
            start_with_system: false,
        }
    }
}

impl Default for PomodoroSettings {
    fn default() -> Self {
        Self {
            work_min: default_work_min(),
            short_break_min: default_short_break_min(),
            long_break_min: default_long_break_min(),
            cycles_before_long_break: default_cycles_before_long_break(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            breaks: BreaksConfig::default(),
            startup: StartupConfig::default(),
            pomodoro: PomodoroSettings::default(),
            todos: Vec::new(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> std::result::Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().map_or(true, |p| p.is_empty()) {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => serde_json::Value::Number(
                        value
                            .parse::<u64>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?
                            .into(),
                    ),
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    pub fn path() -> Result<PathBuf> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults when the file is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed or
    /// holds out-of-range values, or if the default config cannot be written
    /// to disk.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
            .into()),
        }
    }

    /// Persist to the default location.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by dot-separated key. The result must still validate;
    /// on error `self` is left unchanged. Does not save.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut json = serde_json::to_value(&*self)?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json)?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Check every value is inside the range the managers accept.
    pub fn validate(&self) -> Result<()> {
        let b = &self.breaks;
        check_range("breaks.interval_min", b.interval_min, 1, 120)?;
        check_range("breaks.duration_secs", b.duration_secs, 5, 300)?;
        check_range("breaks.pre_notification_secs", b.pre_notification_secs, 0, 120)?;
        check_range("breaks.postpone_min", b.postpone_min, 1, 30)?;
        check_range(
            "breaks.water_reminder_interval_min",
            b.water_reminder_interval_min,
            0,
            120,
        )?;
        if b.messages.iter().all(|m| m.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                key: "breaks.messages".into(),
                message: "at least one break message is required".into(),
            }
            .into());
        }

        let p = &self.pomodoro;
        check_range("pomodoro.work_min", p.work_min, 1, 180)?;
        check_range("pomodoro.short_break_min", p.short_break_min, 1, 60)?;
        check_range("pomodoro.long_break_min", p.long_break_min, 1, 120)?;
        check_range(
            "pomodoro.cycles_before_long_break",
            p.cycles_before_long_break,
            1,
            12,
        )?;
        Ok(())
    }

    /// Snapshot for [`crate::TimerManager`]. A disabled pre-notification is a
    /// zero lead time.
    pub fn break_timer_config(&self) -> BreakTimerConfig {
        BreakTimerConfig {
            break_interval_min: self.breaks.interval_min,
            break_duration_secs: self.breaks.duration_secs,
            pre_notification_secs: if self.breaks.show_pre_notification {
                self.breaks.pre_notification_secs
            } else {
                0
            },
            water_interval_min: self.breaks.water_reminder_interval_min,
        }
    }

    pub fn pomodoro_config(&self) -> PomodoroConfig {
        PomodoroConfig {
            work_min: self.pomodoro.work_min,
            short_break_min: self.pomodoro.short_break_min,
            long_break_min: self.pomodoro.long_break_min,
            cycles_before_long_break: self.pomodoro.cycles_before_long_break,
        }
    }

    pub fn random_break_message(&self) -> &str {
        self.breaks
            .messages
            .choose(&mut rand::thread_rng())
            .map(String::as_str)
            .unwrap_or(FALLBACK_BREAK_MESSAGE)
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }
}

fn check_range(key: &str, value: u32, min: u32, max: u32) -> Result<()> {
    if (min..=max).contains(&value) {
        return Ok(());
    }
    Err(CoreError::Config(ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("{value} is outside {min}..={max}"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn config_default_values() {
        let cfg = Config::default();
        assert_eq!(cfg.breaks.interval_min, 20);
        assert_eq!(cfg.breaks.duration_secs, 20);
        assert_eq!(cfg.breaks.pre_notification_secs, 30);
        assert_eq!(cfg.breaks.postpone_min, 5);
        assert_eq!(cfg.breaks.messages.len(), 5);
        assert!(cfg.startup.start_minimized);
        assert_eq!(cfg.pomodoro.work_min, 25);
        assert_eq!(cfg.pomodoro.cycles_before_long_break, 4);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let cfg: Config = toml::from_str("[breaks]\ninterval_min = 45\n").unwrap();
        assert_eq!(cfg.breaks.interval_min, 45);
        assert_eq!(cfg.breaks.duration_secs, 20);
        assert_eq!(cfg.pomodoro.long_break_min, 15);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("breaks.allow_skip").as_deref(), Some("true"));
        assert_eq!(cfg.get("pomodoro.work_min").as_deref(), Some("25"));
        assert!(cfg.get("breaks.missing_key").is_none());
    }

    #[test]
    fn set_updates_nested_values() {
        let mut cfg = Config::default();
        cfg.set("breaks.interval_min", "30").unwrap();
        cfg.set("breaks.allow_postpone", "false").unwrap();
        assert_eq!(cfg.breaks.interval_min, 30);
        assert!(!cfg.breaks.allow_postpone);
    }

    #[test]
    fn set_rejects_unknown_key_and_bad_type() {
        let mut cfg = Config::default();
        assert!(cfg.set("breaks.nonexistent", "1").is_err());
        assert!(cfg.set("breaks.allow_skip", "maybe").is_err());
        assert!(cfg.set("", "1").is_err());
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn set_rejects_out_of_range_value() {
        let mut cfg = Config::default();
        assert!(cfg.set("breaks.duration_secs", "2").is_err());
        assert!(cfg.set("pomodoro.cycles_before_long_break", "0").is_err());
        assert_eq!(cfg.breaks.duration_secs, 20);
    }

    #[test]
    fn disabled_pre_notification_is_zero_lead() {
        let mut cfg = Config::default();
        assert_eq!(cfg.break_timer_config().pre_notification_secs, 30);
        cfg.breaks.show_pre_notification = false;
        assert_eq!(cfg.break_timer_config().pre_notification_secs, 0);
    }

    #[test]
    fn random_message_falls_back_when_empty() {
        let mut cfg = Config::default();
        assert!(cfg.breaks.messages.iter().any(|m| m == cfg.random_break_message()));
        cfg.breaks.messages.clear();
        assert_eq!(cfg.random_break_message(), FALLBACK_BREAK_MESSAGE);
    }

    #[test]
    fn todos_survive_a_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut cfg = Config::default();
        let mut daily =
            TodoItem::recurring("Eye drops", NaiveTime::from_hms_opt(9, 30, 0).unwrap()).unwrap();
        daily.last_reset_date = Some(chrono::NaiveDate::from_ymd_opt(2026, 5, 12).unwrap());
        cfg.todos.push(daily);
        cfg.todos
            .push(TodoItem::new("Renew passport").unwrap().with_description("before June"));
        cfg.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.todos, cfg.todos);
    }

    #[test]
    fn missing_file_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg, Config::default());
        assert!(path.exists());
    }

    #[test]
    fn out_of_range_file_is_rejected_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[breaks]\ninterval_min = 0\nduration_secs = 0\n").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(CoreError::Config(ConfigError::InvalidValue { ref key, .. }))
                if key == "breaks.interval_min"
        ));
    }

    #[test]
    fn garbage_file_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "breaks = [not toml").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(CoreError::Config(ConfigError::LoadFailed { .. }))
        ));
    }
}
