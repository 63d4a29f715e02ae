use serde::{Deserialize, Serialize};
use std::time::Duration;

pub(crate) const TICK_INTERVAL_MIN_MS: u64 = 100;
pub(crate) const TICK_INTERVAL_MAX_MS: u64 = 5_000;
pub(crate) const TICK_INTERVAL_DEFAULT_MS: u64 = 500;
pub(crate) const DEBOUNCE_DELAY_MIN_MS: u64 = 100;
pub(crate) const DEBOUNCE_DELAY_MAX_MS: u64 = 30_000;
pub(crate) const DEBOUNCE_DELAY_DEFAULT_MS: u64 = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    #[default]
    Softcore,
    Hardcore,
    Both,
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameVersion {
    #[default]
    Resurrected,
    Classic,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GrailSettings {
    pub save_dir: String,
    pub game_mode: GameMode,
    pub game_version: GameVersion,
    pub grail_normal: bool,
    pub grail_ethereal: bool,
    pub grail_each: bool,
    pub grail_runes: bool,
    pub grail_runewords: bool,
    pub tick_reader_interval_ms: Option<u64>,
    pub file_change_debounce_ms: Option<u64>,
}

impl Default for GrailSettings {
    fn default() -> Self {
        Self {
            save_dir: String::new(),
            game_mode: GameMode::Softcore,
            game_version: GameVersion::Resurrected,
            grail_normal: true,
            grail_ethereal: false,
            grail_each: false,
            grail_runes: true,
            grail_runewords: true,
            tick_reader_interval_ms: None,
            file_change_debounce_ms: None,
        }
    }
}

pub trait SettingsProvider: Send + Sync {
    fn get_all_settings(&self) -> GrailSettings;
}

impl SettingsProvider for GrailSettings {
    fn get_all_settings(&self) -> GrailSettings {
        self.clone()
    }
}

pub(crate) fn validated_tick_interval(requested_ms: Option<u64>) -> Duration {
    validated_interval(
        requested_ms,
        TICK_INTERVAL_MIN_MS,
        TICK_INTERVAL_MAX_MS,
        TICK_INTERVAL_DEFAULT_MS,
    )
}

pub(crate) fn validated_debounce_delay(requested_ms: Option<u64>) -> Duration {
    validated_interval(
        requested_ms,
        DEBOUNCE_DELAY_MIN_MS,
        DEBOUNCE_DELAY_MAX_MS,
        DEBOUNCE_DELAY_DEFAULT_MS,
    )
}

fn validated_interval(requested_ms: Option<u64>, min_ms: u64, max_ms: u64, default_ms: u64) -> Duration {
    let millis = match requested_ms {
        Some(value) if (min_ms..=max_ms).contains(&value) => value,
        _ => default_ms,
    };

    Duration::from_millis(millis)
}

#[cfg(test)]
mod tests {
    use super::{
        validated_debounce_delay, validated_tick_interval, GameMode, GrailSettings,
        DEBOUNCE_DELAY_DEFAULT_MS, TICK_INTERVAL_DEFAULT_MS,
    };
    use std::time::Duration;

    #[test]
    fn accepts_in_range_tick_intervals() {
        assert_eq!(validated_tick_interval(Some(100)), Duration::from_millis(100));
        assert_eq!(validated_tick_interval(Some(500)), Duration::from_millis(500));
        assert_eq!(validated_tick_interval(Some(5_000)), Duration::from_millis(5_000));
    }

    #[test]
    fn silently_replaces_out_of_range_intervals_with_defaults() {
        let default_tick = Duration::from_millis(TICK_INTERVAL_DEFAULT_MS);
        assert_eq!(validated_tick_interval(Some(0)), default_tick);
        assert_eq!(validated_tick_interval(Some(99)), default_tick);
        assert_eq!(validated_tick_interval(Some(5_001)), default_tick);
        assert_eq!(validated_tick_interval(None), default_tick);

        let default_debounce = Duration::from_millis(DEBOUNCE_DELAY_DEFAULT_MS);
        assert_eq!(validated_debounce_delay(Some(0)), default_debounce);
        assert_eq!(validated_debounce_delay(Some(99)), default_debounce);
        assert_eq!(validated_debounce_delay(Some(30_001)), default_debounce);
        assert_eq!(validated_debounce_delay(None), default_debounce);
    }

    #[test]
    fn settings_deserialize_with_camel_case_defaults() {
        let settings: GrailSettings =
            serde_json::from_str(r#"{"saveDir":"/saves","gameMode":"manual"}"#)
                .expect("Expected settings to deserialize");

        assert_eq!(settings.save_dir, "/saves");
        assert_eq!(settings.game_mode, GameMode::Manual);
        assert!(settings.grail_normal);
        assert!(settings.tick_reader_interval_ms.is_none());
    }
}
