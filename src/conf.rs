//! Settings consumed by the overlay
//!
//! Read from `~/.config/dictate-overlay/config.toml`. The overlay only ever
//! reads this file; the settings UI that writes it lives elsewhere.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::placement::Direction;

/// Overall scale of the overlay's content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlaySize {
    Small,
    #[default]
    Medium,
    Large,
}

impl OverlaySize {
    pub fn as_str(&self) -> &'static str {
        match self {
            OverlaySize::Small => "small",
            OverlaySize::Medium => "medium",
            OverlaySize::Large => "large",
        }
    }
}

impl std::str::FromStr for OverlaySize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "small" => Ok(OverlaySize::Small),
            "medium" => Ok(OverlaySize::Medium),
            "large" => Ok(OverlaySize::Large),
            other => Err(format!("Invalid overlay size: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OverlaySettings {
    /// Distance of the overlay above the bottom of the visible screen area.
    /// May be negative; placement clamps it back on screen.
    #[serde(default = "default_vertical_offset")]
    pub vertical_offset: f64,

    #[serde(default)]
    pub size: OverlaySize,
}

fn default_vertical_offset() -> f64 {
    60.0
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self {
            vertical_offset: default_vertical_offset(),
            size: OverlaySize::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PopupSettings {
    /// Space between the trigger and the popup menu
    #[serde(default = "default_gap")]
    pub gap: f64,

    #[serde(default)]
    pub direction: Direction,

    /// Width constraint handed to the menu content
    #[serde(default = "default_max_width")]
    pub max_width: f64,
}

fn default_gap() -> f64 {
    6.0
}

fn default_max_width() -> f64 {
    280.0
}

impl Default for PopupSettings {
    fn default() -> Self {
        Self {
            gap: default_gap(),
            direction: Direction::default(),
            max_width: default_max_width(),
        }
    }
}

/// Debounce and animation timing, in milliseconds.
///
/// Exact values are tuning. What must hold is that showing the popup is
/// faster than hiding it and that resize debouncing is never zero.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Timing {
    pub show_delay_ms: u64,
    pub hide_delay_ms: u64,
    pub reposition_delay_ms: u64,
    pub resize_debounce_ms: u64,
    pub fade_in_ms: u64,
    pub fade_out_ms: u64,
    pub frame_interval_ms: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            show_delay_ms: 60,
            hide_delay_ms: 250,
            reposition_delay_ms: 16,
            resize_debounce_ms: 50,
            fade_in_ms: 200,
            fade_out_ms: 150,
            frame_interval_ms: 16,
        }
    }
}

impl Timing {
    pub fn show_delay(&self) -> Duration {
        Duration::from_millis(self.show_delay_ms)
    }

    pub fn hide_delay(&self) -> Duration {
        Duration::from_millis(self.hide_delay_ms)
    }

    pub fn reposition_delay(&self) -> Duration {
        Duration::from_millis(self.reposition_delay_ms)
    }

    pub fn resize_debounce(&self) -> Duration {
        Duration::from_millis(self.resize_debounce_ms)
    }

    pub fn fade_in(&self) -> Duration {
        Duration::from_millis(self.fade_in_ms)
    }

    pub fn fade_out(&self) -> Duration {
        Duration::from_millis(self.fade_out_ms)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms.max(1))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.show_delay_ms >= self.hide_delay_ms {
            return Err(ConfigError::Timing(format!(
                "show delay ({}ms) must be shorter than hide delay ({}ms)",
                self.show_delay_ms, self.hide_delay_ms
            )));
        }
        if self.resize_debounce_ms == 0 {
            return Err(ConfigError::Timing(
                "resize debounce must be greater than zero".to_string(),
            ));
        }
        if self.fade_out_ms > self.fade_in_ms {
            return Err(ConfigError::Timing(format!(
                "fade out ({}ms) must not be longer than fade in ({}ms)",
                self.fade_out_ms, self.fade_in_ms
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    #[serde(default)]
    pub overlay: OverlaySettings,

    #[serde(default)]
    pub popup: PopupSettings,

    #[serde(default)]
    pub timing: Timing,
}

impl Settings {
    /// Load from the default config path.
    /// Returns default settings if the file doesn't exist or is invalid.
    pub fn load() -> Self {
        let Some(path) = config_path() else {
            log::warn!("Could not determine config directory, using defaults");
            return Self::default();
        };

        if !path.exists() {
            log::info!("No config file found at {}, using defaults", path.display());
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(settings) => {
                log::info!("Loaded settings from: {}", path.display());
                settings
            }
            Err(e) => {
                log::warn!("Failed to load config: {}, using defaults", e);
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(contents)?;
        settings.timing.validate()?;
        Ok(settings)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Get the path to the config file: ~/.config/dictate-overlay/config.toml
pub fn config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "dictate-overlay").map(|dirs| dirs.config_dir().join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.overlay.size, OverlaySize::Medium);
        assert_eq!(settings.popup.direction, Direction::Above);
        assert!(settings.timing.validate().is_ok());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let settings = Settings::parse(
            r#"
            [overlay]
            vertical_offset = 200.0
            size = "large"

            [timing]
            hide_delay_ms = 400
            "#,
        )
        .unwrap();

        assert_eq!(settings.overlay.vertical_offset, 200.0);
        assert_eq!(settings.overlay.size, OverlaySize::Large);
        assert_eq!(settings.timing.hide_delay_ms, 400);
        assert_eq!(settings.timing.show_delay_ms, 60);
        assert_eq!(settings.popup, PopupSettings::default());
    }

    #[test]
    fn test_show_slower_than_hide_is_rejected() {
        let result = Settings::parse(
            r#"
            [timing]
            show_delay_ms = 300
            hide_delay_ms = 100
            "#,
        );
        assert!(matches!(result, Err(ConfigError::Timing(_))));
    }

    #[test]
    fn test_zero_resize_debounce_is_rejected() {
        let timing = Timing {
            resize_debounce_ms: 0,
            ..Timing::default()
        };
        assert!(timing.validate().is_err());
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            Settings::parse("overlay = ["),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_serialize_deserialize() {
        let mut settings = Settings::default();
        settings.overlay.vertical_offset = -20.0;
        settings.popup.direction = Direction::Below;

        let toml = settings.to_toml().unwrap();
        let deserialized = Settings::parse(&toml).unwrap();
        assert_eq!(deserialized, settings);
    }

    #[test]
    fn test_overlay_size_from_str() {
        assert_eq!("small".parse::<OverlaySize>(), Ok(OverlaySize::Small));
        assert!("huge".parse::<OverlaySize>().is_err());
    }
}
