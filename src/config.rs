//! Configuration loaded from `~/.voicekey.toml` (created on first run).
//!
//! The file is read once at startup; nothing is written back while running.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

/// Top-level configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Global hotkey combos
    pub hotkeys: HotkeysConfig,
    /// Whisper model settings
    pub model: ModelConfig,
    /// Language defaults
    pub language: LanguageConfig,
    /// Transcript delivery settings
    pub delivery: DeliveryConfig,
    /// Log file settings
    pub telemetry: TelemetryConfig,
}

/// A single modifier+key combo.
#[derive(Debug, Deserialize, Clone)]
pub struct ComboConfig {
    /// Modifier names ("Control", "Shift", "Alt", "Command")
    pub modifiers: Vec<String>,
    /// Key name ("A".."Z" or "Space")
    pub key: String,
}

/// Hotkey combos for both front ends.
#[derive(Debug, Deserialize, Clone)]
pub struct HotkeysConfig {
    /// Toggle-record combo (tray front end)
    pub toggle: ComboConfig,
    /// Cycle-language combo (tray front end)
    pub cycle_language: ComboConfig,
    /// Push-to-talk combo (window front end)
    pub push_to_talk: ComboConfig,
}

/// Whisper model settings.
#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    /// Path to the ggml model file (`~` expands to the home directory)
    pub path: String,
    /// CPU threads for inference
    pub threads: usize,
    /// Beam width for the final pass (1 = greedy)
    pub beam_size: usize,
    /// Interval between interim-transcript passes, in milliseconds
    pub partial_interval_ms: u64,
}

/// Language defaults.
#[derive(Debug, Deserialize, Clone)]
pub struct LanguageConfig {
    /// Language code selected at startup
    pub default: String,
}

/// Transcript delivery settings.
#[derive(Debug, Deserialize, Clone)]
pub struct DeliveryConfig {
    /// Delay between clipboard copy and the paste keystroke, in milliseconds
    pub settle_ms: u64,
}

/// Log file settings.
#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    /// Write logs to `log_path` instead of stdout
    pub enabled: bool,
    /// Log file location (`~` expands to the home directory)
    pub log_path: String,
}

impl Config {
    /// Load config from `~/.voicekey.toml`, creating it with defaults first
    /// if missing.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, created, or parsed.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            Self::create_default(&config_path).context("failed to create default config")?;
        }

        let contents = fs::read_to_string(&config_path).context("failed to read config file")?;

        let config: Self = toml::from_str(&contents).context("failed to parse config TOML")?;

        Ok(config)
    }

    fn config_path() -> Result<PathBuf> {
        let home = std::env::var("HOME").context("HOME environment variable not set")?;
        Ok(PathBuf::from(home).join(".voicekey.toml"))
    }

    fn create_default(path: &PathBuf) -> Result<()> {
        let default_config = r#"[hotkeys.toggle]
modifiers = ["Control", "Shift"]
key = "Space"

[hotkeys.cycle_language]
modifiers = ["Alt", "Shift"]
key = "L"

[hotkeys.push_to_talk]
modifiers = ["Control", "Shift"]
key = "Space"

[model]
path = "~/.voicekey/models/ggml-large-v3-turbo.bin"
threads = 4
beam_size = 5
partial_interval_ms = 1500

[language]
default = "ko"

[delivery]
settle_ms = 100

[telemetry]
enabled = false
log_path = "~/.voicekey/voicekey.log"
"#;
        fs::write(path, default_config).context("failed to write default config")?;
        Ok(())
    }

    /// Expand a leading `~/` to the home directory.
    ///
    /// # Errors
    /// Returns an error if HOME is not set.
    pub fn expand_path(path: &str) -> Result<PathBuf> {
        if let Some(stripped) = path.strip_prefix("~/") {
            let home = std::env::var("HOME").context("HOME environment variable not set")?;
            Ok(PathBuf::from(home).join(stripped))
        } else {
            Ok(PathBuf::from(path))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_parses() {
        let dir = std::env::temp_dir().join("voicekey-config-test");
        fs::create_dir_all(&dir).ok();
        let path = dir.join("default.toml");
        Config::create_default(&path).ok();

        let contents = fs::read_to_string(&path).unwrap_or_default();
        let parsed: Result<Config, _> = toml::from_str(&contents);
        assert!(parsed.is_ok(), "{:?}", parsed.err());

        let Ok(config) = parsed else { return };
        assert_eq!(config.language.default, "ko");
        assert_eq!(config.delivery.settle_ms, 100);
        assert_eq!(config.hotkeys.toggle.key, "Space");
        assert_eq!(config.model.partial_interval_ms, 1500);

        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let Ok(home) = std::env::var("HOME") else {
            return;
        };
        let result = Config::expand_path("~/models/model.bin").unwrap_or_default();
        assert_eq!(result, PathBuf::from(home).join("models/model.bin"));
    }

    #[test]
    fn test_expand_path_absolute() {
        let result = Config::expand_path("/opt/models/model.bin").unwrap_or_default();
        assert_eq!(result, PathBuf::from("/opt/models/model.bin"));
    }
}
