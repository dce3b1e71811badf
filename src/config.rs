use directories::ProjectDirs;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config directory not found")]
    NoConfigDir,
    #[error("failed to read config: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("validation failed: {0}")]
    ValidationError(String),
}

/// User-facing add-on settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub account: AccountConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountConfig {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl AccountConfig {
    /// Credentials are only used when both halves are present and non-empty.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(user), Some(pass)) if !user.is_empty() && !pass.is_empty() => Some((user, pass)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaybackConfig {
    /// Preferred quality tag, e.g. "480p"
    #[serde(default = "default_video_quality")]
    pub video_quality: String,
    /// Hide clips and trailers (media without an episode number)
    #[serde(default = "default_hide_clips")]
    pub hide_clips: bool,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_poll_attempts")]
    pub poll_attempts: u32,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            video_quality: default_video_quality(),
            hide_clips: default_hide_clips(),
            poll_interval_ms: default_poll_interval_ms(),
            poll_attempts: default_poll_attempts(),
        }
    }
}

impl PlaybackConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn default_video_quality() -> String {
    "480p".to_string()
}

fn default_hide_clips() -> bool {
    true
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_poll_attempts() -> u32 {
    30
}

#[derive(Default, Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub temp_dir: Option<PathBuf>,
    pub state_file: Option<PathBuf>,
}

impl StorageConfig {
    pub fn temp_dir(&self) -> PathBuf {
        self.temp_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("crispyloaf"))
    }

    /// Location of the JSON key-value store holding the API session state.
    pub fn state_file(&self) -> PathBuf {
        self.state_file.clone().unwrap_or_else(|| {
            ProjectDirs::from("", "", "crispyloaf")
                .map(|dirs| dirs.data_dir().join("storage.json"))
                .unwrap_or_else(|| self.temp_dir().join("storage.json"))
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Settings {
    /// Load settings from the platform config dir, falling back to defaults
    /// when no config file exists yet.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(contents)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn config_path() -> Result<PathBuf, ConfigError> {
        ProjectDirs::from("", "", "crispyloaf")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .ok_or(ConfigError::NoConfigDir)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.playback.video_quality.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "playback.video_quality cannot be empty".to_string(),
            ));
        }

        if self.playback.poll_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "playback.poll_attempts must be at least 1".to_string(),
            ));
        }

        let has_user = self.account.username.as_deref().is_some_and(|u| !u.is_empty());
        let has_pass = self.account.password.as_deref().is_some_and(|p| !p.is_empty());
        if has_user != has_pass {
            return Err(ConfigError::ValidationError(
                "account.username and account.password must be set together".to_string(),
            ));
        }

        Ok(())
    }
}
