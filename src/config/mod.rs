use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::catalog::youtube::DEFAULT_API_BASE;
use crate::HarvestError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// YouTube access
    pub youtube: YoutubeConfig,

    /// Text repair services
    pub services: ServicesConfig,

    /// Run behaviour
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct YoutubeConfig {
    /// Data API key (overridden by `YOUTUBE_API_KEY`)
    pub api_key: String,

    /// Data API base URL
    pub api_base_url: String,

    /// Host used in archived watch links
    pub watch_host: String,

    /// yt-dlp executable used to list caption tracks
    pub yt_dlp_path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServicesConfig {
    /// Punctuation restoration endpoint
    pub punctuation_url: String,

    /// LibreTranslate-compatible translation endpoint
    pub translation_url: String,

    /// Optional translation API key
    pub translation_api_key: Option<String>,

    /// Request timeout in seconds for both services
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Root directory holding one sub-directory per query
    pub output_root: PathBuf,

    /// Minimum share of the raw transcript length the repaired text must keep
    pub min_length_ratio: f64,

    /// Lower bound of the pause between top-level videos, in seconds
    pub pace_min_secs: f64,

    /// Upper bound of the pause between top-level videos, in seconds
    pub pace_max_secs: f64,
}

impl Default for YoutubeConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base_url: DEFAULT_API_BASE.to_string(),
            watch_host: "www.youtube.com".to_string(),
            yt_dlp_path: "yt-dlp".to_string(),
        }
    }
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            punctuation_url: "http://127.0.0.1:8008/punctuate".to_string(),
            translation_url: "http://127.0.0.1:5000/translate".to_string(),
            translation_api_key: None,
            timeout_secs: 120,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from("transcripts"),
            min_length_ratio: 0.8,
            pace_min_secs: 5.0,
            pace_max_secs: 10.0,
        }
    }
}

impl Config {
    /// Load configuration from file or create default
    pub async fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            let config = Self::default();
            config.save_to(&config_path)?;
            tracing::info!("Wrote default configuration to {}", config_path.display());
            Ok(config)
        }
    }

    /// Load and validate a configuration file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs_err::read_to_string(path).context("Failed to read config file")?;

        let config: Config =
            serde_yaml::from_str(&content).context("Failed to parse config file")?;

        config.validate()?;
        Ok(config)
    }

    fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self).context("Failed to serialize config")?;

        fs_err::write(config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    /// Get configuration file path
    pub fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir().context("Could not determine config directory")?;

        Ok(config_dir.join("transcript-harvester").join("config.yaml"))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let pipeline = &self.pipeline;

        if !(pipeline.min_length_ratio > 0.0 && pipeline.min_length_ratio <= 1.0) {
            return Err(HarvestError::ConfigError(format!(
                "pipeline.min_length_ratio must be in (0, 1], got {}",
                pipeline.min_length_ratio
            ))
            .into());
        }

        let representable =
            |secs: f64| secs >= 0.0 && Duration::try_from_secs_f64(secs).is_ok();
        if !representable(pipeline.pace_min_secs)
            || !representable(pipeline.pace_max_secs)
            || pipeline.pace_max_secs < pipeline.pace_min_secs
        {
            return Err(HarvestError::ConfigError(format!(
                "pipeline pace window [{}, {}] is invalid",
                pipeline.pace_min_secs, pipeline.pace_max_secs
            ))
            .into());
        }

        if self.youtube.watch_host.trim().is_empty() {
            return Err(HarvestError::ConfigError("youtube.watch_host must be set".into()).into());
        }

        Ok(())
    }

    /// Replace the file's API key when one is supplied on the command line or environment
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        if let Some(key) = api_key.filter(|key| !key.trim().is_empty()) {
            self.youtube.api_key = key;
        }
        self
    }

    /// The API key, which harvesting cannot do without
    pub fn require_api_key(&self) -> Result<&str> {
        if self.youtube.api_key.trim().is_empty() {
            return Err(HarvestError::ConfigError(
                "YouTube API key missing: set youtube.api_key or YOUTUBE_API_KEY".into(),
            )
            .into());
        }
        Ok(&self.youtube.api_key)
    }

    pub fn service_timeout(&self) -> Duration {
        Duration::from_secs(self.services.timeout_secs)
    }

    /// Display current configuration
    pub fn display(&self) {
        let key = if self.youtube.api_key.is_empty() {
            "(not set)".to_string()
        } else {
            format!("{}…", self.youtube.api_key.chars().take(4).collect::<String>())
        };

        println!("Current Configuration:");
        println!("  YouTube API Key: {}", key);
        println!("  YouTube API: {}", self.youtube.api_base_url);
        println!("  Watch Host: {}", self.youtube.watch_host);
        println!("  yt-dlp: {}", self.youtube.yt_dlp_path);
        println!("  Punctuation Service: {}", self.services.punctuation_url);
        println!("  Translation Service: {}", self.services.translation_url);
        println!("  Output Root: {}", self.pipeline.output_root.display());
        println!("  Min Length Ratio: {}", self.pipeline.min_length_ratio);
        println!(
            "  Pacing: {}-{}s",
            self.pipeline.pace_min_secs, self.pipeline.pace_max_secs
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.pipeline.min_length_ratio, 0.8);
        assert_eq!(config.pipeline.pace_min_secs, 5.0);
        assert_eq!(config.pipeline.pace_max_secs, 10.0);
    }

    #[test]
    fn test_partial_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        fs_err::write(&path, "pipeline:\n  min_length_ratio: 0.5\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.pipeline.min_length_ratio, 0.5);
        assert_eq!(config.pipeline.pace_max_secs, 10.0);
        assert_eq!(config.youtube.watch_host, "www.youtube.com");
    }

    #[test]
    fn test_round_trip_through_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.yaml");
        let mut config = Config::default();
        config.youtube.api_key = "abc".to_string();

        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let mut config = Config::default();
        config.pipeline.min_length_ratio = 1.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.pipeline.pace_min_secs = 10.0;
        config.pipeline.pace_max_secs = 5.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unrepresentable_pace_window_is_a_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");

        fs_err::write(&path, "pipeline:\n  pace_min_secs: .nan\n  pace_max_secs: 2.0\n").unwrap();
        assert!(Config::load_from(&path).is_err());

        fs_err::write(&path, "pipeline:\n  pace_max_secs: 1.0e300\n").unwrap();
        assert!(Config::load_from(&path).is_err());

        fs_err::write(&path, "pipeline:\n  pace_max_secs: .inf\n").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_api_key_override() {
        let config = Config::default();
        assert!(config.require_api_key().is_err());

        let config = config.with_api_key(Some("from-env".to_string()));
        assert_eq!(config.require_api_key().unwrap(), "from-env");

        let config = config.with_api_key(Some("  ".to_string()));
        assert_eq!(config.require_api_key().unwrap(), "from-env");
    }
}
