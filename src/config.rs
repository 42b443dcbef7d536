//! Configuration system using TOML files.
//!
//! Config is stored in the OS-standard config directory:
//! - Windows: %APPDATA%\audio-fingerprint\config.toml
//! - macOS: ~/Library/Application Support/audio-fingerprint/config.toml
//! - Linux: ~/.config/audio-fingerprint/config.toml
//!
//! Every section is optional; missing keys fall back to the standard
//! fingerprinting parameters (11025 Hz mono, 4096-sample windows with 2/3
//! overlap, 28-3520 Hz chroma range).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::FingerprintError;

/// Default target sample rate for fingerprinting.
pub const DEFAULT_SAMPLE_RATE: u32 = 11025;

/// Default target channel count.
pub const DEFAULT_CHANNELS: u16 = 1;

/// Fingerprinting configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Target PCM format
    pub audio: AudioConfig,

    /// Feature extraction parameters
    pub analysis: AnalysisConfig,

    /// Execution settings
    pub pipeline: PipelineConfig,
}

/// Target PCM format the decoder produces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Sample rate in Hz
    pub sample_rate: u32,

    /// Channel count (1 or 2)
    pub channels: u16,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: DEFAULT_CHANNELS,
        }
    }
}

/// Chroma analysis parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Analysis window length in samples
    pub window_size: usize,

    /// Distance between consecutive windows in samples
    pub hop_size: usize,

    /// Lowest frequency folded into the chroma bins (Hz)
    pub min_freq: f32,

    /// Highest frequency folded into the chroma bins (Hz)
    pub max_freq: f32,

    /// Frames whose energy norm falls below this are zeroed
    pub silence_threshold: f32,

    /// Shortest input accepted, in seconds
    pub min_duration_secs: f64,

    /// Only analyse this many leading seconds (None = whole input)
    pub max_duration_secs: Option<f64>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            window_size: 4096,
            hop_size: 4096 / 3,
            min_freq: 28.0,
            max_freq: 3520.0,
            silence_threshold: 0.01,
            min_duration_secs: 1.0,
            max_duration_secs: None,
        }
    }
}

/// Pipeline execution settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Decode on a worker thread feeding the extractor through a bounded channel
    pub pipelined: bool,

    /// Capacity of the decoder → extractor channel, in chunks
    pub buffer_chunks: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            pipelined: true,
            buffer_chunks: 16,
        }
    }
}

impl Config {
    /// Default configuration targeting the given PCM format.
    pub fn with_format(sample_rate: u32, channels: u16) -> Self {
        Self {
            audio: AudioConfig {
                sample_rate,
                channels,
            },
            ..Default::default()
        }
    }

    /// Reject values that cannot produce a fingerprint.
    pub fn validate(&self) -> Result<(), FingerprintError> {
        let rate = self.audio.sample_rate;
        if !(8_000..=192_000).contains(&rate) {
            return Err(FingerprintError::config(format!(
                "sample_rate must be 8000-192000 Hz, got {rate}"
            )));
        }
        if !(1..=2).contains(&self.audio.channels) {
            return Err(FingerprintError::config(format!(
                "channels must be 1 or 2, got {}",
                self.audio.channels
            )));
        }

        let a = &self.analysis;
        if a.window_size < 512 {
            return Err(FingerprintError::config(format!(
                "window_size must be at least 512, got {}",
                a.window_size
            )));
        }
        if a.hop_size == 0 || a.hop_size > a.window_size {
            return Err(FingerprintError::config(format!(
                "hop_size must be in 1..={}, got {}",
                a.window_size, a.hop_size
            )));
        }
        let nyquist = rate as f32 / 2.0;
        if !(a.min_freq > 0.0 && a.min_freq < a.max_freq && a.max_freq < nyquist) {
            return Err(FingerprintError::config(format!(
                "frequency range {}-{} Hz must lie inside 0-{} Hz",
                a.min_freq, a.max_freq, nyquist
            )));
        }
        if !(a.silence_threshold >= 0.0 && a.min_duration_secs >= 0.0) {
            return Err(FingerprintError::config(
                "silence_threshold and min_duration_secs must be non-negative",
            ));
        }
        if let Some(max) = a.max_duration_secs
            && !(max > 0.0 && max.is_finite())
        {
            return Err(FingerprintError::config(format!(
                "max_duration_secs must be positive, got {max}"
            )));
        }
        if self.pipeline.buffer_chunks == 0 {
            return Err(FingerprintError::config("buffer_chunks must be at least 1"));
        }

        Ok(())
    }
}

// ============================================================================
// Config File Operations
// ============================================================================

/// Get the config directory path
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("audio-fingerprint"))
}

/// Get the full path to the config file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Load configuration from disk
///
/// Returns default config if file doesn't exist or can't be parsed.
/// Logs warnings but doesn't fail - we always return a usable config.
pub fn load() -> Config {
    let Some(path) = config_path() else {
        tracing::warn!("Could not determine config directory, using defaults");
        return Config::default();
    };

    if !path.exists() {
        tracing::debug!("No config file found at {:?}, using defaults", path);
        return Config::default();
    }

    match load_from(&path) {
        Ok(config) => {
            tracing::info!("Loaded config from {:?}", path);
            config
        }
        Err(e) => {
            tracing::error!("{}", e);
            tracing::warn!("Using default configuration");
            Config::default()
        }
    }
}

/// Load configuration from an explicit path, failing on any problem.
pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
    let contents =
        std::fs::read_to_string(path).map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
    toml::from_str(&contents).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))
}

/// Save configuration to the default location
///
/// Creates the config directory if it doesn't exist.
pub fn save(config: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path().ok_or(ConfigError::NoConfigDir)?;
    save_to(config, &path)?;
    Ok(path)
}

/// Save configuration to an explicit path
pub fn save_to(config: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| ConfigError::CreateDir(dir.to_path_buf(), e))?;
    }

    let contents = toml::to_string_pretty(config).map_err(ConfigError::Serialize)?;

    // Write atomically (write to temp, then rename)
    let temp_path = path.with_extension("toml.tmp");
    std::fs::write(&temp_path, &contents).map_err(|e| ConfigError::Write(temp_path.clone(), e))?;
    std::fs::rename(&temp_path, path)
        .map_err(|e| ConfigError::Rename(temp_path, path.to_path_buf(), e))?;

    tracing::info!("Saved config to {:?}", path);
    Ok(())
}

// ============================================================================
// Error Types
// ============================================================================

/// Configuration file errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read config file {0}: {1}")]
    Read(PathBuf, std::io::Error),

    #[error("Failed to parse config file {0}: {1}")]
    Parse(PathBuf, toml::de::Error),

    #[error("Failed to create config directory {0}: {1}")]
    CreateDir(PathBuf, std::io::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),

    #[error("Failed to write config to {0}: {1}")]
    Write(PathBuf, std::io::Error),

    #[error("Failed to rename temp file {0} to {1}: {2}")]
    Rename(PathBuf, PathBuf, std::io::Error),
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_serializes() {
        let config = Config::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("[audio]"));
        assert!(toml.contains("[analysis]"));
        assert!(toml.contains("[pipeline]"));
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.audio.sample_rate, 11025);
        assert_eq!(config.audio.channels, 1);
        assert_eq!(config.analysis.hop_size, 1365);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let toml = r#"
[analysis]
max_duration_secs = 120.0
"#;
        let config: Config = toml::from_str(toml).unwrap();

        assert_eq!(config.analysis.max_duration_secs, Some(120.0));
        assert_eq!(config.analysis.window_size, 4096);
        assert_eq!(config.audio.sample_rate, 11025);
        assert!(config.pipeline.pipelined);
    }

    #[test]
    fn test_validate_rejects_bad_channels() {
        let config = Config::with_format(11025, 3);
        assert!(matches!(
            config.validate(),
            Err(FingerprintError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_validate_rejects_range_above_nyquist() {
        // Nyquist at 8 kHz is 4 kHz
        let mut config = Config::with_format(8000, 1);
        config.analysis.max_freq = 4500.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_hop() {
        let mut config = Config::default();
        config.analysis.hop_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.analysis.max_duration_secs = Some(30.0);
        config.pipeline.pipelined = false;

        save_to(&config, &path).unwrap();
        let loaded = load_from(&path).unwrap();
        assert_eq!(loaded, config);
        assert!(!path.with_extension("toml.tmp").exists());
    }

    #[test]
    fn test_load_from_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[audio]\nsample_rate = \"fast\"\n").unwrap();

        assert!(matches!(load_from(&path), Err(ConfigError::Parse(_, _))));
    }
}
