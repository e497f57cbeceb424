//! TOML configuration.
//!
//! Every section has defaults so a minimal config only needs the feed URL.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub feed: FeedSettings,
    pub paths: PathSettings,
    pub download: DownloadSettings,
    pub transcription: TranscriptionSettings,
    pub llm: LlmSettings,
    pub audio: AudioSettings,
}

/// Feed source settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedSettings {
    /// RSS feed URL or path to a local RSS file
    pub url: String,
}

/// On-disk layout for pipeline artifacts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    /// Directory for downloaded episode audio
    pub raw_audio: PathBuf,
    /// Directory for cleaned episode audio
    pub processed_audio: PathBuf,
    /// Directory for SRT subtitle tracks
    pub srt: PathBuf,
    /// Directory for plain-text transcripts
    pub txt: PathBuf,
    /// Directory for processed (translated, cleaned) transcripts
    pub output: PathBuf,
    /// Ledger of downloaded episodes
    pub downloaded_ledger: PathBuf,
    /// Ledger of fully processed episodes
    pub processed_ledger: PathBuf,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            raw_audio: PathBuf::from("data/raw"),
            processed_audio: PathBuf::from("data/processed"),
            srt: PathBuf::from("transcripts/srt"),
            txt: PathBuf::from("transcripts/txt"),
            output: PathBuf::from("outputs"),
            downloaded_ledger: PathBuf::from("data/downloaded_episodes.json"),
            processed_ledger: PathBuf::from("data/processed_episodes.json"),
        }
    }
}

/// Download tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadSettings {
    /// Connect timeout in seconds
    pub connect_timeout_secs: u64,
    /// Abort the download when no bytes arrive for this long
    pub stall_timeout_secs: u64,
    /// Attempts per episode before giving up
    pub max_retries: u32,
    /// Base delay between attempts; doubled after each failure
    pub retry_backoff_secs: u64,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 30,
            stall_timeout_secs: 60,
            max_retries: 3,
            retry_backoff_secs: 5,
        }
    }
}

/// Transcription service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionSettings {
    /// Speech-to-text model identifier
    pub model: String,
    /// Optional language hint passed to the model
    pub language: Option<String>,
}

impl Default for TranscriptionSettings {
    fn default() -> Self {
        Self {
            model: "whisper-1".to_string(),
            language: None,
        }
    }
}

/// Hosted language model settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Chat model identifier
    pub model: String,
    /// Temperature for ad-segment detection; low for timestamp accuracy
    pub detect_temperature: f32,
    /// Temperature for transcript processing
    pub process_temperature: f32,
    /// Maximum characters per transcript chunk sent to the model
    pub max_chunk_chars: usize,
    /// Request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            detect_temperature: 0.1,
            process_temperature: 0.5,
            max_chunk_chars: 3000,
            request_timeout_secs: 300,
        }
    }
}

/// External media tool settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// ffmpeg executable; resolved via PATH when not absolute
    pub ffmpeg: String,
    /// ffprobe executable; resolved via PATH when not absolute
    pub ffprobe: String,
    /// Timeout in seconds for a single tool invocation
    pub tool_timeout_secs: u64,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
            tool_timeout_secs: 600,
        }
    }
}

impl Settings {
    /// Load settings from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(toml::from_str(&content)?)
    }

    /// Load settings from a TOML file, falling back to defaults when the
    /// file does not exist
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults_are_sensible() {
        let settings = Settings::default();

        assert_eq!(settings.transcription.model, "whisper-1");
        assert_eq!(settings.audio.ffmpeg, "ffmpeg");
        assert_eq!(settings.download.max_retries, 3);
        assert_eq!(settings.paths.raw_audio, PathBuf::from("data/raw"));
    }

    #[test]
    fn partial_config_fills_in_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[feed]
url = "https://example.com/feed.xml"

[llm]
model = "gpt-4o"
"#,
        )
        .unwrap();

        let settings = Settings::load(&path).unwrap();

        assert_eq!(settings.feed.url, "https://example.com/feed.xml");
        assert_eq!(settings.llm.model, "gpt-4o");
        assert_eq!(settings.llm.max_chunk_chars, 3000);
        assert_eq!(settings.download.stall_timeout_secs, 60);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let settings = Settings::load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert!(settings.feed.url.is_empty());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "feed = {{{").unwrap();

        assert!(Settings::load(&path).is_err());
    }
}
