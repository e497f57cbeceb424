use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when fetching or parsing RSS feeds
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Failed to fetch feed from {url}: {source}")]
    FetchFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to read feed file {path}: {source}")]
    FileReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse RSS feed: {0}")]
    ParseFailed(#[from] rss::Error),

    #[error("Invalid feed URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Episode '{title}' has no enclosure (audio file)")]
    MissingEnclosure { title: String },
}

/// Errors that can occur during episode downloads
#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("HTTP request failed for {url}: {source}")]
    HttpFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP error {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Failed to create file {path}: {source}")]
    FileCreateFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write to file {path}: {source}")]
    FileWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Stream error while downloading {url}: {source}")]
    StreamFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Download of {url} stalled: no data for {idle_secs}s")]
    Stalled { url: String, idle_secs: u64 },

    #[error("Download of {url} failed after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        last_error: String,
    },
}

/// Errors that can occur writing the episode ledgers.
///
/// Reads never fail: an unreadable ledger file is treated as empty.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Failed to write ledger file {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize ledger: {0}")]
    SerializeFailed(#[from] serde_json::Error),
}

/// Errors that can occur parsing subtitle files or timestamps
#[derive(Error, Debug)]
pub enum SubtitleError {
    #[error("Invalid SRT timestamp '{0}'")]
    InvalidTimestamp(String),

    #[error("Failed to read subtitle file {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that can occur during transcription
#[derive(Error, Debug)]
pub enum TranscribeError {
    #[error("Failed to read audio file {path}: {source}")]
    AudioReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Transcription request failed: {0}")]
    Api(String),
}

/// Errors that can occur talking to the hosted language model
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Language model request failed: {0}")]
    Api(String),

    #[error("Language model returned an empty response")]
    EmptyResponse,

    #[error("No JSON object found in language model response")]
    NoJsonObject,

    #[error("Failed to parse language model response: {0}")]
    MalformedResponse(#[from] serde_json::Error),

    #[error("Bad timestamp in language model response: {0}")]
    Subtitle(#[from] SubtitleError),
}

/// Errors that can occur while editing audio with the external media tool
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("External tool not found: {0}. Install it and make sure it is in PATH")]
    ToolNotFound(String),

    #[error("{tool} exited with an error: {stderr}")]
    ToolFailed { tool: String, stderr: String },

    #[error("{tool} did not finish within {secs}s")]
    ToolTimeout { tool: String, secs: u64 },

    #[error("Could not determine duration of {0}")]
    DurationUnavailable(PathBuf),

    #[error("Removal segments cover the entire audio, nothing would remain")]
    NothingToKeep,

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that can occur loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    ParseFailed(#[from] toml::de::Error),
}

/// Top-level error for a pipeline run or a single episode
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),

    #[error("Download error: {0}")]
    Download(#[from] DownloadError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Subtitle error: {0}")]
    Subtitle(#[from] SubtitleError),

    #[error("Transcription error: {0}")]
    Transcribe(#[from] TranscribeError),

    #[error("Language model error: {0}")]
    Llm(#[from] LlmError),

    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
