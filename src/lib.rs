pub mod audio;
pub mod config;
pub mod episode;
pub mod error;
pub mod feed;
pub mod http;
pub mod ledger;
pub mod llm;
pub mod pipeline;
pub mod progress;
pub mod subtitle;
pub mod timeline;
pub mod transcribe;
pub mod transcript;

// Re-export main types for convenience
pub use audio::AudioEditor;
pub use config::Settings;
pub use error::{
    AudioError, ConfigError, DownloadError, FeedError, LedgerError, LlmError, PipelineError,
    SubtitleError, TranscribeError,
};
pub use feed::{Episode, Podcast, load_feed, parse_feed};
pub use http::{HttpClient, HttpResponse, ReqwestClient};
pub use ledger::{Ledger, LedgerRecord};
pub use llm::{AdSegment, OpenAiClassifier, OpenAiProcessor, SegmentClassifier, TranscriptProcessor};
pub use pipeline::{Pipeline, PipelineOptions, RunSummary};
pub use progress::{NoopReporter, ProgressEvent, ProgressReporter, SharedProgressReporter};
pub use subtitle::{SubtitleSegment, format_srt, parse_srt};
pub use timeline::{TimeInterval, keep_intervals};
pub use transcribe::{Transcriber, WhisperTranscriber};
