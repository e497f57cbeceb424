//! Speech-to-text transcription.
//!
//! Transcription is an external service behind the [`Transcriber`] trait:
//! audio file in, ordered timestamped segments out.

mod whisper;

pub use whisper::WhisperTranscriber;

use std::path::Path;

use async_trait::async_trait;

use crate::error::TranscribeError;
use crate::subtitle::SubtitleSegment;

/// Trait for transcription services
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe an audio file into ordered, timestamped segments
    async fn transcribe(&self, audio_path: &Path) -> Result<Vec<SubtitleSegment>, TranscribeError>;
}
