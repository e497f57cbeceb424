//! OpenAI Whisper transcription implementation.

use std::path::Path;

use async_openai::types::{AudioResponseFormat, CreateTranscriptionRequestArgs};
use async_trait::async_trait;
use tracing::{debug, info};

use crate::config::TranscriptionSettings;
use crate::error::TranscribeError;
use crate::llm::create_client;
use crate::subtitle::SubtitleSegment;

use super::Transcriber;

/// OpenAI Whisper-based transcriber
pub struct WhisperTranscriber {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    language: Option<String>,
}

impl WhisperTranscriber {
    pub fn new(settings: &TranscriptionSettings) -> Self {
        Self {
            client: create_client(),
            model: settings.model.clone(),
            language: settings.language.clone(),
        }
    }
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    async fn transcribe(&self, audio_path: &Path) -> Result<Vec<SubtitleSegment>, TranscribeError> {
        info!(audio = %audio_path.display(), model = %self.model, "transcribing audio");

        let file_bytes =
            tokio::fs::read(audio_path)
                .await
                .map_err(|e| TranscribeError::AudioReadFailed {
                    path: audio_path.to_path_buf(),
                    source: e,
                })?;

        let file_name = audio_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.mp3")
            .to_string();

        let mut request_builder = CreateTranscriptionRequestArgs::default();
        request_builder
            .file(async_openai::types::AudioInput::from_vec_u8(
                file_name, file_bytes,
            ))
            .model(&self.model)
            .response_format(AudioResponseFormat::VerboseJson);

        if let Some(lang) = &self.language {
            request_builder.language(lang);
        }

        let request = request_builder
            .build()
            .map_err(|e| TranscribeError::Api(format!("Failed to build request: {e}")))?;

        let response = self
            .client
            .audio()
            .transcribe_verbose_json(request)
            .await
            .map_err(|e| TranscribeError::Api(format!("Whisper API error: {e}")))?;

        let segments: Vec<SubtitleSegment> = response
            .segments
            .map(|segs| {
                segs.iter()
                    .enumerate()
                    .map(|(i, s)| {
                        SubtitleSegment::new(
                            i + 1,
                            s.start as f64,
                            s.end as f64,
                            s.text.trim().to_string(),
                        )
                    })
                    .collect()
            })
            .unwrap_or_else(|| {
                // Fallback: one segment spanning the full response
                vec![SubtitleSegment::new(
                    1,
                    0.0,
                    response.duration as f64,
                    response.text.trim().to_string(),
                )]
            });

        debug!(segments = segments.len(), "transcription complete");
        Ok(segments)
    }
}
