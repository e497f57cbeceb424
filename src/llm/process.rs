//! Transcript content processing: speaker attribution, segmentation, and
//! translation via the hosted language model.
//!
//! Long transcripts are split into chunks at sentence boundaries and
//! processed one request at a time; the results are joined with a
//! separator line.

use std::sync::LazyLock;
use std::time::Duration;

use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use regex::Regex;
use tracing::{info, warn};

use crate::config::LlmSettings;
use crate::error::LlmError;

use super::client::create_client_with_timeout;

/// Separator between independently processed chunks
const CHUNK_SEPARATOR: &str = "\n\n---\n\n";

/// Minimum tokens reserved for a chunk's response
const MIN_RESPONSE_TOKENS: u32 = 6000;

/// Trait for transcript content processing services
#[async_trait]
pub trait TranscriptProcessor: Send + Sync {
    /// Process a transcript: attribute speakers, segment, and translate
    async fn process(&self, transcript: &str, title: Option<&str>) -> Result<String, LlmError>;
}

const SYSTEM_PROMPT: &str = "You are a podcast content editor. You can:\n\
1. Recognize different speakers from their style and wording\n\
2. Follow the context and logic of a conversation\n\
3. Translate naturally into Chinese while keeping the original tone\n\
4. Break text into coherent paragraphs\n\n\
Work carefully; translation quality and sensible paragraphing matter.";

fn chunk_prompt(
    chunk: &str,
    title: Option<&str>,
    chunk_index: Option<(usize, usize)>,
) -> String {
    let chunk_note = match chunk_index {
        Some((index, total)) => format!(
            "\nNote: this is part {index}/{total}; keep the format consistent and do not add part markers."
        ),
        None => String::new(),
    };

    format!(
        "Process the following English podcast transcript.\n\n\
## Steps\n\n\
### 1. Identify speakers\n\
Attribute each passage to a speaker by style and wording; \
use [Speaker] or [Host] when unsure.\n\n\
### 2. Paragraph the text\n\
Break at natural topic changes, three to five sentences per paragraph.\n\n\
### 3. Translate\n\
Translate into natural, fluent Chinese, keeping the original tone. \
Keep important English terms (brand names, technical words) with a note in parentheses.\n\n\
Episode title: {}{chunk_note}\n\n\
Transcript:\n{chunk}\n\n\
## Output format\n\n\
[Speaker 1]:\n[English original]\n[Chinese translation]\n\n\
[Speaker 2]:\n[English original]\n[Chinese translation]\n\n\
...\n\n\
Every passage must contain the English original first and the Chinese translation below it.",
        title.unwrap_or("unknown"),
    )
}

/// Processor backed by an OpenAI chat model
pub struct OpenAiProcessor {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    temperature: f32,
    max_chunk_chars: usize,
}

impl OpenAiProcessor {
    pub fn new(settings: &LlmSettings) -> Self {
        Self {
            client: create_client_with_timeout(Duration::from_secs(settings.request_timeout_secs)),
            model: settings.model.clone(),
            temperature: settings.process_temperature,
            max_chunk_chars: settings.max_chunk_chars,
        }
    }

    async fn process_chunk(
        &self,
        chunk: &str,
        title: Option<&str>,
        chunk_index: Option<(usize, usize)>,
    ) -> Result<String, LlmError> {
        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(SYSTEM_PROMPT)
                .build()
                .map_err(|e| LlmError::Api(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(chunk_prompt(chunk, title, chunk_index))
                .build()
                .map_err(|e| LlmError::Api(e.to_string()))?
                .into(),
        ];

        // The answer carries the original plus a translation, so reserve
        // room for roughly twice the input
        let estimated_tokens = (chunk.len() * 2 / 4) as u32;
        let max_tokens = estimated_tokens.max(MIN_RESPONSE_TOKENS);

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(self.temperature)
            .max_tokens(max_tokens)
            .build()
            .map_err(|e| LlmError::Api(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| LlmError::Api(e.to_string()))?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.as_ref())
            .ok_or(LlmError::EmptyResponse)?
            .clone();

        if content.ends_with("...") || content.len() < chunk.len() * 3 / 10 {
            warn!(
                response_len = content.len(),
                chunk_len = chunk.len(),
                "processed chunk looks truncated"
            );
        }

        Ok(content)
    }
}

#[async_trait]
impl TranscriptProcessor for OpenAiProcessor {
    async fn process(&self, transcript: &str, title: Option<&str>) -> Result<String, LlmError> {
        let chunks = split_into_chunks(transcript, self.max_chunk_chars);

        if chunks.len() == 1 {
            info!(chars = transcript.len(), "processing transcript in one request");
            return self.process_chunk(&chunks[0], title, None).await;
        }

        info!(
            chars = transcript.len(),
            chunks = chunks.len(),
            "processing transcript in chunks"
        );

        let total = chunks.len();
        let mut processed = Vec::with_capacity(total);

        for (i, chunk) in chunks.iter().enumerate() {
            let part = self
                .process_chunk(chunk, title, Some((i + 1, total)))
                .await?;
            processed.push(part);
        }

        Ok(processed.join(CHUNK_SEPARATOR))
    }
}

static SENTENCE_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]+\s+").expect("valid sentence boundary pattern"));

/// Split text into chunks of at most `max_chunk_chars`, preferring sentence
/// boundaries.
///
/// A single sentence longer than the limit becomes its own oversized chunk
/// rather than being cut mid-sentence.
pub fn split_into_chunks(text: &str, max_chunk_chars: usize) -> Vec<String> {
    if text.len() <= max_chunk_chars {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();

    for sentence in split_sentences(text) {
        if !current.is_empty() && current.len() + sentence.len() > max_chunk_chars {
            chunks.push(current.trim().to_string());
            current.clear();
        }
        current.push_str(sentence);
    }

    if !current.trim().is_empty() {
        chunks.push(current.trim().to_string());
    }

    chunks
}

/// Split text into sentences, each keeping its terminator and trailing
/// whitespace
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;

    for boundary in SENTENCE_BOUNDARY.find_iter(text) {
        sentences.push(&text[start..boundary.end()]);
        start = boundary.end();
    }

    if start < text.len() {
        sentences.push(&text[start..]);
    }

    sentences
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_a_single_chunk() {
        let chunks = split_into_chunks("One sentence. Another one.", 100);
        assert_eq!(chunks, vec!["One sentence. Another one."]);
    }

    #[test]
    fn long_text_splits_at_sentence_boundaries() {
        let text = "First sentence here. Second sentence here. Third sentence here.";
        let chunks = split_into_chunks(text, 45);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], "First sentence here. Second sentence here.");
        assert_eq!(chunks[1], "Third sentence here.");
    }

    #[test]
    fn every_chunk_respects_the_limit_when_sentences_fit() {
        let text = "Alpha beta gamma. ".repeat(50);
        let chunks = split_into_chunks(&text, 100);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.len() <= 100, "chunk too long: {}", chunk.len());
        }
    }

    #[test]
    fn oversized_sentence_becomes_its_own_chunk() {
        let long_sentence = format!("{} end.", "word ".repeat(40));
        let text = format!("Short one. {long_sentence}");
        let chunks = split_into_chunks(&text, 50);

        assert_eq!(chunks[0], "Short one.");
        assert!(chunks[1].len() > 50);
    }

    #[test]
    fn question_and_exclamation_marks_are_boundaries() {
        let text = "Really? Yes! Good.";
        let sentences = split_sentences(text);
        assert_eq!(sentences, vec!["Really? ", "Yes! ", "Good."]);
    }

    #[test]
    fn chunk_prompt_mentions_part_numbers() {
        let prompt = chunk_prompt("text", Some("My Show"), Some((2, 3)));
        assert!(prompt.contains("part 2/3"));
        assert!(prompt.contains("My Show"));

        let prompt = chunk_prompt("text", None, None);
        assert!(!prompt.contains("part "));
        assert!(prompt.contains("unknown"));
    }
}
