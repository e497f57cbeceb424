//! Intro/outro segment detection via the hosted language model.
//!
//! The model receives the whole SRT track and answers with a JSON object
//! listing the time ranges it judges to be intro or outro content. The
//! answer may be wrapped in markdown fences or commentary, so the outermost
//! JSON object is located by pattern rather than trusting the response to
//! be pure JSON.

use std::sync::LazyLock;
use std::time::Duration;

use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::LlmSettings;
use crate::error::LlmError;
use crate::subtitle::timestamp_to_seconds;
use crate::timeline::TimeInterval;

use super::client::create_client_with_timeout;

/// A time range the classifier wants removed, with its justification
#[derive(Debug, Clone)]
pub struct AdSegment {
    pub interval: TimeInterval,
    pub reason: String,
}

/// Trait for intro/outro classification services
#[async_trait]
pub trait SegmentClassifier: Send + Sync {
    /// Classify intro/outro time ranges in an SRT subtitle track
    async fn detect_ads(&self, srt_content: &str) -> Result<Vec<AdSegment>, LlmError>;
}

const MAX_RESPONSE_TOKENS: u32 = 3000;

const SYSTEM_PROMPT: &str = "You are a podcast content analyst. You can:\n\
1. Accurately identify a podcast's intro and outro time ranges\n\
2. Read SRT subtitle timestamps\n\
3. Recognize greeting and farewell language patterns\n\
4. Extract precise time ranges\n\n\
Analyze carefully and double-check every timestamp.";

fn detection_prompt(srt_content: &str) -> String {
    format!(
        "Analyze the following SRT subtitle file and identify the intro and outro segments.\n\n\
## Steps\n\n\
### 1. Find the intro\n\
Intros usually open with a greeting (\"Hey Lindsay, how are you today?\", \
\"Hey there, what's shakin'?\"), followed by show and host introductions. \
The intro ends where the main topic starts.\n\n\
### 2. Find the outro\n\
Outros usually close with farewells (\"bye\", \"see you next time\", \"goodbye\" plus a name), \
often preceded by a summary, a preview of the next episode, or thanks. \
The outro starts where the main topic ends.\n\n\
### 3. Extract the time ranges\n\
Use the SRT timestamps: the intro runs from the first greeting to the start of the main topic, \
the outro from the start of the farewells to the last line.\n\n\
## SRT content\n{srt_content}\n\n\
## Output\n\
Reply with a JSON object of this exact shape:\n\
{{\n  \"ad_segments\": [\n    {{\n      \"start_time\": \"00:00:00,000\",\n      \"end_time\": \"00:01:30,000\",\n      \"reason\": \"intro: greeting and show introduction\"\n    }}\n  ]\n}}\n\n\
Rules:\n\
- Times must use the SRT format HH:MM:SS,mmm\n\
- Return an empty ad_segments array when there is no intro or outro\n\
- Return only the JSON, no other text"
    )
}

/// Classifier backed by an OpenAI chat model
pub struct OpenAiClassifier {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    temperature: f32,
}

impl OpenAiClassifier {
    pub fn new(settings: &LlmSettings) -> Self {
        Self {
            client: create_client_with_timeout(Duration::from_secs(settings.request_timeout_secs)),
            model: settings.model.clone(),
            temperature: settings.detect_temperature,
        }
    }
}

#[async_trait]
impl SegmentClassifier for OpenAiClassifier {
    async fn detect_ads(&self, srt_content: &str) -> Result<Vec<AdSegment>, LlmError> {
        info!(model = %self.model, "detecting intro/outro segments");

        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(SYSTEM_PROMPT)
                .build()
                .map_err(|e| LlmError::Api(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(detection_prompt(srt_content))
                .build()
                .map_err(|e| LlmError::Api(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(self.temperature)
            .max_tokens(MAX_RESPONSE_TOKENS)
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
            .ok_or(LlmError::EmptyResponse)?;

        let segments = parse_ad_response(content)?;
        debug!(count = segments.len(), "classifier returned segments");
        Ok(segments)
    }
}

#[derive(Debug, Deserialize)]
struct RawAdResponse {
    #[serde(default)]
    ad_segments: Vec<RawAdSegment>,
}

#[derive(Debug, Deserialize)]
struct RawAdSegment {
    start_time: String,
    end_time: String,
    #[serde(default)]
    reason: String,
}

static JSON_OBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("valid JSON object pattern"));

/// Parse the model's answer, locating the outermost JSON object first
pub fn parse_ad_response(response: &str) -> Result<Vec<AdSegment>, LlmError> {
    let json_str = JSON_OBJECT
        .find(response)
        .map(|m| m.as_str())
        .ok_or(LlmError::NoJsonObject)?;

    let raw: RawAdResponse = serde_json::from_str(json_str)?;

    raw.ad_segments
        .into_iter()
        .map(|segment| {
            let start = timestamp_to_seconds(&segment.start_time)?;
            let end = timestamp_to_seconds(&segment.end_time)?;
            Ok(AdSegment {
                interval: TimeInterval::new(start, end),
                reason: segment.reason,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pure_json_response() {
        let response = r#"{"ad_segments": [
            {"start_time": "00:00:00,000", "end_time": "00:01:30,000", "reason": "intro"},
            {"start_time": "00:15:00,000", "end_time": "00:16:00,000", "reason": "outro"}
        ]}"#;

        let segments = parse_ad_response(response).unwrap();

        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].interval, TimeInterval::new(0.0, 90.0));
        assert_eq!(segments[0].reason, "intro");
        assert_eq!(segments[1].interval, TimeInterval::new(900.0, 960.0));
    }

    #[test]
    fn parses_json_wrapped_in_markdown_fences() {
        let response = "Here is the analysis you asked for:\n```json\n{\"ad_segments\": [{\"start_time\": \"00:00:05,500\", \"end_time\": \"00:00:45,000\", \"reason\": \"intro\"}]}\n```\nLet me know if you need more.";

        let segments = parse_ad_response(response).unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].interval, TimeInterval::new(5.5, 45.0));
    }

    #[test]
    fn empty_segment_array_is_ok() {
        let segments = parse_ad_response(r#"{"ad_segments": []}"#).unwrap();
        assert!(segments.is_empty());

        // Missing key entirely also means "nothing found"
        let segments = parse_ad_response(r#"{}"#).unwrap();
        assert!(segments.is_empty());
    }

    #[test]
    fn response_without_json_is_an_error() {
        assert!(matches!(
            parse_ad_response("I could not find any segments."),
            Err(LlmError::NoJsonObject)
        ));
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(
            parse_ad_response(r#"{"ad_segments": [{"start_time": }]}"#),
            Err(LlmError::MalformedResponse(_))
        ));
    }

    #[test]
    fn bad_timestamp_is_an_error() {
        let response = r#"{"ad_segments": [{"start_time": "0:0:0", "end_time": "00:01:00,000"}]}"#;
        assert!(matches!(
            parse_ad_response(response),
            Err(LlmError::Subtitle(_))
        ));
    }
}
