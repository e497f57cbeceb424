//! Hosted language model integration: intro/outro classification and
//! transcript content processing.

mod classify;
mod client;
mod process;

pub use classify::{AdSegment, OpenAiClassifier, SegmentClassifier, parse_ad_response};
pub use client::{create_client, create_client_with_timeout};
pub use process::{OpenAiProcessor, TranscriptProcessor, split_into_chunks};
