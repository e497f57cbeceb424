//! SRT subtitle parsing and formatting.
//!
//! Internal time values are seconds as f64; conversion to and from the
//! `HH:MM:SS,mmm` form is exact to the millisecond.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::SubtitleError;
use crate::timeline::TimeInterval;

/// One time-stamped unit of transcribed text
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleSegment {
    /// 1-based sequence number; ordering by index equals ordering by start
    pub index: usize,
    pub interval: TimeInterval,
    pub text: String,
}

impl SubtitleSegment {
    pub fn new(index: usize, start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            index,
            interval: TimeInterval::new(start, end),
            text: text.into(),
        }
    }
}

static SRT_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?s)(\d+)\s*\n(\d{2}:\d{2}:\d{2},\d{3})\s*-->\s*(\d{2}:\d{2}:\d{2},\d{3})\s*\n(.*?)(?:\n\s*\n|\z)",
    )
    .expect("valid SRT block pattern")
});

/// Parse SRT content into segments.
///
/// Blocks that fail to parse are skipped rather than failing the whole
/// file; transcription output is occasionally ragged at the end.
pub fn parse_srt(content: &str) -> Vec<SubtitleSegment> {
    SRT_BLOCK
        .captures_iter(content)
        .filter_map(|cap| {
            let index: usize = cap[1].parse().ok()?;
            let start = timestamp_to_seconds(&cap[2]).ok()?;
            let end = timestamp_to_seconds(&cap[3]).ok()?;
            let text = cap[4].trim().to_string();
            Some(SubtitleSegment::new(index, start, end, text))
        })
        .collect()
}

/// Format segments as SRT: sequence number, time range, text, blank line
pub fn format_srt(segments: &[SubtitleSegment]) -> String {
    let mut output = String::new();

    for segment in segments {
        output.push_str(&format!("{}\n", segment.index));
        output.push_str(&format!(
            "{} --> {}\n",
            seconds_to_timestamp(segment.interval.start),
            seconds_to_timestamp(segment.interval.end)
        ));
        output.push_str(&segment.text);
        output.push_str("\n\n");
    }

    output
}

/// Join segment texts into a plain transcript
pub fn plain_text(segments: &[SubtitleSegment]) -> String {
    segments
        .iter()
        .map(|s| s.text.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse an `HH:MM:SS,mmm` timestamp into seconds
pub fn timestamp_to_seconds(timestamp: &str) -> Result<f64, SubtitleError> {
    let invalid = || SubtitleError::InvalidTimestamp(timestamp.to_string());

    let (time_part, millis_part) = timestamp.split_once(',').ok_or_else(invalid)?;

    let mut fields = time_part.split(':');
    let hours: u64 = fields.next().and_then(|f| f.parse().ok()).ok_or_else(invalid)?;
    let minutes: u64 = fields.next().and_then(|f| f.parse().ok()).ok_or_else(invalid)?;
    let seconds: u64 = fields.next().and_then(|f| f.parse().ok()).ok_or_else(invalid)?;
    if fields.next().is_some() || minutes > 59 || seconds > 59 {
        return Err(invalid());
    }

    let millis: u64 = millis_part.parse().map_err(|_| invalid())?;
    if millis_part.len() != 3 {
        return Err(invalid());
    }

    Ok((hours * 3600 + minutes * 60 + seconds) as f64 + millis as f64 / 1000.0)
}

/// Format seconds as an `HH:MM:SS,mmm` timestamp, rounding to the millisecond
pub fn seconds_to_timestamp(seconds: f64) -> String {
    let total_ms = (seconds * 1000.0).round() as u64;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let secs = (total_ms % 60_000) / 1000;
    let ms = total_ms % 1000;

    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_SRT: &str = "1\n00:00:00,000 --> 00:00:04,500\nHey Lindsay, how are you today?\n\n2\n00:00:04,500 --> 00:00:09,250\nI'm doing great, thanks for asking.\nReally great.\n\n3\n00:00:09,250 --> 00:00:12,000\nLet's get into today's topic.\n";

    #[test]
    fn parse_extracts_all_segments() {
        let segments = parse_srt(SAMPLE_SRT);

        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0].index, 1);
        assert_eq!(segments[0].interval.start, 0.0);
        assert_eq!(segments[0].interval.end, 4.5);
        assert_eq!(segments[0].text, "Hey Lindsay, how are you today?");
    }

    #[test]
    fn parse_keeps_multiline_text_blocks() {
        let segments = parse_srt(SAMPLE_SRT);
        assert_eq!(
            segments[1].text,
            "I'm doing great, thanks for asking.\nReally great."
        );
    }

    #[test]
    fn parse_empty_content_returns_no_segments() {
        assert!(parse_srt("").is_empty());
        assert!(parse_srt("not an srt file").is_empty());
    }

    #[test]
    fn format_round_trips_through_parse() {
        let segments = parse_srt(SAMPLE_SRT);
        let formatted = format_srt(&segments);
        let reparsed = parse_srt(&formatted);

        assert_eq!(segments, reparsed);
    }

    #[test]
    fn plain_text_joins_segments() {
        let segments = vec![
            SubtitleSegment::new(1, 0.0, 1.0, " Hello. "),
            SubtitleSegment::new(2, 1.0, 2.0, ""),
            SubtitleSegment::new(3, 2.0, 3.0, "World."),
        ];
        assert_eq!(plain_text(&segments), "Hello. World.");
    }

    #[test]
    fn timestamp_to_seconds_parses_milliseconds() {
        assert_eq!(timestamp_to_seconds("00:00:00,000").unwrap(), 0.0);
        assert_eq!(timestamp_to_seconds("00:01:01,500").unwrap(), 61.5);
        assert_eq!(timestamp_to_seconds("01:01:01,123").unwrap(), 3661.123);
    }

    #[test]
    fn timestamp_rejects_malformed_input() {
        assert!(timestamp_to_seconds("00:00:00").is_err());
        assert!(timestamp_to_seconds("00:00:00.000").is_err());
        assert!(timestamp_to_seconds("00:61:00,000").is_err());
        assert!(timestamp_to_seconds("abc").is_err());
        assert!(timestamp_to_seconds("00:00:00,12").is_err());
    }

    #[test]
    fn string_to_seconds_and_back_is_identity() {
        for ts in ["00:00:00,000", "00:01:01,500", "01:01:01,123", "10:59:59,999"] {
            let seconds = timestamp_to_seconds(ts).unwrap();
            assert_eq!(seconds_to_timestamp(seconds), ts);
        }
    }

    #[test]
    fn seconds_to_string_and_back_within_one_ms() {
        for &secs in &[0.0, 0.001, 61.5, 3661.123, 7322.999, 59.9994] {
            let ts = seconds_to_timestamp(secs);
            let back = timestamp_to_seconds(&ts).unwrap();
            assert!((back - secs).abs() < 0.001, "{} -> {} -> {}", secs, ts, back);
        }
    }
}
