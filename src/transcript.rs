//! Fuzzy removal of classified segments from the processed transcript.
//!
//! The processed transcript has been reformatted and translated, so it no
//! longer lines up 1:1 with the subtitle track. Candidate texts taken from
//! the subtitle segments are matched against it with three progressively
//! looser strategies, applied longest candidate first so a short candidate
//! never matches inside a longer one that should go as a unit:
//!
//! 1. case-insensitive exact substring (all occurrences deleted)
//! 2. punctuation-stripped, whitespace-collapsed match, deleting a
//!    sentence-aligned span around the located text
//! 3. keyword match on the candidate's content words, deleting a
//!    sentence-aligned span around the first keyword hit
//!
//! Misses are expected: unmatched candidates stay in the transcript and are
//! only counted. The thresholds below were chosen empirically; they are
//! tunable constants, not derived from an invariant.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::subtitle::SubtitleSegment;
use crate::timeline::TimeInterval;

/// Characters scanned past the candidate before the right sentence boundary
const SENTENCE_LOOKAHEAD_CHARS: usize = 50;

/// Minimum length of a candidate word to count as a keyword
const MIN_KEYWORD_LEN: usize = 4;

/// Keywords sampled from the front of a candidate
const KEYWORD_SAMPLE: usize = 5;

/// Sampled keywords that must appear for a keyword match
const MIN_KEYWORD_HITS: usize = 3;

/// Result of a removal pass over the processed transcript
#[derive(Debug)]
pub struct RemovalOutcome {
    pub text: String,
    /// Candidates that matched one of the three strategies
    pub matched: usize,
    /// Total candidates collected from the subtitle track
    pub candidates: usize,
}

/// Remove the text corresponding to the removal intervals from a processed
/// transcript, using the subtitle track to find what the removed spans said
pub fn remove_intervals(
    processed: &str,
    subtitles: &[SubtitleSegment],
    removals: &[TimeInterval],
) -> RemovalOutcome {
    let mut candidates = collect_candidates(subtitles, removals);
    let total = candidates.len();

    // Longest first; ordering is part of the contract
    candidates.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()));

    let mut text = processed.to_string();
    let mut matched = 0;

    for candidate in &candidates {
        if remove_candidate(&mut text, candidate) {
            matched += 1;
        } else {
            debug!(candidate = %truncate(candidate, 60), "no match for removal candidate");
        }
    }

    RemovalOutcome {
        text: cleanup(&text),
        matched,
        candidates: total,
    }
}

/// Collect the source text of every subtitle segment overlapping a removal
/// interval, deduplicated by exact text
fn collect_candidates(subtitles: &[SubtitleSegment], removals: &[TimeInterval]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut candidates = Vec::new();

    for segment in subtitles {
        if removals.iter().any(|iv| segment.interval.overlaps(iv)) {
            let text = segment.text.trim();
            if !text.is_empty() && seen.insert(text.to_string()) {
                candidates.push(text.to_string());
            }
        }
    }

    candidates
}

fn remove_candidate(text: &mut String, candidate: &str) -> bool {
    if remove_exact(text, candidate) {
        return true;
    }
    if remove_normalized(text, candidate) {
        return true;
    }
    remove_keywords(text, candidate)
}

/// Strategy 1: delete every case-insensitive verbatim occurrence
fn remove_exact(text: &mut String, candidate: &str) -> bool {
    let ranges = find_ci_ranges(text, candidate);
    if ranges.is_empty() {
        return false;
    }

    for &(start, end) in ranges.iter().rev() {
        text.replace_range(start..end, "");
    }
    true
}

/// Strategy 2: match with punctuation stripped and whitespace collapsed,
/// then delete a sentence-aligned span around the located text
fn remove_normalized(text: &mut String, candidate: &str) -> bool {
    let (norm_text, byte_map) = normalize_with_map(text);
    let (norm_candidate, _) = normalize_with_map(candidate);

    if norm_candidate.is_empty() {
        return false;
    }

    let offset = match find_subslice(&norm_text, &norm_candidate) {
        Some(offset) => offset,
        None => return false,
    };

    let anchor_byte = byte_map[offset];
    *text = delete_sentence_span(text, anchor_byte, candidate.chars().count());
    true
}

/// Strategy 3: require enough of the candidate's leading content words to
/// appear, then delete a sentence-aligned span around the first hit
fn remove_keywords(text: &mut String, candidate: &str) -> bool {
    let keywords: Vec<String> = candidate
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= MIN_KEYWORD_LEN)
        .take(KEYWORD_SAMPLE)
        .map(|w| w.to_string())
        .collect();

    if keywords.len() < MIN_KEYWORD_HITS {
        return false;
    }

    let mut first_hit = None;
    let mut hits = 0;
    for keyword in &keywords {
        if let Some(&(start, _)) = find_ci_ranges(text, keyword).first() {
            hits += 1;
            if first_hit.is_none() {
                first_hit = Some(start);
            }
        }
    }

    if hits < MIN_KEYWORD_HITS {
        return false;
    }

    let anchor_byte = first_hit.expect("at least one keyword hit");
    *text = delete_sentence_span(text, anchor_byte, candidate.chars().count());
    true
}

/// Find all case-insensitive occurrences of `needle` in `haystack`,
/// returned as non-overlapping byte ranges
fn find_ci_ranges(haystack: &str, needle: &str) -> Vec<(usize, usize)> {
    let hay: Vec<(usize, char)> = haystack.char_indices().collect();
    let ndl: Vec<char> = needle.chars().collect();

    if ndl.is_empty() || hay.len() < ndl.len() {
        return Vec::new();
    }

    let mut ranges = Vec::new();
    let mut i = 0;
    while i + ndl.len() <= hay.len() {
        if (0..ndl.len()).all(|j| chars_eq_ci(hay[i + j].1, ndl[j])) {
            let start = hay[i].0;
            let (last_byte, last_char) = hay[i + ndl.len() - 1];
            ranges.push((start, last_byte + last_char.len_utf8()));
            i += ndl.len();
        } else {
            i += 1;
        }
    }

    ranges
}

fn chars_eq_ci(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

/// Lowercase alphanumeric characters with whitespace runs collapsed to a
/// single space, plus a map from each normalized char to the byte offset of
/// the original character that produced it
fn normalize_with_map(text: &str) -> (Vec<char>, Vec<usize>) {
    let mut normalized = Vec::new();
    let mut byte_map = Vec::new();

    for (byte_idx, c) in text.char_indices() {
        if c.is_alphanumeric() {
            for lc in c.to_lowercase() {
                normalized.push(lc);
                byte_map.push(byte_idx);
            }
        } else if c.is_whitespace() && normalized.last().is_some_and(|&l| l != ' ') {
            normalized.push(' ');
            byte_map.push(byte_idx);
        }
    }

    if normalized.last() == Some(&' ') {
        normalized.pop();
        byte_map.pop();
    }

    (normalized, byte_map)
}

fn find_subslice(haystack: &[char], needle: &[char]) -> Option<usize> {
    if needle.len() > haystack.len() {
        return None;
    }
    (0..=haystack.len() - needle.len()).find(|&i| &haystack[i..i + needle.len()] == needle)
}

fn is_sentence_end(c: char) -> bool {
    matches!(c, '.' | '!' | '?' | '。' | '！' | '？' | '\n')
}

/// Delete a sentence-aligned span: from just after the previous sentence
/// terminator before `anchor_byte`, through the next terminator after the
/// candidate's length plus the look-ahead margin
fn delete_sentence_span(text: &str, anchor_byte: usize, candidate_chars: usize) -> String {
    let chars: Vec<(usize, char)> = text.char_indices().collect();

    let anchor = chars
        .iter()
        .position(|&(b, _)| b >= anchor_byte)
        .unwrap_or(chars.len());

    let delete_from = chars[..anchor]
        .iter()
        .rposition(|&(_, c)| is_sentence_end(c))
        .map(|i| i + 1)
        .unwrap_or(0);

    let scan_from = (anchor + candidate_chars + SENTENCE_LOOKAHEAD_CHARS).min(chars.len());
    let delete_to = chars[scan_from..]
        .iter()
        .position(|&(_, c)| is_sentence_end(c))
        .map(|i| scan_from + i + 1)
        .unwrap_or(chars.len());

    chars[..delete_from]
        .iter()
        .chain(chars[delete_to..].iter())
        .map(|&(_, c)| c)
        .collect()
}

static MULTI_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]{2,}").expect("valid pattern"));
static SPACE_BEFORE_PUNCT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" +([,.!?;:，。！？；：])").expect("valid pattern"));
static EXCESS_BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid pattern"));

/// Whitespace cleanup after span deletion
fn cleanup(text: &str) -> String {
    let text = MULTI_SPACE.replace_all(text, " ");
    let text = SPACE_BEFORE_PUNCT.replace_all(&text, "$1");
    let text = EXCESS_BLANK_LINES.replace_all(&text, "\n\n");
    text.trim().to_string()
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        s.chars().take(max_chars).collect::<String>() + "..."
    }
}
