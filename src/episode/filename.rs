use crate::feed::Episode;

/// Maximum length for the title portion of a filename
const MAX_TITLE_LENGTH: usize = 100;

/// Check if a character is allowed in filenames (whitelist approach)
fn is_valid_filename_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ' ')
}

/// Generate a filename stem (without extension) for an episode
///
/// Format: "YYYY-MM-DD-sanitized-title" or "undated-sanitized-title"
pub fn episode_stem(episode: &Episode) -> String {
    let date_prefix = episode
        .pub_date
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "undated".to_string());

    format!("{}-{}", date_prefix, sanitize_title(&episode.title))
}

/// Get the audio file extension from an episode's enclosure
///
/// Attempts to extract from URL path or MIME type, defaults to "mp3"
pub fn audio_extension(episode: &Episode) -> String {
    if let Some(ext) = episode
        .enclosure
        .url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .and_then(|filename| filename.rsplit('.').next())
        .filter(|ext| is_audio_extension(ext))
    {
        return ext.to_lowercase();
    }

    if let Some(ref mime) = episode.enclosure.mime_type
        && let Some(ext) = mime_to_extension(mime)
    {
        return ext.to_string();
    }

    "mp3".to_string()
}

/// Filename of the raw downloaded audio
pub fn audio_filename(episode: &Episode) -> String {
    format!("{}.{}", episode_stem(episode), audio_extension(episode))
}

/// Filename of the subtitle track produced by transcription
pub fn srt_filename(stem: &str) -> String {
    format!("{stem}.srt")
}

/// Filename of the plain-text transcript produced by transcription
pub fn txt_filename(stem: &str) -> String {
    format!("{stem}.txt")
}

/// Filename of the cleaned audio, next to the raw audio's extension
pub fn cleaned_audio_filename(episode: &Episode) -> String {
    format!(
        "{}_no_ads.{}",
        episode_stem(episode),
        audio_extension(episode)
    )
}

/// Filename of the processed (translated, cleaned) transcript
pub fn processed_txt_filename(stem: &str) -> String {
    format!("{stem}_processed.txt")
}

/// Sanitize a title for use in a filename using whitelist approach
fn sanitize_title(title: &str) -> String {
    let sanitized: String = title
        .chars()
        .map(|c| if is_valid_filename_char(c) { c } else { '-' })
        .collect();

    let collapsed = collapse_separators(&sanitized);
    let trimmed = collapsed.trim_matches(|c: char| c == '-' || c.is_whitespace());

    if trimmed.len() > MAX_TITLE_LENGTH {
        truncate_at_boundary(trimmed, MAX_TITLE_LENGTH)
    } else {
        trimmed.to_string()
    }
}

/// Collapse multiple spaces and dashes into single dashes
fn collapse_separators(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut last_was_separator = false;

    for c in s.chars() {
        if c == '-' || c.is_whitespace() {
            if !last_was_separator {
                result.push('-');
                last_was_separator = true;
            }
        } else {
            result.push(c);
            last_was_separator = false;
        }
    }

    result
}

/// Truncate string at a word boundary
fn truncate_at_boundary(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }

    let truncated: String = s.chars().take(max_len).collect();
    if let Some(pos) = truncated.rfind('-')
        && pos > max_len / 2
    {
        return truncated[..pos].to_string();
    }

    truncated.trim_end_matches('-').to_string()
}

fn is_audio_extension(ext: &str) -> bool {
    matches!(
        ext.to_lowercase().as_str(),
        "mp3" | "m4a" | "mp4" | "aac" | "ogg" | "opus" | "wav" | "flac"
    )
}

/// Map MIME types to file extensions
fn mime_to_extension(mime: &str) -> Option<&'static str> {
    match mime.to_lowercase().as_str() {
        "audio/mpeg" | "audio/mp3" => Some("mp3"),
        "audio/mp4" | "audio/m4a" | "audio/x-m4a" => Some("m4a"),
        "audio/aac" => Some("aac"),
        "audio/ogg" => Some("ogg"),
        "audio/opus" => Some("opus"),
        "audio/wav" | "audio/x-wav" => Some("wav"),
        "audio/flac" | "audio/x-flac" => Some("flac"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::Enclosure;
    use chrono::DateTime;
    use url::Url;

    fn make_episode(title: &str, date: Option<&str>, url: &str, mime: Option<&str>) -> Episode {
        Episode {
            title: title.to_string(),
            pub_date: date.and_then(|d| DateTime::parse_from_rfc2822(d).ok()),
            guid: Some("test-guid".to_string()),
            link: None,
            enclosure: Enclosure {
                url: Url::parse(url).unwrap(),
                length: None,
                mime_type: mime.map(String::from),
            },
        }
    }

    #[test]
    fn sanitize_replaces_special_chars_with_dash() {
        assert_eq!(sanitize_title("a:b/c\\d"), "a-b-c-d");
        assert_eq!(sanitize_title("a:::b///c"), "a-b-c");
        assert_eq!(sanitize_title("  --hello--  "), "hello");
    }

    #[test]
    fn sanitize_handles_unicode_and_emoji() {
        assert_eq!(sanitize_title("Café résumé"), "Caf-r-sum");
        assert_eq!(sanitize_title("Hello 🎙️ World"), "Hello-World");
    }

    #[test]
    fn stem_includes_date_prefix() {
        let episode = make_episode(
            "Test Episode!",
            Some("Mon, 15 Jan 2024 12:00:00 +0000"),
            "https://example.com/ep.mp3",
            Some("audio/mpeg"),
        );
        assert_eq!(episode_stem(&episode), "2024-01-15-Test-Episode");
    }

    #[test]
    fn stem_without_date_is_undated() {
        let episode = make_episode("Test", None, "https://example.com/ep.mp3", None);
        assert_eq!(episode_stem(&episode), "undated-Test");
    }

    #[test]
    fn extension_from_url_wins_over_mime() {
        let episode = make_episode(
            "Test",
            None,
            "https://example.com/ep.m4a",
            Some("audio/mpeg"),
        );
        assert_eq!(audio_extension(&episode), "m4a");
    }

    #[test]
    fn extension_falls_back_to_mime_then_mp3() {
        let episode = make_episode(
            "Test",
            None,
            "https://example.com/episode",
            Some("audio/ogg"),
        );
        assert_eq!(audio_extension(&episode), "ogg");

        let episode = make_episode("Test", None, "https://example.com/episode", None);
        assert_eq!(audio_extension(&episode), "mp3");
    }

    #[test]
    fn derived_filenames_share_the_stem() {
        let episode = make_episode(
            "Daily Show",
            Some("Mon, 15 Jan 2024 12:00:00 +0000"),
            "https://example.com/ep.mp3",
            Some("audio/mpeg"),
        );
        let stem = episode_stem(&episode);

        assert_eq!(audio_filename(&episode), format!("{stem}.mp3"));
        assert_eq!(srt_filename(&stem), format!("{stem}.srt"));
        assert_eq!(txt_filename(&stem), format!("{stem}.txt"));
        assert_eq!(cleaned_audio_filename(&episode), format!("{stem}_no_ads.mp3"));
        assert_eq!(processed_txt_filename(&stem), format!("{stem}_processed.txt"));
    }

    #[test]
    fn long_titles_truncate_at_word_boundary() {
        let long_title = "word ".repeat(40);
        let sanitized = sanitize_title(&long_title);
        assert!(sanitized.len() <= MAX_TITLE_LENGTH);
        assert!(!sanitized.ends_with('-'));
    }
}
