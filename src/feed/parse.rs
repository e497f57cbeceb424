// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use chrono::{DateTime, FixedOffset};
use url::Url;

use crate::error::FeedError;

/// Represents a parsed podcast feed
#[derive(Debug, Clone)]
pub struct Podcast {
    pub title: String,
    pub episodes: Vec<Episode>,
}

/// Represents a single podcast episode
#[derive(Debug, Clone)]
pub struct Episode {
    pub title: String,
    pub pub_date: Option<DateTime<FixedOffset>>,
    pub guid: Option<String>,
    pub link: Option<String>,
    pub enclosure: Enclosure,
}

/// Represents the audio file attached to an episode
#[derive(Debug, Clone)]
pub struct Enclosure {
    pub url: Url,
    pub length: Option<u64>,
    pub mime_type: Option<String>,
}

impl Episode {
    /// Stable identity used as the ledger key.
    ///
    /// Prefers the guid, falls back to the item link, and as a last resort
    /// combines title and publish date.
    pub fn identity(&self) -> String {
        if let Some(guid) = &self.guid {
            return guid.clone();
        }
        if let Some(link) = &self.link {
            return link.clone();
        }
        let date = self
            .pub_date
            .map(|dt| dt.to_rfc3339())
            .unwrap_or_default();
        format!("{}_{}", self.title, date)
    }
}

/// Parse RSS feed XML bytes into a Podcast struct
pub fn parse_feed(xml_bytes: &[u8]) -> Result<Podcast, FeedError> {
    let channel = rss::Channel::read_from(xml_bytes)?;

    let episodes = channel
        .items()
        .iter()
        .filter_map(|item| parse_episode(item).ok())
        .collect();

    Ok(Podcast {
        title: channel.title().to_string(),
        episodes,
    })
}

fn parse_episode(item: &rss::Item) -> Result<Episode, FeedError> {
    let title = item
        .title()
        .map(String::from)
        .unwrap_or_else(|| "Untitled Episode".to_string());

    let enclosure = item
        .enclosure()
        .ok_or_else(|| FeedError::MissingEnclosure {
            title: title.clone(),
        })?;

    let enclosure_url = Url::parse(enclosure.url())?;

    let pub_date = item.pub_date().and_then(|date_str| {
        DateTime::parse_from_rfc2822(date_str)
            .or_else(|_| parse_relaxed_date(date_str))
            .ok()
    });

    Ok(Episode {
        title,
        pub_date,
        guid: item.guid().map(|g| g.value().to_string()),
        link: item.link().map(String::from),
        enclosure: Enclosure {
            url: enclosure_url,
            length: enclosure.length().parse().ok(),
            mime_type: Some(enclosure.mime_type().to_string()).filter(|s| !s.is_empty()),
        },
    })
}

/// Try to parse dates that don't strictly conform to RFC 2822
fn parse_relaxed_date(date_str: &str) -> Result<DateTime<FixedOffset>, chrono::ParseError> {
    let formats = [
        "%a, %d %b %Y %H:%M:%S %z",
        "%Y-%m-%dT%H:%M:%S%:z",
        "%Y-%m-%d %H:%M:%S %z",
    ];

    for format in formats {
        if let Ok(dt) = DateTime::parse_from_str(date_str, format) {
            return Ok(dt);
        }
    }

    Err(chrono::DateTime::parse_from_rfc2822("invalid").unwrap_err())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Test Podcast</title>
    <description>A test podcast for unit testing</description>
    <link>https://example.com</link>
    <item>
      <title>Episode 1</title>
      <link>https://example.com/episodes/1</link>
      <pubDate>Mon, 01 Jan 2024 12:00:00 +0000</pubDate>
      <guid>ep1-guid</guid>
      <enclosure url="https://example.com/ep1.mp3" length="1234567" type="audio/mpeg"/>
    </item>
    <item>
      <title>Episode 2</title>
      <enclosure url="https://example.com/ep2.mp3" type="audio/mpeg"/>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn parse_feed_extracts_podcast_and_episodes() {
        let podcast = parse_feed(SAMPLE_FEED.as_bytes()).unwrap();

        assert_eq!(podcast.title, "Test Podcast");
        assert_eq!(podcast.episodes.len(), 2);

        let ep1 = &podcast.episodes[0];
        assert_eq!(ep1.title, "Episode 1");
        assert_eq!(ep1.guid, Some("ep1-guid".to_string()));
        assert_eq!(ep1.enclosure.length, Some(1234567));
        assert!(ep1.pub_date.is_some());
    }

    #[test]
    fn parse_feed_handles_missing_optional_fields() {
        let podcast = parse_feed(SAMPLE_FEED.as_bytes()).unwrap();

        let ep2 = &podcast.episodes[1];
        assert_eq!(ep2.title, "Episode 2");
        assert!(ep2.pub_date.is_none());
        assert!(ep2.guid.is_none());
        assert!(ep2.link.is_none());
    }

    #[test]
    fn parse_feed_skips_items_without_enclosure() {
        let feed_no_enclosure = r#"<?xml version="1.0"?>
<rss version="2.0">
  <channel>
    <title>Test</title>
    <description>Test</description>
    <item>
      <title>No Audio</title>
    </item>
  </channel>
</rss>"#;

        let podcast = parse_feed(feed_no_enclosure.as_bytes()).unwrap();
        assert!(podcast.episodes.is_empty());
    }

    #[test]
    fn identity_prefers_guid() {
        let podcast = parse_feed(SAMPLE_FEED.as_bytes()).unwrap();
        assert_eq!(podcast.episodes[0].identity(), "ep1-guid");
    }

    #[test]
    fn identity_falls_back_to_link_then_title_and_date() {
        let podcast = parse_feed(SAMPLE_FEED.as_bytes()).unwrap();

        let mut ep = podcast.episodes[0].clone();
        ep.guid = None;
        assert_eq!(ep.identity(), "https://example.com/episodes/1");

        ep.link = None;
        assert!(ep.identity().starts_with("Episode 1_2024-01-01"));

        // No date either: identity still stable, keyed by title
        ep.pub_date = None;
        assert_eq!(ep.identity(), "Episode 1_");
    }
}
