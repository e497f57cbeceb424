// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::LedgerError;
use crate::feed::Episode;

/// Metadata stored per episode in a ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerRecord {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<String>,
    /// Path of the artifact this record refers to
    pub path: String,
    pub recorded_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
}

impl LedgerRecord {
    /// Create a record from a parsed Episode
    pub fn from_episode(episode: &Episode, path: &Path, content_hash: Option<String>) -> Self {
        Self {
            title: episode.title.clone(),
            published: episode.pub_date.map(|dt| dt.to_rfc3339()),
            path: path.display().to_string(),
            recorded_at: Utc::now().to_rfc3339(),
            content_hash,
        }
    }
}

/// A durable identifier-keyed record of pipeline progress.
///
/// The ledger is a single human-readable JSON object mapping episode
/// identity to a record; every update rewrites the whole file. An
/// unreadable or missing file loads as empty. Single-process use only;
/// there is no cross-process locking.
#[derive(Debug)]
pub struct Ledger {
    path: PathBuf,
    records: BTreeMap<String, LedgerRecord>,
}

impl Ledger {
    /// Load a ledger from disk, treating missing or unreadable files as
    /// empty
    pub fn load(path: &Path) -> Self {
        let records = match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(records) => records,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "ledger unreadable, starting empty");
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no ledger file yet");
                BTreeMap::new()
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ledger unreadable, starting empty");
                BTreeMap::new()
            }
        };

        Self {
            path: path.to_path_buf(),
            records,
        }
    }

    /// Whether an episode has a record in this ledger
    pub fn contains(&self, episode_id: &str) -> bool {
        self.records.contains_key(episode_id)
    }

    /// Look up an episode's record
    pub fn get(&self, episode_id: &str) -> Option<&LedgerRecord> {
        self.records.get(episode_id)
    }

    /// Number of recorded episodes
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Insert or replace a record and rewrite the whole file
    pub fn record(&mut self, episode_id: &str, record: LedgerRecord) -> Result<(), LedgerError> {
        self.records.insert(episode_id.to_string(), record);
        self.flush()
    }

    fn flush(&self) -> Result<(), LedgerError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| LedgerError::WriteFailed {
                path: self.path.clone(),
                source: e,
            })?;
        }

        let json = serde_json::to_string_pretty(&self.records)?;
        std::fs::write(&self.path, json).map_err(|e| LedgerError::WriteFailed {
            path: self.path.clone(),
            source: e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::Enclosure;
    use tempfile::tempdir;
    use url::Url;

    fn make_episode(title: &str) -> Episode {
        Episode {
            title: title.to_string(),
            pub_date: chrono::DateTime::parse_from_rfc2822("Mon, 15 Jan 2024 12:00:00 +0000").ok(),
            guid: Some(format!("{title}-guid")),
            link: None,
            enclosure: Enclosure {
                url: Url::parse("https://example.com/ep.mp3").unwrap(),
                length: None,
                mime_type: None,
            },
        }
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempdir().unwrap();
        let ledger = Ledger::load(&dir.path().join("absent.json"));
        assert!(ledger.is_empty());
    }

    #[test]
    fn unreadable_file_loads_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        std::fs::write(&path, "not json at all {{{").unwrap();

        let ledger = Ledger::load(&path);
        assert!(ledger.is_empty());
    }

    #[test]
    fn record_then_reload_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        let episode = make_episode("Episode 1");

        let mut ledger = Ledger::load(&path);
        let record =
            LedgerRecord::from_episode(&episode, Path::new("data/raw/ep1.mp3"), Some("sha256:abc".into()));
        ledger.record(&episode.identity(), record).unwrap();

        assert!(ledger.contains("Episode 1-guid"));

        let reloaded = Ledger::load(&path);
        assert_eq!(reloaded.len(), 1);
        let record = reloaded.get("Episode 1-guid").unwrap();
        assert_eq!(record.title, "Episode 1");
        assert_eq!(record.path, "data/raw/ep1.mp3");
        assert_eq!(record.content_hash.as_deref(), Some("sha256:abc"));
        assert!(record.published.is_some());
    }

    #[test]
    fn record_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/dir/ledger.json");
        let episode = make_episode("Episode 1");

        let mut ledger = Ledger::load(&path);
        ledger
            .record(
                &episode.identity(),
                LedgerRecord::from_episode(&episode, Path::new("ep1.mp3"), None),
            )
            .unwrap();

        assert!(path.exists());
    }

    #[test]
    fn updates_replace_existing_records() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        let episode = make_episode("Episode 1");
        let id = episode.identity();

        let mut ledger = Ledger::load(&path);
        ledger
            .record(&id, LedgerRecord::from_episode(&episode, Path::new("a.mp3"), None))
            .unwrap();
        ledger
            .record(&id, LedgerRecord::from_episode(&episode, Path::new("b.mp3"), None))
            .unwrap();

        assert_eq!(ledger.len(), 1);
        assert_eq!(Ledger::load(&path).get(&id).unwrap().path, "b.mp3");
    }
}
