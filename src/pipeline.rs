// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::audio::AudioEditor;
use crate::config::Settings;
use crate::episode::{
    audio_filename, cleaned_audio_filename, download_with_retry, episode_stem,
    processed_txt_filename, srt_filename, txt_filename,
};
use crate::error::{AudioError, PipelineError, SubtitleError};
use crate::feed::{Episode, load_feed};
use crate::http::HttpClient;
use crate::ledger::{Ledger, LedgerRecord};
use crate::llm::{SegmentClassifier, TranscriptProcessor};
use crate::progress::{ProgressEvent, SharedProgressReporter};
use crate::subtitle::{SubtitleSegment, format_srt, parse_srt, plain_text};
use crate::timeline::{TimeInterval, keep_intervals};
use crate::transcribe::Transcriber;
use crate::transcript;

/// Options for a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    /// Number of new episodes to carry through the pipeline (None = all)
    pub count: Option<usize>,
    /// Only consider episodes whose title contains this string
    /// (case-insensitive)
    pub search: Option<String>,
}

/// Result of a pipeline run
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Episodes carried through all stages this run
    pub processed: usize,
    /// Episodes skipped because they were already fully processed
    pub skipped: usize,
    /// Episodes that failed partway
    pub failed: usize,
    /// Details of failed episodes (title, error message)
    pub failed_episodes: Vec<(String, String)>,
}

/// The per-episode workflow driver.
///
/// Episodes run strictly one at a time, each carried through download,
/// transcription, classification, audio editing, and transcript processing
/// before the next begins. Every stage checks for existing output first so
/// an interrupted run resumes where it stopped. A failing episode is
/// logged and skipped; it never aborts the batch or touches another
/// episode's ledger entries.
pub struct Pipeline<'a, C: HttpClient> {
    pub client: &'a C,
    pub transcriber: &'a dyn Transcriber,
    pub classifier: &'a dyn SegmentClassifier,
    pub processor: &'a dyn TranscriptProcessor,
    pub editor: &'a AudioEditor,
    pub settings: &'a Settings,
    pub reporter: SharedProgressReporter,
}

impl<C: HttpClient> Pipeline<'_, C> {
    /// Run the pipeline over the configured feed
    pub async fn run(&self, options: &PipelineOptions) -> Result<RunSummary, PipelineError> {
        let feed_source = &self.settings.feed.url;

        self.reporter.report(ProgressEvent::FetchingFeed {
            source: feed_source.clone(),
        });

        let podcast = load_feed(self.client, feed_source).await?;

        let selected: Vec<&Episode> = podcast
            .episodes
            .iter()
            .filter(|e| match &options.search {
                Some(needle) => e.title.to_lowercase().contains(&needle.to_lowercase()),
                None => true,
            })
            .collect();

        self.reporter.report(ProgressEvent::FeedParsed {
            podcast_title: podcast.title.clone(),
            total_episodes: podcast.episodes.len(),
            selected_episodes: selected.len(),
        });

        let mut downloaded = Ledger::load(&self.settings.paths.downloaded_ledger);
        let mut processed = Ledger::load(&self.settings.paths.processed_ledger);

        let mut summary = RunSummary::default();
        let total_selected = selected.len();

        for (episode_index, episode) in selected.into_iter().enumerate() {
            let id = episode.identity();

            if processed.contains(&id) {
                summary.skipped += 1;
                self.reporter.report(ProgressEvent::EpisodeSkipped {
                    episode_title: episode.title.clone(),
                });
                continue;
            }

            if let Some(count) = options.count
                && summary.processed + summary.failed >= count
            {
                break;
            }

            self.reporter.report(ProgressEvent::EpisodeStarted {
                episode_index,
                total_selected,
                episode_title: episode.title.clone(),
            });

            match self
                .process_episode(episode, &mut downloaded, &mut processed)
                .await
            {
                Ok(()) => {
                    summary.processed += 1;
                    self.reporter.report(ProgressEvent::EpisodeCompleted {
                        episode_title: episode.title.clone(),
                    });
                }
                Err(e) => {
                    warn!(episode = %episode.title, error = %e, "episode failed, continuing");
                    summary.failed += 1;
                    summary
                        .failed_episodes
                        .push((episode.title.clone(), e.to_string()));
                    self.reporter.report(ProgressEvent::EpisodeFailed {
                        episode_title: episode.title.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        self.reporter.report(ProgressEvent::RunCompleted {
            processed_count: summary.processed,
            skipped_count: summary.skipped,
            failed_count: summary.failed,
        });

        Ok(summary)
    }

    /// Carry one episode through all pipeline stages
    async fn process_episode(
        &self,
        episode: &Episode,
        downloaded: &mut Ledger,
        processed: &mut Ledger,
    ) -> Result<(), PipelineError> {
        let id = episode.identity();
        let stem = episode_stem(episode);
        let paths = &self.settings.paths;

        // Stage 1: download
        let audio_path = paths.raw_audio.join(audio_filename(episode));
        if downloaded.contains(&id) && audio_path.exists() {
            self.reporter
                .report(ProgressEvent::StageSkipped { stage: "download" });
        } else {
            create_dir(&paths.raw_audio)?;
            let result = download_with_retry(
                self.client,
                episode,
                &audio_path,
                &self.settings.download,
                &self.reporter,
            )
            .await?;
            downloaded.record(
                &id,
                LedgerRecord::from_episode(episode, &audio_path, Some(result.content_hash)),
            )?;
        }

        // Stage 2: transcription, producing the SRT track and a plain
        // transcript in one pass
        let srt_path = paths.srt.join(srt_filename(&stem));
        let txt_path = paths.txt.join(txt_filename(&stem));

        let segments: Vec<SubtitleSegment> = if srt_path.exists() && txt_path.exists() {
            self.reporter.report(ProgressEvent::StageSkipped {
                stage: "transcription",
            });
            let content =
                std::fs::read_to_string(&srt_path).map_err(|e| SubtitleError::ReadFailed {
                    path: srt_path.clone(),
                    source: e,
                })?;
            parse_srt(&content)
        } else {
            self.reporter.report(ProgressEvent::Transcribing {
                episode_title: episode.title.clone(),
            });
            let segments = self.transcriber.transcribe(&audio_path).await?;

            create_dir(&paths.srt)?;
            create_dir(&paths.txt)?;
            write_file(&srt_path, &format_srt(&segments))?;
            write_file(&txt_path, &plain_text(&segments))?;

            self.reporter.report(ProgressEvent::Transcribed {
                segment_count: segments.len(),
            });
            segments
        };

        // Stage 3: classification. Results are not persisted, so this runs
        // even when later stages are already on disk.
        let ads = self.classifier.detect_ads(&format_srt(&segments)).await?;
        self.reporter
            .report(ProgressEvent::AdSegmentsDetected { count: ads.len() });

        for ad in &ads {
            info!(
                start = ad.interval.start,
                end = ad.interval.end,
                reason = %ad.reason,
                "removal segment"
            );
        }

        let ad_intervals: Vec<TimeInterval> = ads.iter().map(|a| a.interval).collect();

        // Stage 4: audio editing
        let cleaned_path = paths.processed_audio.join(cleaned_audio_filename(episode));
        if cleaned_path.exists() {
            self.reporter
                .report(ProgressEvent::StageSkipped { stage: "audio" });
        } else if ad_intervals.is_empty() {
            // Nothing to cut; a plain copy avoids a pointless splice
            create_dir(&paths.processed_audio)?;
            std::fs::copy(&audio_path, &cleaned_path).map_err(|e| PipelineError::Io {
                path: cleaned_path.clone(),
                source: e,
            })?;
            self.reporter.report(ProgressEvent::AudioCleaned {
                kept_intervals: 1,
                removed_seconds: 0.0,
            });
        } else {
            let total_duration = self.editor.duration(&audio_path).await?;
            let keep = keep_intervals(&ad_intervals, total_duration);
            if keep.is_empty() {
                return Err(AudioError::NothingToKeep.into());
            }

            self.editor.cut(&audio_path, &keep, &cleaned_path).await?;

            let kept_seconds: f64 = keep.iter().map(|iv| iv.duration()).sum();
            self.reporter.report(ProgressEvent::AudioCleaned {
                kept_intervals: keep.len(),
                removed_seconds: total_duration - kept_seconds,
            });
        }

        // Stage 5: transcript processing and reconciliation
        let final_txt_path = paths.output.join(processed_txt_filename(&stem));
        if final_txt_path.exists() {
            self.reporter
                .report(ProgressEvent::StageSkipped { stage: "transcript" });
        } else {
            let raw_transcript =
                std::fs::read_to_string(&txt_path).map_err(|e| PipelineError::Io {
                    path: txt_path.clone(),
                    source: e,
                })?;

            let processed_text = self
                .processor
                .process(&raw_transcript, Some(&episode.title))
                .await?;

            let final_text = if ad_intervals.is_empty() {
                processed_text
            } else {
                let outcome =
                    transcript::remove_intervals(&processed_text, &segments, &ad_intervals);
                self.reporter.report(ProgressEvent::TranscriptCleaned {
                    matched_candidates: outcome.matched,
                    total_candidates: outcome.candidates,
                });
                outcome.text
            };

            create_dir(&paths.output)?;
            write_file(&final_txt_path, &final_text)?;
        }

        processed.record(
            &id,
            LedgerRecord::from_episode(episode, &final_txt_path, None),
        )?;

        Ok(())
    }
}

fn create_dir(path: &Path) -> Result<(), PipelineError> {
    std::fs::create_dir_all(path).map_err(|e| PipelineError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

fn write_file(path: &PathBuf, content: &str) -> Result<(), PipelineError> {
    std::fs::write(path, content).map_err(|e| PipelineError::Io {
        path: path.clone(),
        source: e,
    })
}
