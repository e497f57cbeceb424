use std::sync::Arc;

/// Events emitted while running the pipeline, for progress reporting
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Feed is being fetched or read
    FetchingFeed { source: String },

    /// Feed has been parsed and episodes selected
    FeedParsed {
        podcast_title: String,
        total_episodes: usize,
        selected_episodes: usize,
    },

    /// An episode is entering the pipeline
    EpisodeStarted {
        episode_index: usize,
        total_selected: usize,
        episode_title: String,
    },

    /// An episode was skipped because it is already fully processed
    EpisodeSkipped { episode_title: String },

    /// A download is starting
    DownloadStarted {
        episode_title: String,
        /// Expected content length in bytes, if known
        content_length: Option<u64>,
    },

    /// Download progress update
    DownloadProgress {
        bytes_downloaded: u64,
        total_bytes: Option<u64>,
    },

    /// A download completed and was finalized
    DownloadCompleted {
        episode_title: String,
        bytes_downloaded: u64,
    },

    /// A download attempt failed and will be retried
    DownloadRetrying {
        attempt: u32,
        max_attempts: u32,
        error: String,
    },

    /// Transcription is starting (this is the slow stage)
    Transcribing { episode_title: String },

    /// Transcription produced a subtitle track
    Transcribed { segment_count: usize },

    /// The classifier reported removal segments
    AdSegmentsDetected { count: usize },

    /// Audio was cut down to the keep intervals
    AudioCleaned {
        kept_intervals: usize,
        removed_seconds: f64,
    },

    /// Transcript processing and cleanup finished
    TranscriptCleaned {
        matched_candidates: usize,
        total_candidates: usize,
    },

    /// A pipeline stage was skipped because its output already exists
    StageSkipped { stage: &'static str },

    /// An episode finished all stages
    EpisodeCompleted { episode_title: String },

    /// An episode failed; the run continues with the next one
    EpisodeFailed {
        episode_title: String,
        error: String,
    },

    /// The whole run completed
    RunCompleted {
        processed_count: usize,
        skipped_count: usize,
        failed_count: usize,
    },
}

/// Trait for reporting progress events during a pipeline run.
///
/// Implementations can use this to display progress bars, log messages,
/// or collect statistics.
pub trait ProgressReporter: Send + Sync {
    /// Report a progress event
    fn report(&self, event: ProgressEvent);
}

/// A shared reference to a progress reporter
pub type SharedProgressReporter = Arc<dyn ProgressReporter>;

/// A no-op progress reporter that silently ignores all events.
/// Useful for tests or quiet mode.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn report(&self, _event: ProgressEvent) {
        // Intentionally empty
    }
}

impl NoopReporter {
    /// Create a new NoopReporter wrapped in an Arc
    pub fn shared() -> SharedProgressReporter {
        Arc::new(Self)
    }
}
