use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::StreamExt;
use sha2::{Digest, Sha256};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::config::DownloadSettings;
use crate::error::DownloadError;
use crate::feed::Episode;
use crate::http::HttpClient;
use crate::progress::{ProgressEvent, SharedProgressReporter};

/// Result of a completed download
#[derive(Debug, Clone)]
pub struct DownloadResult {
    pub bytes_downloaded: u64,
    /// Hex-encoded SHA-256 of the file contents, "sha256:" prefixed
    pub content_hash: String,
}

/// Download an episode with bounded retries and backoff.
///
/// Each attempt streams to a `.partial` file which is renamed into place
/// only on success; a failed attempt removes its partial file before the
/// next one starts. After the last attempt the error is wrapped in
/// `RetriesExhausted` so the caller can skip the episode.
pub async fn download_with_retry<C: HttpClient>(
    client: &C,
    episode: &Episode,
    output_path: &Path,
    settings: &DownloadSettings,
    reporter: &SharedProgressReporter,
) -> Result<DownloadResult, DownloadError> {
    let url = episode.enclosure.url.as_str();
    let mut backoff = Duration::from_secs(settings.retry_backoff_secs);
    let mut last_error = None;

    for attempt in 1..=settings.max_retries {
        match download_episode(client, episode, output_path, settings, reporter).await {
            Ok(result) => return Ok(result),
            Err(e) => {
                warn!(url, attempt, error = %e, "download attempt failed");
                if attempt < settings.max_retries {
                    reporter.report(ProgressEvent::DownloadRetrying {
                        attempt,
                        max_attempts: settings.max_retries,
                        error: e.to_string(),
                    });
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
                last_error = Some(e);
            }
        }
    }

    Err(DownloadError::RetriesExhausted {
        url: url.to_string(),
        attempts: settings.max_retries,
        last_error: last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown".to_string()),
    })
}

/// Download an episode to the specified output path (single attempt).
///
/// Streams the response body to a `.partial` file, hashing as it goes and
/// reporting progress through the reporter. A chunk gap longer than the
/// stall timeout aborts the attempt.
pub async fn download_episode<C: HttpClient>(
    client: &C,
    episode: &Episode,
    output_path: &Path,
    settings: &DownloadSettings,
    reporter: &SharedProgressReporter,
) -> Result<DownloadResult, DownloadError> {
    let partial_path = partial_path(output_path);

    let result = stream_to_partial(client, episode, &partial_path, settings, reporter).await;

    match result {
        Ok(download) => {
            tokio::fs::rename(&partial_path, output_path)
                .await
                .map_err(|e| DownloadError::FileWriteFailed {
                    path: output_path.to_path_buf(),
                    source: e,
                })?;

            reporter.report(ProgressEvent::DownloadCompleted {
                episode_title: episode.title.clone(),
                bytes_downloaded: download.bytes_downloaded,
            });

            Ok(download)
        }
        Err(e) => {
            if let Err(rm) = tokio::fs::remove_file(&partial_path).await {
                debug!(path = %partial_path.display(), error = %rm, "partial file not removed");
            }
            Err(e)
        }
    }
}

async fn stream_to_partial<C: HttpClient>(
    client: &C,
    episode: &Episode,
    partial_path: &Path,
    settings: &DownloadSettings,
    reporter: &SharedProgressReporter,
) -> Result<DownloadResult, DownloadError> {
    let url = episode.enclosure.url.as_str();

    let response = client
        .get_stream(url)
        .await
        .map_err(|e| DownloadError::HttpFailed {
            url: url.to_string(),
            source: e,
        })?;

    if response.status >= 400 {
        return Err(DownloadError::HttpStatus {
            url: url.to_string(),
            status: response.status,
        });
    }

    // Content-Length may be missing; the feed's enclosure length is a hint
    let total_bytes = response.content_length.or(episode.enclosure.length);

    reporter.report(ProgressEvent::DownloadStarted {
        episode_title: episode.title.clone(),
        content_length: total_bytes,
    });

    let mut file = File::create(partial_path)
        .await
        .map_err(|e| DownloadError::FileCreateFailed {
            path: partial_path.to_path_buf(),
            source: e,
        })?;

    let stall_timeout = Duration::from_secs(settings.stall_timeout_secs);
    let mut hasher = Sha256::new();
    let mut bytes_downloaded: u64 = 0;
    let mut stream = response.body;

    loop {
        let chunk_result = match tokio::time::timeout(stall_timeout, stream.next()).await {
            Ok(Some(chunk_result)) => chunk_result,
            Ok(None) => break,
            Err(_) => {
                return Err(DownloadError::Stalled {
                    url: url.to_string(),
                    idle_secs: settings.stall_timeout_secs,
                });
            }
        };

        let chunk = chunk_result.map_err(|e| DownloadError::StreamFailed {
            url: url.to_string(),
            source: e,
        })?;

        file.write_all(&chunk)
            .await
            .map_err(|e| DownloadError::FileWriteFailed {
                path: partial_path.to_path_buf(),
                source: e,
            })?;

        hasher.update(&chunk);
        bytes_downloaded += chunk.len() as u64;

        reporter.report(ProgressEvent::DownloadProgress {
            bytes_downloaded,
            total_bytes,
        });
    }

    file.flush()
        .await
        .map_err(|e| DownloadError::FileWriteFailed {
            path: partial_path.to_path_buf(),
            source: e,
        })?;

    Ok(DownloadResult {
        bytes_downloaded,
        content_hash: format!("sha256:{:x}", hasher.finalize()),
    })
}

fn partial_path(output_path: &Path) -> PathBuf {
    let mut name = output_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.push_str(".partial");
    output_path.with_file_name(name)
}
