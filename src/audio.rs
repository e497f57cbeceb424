// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Audio editing via the external media tools (ffmpeg/ffprobe).
//!
//! The editor only decides which intervals to extract and in what order;
//! all codec work is a lossless stream copy, never a re-encode.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::AudioSettings;
use crate::error::AudioError;
use crate::timeline::TimeInterval;

pub struct AudioEditor {
    ffmpeg: String,
    ffprobe: String,
    timeout: Duration,
}

impl AudioEditor {
    pub fn new(settings: &AudioSettings) -> Self {
        Self {
            ffmpeg: settings.ffmpeg.clone(),
            ffprobe: settings.ffprobe.clone(),
            timeout: Duration::from_secs(settings.tool_timeout_secs),
        }
    }

    /// Check that ffmpeg is runnable; returns its version line
    pub async fn verify(&self) -> Result<String, AudioError> {
        let output = self
            .run_tool(&self.ffmpeg, &["-version".to_string()])
            .await?;

        let version_line = output.lines().next().unwrap_or("").to_string();
        info!(version = %version_line, "ffmpeg available");
        Ok(version_line)
    }

    /// Query the duration of an audio file in seconds using ffprobe
    pub async fn duration(&self, path: &Path) -> Result<f64, AudioError> {
        let args = vec![
            "-v".to_string(),
            "quiet".to_string(),
            "-print_format".to_string(),
            "json".to_string(),
            "-show_format".to_string(),
            path.display().to_string(),
        ];

        let stdout = self.run_tool(&self.ffprobe, &args).await?;

        let json: serde_json::Value = serde_json::from_str(&stdout)
            .map_err(|_| AudioError::DurationUnavailable(path.to_path_buf()))?;

        json["format"]["duration"]
            .as_str()
            .and_then(|d| d.parse::<f64>().ok())
            .ok_or_else(|| AudioError::DurationUnavailable(path.to_path_buf()))
    }

    /// Produce `output` containing only the keep intervals of `input`,
    /// concatenated in ascending order.
    ///
    /// One interval is a direct range extraction; several are extracted
    /// into a scoped temp directory and joined with the concat demuxer.
    /// The temp directory is removed on every exit path; a removal failure
    /// is logged and never masks the splice error.
    pub async fn cut(
        &self,
        input: &Path,
        keep: &[TimeInterval],
        output: &Path,
    ) -> Result<(), AudioError> {
        if keep.is_empty() {
            return Err(AudioError::NothingToKeep);
        }

        if let Some(parent) = output.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AudioError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        if keep.len() == 1 {
            return self.extract(input, keep[0], output).await;
        }

        let temp_dir = tempfile::tempdir().map_err(|e| AudioError::Io {
            path: PathBuf::from("tempdir"),
            source: e,
        })?;

        let result = self
            .extract_and_concat(input, keep, temp_dir.path(), output)
            .await;

        if let Err(e) = temp_dir.close() {
            warn!(error = %e, "failed to clean up segment temp dir");
        }

        result
    }

    async fn extract_and_concat(
        &self,
        input: &Path,
        keep: &[TimeInterval],
        temp_dir: &Path,
        output: &Path,
    ) -> Result<(), AudioError> {
        let extension = input
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("mp3");

        let mut segment_files = Vec::with_capacity(keep.len());
        for (i, interval) in keep.iter().enumerate() {
            let segment_path = temp_dir.join(format!("segment_{:03}.{}", i, extension));
            self.extract(input, *interval, &segment_path).await?;
            segment_files.push(segment_path);
        }

        let list_path = temp_dir.join("concat_list.txt");
        std::fs::write(&list_path, concat_list(&segment_files)).map_err(|e| AudioError::Io {
            path: list_path.clone(),
            source: e,
        })?;

        info!(segments = keep.len(), output = %output.display(), "concatenating keep segments");

        let args = vec![
            "-f".to_string(),
            "concat".to_string(),
            "-safe".to_string(),
            "0".to_string(),
            "-i".to_string(),
            list_path.display().to_string(),
            "-acodec".to_string(),
            "copy".to_string(),
            "-y".to_string(),
            output.display().to_string(),
        ];

        self.run_tool(&self.ffmpeg, &args).await.map(|_| ())
    }

    /// Extract a single interval with a lossless stream copy
    async fn extract(
        &self,
        input: &Path,
        interval: TimeInterval,
        output: &Path,
    ) -> Result<(), AudioError> {
        debug!(
            start = interval.start,
            end = interval.end,
            output = %output.display(),
            "extracting segment"
        );

        let args = vec![
            "-i".to_string(),
            input.display().to_string(),
            "-ss".to_string(),
            format!("{:.3}", interval.start),
            "-t".to_string(),
            format!("{:.3}", interval.duration()),
            "-acodec".to_string(),
            "copy".to_string(),
            "-y".to_string(),
            output.display().to_string(),
        ];

        self.run_tool(&self.ffmpeg, &args).await.map(|_| ())
    }

    /// Run a tool with a timeout, mapping NotFound and non-zero exits
    async fn run_tool(&self, tool: &str, args: &[String]) -> Result<String, AudioError> {
        let invocation = Command::new(tool)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output();

        let output = match tokio::time::timeout(self.timeout, invocation).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AudioError::ToolNotFound(tool.to_string()));
            }
            Ok(Err(e)) => {
                return Err(AudioError::Io {
                    path: PathBuf::from(tool),
                    source: e,
                });
            }
            Err(_) => {
                return Err(AudioError::ToolTimeout {
                    tool: tool.to_string(),
                    secs: self.timeout.as_secs(),
                });
            }
        };

        if !output.status.success() {
            return Err(AudioError::ToolFailed {
                tool: tool.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Render an ffmpeg concat demuxer file list, quoting each path
fn concat_list(files: &[PathBuf]) -> String {
    let mut list = String::new();
    for file in files {
        let quoted = file.display().to_string().replace('\'', "'\\''");
        list.push_str(&format!("file '{}'\n", quoted));
    }
    list
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AudioSettings;

    #[test]
    fn concat_list_quotes_paths() {
        let files = vec![
            PathBuf::from("/tmp/seg/segment_000.mp3"),
            PathBuf::from("/tmp/seg/segment_001.mp3"),
        ];
        assert_eq!(
            concat_list(&files),
            "file '/tmp/seg/segment_000.mp3'\nfile '/tmp/seg/segment_001.mp3'\n"
        );
    }

    #[test]
    fn concat_list_escapes_single_quotes() {
        let files = vec![PathBuf::from("/tmp/it's here.mp3")];
        assert!(concat_list(&files).contains("it'\\''s here"));
    }

    #[tokio::test]
    async fn cut_with_no_keep_intervals_is_an_error() {
        let editor = AudioEditor::new(&AudioSettings::default());

        let result = editor
            .cut(Path::new("in.mp3"), &[], Path::new("out.mp3"))
            .await;

        assert!(matches!(result, Err(AudioError::NothingToKeep)));
    }

    #[tokio::test]
    async fn missing_tool_maps_to_tool_not_found() {
        let settings = AudioSettings {
            ffmpeg: "definitely-not-a-real-ffmpeg-binary".to_string(),
            ffprobe: "definitely-not-a-real-ffprobe-binary".to_string(),
            tool_timeout_secs: 5,
        };
        let editor = AudioEditor::new(&settings);

        let result = editor.verify().await;
        assert!(matches!(result, Err(AudioError::ToolNotFound(_))));
    }
}
