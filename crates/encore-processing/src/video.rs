//! Video transcoding through an external ffmpeg process.
//!
//! The transcoder probes the source duration with ffprobe, then runs ffmpeg
//! with `-progress pipe:1` and converts its out-time reports into whole
//! percentages pushed onto an mpsc channel. Progress never regresses: if the
//! tool reports a smaller value the last one is retained.

use std::path::Path;
use std::process::Stdio;

use encore_core::constants::VIDEO_AUDIO_BITRATE;
use encore_core::models::VideoPreset;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

#[derive(Debug, thiserror::Error)]
pub enum TranscodeError {
    #[error("Failed to probe video: {0}")]
    Probe(String),

    #[error("Transcoding failed: {0}")]
    Ffmpeg(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Wrapper around the ffmpeg/ffprobe binaries.
#[derive(Clone)]
pub struct FfmpegTranscoder {
    ffmpeg_path: String,
    ffprobe_path: String,
}

impl FfmpegTranscoder {
    pub fn new(ffmpeg_path: String, ffprobe_path: String) -> Self {
        Self {
            ffmpeg_path,
            ffprobe_path,
        }
    }

    /// Source duration in seconds, via ffprobe's JSON output.
    pub async fn probe_duration(&self, input: &Path) -> Result<f64, TranscodeError> {
        let output = Command::new(&self.ffprobe_path)
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "json",
            ])
            .arg(input)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| TranscodeError::Probe(format!("Failed to execute ffprobe: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TranscodeError::Probe(stderr.trim().to_string()));
        }

        let parsed: serde_json::Value = serde_json::from_slice(&output.stdout)
            .map_err(|e| TranscodeError::Probe(format!("Unparseable ffprobe output: {}", e)))?;

        parsed["format"]["duration"]
            .as_str()
            .and_then(|d| d.parse::<f64>().ok())
            .filter(|d| *d > 0.0)
            .ok_or_else(|| TranscodeError::Probe("No duration in ffprobe output".to_string()))
    }

    /// Transcode `input` to `output` with the given preset, reporting whole
    /// percentages on `progress`. A dropped receiver does not stop the work;
    /// the transcode always runs to completion or failure.
    pub async fn transcode(
        &self,
        input: &Path,
        output: &Path,
        preset: VideoPreset,
        progress: mpsc::Sender<u8>,
    ) -> Result<(), TranscodeError> {
        let duration_secs = self.probe_duration(input).await?;

        let args = build_ffmpeg_args(input, output, preset);
        tracing::debug!(preset = preset.as_str(), duration_secs, "Starting ffmpeg");

        let mut child = Command::new(&self.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| TranscodeError::Ffmpeg(format!("Failed to execute ffmpeg: {}", e)))?;

        // Drain stderr concurrently so a chatty ffmpeg cannot deadlock on a
        // full pipe; the tail doubles as the failure message.
        let mut stderr = child.stderr.take().expect("stderr piped");
        let stderr_task = tokio::spawn(async move {
            let mut buf = String::new();
            let _ = stderr.read_to_string(&mut buf).await;
            buf
        });

        let stdout = child.stdout.take().expect("stdout piped");
        let mut lines = BufReader::new(stdout).lines();
        let mut tracker = ProgressTracker::new(duration_secs);

        while let Ok(Some(line)) = lines.next_line().await {
            if let Some(percent) = tracker.observe_line(&line) {
                let _ = progress.send(percent).await;
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| TranscodeError::Ffmpeg(format!("Failed to wait for ffmpeg: {}", e)))?;
        let stderr_output = stderr_task.await.unwrap_or_default();

        if !status.success() {
            return Err(TranscodeError::Ffmpeg(stderr_tail(&stderr_output)));
        }

        let _ = progress.send(100).await;
        Ok(())
    }
}

/// Build the ffmpeg argument list for a preset: H.264 at the preset's CRF,
/// scaled to at most the preset's vertical resolution (never upscaled),
/// AAC audio at a fixed bitrate.
fn build_ffmpeg_args(input: &Path, output: &Path, preset: VideoPreset) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-i".to_string(),
        input.to_string_lossy().to_string(),
        "-c:v".to_string(),
        "libx264".to_string(),
        "-preset".to_string(),
        "fast".to_string(),
        "-crf".to_string(),
        preset.crf().to_string(),
        "-vf".to_string(),
        format!("scale=-2:min({}\\,ih)", preset.target_height()),
        "-c:a".to_string(),
        "aac".to_string(),
        "-b:a".to_string(),
        VIDEO_AUDIO_BITRATE.to_string(),
        "-movflags".to_string(),
        "+faststart".to_string(),
        "-progress".to_string(),
        "pipe:1".to_string(),
        "-nostats".to_string(),
        output.to_string_lossy().to_string(),
    ]
}

/// Converts ffmpeg `-progress` key=value lines into monotone percentages.
struct ProgressTracker {
    duration_us: f64,
    last_percent: u8,
}

impl ProgressTracker {
    fn new(duration_secs: f64) -> Self {
        Self {
            duration_us: duration_secs * 1_000_000.0,
            last_percent: 0,
        }
    }

    /// Returns a percentage only when it advances past the last reported one.
    /// Capped at 99 while running; 100 is reserved for successful exit.
    fn observe_line(&mut self, line: &str) -> Option<u8> {
        let micros = parse_out_time_us(line)?;
        let percent = ((micros as f64 / self.duration_us) * 100.0).floor() as i64;
        let percent = percent.clamp(0, 99) as u8;
        if percent > self.last_percent {
            self.last_percent = percent;
            Some(percent)
        } else {
            None
        }
    }
}

/// Parse an out-time progress line into microseconds. ffmpeg emits
/// `out_time_us` and, due to a long-standing quirk, `out_time_ms` also in
/// microseconds; both are treated the same.
fn parse_out_time_us(line: &str) -> Option<u64> {
    let value = line
        .strip_prefix("out_time_us=")
        .or_else(|| line.strip_prefix("out_time_ms="))?;
    value.trim().parse::<u64>().ok()
}

/// Last few stderr lines, which is where ffmpeg puts the actual error.
fn stderr_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.lines().filter(|l| !l.trim().is_empty()).collect();
    let tail_start = lines.len().saturating_sub(5);
    let tail = lines[tail_start..].join("\n");
    if tail.is_empty() {
        "ffmpeg exited with a non-zero status".to_string()
    } else {
        tail
    }
}
