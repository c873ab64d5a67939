use async_trait::async_trait;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, info};

use super::{AudioHandle, AudioSource, MediaCommand, MediaLocator};
use crate::config::AcquireConfig;
use crate::error::{Result, SubfuseError};
use crate::progress::StageReporter;

static DOWNLOAD_PERCENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[download\]\s+(\d{1,3}(?:\.\d+)?)%").expect("download progress pattern is valid")
});

const TRANSIENT_MARKERS: &[&str] = &[
    "HTTP Error 403",
    "HTTP Error 429",
    "Too Many Requests",
    "Connection reset",
    "timed out",
    "Temporary failure in name resolution",
];

/// Downloads and extracts audio with yt-dlp
pub struct YtDlpSource {
    config: AcquireConfig,
}

impl YtDlpSource {
    pub fn new(config: AcquireConfig) -> Self {
        Self { config }
    }

    fn build_command(&self, url: &str, output_template: &Path) -> MediaCommand {
        MediaCommand::new(&self.config.binary_path, format!("Extract audio from {}", url))
            .args(["-x", "--audio-format"])
            .arg(&self.config.audio_format)
            .arg("--audio-quality")
            .arg(&self.config.audio_quality)
            .args(["--newline", "--no-playlist", "--no-warnings", "-o"])
            .arg(output_template.to_string_lossy().to_string())
            .arg(url)
    }
}

/// Percent from a `[download]  42.0% of ...` progress line
pub fn parse_download_percent(line: &str) -> Option<f32> {
    DOWNLOAD_PERCENT
        .captures(line)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f32>().ok())
        .map(|p| p.min(100.0))
}

/// Map extractor stderr to a transient or permanent error
pub fn classify_failure(stderr: &str) -> SubfuseError {
    let message = stderr
        .lines()
        .rev()
        .find(|line| line.contains("ERROR"))
        .unwrap_or_else(|| stderr.trim())
        .to_string();

    if TRANSIENT_MARKERS.iter().any(|marker| stderr.contains(marker)) {
        SubfuseError::TransientRemote(message)
    } else {
        SubfuseError::Acquisition(message)
    }
}

async fn find_audio_file(dir: &Path, extension: &str) -> Result<PathBuf> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut fallback = None;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case(extension)) {
            return Ok(path);
        }
        if fallback.is_none() && path.is_file() {
            fallback = Some(path);
        }
    }
    fallback.ok_or_else(|| SubfuseError::Acquisition("Audio file not found after download".to_string()))
}

#[async_trait]
impl AudioSource for YtDlpSource {
    async fn acquire(&self, locator: &MediaLocator, progress: &StageReporter) -> Result<AudioHandle> {
        let dir = tempfile::Builder::new().prefix("subfuse-audio-").tempdir()?;
        let template = dir.path().join("audio.%(ext)s");
        let command = self.build_command(&locator.url, &template);

        info!("Downloading audio for {}", locator.video_id);
        let output = command
            .execute_streaming(|line| {
                if let Some(percent) = parse_download_percent(line) {
                    progress.report(percent, format!("Downloading audio {:.0}%", percent));
                } else {
                    debug!("yt-dlp: {}", line);
                }
            })
            .await?;

        if !output.success {
            return Err(classify_failure(&output.stderr));
        }

        let path = find_audio_file(dir.path(), &self.config.audio_format).await?;
        info!("Audio downloaded to {}", path.display());
        Ok(AudioHandle::new(dir, path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_percent_lines() {
        assert_eq!(parse_download_percent("[download]  42.5% of 3.10MiB at 1.2MiB/s"), Some(42.5));
        assert_eq!(parse_download_percent("[download] 100% of 3.10MiB"), Some(100.0));
        assert_eq!(parse_download_percent("[ExtractAudio] Destination: audio.mp3"), None);
    }

    #[test]
    fn test_failure_classification() {
        let throttled = "WARNING: something\nERROR: unable to download video data: HTTP Error 429: Too Many Requests\n";
        match classify_failure(throttled) {
            SubfuseError::TransientRemote(msg) => assert!(msg.starts_with("ERROR: unable")),
            other => panic!("expected transient, got {:?}", other),
        }

        let gone = "ERROR: [youtube] abcdefghijk: Video unavailable\n";
        assert!(matches!(classify_failure(gone), SubfuseError::Acquisition(_)));
    }

    #[test]
    fn test_command_uses_configured_extraction() {
        let source = YtDlpSource::new(AcquireConfig::default());
        let cmd = source.build_command("https://youtu.be/abcdefghijk", Path::new("/tmp/x/audio.%(ext)s"));
        assert_eq!(cmd.binary_path, "yt-dlp");
        assert_eq!(&cmd.args[..5], &["-x", "--audio-format", "mp3", "--audio-quality", "192K"]);
        assert_eq!(cmd.args.last().unwrap(), "https://youtu.be/abcdefghijk");
    }

    #[tokio::test]
    async fn test_find_audio_file_prefers_extension() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("audio.webm.part"), b"x").await.unwrap();
        tokio::fs::write(dir.path().join("audio.mp3"), b"x").await.unwrap();
        let found = find_audio_file(dir.path(), "mp3").await.unwrap();
        assert_eq!(found.file_name().unwrap(), "audio.mp3");
    }
}
