// Audio acquisition
//
// - Locator: URL validation and content identity
// - Commands: external extractor invocation with streamed output
// - YtDlp: default `AudioSource` built on yt-dlp
// - Retry: exponential backoff for transient download failures

pub mod commands;
pub mod locator;
pub mod retry;
pub mod ytdlp;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub use commands::*;
pub use locator::MediaLocator;
pub use retry::{RetryPolicy, retry_with_backoff};
pub use ytdlp::YtDlpSource;

use crate::config::AcquireConfig;
use crate::error::Result;
use crate::progress::StageReporter;

/// Downloaded audio; the containing directory is removed on drop
#[derive(Debug)]
pub struct AudioHandle {
    _dir: Option<TempDir>,
    path: PathBuf,
}

impl AudioHandle {
    pub fn new(dir: TempDir, path: PathBuf) -> Self {
        Self { _dir: Some(dir), path }
    }

    /// Handle for a file the caller owns; nothing is removed on drop
    pub fn external(path: PathBuf) -> Self {
        Self { _dir: None, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Fetches the audio track for a locator
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AudioSource: Send + Sync {
    async fn acquire(&self, locator: &MediaLocator, progress: &StageReporter) -> Result<AudioHandle>;
}

/// Factory for audio sources
pub struct AudioSourceFactory;

impl AudioSourceFactory {
    pub fn create_source(config: AcquireConfig) -> Box<dyn AudioSource> {
        Box::new(ytdlp::YtDlpSource::new(config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_handle_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let dir_path = dir.path().to_path_buf();
        let file = dir_path.join("audio.mp3");
        std::fs::write(&file, b"id3").unwrap();

        let handle = AudioHandle::new(dir, file.clone());
        assert!(handle.path().exists());
        drop(handle);
        assert!(!dir_path.exists());
    }

    #[test]
    fn test_external_handle_leaves_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let handle = AudioHandle::external(file.path().to_path_buf());
        drop(handle);
        assert!(file.path().exists());
    }
}
