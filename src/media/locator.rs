use regex::Regex;
use std::sync::LazyLock;

use crate::error::{Result, SubfuseError};

static VIDEO_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:[?&]v=|youtu\.be/|/shorts/|/embed/|/live/)([A-Za-z0-9_-]+)")
        .expect("video id pattern is valid")
});

/// A validated video URL and the content identity derived from it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaLocator {
    pub url: String,
    pub video_id: String,
}

impl MediaLocator {
    pub fn parse(url: &str) -> Result<Self> {
        let url = url.trim();
        if url.is_empty() || !(url.contains("youtube.com") || url.contains("youtu.be")) {
            return Err(SubfuseError::Validation("Invalid YouTube URL".to_string()));
        }

        let video_id = extract_video_id(url)
            .ok_or_else(|| SubfuseError::Validation(format!("Could not find a video id in {}", url)))?;

        Ok(Self {
            url: url.to_string(),
            video_id,
        })
    }
}

pub fn extract_video_id(url: &str) -> Option<String> {
    VIDEO_ID
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
