use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;
use tokio::fs;
use tracing::{debug, info};

use crate::error::Result;

/// File-type header emitted at the top of every encoded document
pub const VTT_HEADER: &str = "WEBVTT";

static TIMESTAMP_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"((?:\d{2,}:)?\d{2}:\d{2}\.\d{3})\s*-->\s*((?:\d{2,}:)?\d{2}:\d{2}\.\d{3})")
        .expect("timestamp pattern is valid")
});

/// One timed subtitle entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cue {
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
    /// Cue text, possibly spanning several lines
    pub text: String,
}

impl Cue {
    pub fn new<S: Into<String>>(start: f64, end: f64, text: S) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }
}

/// Parse a `MM:SS.mmm` or `HH:MM:SS.mmm` timestamp into seconds.
///
/// Missing hour fields count as zero and unparseable components as zero,
/// so this never rejects input.
pub fn parse_time(time_str: &str) -> f64 {
    let parts: Vec<&str> = time_str.trim().split(':').collect();
    let number = |s: &str| s.trim().parse::<f64>().unwrap_or(0.0);

    match parts.as_slice() {
        [hours, minutes, seconds] => number(hours) * 3600.0 + number(minutes) * 60.0 + number(seconds),
        [minutes, seconds] => number(minutes) * 60.0 + number(seconds),
        [seconds] => number(seconds),
        _ => 0.0,
    }
}

/// Format seconds as a zero-padded `HH:MM:SS.mmm` timestamp
pub fn format_time(seconds: f64) -> String {
    let total_milliseconds = (seconds.max(0.0) * 1000.0).round() as u64;
    let hours = total_milliseconds / 3_600_000;
    let minutes = (total_milliseconds % 3_600_000) / 60_000;
    let secs = (total_milliseconds % 60_000) / 1_000;
    let millis = total_milliseconds % 1_000;

    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, secs, millis)
}

/// Decode a WebVTT document into an ordered cue sequence
pub fn decode(document: &str) -> Vec<Cue> {
    let mut cues = Vec::new();
    let mut current: Option<Cue> = None;

    for line in document.lines() {
        let line = line.trim();
        if line.is_empty() || is_header(line) {
            continue;
        }

        if let Some(captures) = TIMESTAMP_RANGE.captures(line) {
            if let Some(finished) = current.take() {
                cues.push(finished);
            }
            let start = parse_time(&captures[1]);
            let end = parse_time(&captures[2]);
            current = Some(Cue::new(start, end, String::new()));
        } else if let Some(cue) = current.as_mut() {
            if !cue.text.is_empty() {
                cue.text.push('\n');
            }
            cue.text.push_str(line);
        } else {
            debug!("Skipping stray subtitle line: {}", line);
        }
    }

    if let Some(finished) = current {
        cues.push(finished);
    }

    cues
}

/// Encode cues as a WebVTT document
pub fn encode(cues: &[Cue]) -> String {
    let mut document = format!("{}\n\n", VTT_HEADER);

    for cue in cues {
        document.push_str(&format!(
            "{} --> {}\n{}\n\n",
            format_time(cue.start),
            format_time(cue.end),
            cue.text.trim()
        ));
    }

    document
}

fn is_header(line: &str) -> bool {
    line == VTT_HEADER || line.starts_with("WEBVTT ") || line.starts_with("WEBVTT\t")
}

/// Read and decode a WebVTT file
pub async fn read_document<P: AsRef<Path>>(path: P) -> Result<Vec<Cue>> {
    let content = fs::read_to_string(path.as_ref()).await?;
    Ok(decode(&content))
}

/// Encode cues and write them to a WebVTT file
pub async fn write_document<P: AsRef<Path>>(cues: &[Cue], output_path: P) -> Result<()> {
    let output_path = output_path.as_ref();
    info!("Writing WebVTT file: {}", output_path.display());

    fs::write(output_path, encode(cues)).await?;

    info!("WebVTT file written with {} cues", cues.len());
    Ok(())
}
