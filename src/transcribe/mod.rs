// Speech-to-text over OpenAI-compatible transcription endpoints
//
// A `Transcriber` turns an audio file into a `Transcript`. Service
// responses are converted through a `TranscriptionMapper`, so a new backend
// only needs its own output structs and a mapper:
// ```
// #[derive(Deserialize)]
// pub struct AzureSpeechOutput { ... }
//
// pub struct AzureSpeechMapper;
// impl TranscriptionMapper<AzureSpeechOutput> for AzureSpeechMapper {
//     fn to_transcript(output: AzureSpeechOutput) -> Result<Transcript> { ... }
// }
// ```

pub mod remote;

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

pub use remote::RemoteTranscriber;

use crate::error::Result;
use crate::provider::{Credentials, Provider};
use crate::subtitle::{self, Cue};

/// End time used when a service returns text without timestamps
pub const UNTIMED_END_SECS: f64 = 359_999.999;

/// What a transcription service produced
#[derive(Debug, Clone, PartialEq)]
pub enum Transcript {
    Segments(Vec<Cue>),
    Text(String),
}

impl Transcript {
    /// Cues for the transcript; plain text becomes one cue spanning everything
    pub fn into_cues(self) -> Vec<Cue> {
        match self {
            Transcript::Segments(cues) => cues,
            Transcript::Text(text) => vec![Cue::new(0.0, UNTIMED_END_SECS, text)],
        }
    }

    pub fn to_document(&self) -> String {
        subtitle::encode(&self.clone().into_cues())
    }
}

/// Converts a service-specific response into a `Transcript`
pub trait TranscriptionMapper<T> {
    fn to_transcript(service_result: T) -> Result<Transcript>;
}

/// Which model and account a transcription call uses
#[derive(Clone)]
pub struct TranscribeParams {
    pub provider: Arc<dyn Provider>,
    pub model: String,
    pub credentials: Credentials,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio_path: &Path, params: &TranscribeParams) -> Result<Transcript>;
}
