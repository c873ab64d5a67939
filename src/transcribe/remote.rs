use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

use super::{TranscribeParams, Transcriber, Transcript, TranscriptionMapper};
use crate::config::RemoteConfig;
use crate::error::{Result, SubfuseError};
use crate::provider::ModelClient;
use crate::subtitle::{self, Cue};

/// `verbose_json` output of an OpenAI-compatible transcription endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct VerboseJsonOutput {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub segments: Vec<VerboseJsonSegment>,
    pub language: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerboseJsonSegment {
    #[serde(default)]
    pub start: f64,
    #[serde(default)]
    pub end: f64,
    #[serde(default)]
    pub text: String,
}

pub struct VerboseJsonMapper;

impl TranscriptionMapper<VerboseJsonOutput> for VerboseJsonMapper {
    fn to_transcript(output: VerboseJsonOutput) -> Result<Transcript> {
        if output.segments.is_empty() {
            if output.text.trim().is_empty() {
                return Err(SubfuseError::Transcription(
                    "Transcription response contained neither segments nor text".to_string(),
                ));
            }
            return Ok(Transcript::Text(output.text.trim().to_string()));
        }

        let cues = output
            .segments
            .into_iter()
            .map(|seg| Cue::new(seg.start, seg.end, seg.text.trim()))
            .collect();
        Ok(Transcript::Segments(cues))
    }
}

/// Posts audio to the provider's `/audio/transcriptions` endpoint
pub struct RemoteTranscriber {
    remote: RemoteConfig,
}

impl RemoteTranscriber {
    pub fn new(remote: RemoteConfig) -> Self {
        Self { remote }
    }
}

/// Interpret a transcription body according to the format that was requested
pub fn parse_transcription_body(body: &str, expects_vtt: bool) -> Result<Transcript> {
    let trimmed = body.trim_start();
    if expects_vtt || trimmed.starts_with(subtitle::VTT_HEADER) {
        let cues = subtitle::decode(body);
        if cues.is_empty() {
            return Err(SubfuseError::Transcription(
                "Transcription returned a subtitle document without cues".to_string(),
            ));
        }
        return Ok(Transcript::Segments(cues));
    }

    match serde_json::from_str::<VerboseJsonOutput>(body) {
        Ok(output) => VerboseJsonMapper::to_transcript(output),
        // Some models answer with bare text even when JSON was requested
        Err(_) if !trimmed.is_empty() && !trimmed.starts_with('{') => {
            Ok(Transcript::Text(trimmed.trim_end().to_string()))
        }
        Err(e) => Err(SubfuseError::Transcription(format!(
            "Failed to parse transcription response: {}",
            e
        ))),
    }
}

#[async_trait]
impl Transcriber for RemoteTranscriber {
    async fn transcribe(&self, audio_path: &Path, params: &TranscribeParams) -> Result<Transcript> {
        let client = ModelClient::new(params.provider.clone(), &params.credentials, &self.remote)?;
        let request = params.provider.build_transcription_request(&params.model);

        info!(
            "Transcribing {} with {}/{}",
            audio_path.display(),
            params.provider.name(),
            params.model
        );
        let body = client.transcribe_audio(audio_path, &request).await?;
        debug!("Transcription response is {} bytes", body.len());

        parse_transcription_body(&body, request.expects_vtt())
    }
}
