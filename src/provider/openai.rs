use super::{Provider, TranscriptionRequest};

/// OpenAI API
pub struct OpenAiProvider;

impl Provider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn default_base_url(&self) -> &'static str {
        "https://api.openai.com/v1"
    }

    fn build_transcription_request(&self, model: &str) -> TranscriptionRequest {
        let mut request = TranscriptionRequest::new(model);
        match model {
            // whisper-1 returns per-segment timestamps in verbose_json
            "whisper-1" => request.timestamp_granularities = vec!["segment".to_string()],
            "gpt-4o-mini-transcribe" => request.response_format = "vtt".to_string(),
            _ => {}
        }
        request
    }
}
