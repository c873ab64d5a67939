use super::{ChatMessage, ChatRequest, Provider, TranscriptionRequest};

/// Token ceiling for models that truncate large batches without one
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Groq API
pub struct GroqProvider;

impl Provider for GroqProvider {
    fn name(&self) -> &'static str {
        "groq"
    }

    fn default_base_url(&self) -> &'static str {
        "https://api.groq.com/openai/v1"
    }

    // Strict schemas run several times slower here; plain JSON mode is used for every model
    fn use_structured_output(&self, _model: &str) -> bool {
        false
    }

    fn build_transcription_request(&self, model: &str) -> TranscriptionRequest {
        let mut request = TranscriptionRequest::new(model);
        request.temperature = Some(0.0);
        request
    }

    fn build_translation_request(
        &self,
        model: &str,
        messages: Vec<ChatMessage>,
        temperature: f32,
    ) -> ChatRequest {
        let mut request = ChatRequest {
            model: model.to_string(),
            messages,
            temperature,
            response_format: self.response_format(model),
            max_tokens: None,
        };

        // Llama style models cut long batches short without an explicit limit
        if !model.contains("gpt-oss") {
            request.max_tokens = Some(DEFAULT_MAX_TOKENS);
        }
        request
    }
}
