// Model provider abstraction
//
// Every supported backend speaks the OpenAI-compatible wire format but
// differs in request details. Each provider is a small variant implementing
// the `Provider` capability interface, selected by name through
// `ProviderFactory`:
// - OpenAI: strict structured output, segment timestamps for whisper-1
// - Groq: JSON mode for most models, explicit token limits
//
// To add a provider, implement `Provider`, list its models in `models.rs`
// and register it in `ProviderFactory::create`.

pub mod client;
pub mod groq;
pub mod models;
pub mod openai;

use serde::Serialize;
use serde_json::{Value, json};
use std::sync::Arc;

pub use client::ModelClient;

/// API credentials supplied with each request
#[derive(Debug, Clone)]
pub struct Credentials {
    pub api_key: String,
    pub base_url: Option<String>,
}

impl Credentials {
    pub fn new<S: Into<String>>(api_key: S, base_url: Option<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.filter(|url| !url.trim().is_empty()),
        }
    }

    /// Base URL to call, falling back to the provider default
    pub fn resolve_base_url(&self, provider: &dyn Provider) -> String {
        self.base_url
            .as_deref()
            .unwrap_or(provider.default_base_url())
            .trim_end_matches('/')
            .to_string()
    }
}

/// Form fields for an `/audio/transcriptions` call
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptionRequest {
    pub model: String,
    pub response_format: String,
    pub timestamp_granularities: Vec<String>,
    pub temperature: Option<f32>,
}

impl TranscriptionRequest {
    pub fn new<S: Into<String>>(model: S) -> Self {
        Self {
            model: model.into(),
            response_format: "verbose_json".to_string(),
            timestamp_granularities: Vec::new(),
            temperature: None,
        }
    }

    pub fn expects_vtt(&self) -> bool {
        self.response_format == "vtt"
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system<S: Into<String>>(content: S) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }

    pub fn user<S: Into<String>>(content: S) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }
}

/// Body of a `/chat/completions` call
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub response_format: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

/// Schema the model must follow when strict structured output is used
pub fn translation_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "translations": {
                "type": "array",
                "items": { "type": "string" }
            }
        },
        "required": ["translations"],
        "additionalProperties": false
    })
}

/// Capability interface implemented by each backend
pub trait Provider: Send + Sync {
    /// Registry key, e.g. `openai`
    fn name(&self) -> &'static str;

    fn default_base_url(&self) -> &'static str;

    /// Maximum translation batches in flight for this backend
    fn concurrency_limit(&self) -> usize {
        10
    }

    /// Whether a translation model accepts strict `json_schema` output
    fn use_structured_output(&self, model: &str) -> bool {
        models::model_supports_structured_output(self.name(), model)
    }

    fn build_transcription_request(&self, model: &str) -> TranscriptionRequest {
        TranscriptionRequest::new(model)
    }

    /// `response_format` for a translation call
    fn response_format(&self, model: &str) -> Value {
        if self.use_structured_output(model) {
            json!({
                "type": "json_schema",
                "json_schema": {
                    "name": "batch_translation",
                    "strict": true,
                    "schema": translation_schema()
                }
            })
        } else {
            json!({ "type": "json_object" })
        }
    }

    fn build_translation_request(
        &self,
        model: &str,
        messages: Vec<ChatMessage>,
        temperature: f32,
    ) -> ChatRequest {
        ChatRequest {
            model: model.to_string(),
            messages,
            temperature,
            response_format: self.response_format(model),
            max_tokens: None,
        }
    }
}

/// Factory for provider variants keyed by name
pub struct ProviderFactory;

impl ProviderFactory {
    pub fn create(name: &str) -> Option<Arc<dyn Provider>> {
        match name.to_lowercase().as_str() {
            "openai" => Some(Arc::new(openai::OpenAiProvider)),
            "groq" => Some(Arc::new(groq::GroqProvider)),
            _ => None,
        }
    }

    pub fn list() -> Vec<&'static str> {
        vec!["openai", "groq"]
    }
}
