use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::{ChatRequest, Credentials, Provider, TranscriptionRequest};
use crate::config::RemoteConfig;
use crate::error::{Result, SubfuseError};

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// Thin client for the OpenAI-compatible endpoints of one provider
#[derive(Clone)]
pub struct ModelClient {
    http: reqwest::Client,
    provider: Arc<dyn Provider>,
    base_url: String,
    api_key: String,
}

impl ModelClient {
    pub fn new(provider: Arc<dyn Provider>, credentials: &Credentials, remote: &RemoteConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(remote.timeout_secs))
            .build()
            .map_err(|e| SubfuseError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: credentials.resolve_base_url(provider.as_ref()),
            api_key: credentials.api_key.clone(),
            http,
            provider,
        })
    }

    pub fn provider(&self) -> &dyn Provider {
        self.provider.as_ref()
    }

    /// Send a chat completion and return the first choice's content
    pub async fn chat_completion(&self, request: &ChatRequest) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!("POST {} (model {})", url, request.model);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(classify_send_error)?;

        let body = read_success_body(response).await?;
        let parsed: ChatCompletionResponse = serde_json::from_str(&body)
            .map_err(|e| SubfuseError::RemoteService(format!("Unexpected chat completion response: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| SubfuseError::RemoteService("Chat completion returned no content".to_string()))
    }

    /// Upload an audio file for transcription and return the raw response body
    pub async fn transcribe_audio(&self, audio: &Path, request: &TranscriptionRequest) -> Result<String> {
        let bytes = tokio::fs::read(audio).await?;
        let file_name = audio
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "audio.mp3".to_string());

        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("audio/mpeg")?;

        let mut form = Form::new()
            .part("file", part)
            .text("model", request.model.clone())
            .text("response_format", request.response_format.clone());
        for granularity in &request.timestamp_granularities {
            form = form.text("timestamp_granularities[]", granularity.clone());
        }
        if let Some(temperature) = request.temperature {
            form = form.text("temperature", temperature.to_string());
        }

        let url = format!("{}/audio/transcriptions", self.base_url);
        debug!("POST {} (model {}, format {})", url, request.model, request.response_format);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(classify_send_error)?;

        read_success_body(response).await
    }
}

fn classify_send_error(e: reqwest::Error) -> SubfuseError {
    if e.is_connect() || e.is_timeout() || e.is_request() {
        SubfuseError::TransientRemote(e.to_string())
    } else {
        SubfuseError::Http(e)
    }
}

async fn read_success_body(response: reqwest::Response) -> Result<String> {
    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        warn!("Model API returned {}: {}", status, error_text);
        return Err(SubfuseError::RemoteService(format!("{}: {}", status, error_text)));
    }

    response.text().await.map_err(classify_send_error)
}
