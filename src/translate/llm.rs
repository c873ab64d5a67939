use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::{BatchTranslator, prompt};
use crate::error::{Result, SubfuseError};
use crate::provider::ModelClient;

/// Chat completion backed batch translator
pub struct LlmTranslator {
    client: ModelClient,
    model: String,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct TranslationsResponse {
    translations: Vec<String>,
}

impl LlmTranslator {
    pub fn new<S: Into<String>>(client: ModelClient, model: S, temperature: f32) -> Self {
        Self {
            client,
            model: model.into(),
            temperature,
        }
    }
}

#[async_trait]
impl BatchTranslator for LlmTranslator {
    async fn translate_batch(&self, texts: &[String], target_language: &str) -> Result<Vec<String>> {
        let messages = prompt::build_messages(texts, target_language);
        let request = self
            .client
            .provider()
            .build_translation_request(&self.model, messages, self.temperature);

        let content = self.client.chat_completion(&request).await?;
        debug!("Raw translation response: {}", content);

        parse_translations(&content).ok_or_else(|| {
            SubfuseError::Translation(format!(
                "Could not parse translations from model response: {}",
                truncate(&content, 200)
            ))
        })
    }
}

/// Parse `{"translations": [...]}` leniently: raw JSON, a fenced block, or
/// the span from the first `{` to the last `}`
pub fn parse_translations(text: &str) -> Option<Vec<String>> {
    let text = text.trim();

    if let Ok(parsed) = serde_json::from_str::<TranslationsResponse>(text) {
        return Some(parsed.translations);
    }

    let cleaned = remove_markdown_code_blocks(text);
    if cleaned != text {
        if let Ok(parsed) = serde_json::from_str::<TranslationsResponse>(&cleaned) {
            return Some(parsed.translations);
        }
    }

    for candidate in [text, cleaned.as_str()] {
        if let (Some(start), Some(end)) = (candidate.find('{'), candidate.rfind('}')) {
            if start < end {
                let json_str = &candidate[start..=end];
                debug!("Extracted JSON from mixed text: {}", json_str);
                if let Ok(parsed) = serde_json::from_str::<TranslationsResponse>(json_str) {
                    return Some(parsed.translations);
                }
            }
        }
    }

    None
}

fn remove_markdown_code_blocks(text: &str) -> String {
    let text = text.trim();
    if !(text.starts_with("```") && text.ends_with("```") && text.len() >= 6) {
        return text.to_string();
    }

    let inner = &text[3..text.len() - 3];
    inner.strip_prefix("json").unwrap_or(inner).trim().to_string()
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
