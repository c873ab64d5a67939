// Batch translation of subtitle cues
//
// The orchestrator in `batch` splits an ordered cue list into batches and
// drives a `BatchTranslator` for each one under a concurrency gate. The
// translator is a seam: `llm::LlmTranslator` talks to a chat completion
// endpoint, tests plug in mocks.

pub mod batch;
pub mod llm;
pub mod prompt;

use async_trait::async_trait;
use std::sync::Arc;

pub use batch::{BatchOptions, BatchOrchestrator, TranslationOutcome, translate_cues};

use crate::config::{RemoteConfig, TranslateConfig};
use crate::error::Result;
use crate::provider::{Credentials, ModelClient, Provider};

/// Target language that means "keep the source text"
pub const ORIGINAL_LANGUAGE: &str = "original";

/// Translates one batch of texts, positionally
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BatchTranslator: Send + Sync {
    async fn translate_batch(&self, texts: &[String], target_language: &str) -> Result<Vec<String>>;
}

/// Builds a translator for one request's provider and credentials
pub trait TranslatorFactory: Send + Sync {
    fn create_translator(
        &self,
        provider: Arc<dyn Provider>,
        credentials: &Credentials,
        model: &str,
    ) -> Result<Arc<dyn BatchTranslator>>;
}

/// Factory for chat-completion backed translators
pub struct LlmTranslatorFactory {
    remote: RemoteConfig,
    temperature: f32,
}

impl LlmTranslatorFactory {
    pub fn new(remote: RemoteConfig, translate: &TranslateConfig) -> Self {
        Self {
            remote,
            temperature: translate.temperature,
        }
    }
}

impl TranslatorFactory for LlmTranslatorFactory {
    fn create_translator(
        &self,
        provider: Arc<dyn Provider>,
        credentials: &Credentials,
        model: &str,
    ) -> Result<Arc<dyn BatchTranslator>> {
        let client = ModelClient::new(provider, credentials, &self.remote)?;
        Ok(Arc::new(llm::LlmTranslator::new(client, model, self.temperature)))
    }
}
