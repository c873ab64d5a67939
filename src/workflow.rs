use serde::Deserialize;
use std::sync::Arc;
use tracing::{Instrument, info, info_span};
use uuid::Uuid;

use crate::cache::{CacheKey, ResultCache};
use crate::config::Config;
use crate::error::{Result, SubfuseError};
use crate::media::{AudioSource, AudioSourceFactory, MediaLocator, RetryPolicy, retry_with_backoff};
use crate::progress::{EventReceiver, ProgressSender, ProgressStream, Stage, StageRange, TranscriptResult};
use crate::provider::{Credentials, Provider, ProviderFactory};
use crate::subtitle;
use crate::transcribe::{RemoteTranscriber, TranscribeParams, Transcriber};
use crate::translate::{
    BatchOptions, BatchOrchestrator, LlmTranslatorFactory, ORIGINAL_LANGUAGE, TranslatorFactory,
};

pub const DEFAULT_TRANSCRIPTION_MODEL: &str = "whisper-1";
pub const DEFAULT_TRANSLATION_MODEL: &str = "gpt-4o-mini";

const DOWNLOAD_RANGE: StageRange = StageRange::new(5, 30);
const TRANSLATE_RANGE: StageRange = StageRange::new(75, 95);

fn default_target_language() -> String {
    "en".to_string()
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_true() -> bool {
    true
}

/// Body of a transcription request as it arrives on the wire
#[derive(Debug, Clone, Deserialize)]
pub struct TranscribeRequest {
    pub video_url: String,
    pub api_key: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_target_language")]
    pub target_language: String,
    #[serde(default)]
    pub transcription_model: Option<String>,
    #[serde(default)]
    pub translation_model: Option<String>,
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_true")]
    pub check_cache: bool,
}

/// A request that passed validation; nothing remote has been called yet
#[derive(Clone)]
pub struct PipelineRequest {
    pub locator: MediaLocator,
    pub provider: Arc<dyn Provider>,
    pub credentials: Credentials,
    pub target_language: String,
    pub transcription_model: String,
    pub translation_model: String,
    pub check_cache: bool,
}

fn model_or_default(model: Option<String>, default: &str) -> String {
    model
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| default.to_string())
}

impl TranscribeRequest {
    pub fn validate(self) -> Result<PipelineRequest> {
        if self.api_key.trim().len() < 10 {
            return Err(SubfuseError::Validation(
                "API key must be at least 10 characters".to_string(),
            ));
        }

        let locator = MediaLocator::parse(&self.video_url)?;

        let provider = ProviderFactory::create(&self.provider).ok_or_else(|| {
            SubfuseError::Validation(format!(
                "Invalid provider. Available: {}",
                ProviderFactory::list().join(", ")
            ))
        })?;

        let target_language = self.target_language.trim().to_string();
        if target_language.is_empty() {
            return Err(SubfuseError::Validation("Target language must not be empty".to_string()));
        }

        Ok(PipelineRequest {
            locator,
            provider,
            credentials: Credentials::new(self.api_key.trim(), self.base_url),
            target_language,
            transcription_model: model_or_default(self.transcription_model, DEFAULT_TRANSCRIPTION_MODEL),
            translation_model: model_or_default(self.translation_model, DEFAULT_TRANSLATION_MODEL),
            check_cache: self.check_cache,
        })
    }
}

impl PipelineRequest {
    pub fn cache_key(&self) -> CacheKey {
        CacheKey::new(&self.locator.video_id, &self.target_language)
    }
}

/// Cache lookup, acquisition, transcription, translation and cache store
pub struct Workflow {
    cache: Arc<ResultCache>,
    audio: Arc<dyn AudioSource>,
    transcriber: Arc<dyn Transcriber>,
    translators: Arc<dyn TranslatorFactory>,
    batch: BatchOptions,
    retry: RetryPolicy,
}

impl Workflow {
    pub fn new(config: &Config, cache: Arc<ResultCache>) -> Self {
        Self::with_components(
            config,
            cache,
            Arc::from(AudioSourceFactory::create_source(config.acquire.clone())),
            Arc::new(RemoteTranscriber::new(config.remote.clone())),
            Arc::new(LlmTranslatorFactory::new(config.remote.clone(), &config.translate)),
        )
    }

    pub fn with_components(
        config: &Config,
        cache: Arc<ResultCache>,
        audio: Arc<dyn AudioSource>,
        transcriber: Arc<dyn Transcriber>,
        translators: Arc<dyn TranslatorFactory>,
    ) -> Self {
        Self {
            cache,
            audio,
            transcriber,
            translators,
            batch: BatchOptions::from(&config.translate),
            retry: RetryPolicy::from(&config.acquire),
        }
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    /// Spawn a run for `request` and return its event stream
    pub fn start(self: &Arc<Self>, request: PipelineRequest) -> EventReceiver {
        let span = info_span!(
            "pipeline",
            request_id = %Uuid::new_v4(),
            video_id = %request.locator.video_id,
            target = %request.target_language
        );
        let workflow = Arc::clone(self);
        ProgressStream::spawn(move |sender| async move { workflow.run(request, sender).await }.instrument(span))
    }

    pub async fn run(&self, request: PipelineRequest, progress: ProgressSender) -> Result<TranscriptResult> {
        progress.progress(Stage::Initializing, 0, "Starting");
        let key = request.cache_key();

        if request.check_cache {
            if let Some(vtt) = self.cache.get(&key) {
                info!("Serving {}/{} from cache", key.content_id, key.language);
                progress.progress(Stage::Cached, 100, "Loaded from cache");
                return Ok(TranscriptResult { vtt, cached: true });
            }
        }

        // Acquisition
        let download = progress.reporter(Stage::Downloading, DOWNLOAD_RANGE);
        download.report(0.0, "Downloading audio");
        let audio_source = self.audio.as_ref();
        let locator = &request.locator;
        let reporter = &download;
        let audio = retry_with_backoff(&self.retry, move |attempt| {
            if attempt > 1 {
                reporter.report(0.0, format!("Retrying download (attempt {})", attempt));
            }
            audio_source.acquire(locator, reporter)
        })
        .await?;
        download.report(100.0, "Audio downloaded");

        // Transcription
        progress.progress(
            Stage::Transcribing,
            35,
            format!("Transcribing with {}/{}", request.provider.name(), request.transcription_model),
        );
        let params = TranscribeParams {
            provider: request.provider.clone(),
            model: request.transcription_model.clone(),
            credentials: request.credentials.clone(),
        };
        let transcript = self.transcriber.transcribe(audio.path(), &params).await?;
        drop(audio);

        let cues = subtitle::decode(&transcript.to_document());
        progress.progress(Stage::Transcribing, 75, format!("Transcribed {} segments", cues.len()));

        // Translation
        let cues = if request.target_language == ORIGINAL_LANGUAGE {
            cues
        } else {
            let translator = self.translators.create_translator(
                request.provider.clone(),
                &request.credentials,
                &request.translation_model,
            )?;
            let translating = progress.reporter(Stage::Translating, TRANSLATE_RANGE);
            translating.report(
                0.0,
                format!("Translating to {} with {}", request.target_language, request.translation_model),
            );

            let options = self.batch.with_provider_limit(request.provider.concurrency_limit());
            BatchOrchestrator::new(options)
                .translate(cues, &request.target_language, translator.as_ref(), Some(&translating))
                .await
                .cues
        };

        // Store
        progress.progress(Stage::Finalizing, 98, "Saving result");
        let vtt = subtitle::encode(&cues);
        self.cache.put(key, vtt.clone());

        Ok(TranscriptResult { vtt, cached: false })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MockAudioSource;
    use crate::progress::ProgressEvent;
    use crate::transcribe::MockTranscriber;

    fn request_json(extra: &str) -> String {
        format!(
            r#"{{"video_url": "https://www.youtube.com/watch?v=dQw4w9WgXcQ", "api_key": "sk-test-1234567890"{}}}"#,
            extra
        )
    }

    #[test]
    fn test_defaults_applied() {
        let request: TranscribeRequest = serde_json::from_str(&request_json("")).unwrap();
        assert_eq!(request.target_language, "en");
        assert_eq!(request.provider, "openai");
        assert!(request.check_cache);

        let validated = request.validate().unwrap();
        assert_eq!(validated.locator.video_id, "dQw4w9WgXcQ");
        assert_eq!(validated.transcription_model, "whisper-1");
        assert_eq!(validated.translation_model, "gpt-4o-mini");
        assert_eq!(validated.cache_key(), CacheKey::new("dQw4w9WgXcQ", "en"));
    }

    #[test]
    fn test_validation_failures() {
        let short_key: TranscribeRequest = serde_json::from_str(
            r#"{"video_url": "https://youtu.be/dQw4w9WgXcQ", "api_key": "short"}"#,
        )
        .unwrap();
        assert!(matches!(short_key.validate(), Err(SubfuseError::Validation(_))));

        let bad_provider: TranscribeRequest =
            serde_json::from_str(&request_json(r#", "provider": "azure""#)).unwrap();
        let err = bad_provider.validate().err().unwrap();
        assert_eq!(err.to_string(), "Validation error: Invalid provider. Available: openai, groq");

        let bad_url: TranscribeRequest = serde_json::from_str(
            r#"{"video_url": "https://example.com/video", "api_key": "sk-test-1234567890"}"#,
        )
        .unwrap();
        assert!(bad_url.validate().is_err());
    }

    #[test]
    fn test_blank_models_fall_back() {
        let request: TranscribeRequest = serde_json::from_str(&request_json(
            r#", "transcription_model": " ", "translation_model": "llama-3.1-8b-instant", "provider": "groq""#,
        ))
        .unwrap();
        let validated = request.validate().unwrap();
        assert_eq!(validated.transcription_model, "whisper-1");
        assert_eq!(validated.translation_model, "llama-3.1-8b-instant");
        assert_eq!(validated.provider.name(), "groq");
    }

    #[tokio::test]
    async fn test_cache_hit_skips_collaborators() {
        let config = Config::default();
        let cache = Arc::new(ResultCache::new(&config.cache));
        cache.put(CacheKey::new("dQw4w9WgXcQ", "en"), "WEBVTT\n\n".to_string());

        let mut audio = MockAudioSource::new();
        audio.expect_acquire().times(0);
        let mut transcriber = MockTranscriber::new();
        transcriber.expect_transcribe().times(0);

        let workflow = Arc::new(Workflow::with_components(
            &config,
            cache,
            Arc::new(audio),
            Arc::new(transcriber),
            Arc::new(LlmTranslatorFactory::new(config.remote.clone(), &config.translate)),
        ));
        let request: TranscribeRequest = serde_json::from_str(&request_json("")).unwrap();
        let events = workflow.start(request.validate().unwrap()).collect().await;

        assert_eq!(events.len(), 3);
        assert!(matches!(&events[2], ProgressEvent::Result { cached: true, .. }));
    }
}
