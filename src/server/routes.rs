use axum::{
    Router,
    http::{Method, header},
    routing::{delete, get, post},
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::AppState;
use super::handlers::{
    cache_stats, clear_cache, delete_cache_entry, delete_cache_video, health_check, inspect_cache_entry,
    list_models, root, transcribe,
};

pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::ACCEPT, header::CONTENT_TYPE, header::ORIGIN])
        .max_age(Duration::from_secs(3600));

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/models", get(list_models))
        .route("/transcribe", post(transcribe))
        .route("/cache", get(cache_stats).delete(clear_cache))
        .route("/cache/{video_id}", delete(delete_cache_video))
        .route(
            "/cache/{video_id}/{lang}",
            get(inspect_cache_entry).delete(delete_cache_entry),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheKey;
    use crate::config::Config;
    use crate::error::Result;
    use crate::media::{AudioHandle, MockAudioSource};
    use crate::provider::{Credentials, Provider};
    use crate::server::handlers::NDJSON_CONTENT_TYPE;
    use crate::subtitle::Cue;
    use crate::transcribe::{MockTranscriber, Transcript};
    use crate::translate::{BatchTranslator, MockBatchTranslator, TranslatorFactory};
    use crate::workflow::Workflow;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::util::ServiceExt;

    fn test_state() -> Arc<AppState> {
        Arc::new(AppState::new(Config::default()))
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn request(method: Method, uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = create_router(test_state()).oneshot(get_request("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["providers"], serde_json::json!(["openai", "groq"]));
        assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_models_catalog() {
        let response = create_router(test_state()).oneshot(get_request("/models")).await.unwrap();
        let json = body_json(response).await;
        let providers = json["providers"].as_array().unwrap();
        assert_eq!(providers.len(), 2);
        assert_eq!(providers[0]["id"], "openai");
        assert_eq!(providers[0]["transcription_models"][0]["id"], "whisper-1");
        assert_eq!(providers[1]["translation_models"][0]["supports_structured_output"], true);
    }

    #[tokio::test]
    async fn test_transcribe_rejects_invalid_request() {
        let app = create_router(test_state());
        let body = r#"{"video_url": "https://vimeo.com/1", "api_key": "sk-test-1234567890"}"#;
        let response = app.oneshot(request(Method::POST, "/transcribe", body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body_json(response).await["detail"], "Invalid YouTube URL");
    }

    #[tokio::test]
    async fn test_transcribe_rejects_malformed_json() {
        let app = create_router(test_state());
        let response = app
            .oneshot(request(Method::POST, "/transcribe", r#"{"video_url": 5"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body_json(response).await["detail"].is_string());
    }

    struct MockTranslators;

    impl TranslatorFactory for MockTranslators {
        fn create_translator(
            &self,
            _provider: Arc<dyn Provider>,
            _credentials: &Credentials,
            _model: &str,
        ) -> Result<Arc<dyn BatchTranslator>> {
            let mut translator = MockBatchTranslator::new();
            translator
                .expect_translate_batch()
                .returning(|texts, _| Ok(texts.iter().map(|t| format!("EN {}", t)).collect()));
            Ok(Arc::new(translator))
        }
    }

    #[tokio::test]
    async fn test_transcribe_streams_fresh_result() {
        let audio_file = tempfile::NamedTempFile::new().unwrap();
        let audio_path = audio_file.path().to_path_buf();

        let mut audio = MockAudioSource::new();
        audio
            .expect_acquire()
            .times(1)
            .returning(move |locator, _| {
                assert_eq!(locator.video_id, "test");
                Ok(AudioHandle::external(audio_path.clone()))
            });
        let mut transcriber = MockTranscriber::new();
        transcriber
            .expect_transcribe()
            .times(1)
            .returning(|_, params| {
                assert_eq!(params.model, "whisper-1");
                Ok(Transcript::Segments(vec![Cue::new(0.0, 5.0, "Test subtitle")]))
            });

        let config = Config::default();
        let cache = Arc::new(crate::cache::ResultCache::new(&config.cache));
        let workflow = Arc::new(Workflow::with_components(
            &config,
            cache,
            Arc::new(audio),
            Arc::new(transcriber),
            Arc::new(MockTranslators),
        ));
        let app = create_router(Arc::new(AppState::with_workflow(config, workflow)));

        let body = r#"{
            "video_url": "https://www.youtube.com/watch?v=test",
            "api_key": "test_key_with_length",
            "base_url": "",
            "target_language": "en",
            "transcription_model": "whisper-1",
            "translation_model": "gpt-4o-mini",
            "provider": "openai",
            "check_cache": false
        }"#;
        let response = app.oneshot(request(Method::POST, "/transcribe", body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        let last: Value = serde_json::from_str(text.lines().last().unwrap()).unwrap();
        assert_eq!(last["action"], "transcribe_result");
        assert_eq!(last["cached"], false);
        assert!(last["vtt"].as_str().unwrap().contains("EN Test subtitle"));
    }

    #[tokio::test]
    async fn test_transcribe_streams_cached_result() {
        let state = test_state();
        state
            .cache
            .put(CacheKey::new("dQw4w9WgXcQ", "pt"), "WEBVTT\n\n00:00:00.000 --> 00:00:01.000\nOi\n\n".to_string());

        let body = r#"{"video_url": "https://youtu.be/dQw4w9WgXcQ", "api_key": "sk-test-1234567890", "target_language": "pt"}"#;
        let response = create_router(state)
            .oneshot(request(Method::POST, "/transcribe", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], NDJSON_CONTENT_TYPE);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        let lines: Vec<Value> = text.lines().map(|l| serde_json::from_str(l).unwrap()).collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["stage"], "initializing");
        assert_eq!(lines[1]["stage"], "cached");
        assert_eq!(lines[1]["percent"], 100);
        assert_eq!(lines[2]["action"], "transcribe_result");
        assert_eq!(lines[2]["cached"], true);
        assert!(lines[2]["vtt"].as_str().unwrap().contains("Oi"));
    }

    #[tokio::test]
    async fn test_cache_maintenance() {
        let state = test_state();
        state.cache.put(CacheKey::new("abcdefghijk", "en"), "WEBVTT\n\n".to_string());
        state.cache.put(CacheKey::new("abcdefghijk", "fr"), "WEBVTT\n\n".to_string());
        state.cache.put(CacheKey::new("zyxwvutsrqp", "en"), "WEBVTT\n\n".to_string());
        let app = create_router(state.clone());

        let response = app.clone().oneshot(get_request("/cache/abcdefghijk/en")).await.unwrap();
        let json = body_json(response).await;
        assert_eq!(json["found"], true);
        assert_eq!(json["size"], 8);

        let response = app
            .clone()
            .oneshot(request(Method::DELETE, "/cache/abcdefghijk/en", ""))
            .await
            .unwrap();
        assert_eq!(body_json(response).await["found"], true);

        let response = app
            .clone()
            .oneshot(request(Method::DELETE, "/cache/abcdefghijk", ""))
            .await
            .unwrap();
        assert_eq!(body_json(response).await["removed_count"], 1);

        let response = app.clone().oneshot(request(Method::DELETE, "/cache", "")).await.unwrap();
        assert_eq!(body_json(response).await["removed_count"], 1);
        assert!(state.cache.is_empty());

        let response = app.oneshot(get_request("/cache/abcdefghijk/fr")).await.unwrap();
        assert_eq!(body_json(response).await["found"], false);
    }
}
