use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_structured_output: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProviderCatalog {
    pub id: &'static str,
    pub name: &'static str,
    pub transcription_models: Vec<ModelInfo>,
    pub translation_models: Vec<ModelInfo>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    Transcription,
    Translation,
}

const fn transcription(id: &'static str, name: &'static str, description: &'static str) -> ModelInfo {
    ModelInfo {
        id,
        name,
        description,
        supports_structured_output: None,
    }
}

const fn translation(
    id: &'static str,
    name: &'static str,
    description: &'static str,
    structured: bool,
) -> ModelInfo {
    ModelInfo {
        id,
        name,
        description,
        supports_structured_output: Some(structured),
    }
}

/// Every provider with its transcription and translation models
pub fn catalog() -> Vec<ProviderCatalog> {
    vec![
        ProviderCatalog {
            id: "openai",
            name: "OpenAI",
            transcription_models: vec![
                transcription("whisper-1", "Whisper v1", "Whisper with segment timestamps"),
                transcription("gpt-4o-mini-transcribe", "GPT-4o Mini Transcribe", "Fast transcription returning VTT"),
            ],
            translation_models: vec![
                translation("gpt-4.1", "GPT-4.1", "Most capable GPT-4.1 model", true),
                translation("gpt-4.1-mini", "GPT-4.1 Mini", "Compact GPT-4.1", true),
                translation("gpt-4.1-nano", "GPT-4.1 Nano", "Smallest GPT-4.1", true),
                translation("gpt-4o", "GPT-4o", "Optimized GPT-4", true),
                translation("gpt-4o-mini", "GPT-4o Mini", "Compact GPT-4o", true),
                translation("gpt-5", "GPT-5", "Next generation", true),
                translation("gpt-5-mini", "GPT-5 Mini", "Compact GPT-5", true),
                translation("gpt-5-nano", "GPT-5 Nano", "Smallest GPT-5", true),
            ],
        },
        ProviderCatalog {
            id: "groq",
            name: "Groq",
            transcription_models: vec![transcription(
                "whisper-large-v3-turbo",
                "Whisper Large v3 Turbo",
                "Fast transcription model",
            )],
            translation_models: vec![
                translation("openai/gpt-oss-120b", "GPT-OSS 120B", "120B parameters with structured output", true),
                translation("openai/gpt-oss-20b", "GPT-OSS 20B", "20B parameters with structured output", true),
                translation("llama-3.3-70b-versatile", "Llama 3.3 70B Versatile", "Versatile 70B model", false),
                translation("llama-3.1-8b-instant", "Llama 3.1 8B Instant", "Fast 8B model", false),
                translation("meta-llama/llama-4-scout-17b-16e-instruct", "Llama 4 Scout 17B", "Llama 4 Scout", false),
                translation("meta-llama/llama-4-maverick-17b-128e-instruct", "Llama 4 Maverick 17B", "Llama 4 Maverick", false),
                translation("qwen/qwen3-32b", "Qwen3 32B", "Qwen 32B model", false),
                translation("moonshotai/kimi-k2-instruct-0905", "Kimi K2 Instruct", "Kimi K2 model", false),
            ],
        },
    ]
}

/// Models of one kind for a provider; unknown providers have none
pub fn provider_models(provider: &str, kind: ModelKind) -> Vec<ModelInfo> {
    catalog()
        .into_iter()
        .find(|p| p.id.eq_ignore_ascii_case(provider))
        .map(|p| match kind {
            ModelKind::Transcription => p.transcription_models,
            ModelKind::Translation => p.translation_models,
        })
        .unwrap_or_default()
}

/// Capability lookup: unknown models fall back to plain JSON mode
pub fn model_supports_structured_output(provider: &str, model: &str) -> bool {
    provider_models(provider, ModelKind::Translation)
        .iter()
        .find(|m| m.id == model)
        .and_then(|m| m.supports_structured_output)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structured_output_lookup() {
        assert!(model_supports_structured_output("openai", "gpt-4o-mini"));
        assert!(model_supports_structured_output("groq", "openai/gpt-oss-20b"));
        assert!(!model_supports_structured_output("groq", "llama-3.1-8b-instant"));
        assert!(!model_supports_structured_output("openai", "made-up-model"));
        assert!(!model_supports_structured_output("nobody", "gpt-4o"));
    }

    #[test]
    fn test_catalog_lists_both_providers() {
        let ids: Vec<_> = catalog().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["openai", "groq"]);
        assert!(provider_models("GROQ", ModelKind::Transcription)
            .iter()
            .any(|m| m.id == "whisper-large-v3-turbo"));
    }
}
