use std::collections::HashMap;
use std::sync::LazyLock;

use crate::provider::ChatMessage;

static LANGUAGE_NAMES: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    HashMap::from([
        ("en", "English"),
        ("pt", "Portuguese (Brazil)"),
        ("es", "Spanish"),
        ("fr", "French"),
        ("de", "German"),
        ("it", "Italian"),
        ("ja", "Japanese"),
        ("ko", "Korean"),
        ("zh", "Chinese"),
        ("ru", "Russian"),
        ("ar", "Arabic"),
        ("hi", "Hindi"),
        ("nl", "Dutch"),
        ("pl", "Polish"),
        ("tr", "Turkish"),
    ])
});

/// Human readable name for a language code; unknown codes pass through
pub fn language_code_to_name(code: &str) -> String {
    LANGUAGE_NAMES
        .get(code.to_lowercase().as_str())
        .map(|name| name.to_string())
        .unwrap_or_else(|| code.to_string())
}

/// Messages asking the model to translate `texts` as a JSON object
pub fn build_messages(texts: &[String], target_language: &str) -> Vec<ChatMessage> {
    let language_name = language_code_to_name(target_language);
    let payload = serde_json::to_string(texts).unwrap_or_else(|_| "[]".to_string());

    vec![
        ChatMessage::system(format!(
            "You are a professional translator. Translate the following subtitles to {}. \
             Return ONLY a JSON object with a 'translations' key containing an array of \
             translated strings in the exact same order and quantity. \
             Do not add any explanation or markdown.",
            language_name
        )),
        ChatMessage::user(format!("JSON array to translate:\n{}", payload)),
    ]
}
