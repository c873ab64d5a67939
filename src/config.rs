use serde::{Deserialize, Serialize};
use std::path::Path;
use crate::error::{Result, SubfuseError};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub translate: TranslateConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub acquire: AcquireConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind the HTTP server to
    pub host: String,
    /// Port to listen on
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslateConfig {
    /// Maximum number of cues sent to the model in one call
    pub batch_size: usize,
    /// Maximum number of batch calls in flight at once
    pub concurrency_limit: usize,
    /// Extra attempts for a failed or short batch before keeping source text
    pub batch_retries: u32,
    /// Sampling temperature for translation calls
    pub temperature: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of cached subtitle documents
    pub max_entries: usize,
    /// Maximum age of a cached document in seconds
    pub ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquireConfig {
    /// Path to the yt-dlp binary
    pub binary_path: String,
    /// Total attempts for a download that fails transiently
    pub max_attempts: u32,
    /// Initial backoff delay, doubled after each failed attempt
    pub backoff_base_ms: u64,
    /// Audio codec requested from the extractor
    pub audio_format: String,
    /// Audio quality requested from the extractor
    pub audio_quality: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Per-call budget for transcription and translation requests
    pub timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl Default for TranslateConfig {
    fn default() -> Self {
        Self {
            batch_size: 150,
            concurrency_limit: 10,
            batch_retries: 0,
            temperature: 0.1,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 100,
            ttl_secs: 24 * 60 * 60,
        }
    }
}

impl Default for AcquireConfig {
    fn default() -> Self {
        Self {
            binary_path: "yt-dlp".to_string(),
            max_attempts: 3,
            backoff_base_ms: 1000,
            audio_format: "mp3".to_string(),
            audio_quality: "192K".to_string(),
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self { timeout_secs: 600 }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SubfuseError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| SubfuseError::Config(format!("Failed to parse config file: {}", e)))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| SubfuseError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| SubfuseError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str("[translate]\nbatch_size = 20\n").unwrap();
        assert_eq!(config.translate.batch_size, 20);
        assert_eq!(config.translate.concurrency_limit, 10);
        assert_eq!(config.cache.max_entries, 100);
        assert_eq!(config.remote.timeout_secs, 600);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.server.port = 9100;
        config.save_to_file(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.server.port, 9100);
        assert_eq!(loaded.acquire.binary_path, "yt-dlp");
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = Config::from_file("/nonexistent/subfuse.toml").unwrap_err();
        assert!(matches!(err, SubfuseError::Config(_)));
    }
}
