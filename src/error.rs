use thiserror::Error;

#[derive(Error, Debug)]
pub enum SubfuseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Malformed request identity or parameters, rejected before any remote call
    #[error("Validation error: {0}")]
    Validation(String),

    /// Network or connection level failure, eligible for retry at the acquisition layer
    #[error("API connection failed: {0}")]
    TransientRemote(String),

    /// Authenticated call that the remote service rejected (bad model, quota, ...)
    #[error("Remote service error: {0}")]
    RemoteService(String),

    /// One translation batch failed; absorbed by the orchestrator
    #[error("Batch {batch} failed: {reason}")]
    PartialBatchFailure { batch: usize, reason: String },

    #[error("Cache invariant violated: {0}")]
    CacheInvariant(String),

    #[error("Audio acquisition error: {0}")]
    Acquisition(String),

    #[error("Transcription error: {0}")]
    Transcription(String),

    #[error("Translation error: {0}")]
    Translation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Pipeline task aborted: {0}")]
    Aborted(String),
}

impl SubfuseError {
    /// Whether the failure may succeed on a later attempt
    pub fn is_transient(&self) -> bool {
        match self {
            Self::TransientRemote(_) => true,
            Self::Http(e) => e.is_connect() || e.is_timeout(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, SubfuseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(SubfuseError::TransientRemote("reset".into()).is_transient());
        assert!(!SubfuseError::RemoteService("quota".into()).is_transient());
        assert!(!SubfuseError::Validation("bad url".into()).is_transient());
    }

    #[test]
    fn test_batch_failure_message() {
        let err = SubfuseError::PartialBatchFailure { batch: 2, reason: "timeout".into() };
        assert_eq!(err.to_string(), "Batch 2 failed: timeout");
    }
}
