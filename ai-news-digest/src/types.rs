use serde::{Deserialize, Serialize};

// Shared records live in the interfaces crate
pub use interfaces::defs::{
    Article, Category, CrawlLog, Digest, DigestIndex, GenerationMode, Localized, NewsItem,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_attempts: u32,
    pub retry_delay_seconds: u64,
    pub max_feed_size_mb: usize,
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (compatible; AIDailyDigest/2.0)".to_string(),
            timeout_seconds: 15,
            max_attempts: 3,
            retry_delay_seconds: 1,
            max_feed_size_mb: 10,
            max_redirects: 5,
        }
    }
}

/// Decides whether a failed attempt is worth repeating.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

/// HTTP statuses that signal a transient upstream condition.
pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

#[derive(Debug, thiserror::Error)]
pub enum DigestError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("Feed parse error: {0}")]
    Parse(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Feed size exceeds limit: {size_mb}MB")]
    FeedTooLarge { size_mb: usize },

    #[error("No endpoint of {source_name} returned any records")]
    NoRecords { source_name: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Digest generation failed: {0}")]
    Generation(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("General error: {0}")]
    General(String),
}

impl Retryable for DigestError {
    fn is_retryable(&self) -> bool {
        match self {
            DigestError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request() || e.is_body(),
            DigestError::Status { status, .. } => is_retryable_status(*status),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, DigestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transient_statuses_retry() {
        for code in [429, 500, 502, 503, 504] {
            assert!(is_retryable_status(code));
        }
        for code in [400, 401, 403, 404, 422, 501] {
            assert!(!is_retryable_status(code));
        }
        let err = DigestError::Status { status: 404, url: "https://x".into() };
        assert!(!err.is_retryable());
        assert!(!DigestError::Parse("bad xml".into()).is_retryable());
    }
}
