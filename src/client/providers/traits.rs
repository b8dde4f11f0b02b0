use crate::client::{PaperRecord, Source};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Search parameters handed to an adapter at construction time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceConfig {
    /// Query string in the source's own syntax
    pub query: String,
    /// First publication year, inclusive
    pub year_start: u16,
    /// Last publication year, inclusive
    pub year_end: u16,
    pub api_key: Option<String>,
    pub contact_email: Option<String>,
    /// Collection cap; 0 means no cap
    pub max_results: usize,
    /// Records requested per page or batch
    pub page_size: usize,
}

impl SourceConfig {
    /// True once `collected` records satisfy the cap
    #[must_use]
    pub const fn limit_reached(&self, collected: usize) -> bool {
        self.max_results > 0 && collected >= self.max_results
    }
}

/// Why an adapter stopped collecting
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// The source had no further results
    Exhausted,
    /// `max_results` was reached
    LimitReached,
    /// A page failed; the records gathered so far are kept
    Aborted(ProviderError),
}

/// Result from a source adapter
#[derive(Debug, Clone)]
pub struct ProviderResult {
    /// Records collected, in source order
    pub records: Vec<PaperRecord>,
    /// Source that provided the results
    pub source: Source,
    /// Total number of results the source reported (if known)
    pub total_available: Option<usize>,
    /// Pages or batches fetched
    pub pages_fetched: usize,
    /// Time taken to execute the search
    pub search_time: Duration,
    pub termination: Termination,
}

impl ProviderResult {
    /// True when the collection was cut short by a failure
    #[must_use]
    pub const fn is_partial(&self) -> bool {
        matches!(self.termination, Termination::Aborted(_))
    }
}

/// Errors that can occur during provider operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Rate limit exceeded (last retry-after {retry_after:?})")]
    RateLimit { retry_after: Duration },

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Timeout occurred")]
    Timeout,

    #[error("Provider error: {0}")]
    Other(String),
}

impl ProviderError {
    /// Fatal errors abort the whole source and discard its records
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Auth(_))
    }
}

impl From<crate::Error> for ProviderError {
    fn from(err: crate::Error) -> Self {
        use crate::Error;

        match err {
            Error::AuthenticationFailed(msg) => Self::Auth(msg),
            Error::AuthorizationDenied { resource } => {
                Self::Auth(format!("access denied to {resource}"))
            }
            Error::RateLimitExceeded { retry_after } => Self::RateLimit { retry_after },
            Error::NetworkTimeout { .. } => Self::Timeout,
            Error::ServiceUnavailable { service, reason } => {
                Self::ServiceUnavailable(format!("{service}: {reason}"))
            }
            Error::InvalidInput { reason, .. } => Self::InvalidQuery(reason),
            Error::Parse { message, .. } => Self::Parse(message),
            Error::Serde(e) => Self::Parse(e.to_string()),
            Error::Http(e) => Self::Network(e.to_string()),
            Error::Api {
                service,
                status,
                message,
            } => Self::Other(format!("{service} returned HTTP {status}: {message}")),
            other => Self::Other(other.to_string()),
        }
    }
}

/// A bibliographic API turned into a sequence of [`PaperRecord`]s.
///
/// Implementations own their pagination. They return partial results with
/// [`Termination::Aborted`] when a page fails and `Err` only for failures that
/// invalidate the whole source (rejected credentials).
#[async_trait]
pub trait SourceProvider: Send + Sync {
    /// Unique name/identifier for this provider
    fn name(&self) -> &str;

    fn source(&self) -> Source;

    /// Parameters this provider searches with
    fn config(&self) -> &SourceConfig;

    /// Collect every record matching the configured query and year window
    async fn search(&self) -> Result<ProviderResult, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_reached() {
        let mut config = SourceConfig {
            query: "q".to_string(),
            year_start: 2020,
            year_end: 2025,
            api_key: None,
            contact_email: None,
            max_results: 2,
            page_size: 25,
        };
        assert!(!config.limit_reached(1));
        assert!(config.limit_reached(2));

        config.max_results = 0;
        assert!(!config.limit_reached(1_000_000));
    }

    #[test]
    fn test_error_conversion_keeps_auth_fatal() {
        let err: ProviderError = crate::Error::AuthorizationDenied {
            resource: "scopus".to_string(),
        }
        .into();
        assert!(err.is_fatal());

        let err: ProviderError = crate::Error::RateLimitExceeded {
            retry_after: Duration::from_secs(5),
        }
        .into();
        assert!(!err.is_fatal());
        assert!(matches!(err, ProviderError::RateLimit { .. }));
    }
}
