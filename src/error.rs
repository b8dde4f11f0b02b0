use std::time::Duration;
use thiserror::Error;

/// Error categorization shared by the collection and classification stages
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (permanent failures)
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // I/O errors (potentially transient)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors (usually permanent)
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    // Network errors (transient - should retry)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Network timeout after {timeout:?}: {message}")]
    NetworkTimeout { timeout: Duration, message: String },

    #[error("Rate limit exceeded: retry after {retry_after:?}")]
    RateLimitExceeded { retry_after: Duration },

    // Client errors (permanent - don't retry)
    #[error("Invalid input: {field} - {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Authorization denied: {resource}")]
    AuthorizationDenied { resource: String },

    #[error("API error {status} from {service}: {message}")]
    Api {
        service: String,
        status: u16,
        message: String,
    },

    // Server errors (transient - should retry)
    #[error("Service temporarily unavailable: {service} - {reason}")]
    ServiceUnavailable { service: String, reason: String },

    // Parse errors
    #[error("Parse error in {context}: {message}")]
    Parse { context: String, message: String },

    #[error("Classifier error: {0}")]
    Classifier(String),

    // Provider errors
    #[error("Provider error: {0}")]
    Provider(String),
}

/// Error categorization for retry strategies
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Permanent errors - should not retry
    Permanent,
    /// Transient errors - safe to retry
    Transient,
    /// Rate limited - retry with backoff
    RateLimited,
}

impl Error {
    /// Categorize error for retry logic
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Config(_)
            | Self::Csv(_)
            | Self::InvalidInput { .. }
            | Self::AuthenticationFailed(_)
            | Self::AuthorizationDenied { .. }
            | Self::Api { .. }
            | Self::Parse { .. }
            | Self::Classifier(_)
            | Self::Serde(_) => ErrorCategory::Permanent,

            Self::RateLimitExceeded { .. } => ErrorCategory::RateLimited,

            Self::Http(_)
            | Self::NetworkTimeout { .. }
            | Self::ServiceUnavailable { .. }
            | Self::Io(_)
            | Self::Provider(_) => ErrorCategory::Transient,
        }
    }

    /// Get suggested retry delay for rate limited errors
    #[must_use]
    pub const fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimitExceeded { retry_after } => Some(*retry_after),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<crate::client::providers::ProviderError> for Error {
    fn from(err: crate::client::providers::ProviderError) -> Self {
        use crate::client::providers::ProviderError;

        match err {
            ProviderError::Network(msg) => Self::Provider(format!("Network error: {msg}")),
            ProviderError::Parse(msg) => Self::Parse {
                context: "provider".to_string(),
                message: msg,
            },
            ProviderError::RateLimit { retry_after } => Self::RateLimitExceeded { retry_after },
            ProviderError::Auth(msg) => Self::AuthenticationFailed(msg),
            ProviderError::InvalidQuery(msg) => Self::InvalidInput {
                field: "query".to_string(),
                reason: msg,
            },
            ProviderError::ServiceUnavailable(msg) => Self::ServiceUnavailable {
                service: "provider".to_string(),
                reason: msg,
            },
            ProviderError::Timeout => Self::NetworkTimeout {
                timeout: Duration::from_secs(30),
                message: "provider request timed out".to_string(),
            },
            ProviderError::Other(msg) => Self::Provider(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_errors_are_permanent() {
        let err = Error::AuthenticationFailed("bad key".to_string());
        assert_eq!(err.category(), ErrorCategory::Permanent);

        let err = Error::AuthorizationDenied {
            resource: "scopus".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Permanent);
    }

    #[test]
    fn test_rate_limit_is_retryable_with_delay() {
        let err = Error::RateLimitExceeded {
            retry_after: Duration::from_secs(5),
        };
        assert_eq!(err.category(), ErrorCategory::RateLimited);
        assert_eq!(err.retry_after(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_client_errors_are_not_retried() {
        let err = Error::Api {
            service: "scopus".to_string(),
            status: 400,
            message: "bad query".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Permanent);

        let err = Error::ServiceUnavailable {
            service: "pubmed".to_string(),
            reason: "502".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Transient);
    }
}
