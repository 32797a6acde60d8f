//! Error types and classification for opsreport

use thiserror::Error;

/// Result type alias using ReportError
pub type Result<T> = std::result::Result<T, ReportError>;

/// Custom error types for report operations
#[derive(Error, Debug)]
pub enum ReportError {
    /// The provider signaled a request-frequency quota was exceeded.
    /// Transient and retry-safe.
    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("credential error: {0}")]
    Credentials(String),

    #[error("connectivity error: {0}")]
    Connectivity(String),

    #[error("retries exhausted after {attempts} attempts: {operation}")]
    RetriesExhausted { operation: String, attempts: u32 },

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("AWS error: {0}")]
    Api(String),

    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),

    #[error("workbook error: {0}")]
    Workbook(#[from] rust_xlsxwriter::XlsxError),

    #[error("General error: {0}")]
    General(#[from] anyhow::Error),
}

impl ReportError {
    /// Whether this error is a rate-limit signal, i.e. the only class the
    /// resilient-call wrapper retries.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ReportError::RateLimited(_))
    }

    /// Whether a task hitting this error should be skipped without aborting
    /// the rest of the run (credential and connectivity problems are scoped
    /// to one profile/region).
    pub fn is_skippable(&self) -> bool {
        matches!(
            self,
            ReportError::Credentials(_) | ReportError::Connectivity(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limited_classification() {
        let err = ReportError::RateLimited("Throttling".into());
        assert!(err.is_rate_limited());
        assert!(!err.is_skippable());
    }

    #[test]
    fn test_credentials_skippable() {
        let err = ReportError::Credentials("InvalidClientTokenId".into());
        assert!(!err.is_rate_limited());
        assert!(err.is_skippable());
    }

    #[test]
    fn test_connectivity_skippable() {
        let err = ReportError::Connectivity("endpoint unreachable".into());
        assert!(err.is_skippable());
    }

    #[test]
    fn test_api_error_not_retryable() {
        let err = ReportError::Api("ValidationError".into());
        assert!(!err.is_rate_limited());
        assert!(!err.is_skippable());
    }
}
