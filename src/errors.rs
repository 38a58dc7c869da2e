/*!
 * Error types for the cuegate library.
 *
 * Only provider failures are hard errors for a translation job. Incomplete
 * reconciliation, oversized batches and quality-gate violations are reported
 * as data on the job output instead.
 */

use thiserror::Error;

/// Errors that can occur when talking to a translation provider.
///
/// Every variant is a transport, auth or quota failure. Content-shape problems
/// (missing, extra or reordered ids) never surface as a `ProviderError`.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when the HTTP envelope of a response cannot be decoded
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting or quota
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// The call did not finish in time. Carries the configured limit in
    /// milliseconds when it is known; the HTTP client's own timeout does not
    /// report it.
    #[error("Request timed out{}", timeout_suffix(.0))]
    Timeout(Option<u64>),
}

impl ProviderError {
    /// Map an HTTP status and body to the matching variant
    pub fn from_status(status_code: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status_code {
            401 | 403 => Self::AuthenticationError(message),
            429 => Self::RateLimitExceeded(message),
            _ => Self::ApiError { status_code, message },
        }
    }
}

fn timeout_suffix(after_ms: &Option<u64>) -> String {
    match after_ms {
        Some(ms) => format!(" after {}ms", ms),
        None => String::new(),
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout(None)
        } else if error.is_connect() {
            Self::ConnectionError(error.to_string())
        } else if error.is_decode() {
            Self::ParseError(error.to_string())
        } else {
            Self::RequestFailed(error.to_string())
        }
    }
}

/// Errors that can occur during subtitle parsing
#[derive(Error, Debug)]
pub enum SubtitleError {
    /// A timestamp line could not be parsed
    #[error("Invalid timestamp at line {line}: {content}")]
    InvalidTimestamp {
        /// 1-based line number in the source file
        line: usize,
        /// The offending line
        content: String,
    },

    /// The file structure is not valid SRT
    #[error("Malformed subtitle file: {0}")]
    Malformed(String),

    /// A JSON segment list could not be decoded
    #[error("Invalid segment list: {0}")]
    InvalidSegments(String),
}

/// Errors that can occur during a translation job
#[derive(Error, Debug)]
pub enum TranslationError {
    /// The provider failed hard; the job cannot continue
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(#[from] ProviderError),

    /// The job was cancelled between batches or retry rounds
    #[error("Translation cancelled after {completed_batches} completed batch(es)")]
    Cancelled {
        /// Number of batches fully reconciled before cancellation
        completed_batches: usize,
    },

    /// The caller supplied input that violates the job contract
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from configuration loading or validation
    #[error("Config error: {0}")]
    Config(String),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from subtitle processing
    #[error("Subtitle error: {0}")]
    Subtitle(#[from] SubtitleError),

    /// Error from translation
    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
