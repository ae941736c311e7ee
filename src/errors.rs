/*!
 * Error types for the droidlingo library.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 */

use thiserror::Error;

/// Errors raised while reading a resource document
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    /// The input is not valid UTF-8
    #[error("Resource file is not valid UTF-8: {0}")]
    Encoding(String),

    /// The XML itself is malformed
    #[error("Malformed XML at byte {position}: {message}")]
    Xml {
        /// Byte offset reported by the reader
        position: usize,
        /// Reader message
        message: String,
    },

    /// The root element is missing or is not `<resources>`
    #[error("Expected a <resources> root element, found {0}")]
    UnexpectedRoot(String),

    /// A required attribute is absent
    #[error("<{element}> at byte {position} is missing the '{attribute}' attribute")]
    MissingAttribute {
        /// Element name
        element: String,
        /// Attribute name
        attribute: &'static str,
        /// Byte offset of the element
        position: usize,
    },

    /// Two entries of the same kind share a name
    #[error("Duplicate {kind} resource '{name}'")]
    DuplicateName {
        /// Resource kind (string, string-array, plurals)
        kind: String,
        /// Resource name
        name: String,
    },
}

/// Errors raised when sentinels cannot be mapped back onto protected spans
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RestoreError {
    /// The number of sentinels found differs from the number of spans
    #[error("Expected {expected} protected tokens but found {found}")]
    CountMismatch {
        /// Number of spans recorded by protect
        expected: usize,
        /// Number of sentinels found in the translated text
        found: usize,
    },

    /// The same sentinel appears more than once
    #[error("Protected token {0} appears more than once")]
    Duplicated(String),

    /// A sentinel refers to a span that was never recorded
    #[error("Unknown protected token {0}")]
    Unknown(String),
}

/// Errors that can occur when working with provider APIs
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
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

    /// The request did not complete within the configured timeout
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {message}")]
    RateLimitExceeded {
        /// Message from the API
        message: String,
        /// Server hint from a Retry-After header
        retry_after_secs: Option<u64>,
    },

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// The provider cannot serve this request at all
    #[error("Unsupported request: {0}")]
    Unsupported(String),
}

impl ProviderError {
    /// Whether the error is transient and worth another attempt with backoff
    pub fn is_retriable(&self) -> bool {
        match self {
            Self::RequestFailed(_)
            | Self::ConnectionError(_)
            | Self::Timeout(_)
            | Self::RateLimitExceeded { .. } => true,
            Self::ApiError { status_code, .. } => *status_code >= 500,
            Self::ParseError(_) | Self::AuthenticationError(_) | Self::Unsupported(_) => false,
        }
    }

    /// Whether the error means no request to this provider can succeed
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::AuthenticationError(_))
    }

    /// Map an HTTP status and body to the matching error variant
    pub fn from_status(status_code: u16, message: impl Into<String>, retry_after_secs: Option<u64>) -> Self {
        let message = message.into();
        match status_code {
            401 | 403 => Self::AuthenticationError(message),
            408 => Self::Timeout(retry_after_secs.unwrap_or(0)),
            429 => Self::RateLimitExceeded { message, retry_after_secs },
            _ => Self::ApiError { status_code, message },
        }
    }
}

/// The whole batch for one language cannot succeed
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Translation to '{language}' aborted: {reason}")]
pub struct FatalBatchError {
    /// Affected target language
    pub language: String,
    /// What made the batch hopeless
    pub reason: String,
}

/// Missing or invalid configuration, raised before any work starts
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A required setting is absent
    #[error("Missing required setting: {0}")]
    Missing(String),

    /// A setting has an unusable value
    #[error("Invalid value for {field}: {reason}")]
    Invalid {
        /// Setting name
        field: String,
        /// Why it was rejected
        reason: String,
    },
}

/// Errors raised while merging several locale documents
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MergeError {
    /// Nothing to merge
    #[error("No source documents to merge")]
    NoSources,

    /// The precedence order names a locale that has no document
    #[error("Precedence order names unknown locale '{0}'")]
    UnknownLocale(String),

    /// A source document is not covered by the precedence order
    #[error("Locale '{0}' is missing from the precedence order")]
    Unranked(String),
}

/// Errors that can occur during translation
#[derive(Error, Debug)]
pub enum TranslationError {
    /// Error from the provider API
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Protected spans could not be restored
    #[error("Restore error: {0}")]
    Restore(#[from] RestoreError),

    /// A whole language batch was abandoned
    #[error("{0}")]
    Fatal(#[from] FatalBatchError),

    /// Every provider in the chain failed for this unit
    #[error("Translation failed: {0}")]
    Failed(String),
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error reading a resource document
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Error from configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error merging locale documents
    #[error("Merge error: {0}")]
    Merge(#[from] MergeError),

    /// Error from translation
    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
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
