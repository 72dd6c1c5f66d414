//! Error types for zonectl
//!
//! This module defines all error types used throughout the crate. The
//! variants follow the error taxonomy of the control plane: configuration
//! errors are fatal before any provider call, capability violations and
//! audit rejections are fatal for one zone, and adapter errors abort the
//! current correction.

use thiserror::Error;

/// Result type alias for zonectl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for zonectl
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors (malformed JSON, duplicate zone, bad nameserver, ...)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A record type that is not in the type registry
    #[error("Unknown record type: {0}")]
    UnknownRecordType(String),

    /// A typed scalar or label failed to parse
    #[error("Parse error: {reason} (input: {input:?})")]
    Parse {
        /// The offending raw input
        input: String,
        /// Why it was rejected
        reason: String,
    },

    /// Desired state asks for something the provider cannot do
    #[error("Capability violation in zone {zone} for provider {provider}: {message}")]
    CapabilityViolation {
        /// Zone name
        zone: String,
        /// Provider instance name
        provider: String,
        /// What was requested
        message: String,
    },

    /// Records rejected by a provider auditor
    #[error("Audit rejected {} record(s) in zone {zone} for provider {provider}: {}", violations.len(), violations.join("; "))]
    AuditRejected {
        /// Zone name
        zone: String,
        /// Provider instance name
        provider: String,
        /// One line per failing (record, predicate) pair
        violations: Vec<String>,
    },

    /// A record read back from a provider could not be lifted into the model
    #[error("Provider {provider} returned an unparsable record in zone {zone}: {message} (record: {record})")]
    ReadBack {
        /// Zone name
        zone: String,
        /// Provider instance name
        provider: String,
        /// The raw record, for diagnostics
        record: String,
        /// Parse failure
        message: String,
    },

    /// Provider-specific error
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// Network-related errors
    #[error("Network error: {0}")]
    Network(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client errors (from provider APIs)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Rate limiting errors that the adapter gave up retrying
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Zone or record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// An operation the provider does not implement
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// A correction exceeded its deadline
    #[error("Timed out: {0}")]
    Timeout(String),

    /// The run was cancelled before this work started
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a parse error tagged with the offending input
    pub fn parse(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Parse {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Create a capability violation
    pub fn capability(
        zone: impl Into<String>,
        provider: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::CapabilityViolation {
            zone: zone.into(),
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a rate limit error
    pub fn rate_limited(msg: impl Into<String>) -> Self {
        Self::RateLimited(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create an unsupported-operation error
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Whether this error is fatal for the whole run rather than one zone
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::Config(_) | Self::UnknownRecordType(_) | Self::Parse { .. } | Self::Json(_)
        )
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
