//! Unified Error Type System
//!
//! Centralized error types for the generation subsystem.
//! Every failure that crosses the public `generate` boundary is normalized
//! into one of these variants; raw provider or parser errors never escape.
//!
//! ## Error Taxonomy
//!
//! - **SchemaValidation**: sanitization produced an empty or inconsistent
//!   schema (caller bug, never retried)
//! - **QuotaExceeded**: provider rate/quota limit (surfaced with a stable
//!   code so HTTP layers can map it to 429)
//! - **MalformedResponse**: provider text unparseable even after repair
//! - **UnexpectedShape** / **InvalidResultType**: parsed but not a known
//!   envelope, or final payload not an object
//! - **ProviderTransport**: network / timeout / 5xx

use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Application Error
// =============================================================================

#[derive(Debug, Error)]
pub enum RecapError {
    // -------------------------------------------------------------------------
    // Generation Errors
    // -------------------------------------------------------------------------
    /// Schema sanitization produced an empty or inconsistent schema.
    /// Indicates a programming-time bug in the caller's schema, not a
    /// runtime condition; never retried.
    #[error("Schema validation failed: {0}")]
    SchemaValidation(String),

    /// Provider-reported rate or quota limit. Never retried within a call.
    #[error("Provider quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Provider text could not be parsed even after the repair pass.
    #[error("Malformed response ({length} bytes): {preview}")]
    MalformedResponse { preview: String, length: usize },

    /// Response parsed but matched none of the known envelope shapes.
    #[error("Unexpected response shape for '{section}': {detail}")]
    UnexpectedShape { section: String, detail: String },

    /// Unwrapped payload was not a non-null, non-array object.
    #[error("Invalid result type for '{section}' (keys: [{keys}])")]
    InvalidResultType { section: String, keys: String },

    /// Network failure, timeout, or 5xx from the provider.
    #[error("Provider transport error: {message}")]
    ProviderTransport {
        message: String,
        status: Option<u16>,
    },

    // -------------------------------------------------------------------------
    // System Errors
    // -------------------------------------------------------------------------
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Timeout after {duration:?}: {operation}")]
    Timeout {
        operation: String,
        duration: Duration,
    },
}

pub type Result<T> = std::result::Result<T, RecapError>;

impl RecapError {
    /// Create a transport error without an HTTP status.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::ProviderTransport {
            message: message.into(),
            status: None,
        }
    }

    /// Create a timeout error.
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Stable error code for upstream HTTP status mapping.
    pub fn code(&self) -> &'static str {
        match self {
            Self::SchemaValidation(_) => "SCHEMA_INVALID",
            Self::QuotaExceeded(_) => "QUOTA_EXCEEDED",
            Self::MalformedResponse { .. } => "MALFORMED_RESPONSE",
            Self::UnexpectedShape { .. } => "UNEXPECTED_SHAPE",
            Self::InvalidResultType { .. } => "INVALID_RESULT_TYPE",
            Self::ProviderTransport { .. } => "PROVIDER_TRANSPORT",
            Self::Json(_) => "JSON",
            Self::Config(_) => "CONFIG",
            Self::Timeout { .. } => "TIMEOUT",
        }
    }

    /// Whether the retry loop may attempt this call again.
    ///
    /// Quota errors are terminal within a call (the caller decides whether
    /// to surface them); schema errors are caller bugs.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::MalformedResponse { .. }
                | Self::UnexpectedShape { .. }
                | Self::InvalidResultType { .. }
                | Self::ProviderTransport { .. }
                | Self::Timeout { .. }
        )
    }
}

// =============================================================================
// Error Classifier
// =============================================================================

/// Markers in provider error bodies that indicate quota exhaustion.
const QUOTA_MARKERS: &[&str] = &[
    "quota",
    "resource_exhausted",
    "resource has been exhausted",
    "rate limit",
    "too many requests",
];

/// Classifier mapping raw provider failures into the error taxonomy.
pub struct ErrorClassifier;

impl ErrorClassifier {
    /// Classify an HTTP status + body from the provider.
    pub fn classify_http(status: u16, body: &str) -> RecapError {
        if status == 429 || Self::is_quota_message(body) {
            return RecapError::QuotaExceeded(truncate_message(body));
        }

        RecapError::ProviderTransport {
            message: truncate_message(body),
            status: Some(status),
        }
    }

    /// Classify an error message with no HTTP status (connect errors,
    /// client build failures).
    pub fn classify_message(message: &str) -> RecapError {
        if Self::is_quota_message(message) {
            return RecapError::QuotaExceeded(truncate_message(message));
        }
        RecapError::transport(truncate_message(message))
    }

    fn is_quota_message(message: &str) -> bool {
        let lower = message.to_lowercase();
        QUOTA_MARKERS.iter().any(|m| lower.contains(m))
    }
}

/// Bound error payloads so full provider bodies never land in logs.
fn truncate_message(message: &str) -> String {
    const MAX: usize = 300;
    if message.chars().count() <= MAX {
        message.to_string()
    } else {
        let truncated: String = message.chars().take(MAX).collect();
        format!("{}...", truncated)
    }
}

// =============================================================================
// Tests
// =============================================================================
