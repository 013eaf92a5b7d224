//! Global Constants
//!
//! Centralized constants for configuration and tuning.
//! All magic numbers should be defined here with documentation.

/// Retry and backoff constants
pub mod retry {
    /// Maximum attempts per model before moving to the next candidate
    pub const MAX_ATTEMPTS_PER_MODEL: u8 = 3;

    /// Base delay for exponential backoff (milliseconds)
    pub const BASE_DELAY_MS: u64 = 2_000;

    /// Maximum delay between attempts (milliseconds)
    pub const MAX_DELAY_MS: u64 = 8_000;
}

/// Model selection constants
pub mod models {
    /// Default fast/cheap model (Free tier, and Pro in fast mode)
    pub const FAST_MODEL: &str = "gemini-2.5-flash";

    /// Fallback candidate tried after the primary fast model
    pub const FAST_FALLBACK_MODEL: &str = "gemini-2.0-flash";

    /// Higher-capability model (Pro tier in reasoned mode)
    pub const REASONING_MODEL: &str = "gemini-2.5-pro";

    /// Output token ceiling for Free tier requests
    pub const FREE_MAX_OUTPUT_TOKENS: u32 = 2_048;
}

/// Repair layer constants
pub mod repair {
    /// Maximum characters of raw text included in malformed-response errors
    pub const PREVIEW_CHARS: usize = 200;
}

/// Cache constants
pub mod cache {
    /// Hex characters of each prompt hash kept in the cache key
    pub const HASH_PREFIX_LEN: usize = 16;
}

/// Fallback composer constants
pub mod fallback {
    /// Character budget for truncated summary text
    pub const SUMMARY_CHAR_BUDGET: usize = 280;

    /// Marker appended when a summary was truncated
    pub const ELLIPSIS: &str = "…";
}

/// HTTP/Network constants
pub mod network {
    /// Default provider request timeout (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

    /// Connection timeout (seconds)
    pub const CONNECTION_TIMEOUT_SECS: u64 = 10;
}
