//! Configuration Types
//!
//! All configuration structures with sensible defaults.

use serde::{Deserialize, Serialize};

use crate::constants::{models as model_constants, retry as retry_constants};
use crate::gen::provider::ProviderConfig;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Execution environment; controls dev-only tracking metadata.
    pub environment: Environment,

    /// Provider HTTP settings
    pub provider: ProviderConfig,

    /// Model selection and retry tuning
    pub generation: GenerationConfig,
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `RecapError::Config` on validation failure.
    pub fn validate(&self) -> crate::types::Result<()> {
        if !(0.0..=2.0).contains(&self.provider.temperature) {
            return Err(crate::types::RecapError::Config(format!(
                "Provider temperature must be between 0.0 and 2.0, got {}",
                self.provider.temperature
            )));
        }

        if self.provider.timeout_secs == 0 {
            return Err(crate::types::RecapError::Config(
                "Provider timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.generation.attempts_per_model == 0 {
            return Err(crate::types::RecapError::Config(
                "generation.attempts_per_model must be at least 1".to_string(),
            ));
        }

        if self.generation.fast_model.is_empty() || self.generation.reasoning_model.is_empty() {
            return Err(crate::types::RecapError::Config(
                "Model names must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

// =============================================================================
// Environment
// =============================================================================

/// Execution environment. Tracking metadata is attached to generated
/// payloads only outside production.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Production,
    Development,
}

impl Environment {
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

// =============================================================================
// Generation Configuration
// =============================================================================

/// Model selection and retry tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Fast/cheap model (Free tier, Pro fast mode)
    pub fast_model: String,
    /// Second candidate tried after the fast model
    pub fast_fallback_model: String,
    /// Higher-capability model (Pro reasoned mode)
    pub reasoning_model: String,
    /// Output token ceiling for Free tier
    pub free_max_output_tokens: u32,
    /// Attempts per model before moving to the next candidate
    pub attempts_per_model: u8,
    /// Base backoff delay (milliseconds)
    pub base_delay_ms: u64,
    /// Backoff ceiling (milliseconds)
    pub max_delay_ms: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            fast_model: model_constants::FAST_MODEL.to_string(),
            fast_fallback_model: model_constants::FAST_FALLBACK_MODEL.to_string(),
            reasoning_model: model_constants::REASONING_MODEL.to_string(),
            free_max_output_tokens: model_constants::FREE_MAX_OUTPUT_TOKENS,
            attempts_per_model: retry_constants::MAX_ATTEMPTS_PER_MODEL,
            base_delay_ms: retry_constants::BASE_DELAY_MS,
            max_delay_ms: retry_constants::MAX_DELAY_MS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_temperature_rejected() {
        let mut config = Config::default();
        config.provider.temperature = 3.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let mut config = Config::default();
        config.generation.attempts_per_model = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_environment_default_is_production() {
        assert!(Environment::default().is_production());
    }
}
