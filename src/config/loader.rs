//! Configuration Loader (Figment-based)
//!
//! Loads and merges configuration from multiple sources:
//! 1. Built-in defaults (Serialized)
//! 2. Config file (recapgen.toml, or a path supplied by the embedder)
//! 3. Environment variables (RECAPGEN_* prefix)

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use tracing::debug;

use super::types::Config;
use crate::types::{RecapError, Result};

/// Default config file name looked up in the working directory.
const DEFAULT_CONFIG_FILE: &str = "recapgen.toml";

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with the full resolution chain:
    /// defaults → recapgen.toml → env vars.
    pub fn load() -> Result<Config> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        let default_path = Path::new(DEFAULT_CONFIG_FILE);
        if default_path.exists() {
            debug!("Loading config from: {}", default_path.display());
            figment = figment.merge(Toml::file(default_path));
        }

        // RECAPGEN_GENERATION__FAST_MODEL -> generation.fast_model
        figment = figment.merge(Env::prefixed("RECAPGEN_").split("__").lowercase(true));

        let config: Config = figment
            .extract()
            .map_err(|e| RecapError::Config(format!("Configuration error: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file only (defaults still apply).
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .extract()
            .map_err(|e| RecapError::Config(format!("Configuration error: {}", e)))?;

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Environment;
    use std::io::Write;

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(
            file,
            r#"
environment = "development"

[generation]
fast_model = "gemini-custom"
attempts_per_model = 2
"#
        )
        .unwrap();

        let config = ConfigLoader::load_from_file(file.path()).unwrap();
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.generation.fast_model, "gemini-custom");
        assert_eq!(config.generation.attempts_per_model, 2);
        // Untouched fields keep defaults.
        assert_eq!(
            config.generation.reasoning_model,
            crate::constants::models::REASONING_MODEL
        );
    }

    #[test]
    fn test_invalid_file_values_rejected() {
        let mut file = tempfile::NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(
            file,
            r#"
[provider]
temperature = 9.0
"#
        )
        .unwrap();

        let err = ConfigLoader::load_from_file(file.path()).unwrap_err();
        assert!(matches!(err, RecapError::Config(_)));
    }

    #[test]
    fn test_missing_file_keeps_defaults() {
        let config = ConfigLoader::load_from_file(Path::new("/nonexistent/recapgen.toml")).unwrap();
        assert!(config.environment.is_production());
    }
}
