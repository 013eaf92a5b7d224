//! Configuration
//!
//! Figment-backed configuration with defaults, TOML file, and env overrides.

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::{Config, Environment, GenerationConfig};
