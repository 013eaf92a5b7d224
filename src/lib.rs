//! # recapgen
//!
//! Structured report generation on top of schema-constrained LLM calls.
//! Turns journal entries into daily, weekly, and monthly reflective
//! reports whose sections are validated JSON payloads.
//!
//! The crate is organized around one pipeline, owned by
//! [`gen::Orchestrator`]:
//!
//! 1. **Cache** — identical (prompts, tier) calls are answered from cache.
//! 2. **Schema sanitization** — caller schemas are reduced to the keyword
//!    subset the provider accepts; contradictions fail fast.
//! 3. **Provider call with retry** — an ordered model plan (by membership
//!    tier and generation mode) is walked with bounded attempts and
//!    exponential backoff; quota errors short-circuit.
//! 4. **Repair & unwrap** — provider text is parsed with one structural
//!    repair pass, then stripped of wrapper envelopes down to the payload.
//! 5. **Telemetry** — usage is dispatched fire-and-forget; failures never
//!    affect the caller's result.
//!
//! [`report::ReportAssembler`] fans sections out over the orchestrator;
//! insight sections degrade through [`gen::InsightFallback`] instead of
//! failing.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use recapgen::config::ConfigLoader;
//! use recapgen::gen::{GeminiProvider, Orchestrator};
//! use recapgen::report::{ReportAssembler, ReportInput};
//! use recapgen::types::{ReportPeriod, Tier};
//!
//! # async fn run() -> recapgen::types::Result<()> {
//! let config = ConfigLoader::load()?;
//! let provider = Arc::new(GeminiProvider::new(config.provider.clone())?);
//! let orchestrator = Orchestrator::builder(provider)
//!     .with_config(&config)
//!     .build();
//!
//! let assembler = ReportAssembler::new(Arc::new(orchestrator));
//! let report = assembler
//!     .assemble(&ReportInput {
//!         period: ReportPeriod::Weekly,
//!         tier: Tier::Pro,
//!         user_id: Some("user-1".into()),
//!         deadline: None,
//!         entries: Vec::new(),
//!     })
//!     .await?;
//! println!("{}", serde_json::to_string_pretty(&report)?);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod gen;
pub mod logging;
pub mod report;
pub mod types;

pub use config::{Config, ConfigLoader};
pub use gen::{Orchestrator, OrchestratorBuilder};
pub use report::{Report, ReportAssembler, ReportInput};
pub use types::{GenerationRequest, RecapError, Result};
