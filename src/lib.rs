//! llm-dispatch
//!
//! A uniform call surface for multiple LLM providers with:
//! - Model aliases resolved to their most recent versioned id
//! - Instruction message normalization per model
//! - Capability gating before any network I/O
//! - Client defaults merged with per-call overrides
//! - Blocking and async dispatch to OpenAI and Anthropic
//! - Token usage and cost accounting

pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;
pub use domain::{DomainError, ModelRegistry};
pub use infrastructure::dispatch::{CallOutcome, LlmClient, RunOptions};
