//! Call dispatch: validation, provider shaping, execution and accounting

mod client;

pub use client::{CallOutcome, CallPhase, LlmClient, LlmClientBuilder, RunOptions};
