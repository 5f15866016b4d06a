//! Command line interface for llm-dispatch
//!
//! Subcommands:
//! - `models`: list the model table
//! - `resolve`: resolve a model name to its versioned id
//! - `cost`: price a token count for a model
//! - `run`: perform a single call

pub mod cost;
pub mod models;
pub mod resolve;
pub mod run;

use clap::{Parser, Subcommand};
use tracing::debug;

use crate::config::AppConfig;
use crate::domain::{DomainError, ModelRegistry};

/// llm-dispatch - Uniform call surface for multiple LLM providers
#[derive(Parser)]
#[command(name = "llm-dispatch")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// List model aliases with capabilities and pricing
    Models(models::ModelsArgs),

    /// Resolve a model alias or versioned id
    Resolve(resolve::ResolveArgs),

    /// Compute the cost of a token count for a model
    Cost(cost::CostArgs),

    /// Send a prompt to a model
    Run(run::RunArgs),
}

/// Model table from config, or the built-in table
pub fn load_registry(config: &AppConfig) -> Result<ModelRegistry, DomainError> {
    match &config.models.table_path {
        Some(path) => {
            debug!(path = %path.display(), "Loading model table");
            ModelRegistry::from_path(path)
        }
        None => ModelRegistry::builtin(),
    }
}
