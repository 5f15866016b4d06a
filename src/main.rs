use std::sync::Arc;

use clap::Parser;
use llm_dispatch::cli::{self, Cli, Command};
use llm_dispatch::config::AppConfig;
use llm_dispatch::infrastructure::logging::init_logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = AppConfig::load().unwrap_or_default();
    init_logging(&config.logging);

    let registry = Arc::new(cli::load_registry(&config)?);

    match cli.command {
        Command::Models(args) => cli::models::run(&registry, args),
        Command::Resolve(args) => cli::resolve::run(&registry, args),
        Command::Cost(args) => cli::cost::run(&registry, args),
        Command::Run(args) => cli::run::run(&config, registry, args).await,
    }
}
