use std::sync::Arc;

use clap::Args;
use serde_json::json;
use tracing::info;

use crate::config::AppConfig;
use crate::domain::{
    ChatResponse, DomainError, Message, ModelRegistry, ReasoningEffort, RuntimeOverrides,
};
use crate::infrastructure::credentials::EnvCredentialProvider;
use crate::infrastructure::dispatch::{CallOutcome, LlmClient, RunOptions};
use crate::infrastructure::llm::{ReqwestTransportFactory, TransportMode};

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Model alias or versioned id
    #[arg(long)]
    pub model: String,

    /// User message
    #[arg(long)]
    pub prompt: String,

    /// Instruction message; rewritten to the role the model accepts
    #[arg(long)]
    pub system: Option<String>,

    #[arg(long)]
    pub reasoning_effort: Option<ReasoningEffort>,

    /// End-user identifier forwarded to the provider
    #[arg(long)]
    pub user: Option<String>,

    /// Use the blocking transport
    #[arg(long)]
    pub blocking: bool,
}

pub async fn run(
    config: &AppConfig,
    registry: Arc<ModelRegistry>,
    args: RunArgs,
) -> anyhow::Result<()> {
    let mode = if args.blocking {
        TransportMode::Blocking
    } else {
        TransportMode::Async
    };
    let client = build_client(config, registry, &args, mode)?;
    let options = run_options(&args);

    info!(model = %args.model, mode = %mode, "Running prompt");

    let outcome = match mode {
        TransportMode::Blocking => {
            tokio::task::spawn_blocking(move || {
                let mut client = client;
                client.run(options)
            })
            .await??
        }
        TransportMode::Async => {
            let mut client = client;
            client.run_async(options).await?
        }
    };

    print_outcome(&outcome)
}

fn build_client(
    config: &AppConfig,
    registry: Arc<ModelRegistry>,
    args: &RunArgs,
    mode: TransportMode,
) -> Result<LlmClient, DomainError> {
    let provider = registry
        .provider_of(&args.model)
        .ok_or_else(|| DomainError::unknown_model(&args.model))?;
    let provider_config = config.providers.get(provider);

    let credentials =
        EnvCredentialProvider::new().with_mapping(provider, provider_config.api_key_env.clone());

    let mut builder = LlmClient::builder(registry)
        .model(&args.model)
        .mode(mode)
        .credentials(Arc::new(credentials))
        .transport_factory(Arc::new(ReqwestTransportFactory::new(
            provider_config.timeout(),
        )));

    if let Some(base_url) = &provider_config.base_url {
        builder = builder.base_url(base_url);
    }
    if let Some(user) = &args.user {
        builder = builder.user(user);
    }

    builder.build()
}

fn run_options(args: &RunArgs) -> RunOptions {
    let mut messages = Vec::with_capacity(2);
    if let Some(system) = &args.system {
        messages.push(Message::system(system));
    }
    messages.push(Message::user(&args.prompt));

    let mut overrides = RuntimeOverrides::new(messages);
    if let Some(effort) = args.reasoning_effort {
        overrides = overrides.reasoning_effort(effort);
    }
    RunOptions::from_overrides(overrides)
}

fn print_outcome(outcome: &CallOutcome<ChatResponse>) -> anyhow::Result<()> {
    if let Some(content) = outcome.response.content() {
        println!("{}", content);
    }

    let summary = json!({
        "id": outcome.response.id,
        "model": outcome.response.model,
        "finish_reason": outcome.response.first_choice().and_then(|c| c.finish_reason.as_ref()),
        "tool_calls": outcome.response.first_choice().map(|c| &c.tool_calls),
        "usage": outcome.usage,
        "cost": outcome.cost,
        "role_rewrite": outcome.role_rewrite,
    });
    eprintln!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MessageRole;

    fn args() -> RunArgs {
        RunArgs {
            model: "o1".to_string(),
            prompt: "What is 2 + 2?".to_string(),
            system: Some("Answer with a number".to_string()),
            reasoning_effort: Some(ReasoningEffort::Low),
            user: None,
            blocking: false,
        }
    }

    #[test]
    fn test_run_options_from_args() {
        let options = run_options(&args());
        let messages = options.overrides.messages.as_slice();

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, MessageRole::System);
        assert_eq!(messages[1].content_text(), "What is 2 + 2?");
        assert_eq!(options.overrides.reasoning_effort, Some(ReasoningEffort::Low));
        assert!(options.return_usage && options.return_cost);
    }

    #[test]
    fn test_build_client_reads_configured_variable() {
        // SAFETY: Variable name is unique to this test
        unsafe { std::env::set_var("LLM_DISPATCH_TEST_CLI_OPENAI_KEY", "sk-cli") };

        let mut config = AppConfig::default();
        config.providers.openai.api_key_env = "LLM_DISPATCH_TEST_CLI_OPENAI_KEY".to_string();
        let registry = Arc::new(ModelRegistry::builtin().unwrap());

        let client = build_client(&config, registry, &args(), TransportMode::Async).unwrap();
        assert_eq!(client.model().model_id, "o1-12-17-24");
        assert_eq!(client.mode(), TransportMode::Async);

        unsafe { std::env::remove_var("LLM_DISPATCH_TEST_CLI_OPENAI_KEY") };
    }

    #[test]
    fn test_build_client_unknown_model() {
        let registry = Arc::new(ModelRegistry::builtin().unwrap());
        let mut args = args();
        args.model = "gpt-5".to_string();

        let result = build_client(&AppConfig::default(), registry, &args, TransportMode::Async);
        assert!(matches!(result, Err(DomainError::UnknownModel { .. })));
    }
}
