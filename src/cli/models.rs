use clap::Args;
use serde_json::{Value, json};

use crate::domain::{Capability, ModelDefinition, ModelRegistry};

#[derive(Args, Debug)]
pub struct ModelsArgs {
    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(registry: &ModelRegistry, args: ModelsArgs) -> anyhow::Result<()> {
    if args.json {
        let models: Vec<Value> = registry.definitions().iter().map(describe).collect();
        println!("{}", serde_json::to_string_pretty(&models)?);
        return Ok(());
    }

    for definition in registry.definitions() {
        let pricing = definition.pricing();
        println!(
            "{:<20} {:<10} {:<28} prompt={} cached={} output={}  [{}]",
            definition.alias(),
            definition.provider(),
            definition.most_recent_id(),
            pricing.prompt_tokens,
            pricing.cached_prompt_tokens,
            pricing.output_tokens,
            capability_names(definition).join(", ")
        );
    }

    Ok(())
}

fn capability_names(definition: &ModelDefinition) -> Vec<String> {
    Capability::ALL
        .iter()
        .filter(|c| definition.capabilities().supports(**c))
        .map(ToString::to_string)
        .collect()
}

fn describe(definition: &ModelDefinition) -> Value {
    json!({
        "alias": definition.alias(),
        "provider": definition.provider(),
        "model_ids": definition.model_ids(),
        "most_recent_id": definition.most_recent_id(),
        "capabilities": definition.capabilities(),
        "pricing": definition.pricing(),
    })
}
