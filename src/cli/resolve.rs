use clap::Args;

use crate::domain::ModelRegistry;

#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Model alias or versioned id
    pub name: String,
}

pub fn run(registry: &ModelRegistry, args: ResolveArgs) -> anyhow::Result<()> {
    let model = registry.resolve(&args.name)?;
    println!(
        "{} -> {} ({}, alias {})",
        model.requested, model.model_id, model.provider, model.alias
    );
    Ok(())
}
