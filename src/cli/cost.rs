use std::time::Duration;

use clap::Args;

use crate::domain::usage::{compute_cost, extract_usage};
use crate::domain::{Cost, DomainError, ModelRegistry, TokenCounts};

#[derive(Args, Debug)]
pub struct CostArgs {
    #[arg(long)]
    pub model: String,

    #[arg(long)]
    pub prompt_tokens: u64,

    #[arg(long, default_value_t = 0)]
    pub cached_prompt_tokens: u64,

    #[arg(long)]
    pub output_tokens: u64,
}

pub fn run(registry: &ModelRegistry, args: CostArgs) -> anyhow::Result<()> {
    let cost = estimate(registry, &args)?;
    println!("{}", serde_json::to_string_pretty(&cost)?);
    Ok(())
}

fn estimate(registry: &ModelRegistry, args: &CostArgs) -> Result<Cost, DomainError> {
    let pricing = registry
        .pricing_for(&args.model)
        .ok_or_else(|| DomainError::unknown_model(&args.model))?;

    let counts = TokenCounts::new(
        args.prompt_tokens,
        args.cached_prompt_tokens,
        args.output_tokens,
    );
    let usage = extract_usage(&counts, Duration::ZERO);
    Ok(compute_cost(&usage, Some(pricing)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(model: &str) -> CostArgs {
        CostArgs {
            model: model.to_string(),
            prompt_tokens: 1_000_000,
            cached_prompt_tokens: 0,
            output_tokens: 500_000,
        }
    }

    #[test]
    fn test_estimate_gpt_4o() {
        let registry = ModelRegistry::builtin().unwrap();
        let cost = estimate(&registry, &args("gpt-4o-01-10-24")).unwrap();
        assert_eq!(cost.prompt_cost, 2.5);
        assert_eq!(cost.output_cost, 5.0);
        assert_eq!(cost.total_cost, 7.5);
    }

    #[test]
    fn test_estimate_unknown_model() {
        let registry = ModelRegistry::builtin().unwrap();
        let result = estimate(&registry, &args("gpt-5"));
        assert!(matches!(result, Err(DomainError::UnknownModel { .. })));
    }
}
