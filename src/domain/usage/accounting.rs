//! Call timing, token usage and monetary cost

use std::future::Future;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::llm::TokenCounts;
use crate::domain::model::PricingEntry;

const TOKENS_PER_PRICE_UNIT: f64 = 1_000_000.0;

/// Token usage of one call plus its measured latency
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub cached_prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
    pub latency_seconds: f64,
}

/// Cost of one call per token category, in the pricing table's currency
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Cost {
    pub prompt_cost: f64,
    pub cached_prompt_cost: f64,
    pub output_cost: f64,
    pub total_cost: f64,
}

/// Which accounting results the caller wants back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageRequest {
    pub usage: bool,
    pub cost: bool,
}

impl UsageRequest {
    pub fn none() -> Self {
        Self {
            usage: false,
            cost: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.usage && !self.cost
    }
}

impl Default for UsageRequest {
    fn default() -> Self {
        Self {
            usage: true,
            cost: true,
        }
    }
}

pub fn timed<T>(f: impl FnOnce() -> T) -> (T, Duration) {
    let start = Instant::now();
    let output = f();
    (output, start.elapsed())
}

pub async fn timed_async<F: Future>(future: F) -> (F::Output, Duration) {
    let start = Instant::now();
    let output = future.await;
    (output, start.elapsed())
}

pub fn extract_usage(counts: &TokenCounts, latency: Duration) -> Usage {
    Usage {
        prompt_tokens: counts.prompt_tokens,
        cached_prompt_tokens: counts.cached_prompt_tokens,
        completion_tokens: counts.completion_tokens,
        total_tokens: counts.total_tokens,
        latency_seconds: latency.as_secs_f64(),
    }
}

/// Cost per category is `tokens * price / 1_000_000`; no pricing means zero cost
pub fn compute_cost(usage: &Usage, pricing: Option<&PricingEntry>) -> Cost {
    let Some(pricing) = pricing else {
        return Cost::default();
    };

    let category = |tokens: u64, price: f64| tokens as f64 * price / TOKENS_PER_PRICE_UNIT;

    let prompt_cost = category(usage.prompt_tokens, pricing.prompt_tokens);
    let cached_prompt_cost = category(usage.cached_prompt_tokens, pricing.cached_prompt_tokens);
    let output_cost = category(usage.completion_tokens, pricing.output_tokens);

    Cost {
        prompt_cost,
        cached_prompt_cost,
        output_cost,
        total_cost: prompt_cost + cached_prompt_cost + output_cost,
    }
}

/// Usage and cost for a finished call, computing only what was requested
pub fn account(
    model: &str,
    counts: &TokenCounts,
    latency: Duration,
    pricing: Option<&PricingEntry>,
    request: UsageRequest,
) -> (Option<Usage>, Option<Cost>) {
    if request.is_empty() {
        return (None, None);
    }

    let usage = extract_usage(counts, latency);
    let cost = request.cost.then(|| compute_cost(&usage, pricing));

    info!(
        model = %model,
        prompt_tokens = usage.prompt_tokens,
        cached_prompt_tokens = usage.cached_prompt_tokens,
        completion_tokens = usage.completion_tokens,
        total_tokens = usage.total_tokens,
        total_cost = cost.map(|c| c.total_cost),
        latency_seconds = usage.latency_seconds,
        "Call accounted"
    );

    (request.usage.then_some(usage), cost)
}
