//! Usage and cost accounting for completed calls

mod accounting;

pub use accounting::{
    Cost, Usage, UsageRequest, account, compute_cost, extract_usage, timed, timed_async,
};
