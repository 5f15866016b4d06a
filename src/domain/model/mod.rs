//! Model domain - model table, capabilities, pricing and version resolution

mod entity;
mod registry;
pub mod version;

pub use entity::{
    Capability, CapabilityFlags, ModelDefinition, PricingEntry, Provider, ResolvedModel,
};
pub use registry::ModelRegistry;
