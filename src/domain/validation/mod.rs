//! Request validation: message normalization, capability gating and parameter merging

mod capability;
mod merge;
mod normalizer;

pub use capability::{
    CapabilityError, CapabilityGate, resolve_tool_choice, validate_schema, validate_tools,
};
pub use merge::{ClientDefaults, FIELD_METADATA, FIELD_TOOLS, MergeFlags, RuntimeOverrides, merge};
pub use normalizer::{NormalizedMessages, RoleRewrite, normalize};

use crate::domain::DomainError;
use crate::domain::llm::CallParameters;
use crate::domain::model::{ModelRegistry, ResolvedModel};

/// Call parameters that passed every check, ready for provider shaping
#[derive(Debug, Clone)]
pub struct ValidatedCall {
    pub model: ResolvedModel,
    pub params: CallParameters,
    pub rewrite: Option<RoleRewrite>,
}

/// Resolve, normalize and gate merged call parameters. Performs no I/O.
pub fn validate_call(
    registry: &ModelRegistry,
    params: CallParameters,
) -> Result<ValidatedCall, DomainError> {
    let model = registry.resolve(&params.model)?;
    let CallParameters {
        model: requested,
        messages,
        user,
        tools,
        tool_choice,
        reasoning_effort,
        structured_output_schema,
        metadata,
        extra,
    } = params;

    let NormalizedMessages { messages, rewrite } =
        normalize(&requested, &model.capabilities, messages)?;

    let gate = CapabilityGate::new(registry, &model);
    gate.check_reasoning_effort(reasoning_effort)?;

    gate.check_tools(tools.as_deref())?;
    if let Some(tools) = tools.as_deref() {
        validate_tools(tools)?;
    }
    let tool_choice = resolve_tool_choice(tool_choice, tools.as_deref())?;

    gate.check_structured_output(structured_output_schema.as_ref())?;
    if let Some(schema) = structured_output_schema.as_ref() {
        validate_schema(schema)?;
    }

    gate.check_image_ingestion(&messages)?;

    Ok(ValidatedCall {
        model,
        params: CallParameters {
            model: requested,
            messages,
            user,
            tools,
            tool_choice,
            reasoning_effort,
            structured_output_schema,
            metadata,
            extra,
        },
        rewrite,
    })
}
