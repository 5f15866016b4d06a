//! Feature gating against a model's declared capabilities

use serde_json::Value;
use thiserror::Error;
use tracing::warn;
use validator::Validate;

use crate::domain::DomainError;
use crate::domain::llm::{MessageList, ReasoningEffort, StructuredOutputSchema, Tool, ToolChoice};
use crate::domain::model::{Capability, ModelRegistry, ResolvedModel};

/// A requested feature the target model does not support
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapabilityError {
    #[error("Reasoning effort not supported for model '{model}'. This feature is only supported for the following models: {}.", .supported.join(", "))]
    ReasoningEffortNotSupported { model: String, supported: Vec<String> },

    #[error("Tools not supported for model '{model}'. This feature is only supported for the following models: {}.", .supported.join(", "))]
    ToolsNotSupported { model: String, supported: Vec<String> },

    #[error("Structured output not supported for model '{model}'. This feature is only supported for the following models: {}.", .supported.join(", "))]
    StructuredOutputNotSupported { model: String, supported: Vec<String> },

    #[error("Image ingestion not supported for model '{model}'. This feature is only supported for the following models: {}.", .supported.join(", "))]
    ImageIngestionNotSupported { model: String, supported: Vec<String> },
}

impl CapabilityError {
    pub fn capability(&self) -> Capability {
        match self {
            Self::ReasoningEffortNotSupported { .. } => Capability::ReasoningEffort,
            Self::ToolsNotSupported { .. } => Capability::FunctionCall,
            Self::StructuredOutputNotSupported { .. } => Capability::StructuredOutput,
            Self::ImageIngestionNotSupported { .. } => Capability::ImageIngestion,
        }
    }

    pub fn model(&self) -> &str {
        match self {
            Self::ReasoningEffortNotSupported { model, .. }
            | Self::ToolsNotSupported { model, .. }
            | Self::StructuredOutputNotSupported { model, .. }
            | Self::ImageIngestionNotSupported { model, .. } => model,
        }
    }

    pub fn supported(&self) -> &[String] {
        match self {
            Self::ReasoningEffortNotSupported { supported, .. }
            | Self::ToolsNotSupported { supported, .. }
            | Self::StructuredOutputNotSupported { supported, .. }
            | Self::ImageIngestionNotSupported { supported, .. } => supported,
        }
    }
}

/// Checks requested features of one call against one resolved model
#[derive(Debug, Clone, Copy)]
pub struct CapabilityGate<'a> {
    registry: &'a ModelRegistry,
    model: &'a ResolvedModel,
}

impl<'a> CapabilityGate<'a> {
    pub fn new(registry: &'a ModelRegistry, model: &'a ResolvedModel) -> Self {
        Self { registry, model }
    }

    fn require(
        &self,
        capability: Capability,
        error: fn(String, Vec<String>) -> CapabilityError,
    ) -> Result<(), CapabilityError> {
        if self.model.capabilities.supports(capability) {
            return Ok(());
        }
        Err(error(
            self.model.requested.clone(),
            self.registry.supported_models(capability),
        ))
    }

    pub fn check_reasoning_effort(
        &self,
        effort: Option<ReasoningEffort>,
    ) -> Result<(), CapabilityError> {
        match effort {
            Some(_) => self.require(Capability::ReasoningEffort, |model, supported| {
                CapabilityError::ReasoningEffortNotSupported { model, supported }
            }),
            None => Ok(()),
        }
    }

    pub fn check_tools(&self, tools: Option<&[Tool]>) -> Result<(), CapabilityError> {
        match tools {
            Some(tools) if !tools.is_empty() => {
                self.require(Capability::FunctionCall, |model, supported| {
                    CapabilityError::ToolsNotSupported { model, supported }
                })
            }
            _ => Ok(()),
        }
    }

    pub fn check_structured_output(
        &self,
        schema: Option<&StructuredOutputSchema>,
    ) -> Result<(), CapabilityError> {
        match schema {
            Some(_) => self.require(Capability::StructuredOutput, |model, supported| {
                CapabilityError::StructuredOutputNotSupported { model, supported }
            }),
            None => Ok(()),
        }
    }

    pub fn check_image_ingestion(&self, messages: &MessageList) -> Result<(), CapabilityError> {
        if messages.iter().any(|m| m.has_images()) {
            self.require(Capability::ImageIngestion, |model, supported| {
                CapabilityError::ImageIngestionNotSupported { model, supported }
            })
        } else {
            Ok(())
        }
    }
}

/// Every tool must carry a valid name, a description and an object parameter schema
pub fn validate_tools(tools: &[Tool]) -> Result<(), DomainError> {
    let invalid: Vec<String> = tools
        .iter()
        .filter_map(|tool| {
            tool.validate()
                .err()
                .map(|e| format!("'{}' ({})", tool.name, e))
        })
        .collect();

    if invalid.is_empty() {
        Ok(())
    } else {
        Err(DomainError::validation(format!(
            "Invalid tools: {}",
            invalid.join("; ")
        )))
    }
}

/// Effective tool choice: `auto` when tools are present without a choice, nothing without tools
pub fn resolve_tool_choice(
    choice: Option<ToolChoice>,
    tools: Option<&[Tool]>,
) -> Result<Option<ToolChoice>, DomainError> {
    let tools = match tools {
        Some(tools) if !tools.is_empty() => tools,
        _ => {
            if let Some(choice) = choice {
                warn!(tool_choice = ?choice, "Tool choice supplied without tools; ignoring it");
            }
            return Ok(None);
        }
    };

    match choice {
        None => Ok(Some(ToolChoice::Auto)),
        Some(ToolChoice::Function { name }) => {
            if tools.iter().any(|t| t.name == name) {
                Ok(Some(ToolChoice::Function { name }))
            } else {
                Err(DomainError::validation(format!(
                    "Tool choice names unknown tool '{}'",
                    name
                )))
            }
        }
        Some(choice) => Ok(Some(choice)),
    }
}

/// The schema must describe a JSON object with properties and compile as JSON Schema
pub fn validate_schema(schema: &StructuredOutputSchema) -> Result<(), DomainError> {
    let root = schema.schema.as_object().ok_or_else(|| {
        DomainError::validation(format!(
            "Structured output schema '{}' must be a JSON object",
            schema.name
        ))
    })?;

    if root.get("type") != Some(&Value::String("object".to_string())) {
        return Err(DomainError::validation(format!(
            "Structured output schema '{}' must describe an object",
            schema.name
        )));
    }

    if !root.get("properties").is_some_and(Value::is_object) {
        return Err(DomainError::validation(format!(
            "Structured output schema '{}' must declare object properties",
            schema.name
        )));
    }

    jsonschema::validator_for(&schema.schema).map_err(|e| {
        DomainError::validation(format!(
            "Structured output schema '{}' is not valid JSON Schema: {}",
            schema.name, e
        ))
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::llm::{ContentPart, Message};
    use serde_json::json;

    fn registry() -> ModelRegistry {
        ModelRegistry::builtin().unwrap()
    }

    fn weather_tool() -> Tool {
        Tool::new(
            "get_weather",
            "Look up the weather",
            json!({"type": "object", "properties": {"city": {"type": "string"}}}),
        )
    }

    #[test]
    fn test_reasoning_effort_rejected_for_o1_mini() {
        let registry = registry();
        let model = registry.resolve("o1-mini").unwrap();
        let gate = CapabilityGate::new(&registry, &model);

        let err = gate
            .check_reasoning_effort(Some(ReasoningEffort::High))
            .unwrap_err();

        assert_eq!(err.capability(), Capability::ReasoningEffort);
        assert_eq!(err.model(), "o1-mini");
        assert!(err.supported().contains(&"o1".to_string()));
        assert!(err.supported().contains(&"o3-mini".to_string()));
        assert!(!err.supported().contains(&"o1-mini".to_string()));

        let message = err.to_string();
        assert!(message.contains("'o1-mini'"));
        assert!(message.contains("o1, o1-01-10-24"));
    }

    #[test]
    fn test_reasoning_effort_allowed_for_o1() {
        let registry = registry();
        let model = registry.resolve("o1").unwrap();
        let gate = CapabilityGate::new(&registry, &model);
        assert!(gate.check_reasoning_effort(Some(ReasoningEffort::Low)).is_ok());
        assert!(gate.check_reasoning_effort(None).is_ok());
    }

    #[test]
    fn test_tools_gated() {
        let registry = registry();
        let tools = vec![weather_tool()];

        let model = registry.resolve("gpt-4o").unwrap();
        assert!(CapabilityGate::new(&registry, &model)
            .check_tools(Some(&tools))
            .is_ok());

        let table = r#"
            [[models]]
            alias = "plain"
            provider = "openai"
            model_ids = ["plain-01-01-25"]
        "#;
        let plain = ModelRegistry::from_toml_str(table).unwrap();
        let model = plain.resolve("plain").unwrap();
        let err = CapabilityGate::new(&plain, &model)
            .check_tools(Some(&tools))
            .unwrap_err();
        assert!(matches!(err, CapabilityError::ToolsNotSupported { .. }));
        assert!(err.supported().is_empty());
    }

    #[test]
    fn test_empty_tool_list_not_gated() {
        let registry = registry();
        let model = registry.resolve("gpt-4o").unwrap();
        assert!(CapabilityGate::new(&registry, &model)
            .check_tools(Some(&[]))
            .is_ok());
    }

    #[test]
    fn test_image_ingestion_gated() {
        let registry = registry();
        let messages = MessageList::from(Message::user_with_parts(vec![
            ContentPart::text("describe"),
            ContentPart::image_url("https://example.com/a.png"),
        ]));

        let model = registry.resolve("o1-mini").unwrap();
        let err = CapabilityGate::new(&registry, &model)
            .check_image_ingestion(&messages)
            .unwrap_err();
        assert_eq!(err.capability(), Capability::ImageIngestion);

        let model = registry.resolve("gpt-4o").unwrap();
        assert!(CapabilityGate::new(&registry, &model)
            .check_image_ingestion(&messages)
            .is_ok());
    }

    #[test]
    fn test_validate_tools_reports_malformed_entries() {
        let bad = Tool::new("bad name!", "", json!(null));
        let err = validate_tools(&[weather_tool(), bad]).unwrap_err();
        assert!(matches!(err, DomainError::Validation { .. }));
        assert!(err.to_string().contains("bad name!"));
    }

    #[test]
    fn test_tool_choice_defaults_to_auto() {
        let tools = vec![weather_tool()];
        assert_eq!(
            resolve_tool_choice(None, Some(&tools)).unwrap(),
            Some(ToolChoice::Auto)
        );
        assert_eq!(
            resolve_tool_choice(Some(ToolChoice::Required), Some(&tools)).unwrap(),
            Some(ToolChoice::Required)
        );
    }

    #[test]
    fn test_tool_choice_discarded_without_tools() {
        assert_eq!(resolve_tool_choice(Some(ToolChoice::Required), None).unwrap(), None);
        assert_eq!(resolve_tool_choice(Some(ToolChoice::Auto), Some(&[])).unwrap(), None);
        assert_eq!(resolve_tool_choice(None, None).unwrap(), None);
    }

    #[test]
    fn test_function_choice_must_name_a_tool() {
        let tools = vec![weather_tool()];
        assert!(resolve_tool_choice(Some(ToolChoice::function("get_weather")), Some(&tools)).is_ok());
        assert!(resolve_tool_choice(Some(ToolChoice::function("other")), Some(&tools)).is_err());
    }

    #[test]
    fn test_schema_structure() {
        let good = StructuredOutputSchema::new(
            "answer",
            json!({"type": "object", "properties": {"text": {"type": "string"}}}),
        );
        assert!(validate_schema(&good).is_ok());

        let not_object = StructuredOutputSchema::new("answer", json!({"type": "string"}));
        assert!(validate_schema(&not_object).is_err());

        let no_properties = StructuredOutputSchema::new("answer", json!({"type": "object"}));
        assert!(validate_schema(&no_properties).is_err());

        let scalar = StructuredOutputSchema::new("answer", json!(42));
        assert!(validate_schema(&scalar).is_err());

        let broken = StructuredOutputSchema::new(
            "answer",
            json!({"type": "object", "properties": {"n": {"type": "integer", "minimum": "zero"}}}),
        );
        assert!(validate_schema(&broken).is_err());
    }
}
