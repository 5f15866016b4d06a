use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use validator::{Validate, ValidationError};

use super::{Message, MessageList};
use crate::domain::DomainError;

/// Function names accepted by both providers
static TOOL_NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_-]{1,64}$").unwrap());

fn is_json_object(value: &Value) -> Result<(), ValidationError> {
    if value.is_object() {
        Ok(())
    } else {
        Err(ValidationError::new("parameters_not_object"))
    }
}

/// A function the model may call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Tool {
    #[validate(regex(path = *TOOL_NAME_PATTERN))]
    pub name: String,
    #[validate(length(min = 1))]
    pub description: String,
    /// JSON Schema of the arguments object
    #[validate(custom(function = "is_json_object"))]
    pub parameters: Value,
    #[serde(default)]
    pub strict: bool,
}

impl Tool {
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            strict: false,
        }
    }

    pub fn for_arguments<T: JsonSchema>(
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let parameters = serde_json::to_value(schemars::schema_for!(T))
            .map_err(|e| DomainError::internal(format!("Failed to serialize schema: {}", e)))?;
        Ok(Self::new(name, description, parameters))
    }
}

/// How the model should pick among the supplied tools
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolChoice {
    Auto,
    None,
    Required,
    Function { name: String },
}

impl ToolChoice {
    pub fn function(name: impl Into<String>) -> Self {
        Self::Function { name: name.into() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    Low,
    Medium,
    High,
}

impl ReasoningEffort {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasoningEffort::Low => "low",
            ReasoningEffort::Medium => "medium",
            ReasoningEffort::High => "high",
        }
    }
}

impl fmt::Display for ReasoningEffort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReasoningEffort {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(DomainError::validation(format!(
                "Invalid reasoning effort '{}': expected low, medium or high",
                other
            ))),
        }
    }
}

/// Schema a structured completion must conform to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredOutputSchema {
    pub name: String,
    pub schema: Value,
    #[serde(default)]
    pub strict: bool,
}

impl StructuredOutputSchema {
    pub fn new(name: impl Into<String>, schema: Value) -> Self {
        Self {
            name: name.into(),
            schema,
            strict: false,
        }
    }

    /// Derive the schema from a Rust type
    pub fn for_type<T: JsonSchema>() -> Result<Self, DomainError> {
        let schema = serde_json::to_value(schemars::schema_for!(T))
            .map_err(|e| DomainError::internal(format!("Failed to serialize schema: {}", e)))?;
        Ok(Self::new(sanitize_schema_name(&T::schema_name()), schema))
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

fn sanitize_schema_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

/// Provider-agnostic parameters of a single call, after merging
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallParameters {
    pub model: String,
    pub messages: MessageList,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Tool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_effort: Option<ReasoningEffort>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structured_output_schema: Option<StructuredOutputSchema>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
    /// Provider-specific keys forwarded untouched
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl CallParameters {
    pub fn builder(model: impl Into<String>) -> CallParametersBuilder {
        CallParametersBuilder::new(model)
    }

    pub fn has_tools(&self) -> bool {
        self.tools.as_ref().is_some_and(|t| !t.is_empty())
    }
}

/// Builder for CallParameters
#[derive(Debug, Default)]
pub struct CallParametersBuilder {
    params: CallParameters,
}

impl CallParametersBuilder {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            params: CallParameters {
                model: model.into(),
                ..Default::default()
            },
        }
    }

    pub fn message(mut self, message: Message) -> Self {
        self.params.messages.push(message);
        self
    }

    pub fn messages(mut self, messages: impl Into<MessageList>) -> Self {
        self.params.messages = messages.into();
        self
    }

    pub fn system(self, content: impl Into<String>) -> Self {
        self.message(Message::system(content))
    }

    pub fn developer(self, content: impl Into<String>) -> Self {
        self.message(Message::developer(content))
    }

    pub fn user_message(self, content: impl Into<String>) -> Self {
        self.message(Message::user(content))
    }

    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.params.user = Some(user.into());
        self
    }

    pub fn tool(mut self, tool: Tool) -> Self {
        self.params.tools.get_or_insert_with(Vec::new).push(tool);
        self
    }

    pub fn tool_choice(mut self, choice: ToolChoice) -> Self {
        self.params.tool_choice = Some(choice);
        self
    }

    pub fn reasoning_effort(mut self, effort: ReasoningEffort) -> Self {
        self.params.reasoning_effort = Some(effort);
        self
    }

    pub fn structured_output(mut self, schema: StructuredOutputSchema) -> Self {
        self.params.structured_output_schema = Some(schema);
        self
    }

    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params
            .metadata
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.extra.insert(key.into(), value.into());
        self
    }

    pub fn build(self) -> CallParameters {
        self.params
    }
}
