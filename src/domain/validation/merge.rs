//! Client defaults combined with per-call overrides

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::llm::{
    CallParameters, Message, MessageList, ReasoningEffort, StructuredOutputSchema, Tool, ToolChoice,
};

pub const FIELD_TOOLS: &str = "tools";
pub const FIELD_METADATA: &str = "metadata";

/// Per-field switches: when set, container values from both sides are combined
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MergeFlags(HashMap<String, bool>);

impl MergeFlags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Combine this field instead of letting the override replace it
    pub fn merge(self, field: impl Into<String>) -> Self {
        self.set(field, true)
    }

    pub fn set(mut self, field: impl Into<String>, enabled: bool) -> Self {
        self.0.insert(field.into(), enabled);
        self
    }

    pub fn is_enabled(&self, field: &str) -> bool {
        self.0.get(field).copied().unwrap_or(false)
    }
}

/// Values a client applies to every call unless overridden
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientDefaults {
    pub model: String,
    pub user: Option<String>,
    pub tools: Option<Vec<Tool>>,
    pub tool_choice: Option<ToolChoice>,
    pub reasoning_effort: Option<ReasoningEffort>,
    pub metadata: Option<Map<String, Value>>,
}

impl ClientDefaults {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }
}

/// Everything a single call supplies; messages are always per call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuntimeOverrides {
    pub model: Option<String>,
    pub messages: MessageList,
    pub user: Option<String>,
    pub tools: Option<Vec<Tool>>,
    pub tool_choice: Option<ToolChoice>,
    pub reasoning_effort: Option<ReasoningEffort>,
    pub structured_output_schema: Option<StructuredOutputSchema>,
    pub metadata: Option<Map<String, Value>>,
    pub extra: Map<String, Value>,
}

impl RuntimeOverrides {
    pub fn new(messages: impl Into<MessageList>) -> Self {
        Self {
            messages: messages.into(),
            ..Default::default()
        }
    }

    pub fn message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn tools(mut self, tools: Vec<Tool>) -> Self {
        self.tools = Some(tools);
        self
    }

    pub fn tool_choice(mut self, choice: ToolChoice) -> Self {
        self.tool_choice = Some(choice);
        self
    }

    pub fn reasoning_effort(mut self, effort: ReasoningEffort) -> Self {
        self.reasoning_effort = Some(effort);
        self
    }

    pub fn structured_output(mut self, schema: StructuredOutputSchema) -> Self {
        self.structured_output_schema = Some(schema);
        self
    }

    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }

    /// Unrecognized key forwarded to the provider as is
    pub fn extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// Effective call parameters from client defaults and call overrides
pub fn merge(
    defaults: &ClientDefaults,
    overrides: RuntimeOverrides,
    flags: &MergeFlags,
) -> CallParameters {
    let tools = match (&defaults.tools, overrides.tools) {
        (Some(base), Some(extra)) if flags.is_enabled(FIELD_TOOLS) => {
            Some(base.iter().cloned().chain(extra).collect())
        }
        (base, over) => over.or_else(|| base.clone()),
    };

    let metadata = match (&defaults.metadata, overrides.metadata) {
        (Some(base), Some(over)) if flags.is_enabled(FIELD_METADATA) => {
            let mut combined = base.clone();
            combined.extend(over);
            Some(combined)
        }
        (base, over) => over.or_else(|| base.clone()),
    };

    CallParameters {
        model: overrides.model.unwrap_or_else(|| defaults.model.clone()),
        messages: overrides.messages,
        user: overrides.user.or_else(|| defaults.user.clone()),
        tools,
        tool_choice: overrides.tool_choice.or_else(|| defaults.tool_choice.clone()),
        reasoning_effort: overrides.reasoning_effort.or(defaults.reasoning_effort),
        structured_output_schema: overrides.structured_output_schema,
        metadata,
        extra: overrides.extra,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tool(name: &str) -> Tool {
        Tool::new(name, "test tool", json!({"type": "object"}))
    }

    fn names(params: &CallParameters) -> Vec<&str> {
        params
            .tools
            .as_ref()
            .map(|t| t.iter().map(|t| t.name.as_str()).collect())
            .unwrap_or_default()
    }

    fn defaults() -> ClientDefaults {
        ClientDefaults {
            tools: Some(vec![tool("a"), tool("b")]),
            ..ClientDefaults::new("gpt-4o")
        }
    }

    #[test]
    fn test_tools_concatenated_when_flagged() {
        let overrides = RuntimeOverrides::new(Message::user("q")).tools(vec![tool("c")]);
        let params = merge(&defaults(), overrides, &MergeFlags::new().merge("tools"));
        assert_eq!(names(&params), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_tools_replaced_without_flag() {
        let overrides = RuntimeOverrides::new(Message::user("q")).tools(vec![tool("c")]);
        let params = merge(&defaults(), overrides, &MergeFlags::new().set("tools", false));
        assert_eq!(names(&params), vec!["c"]);
    }

    #[test]
    fn test_default_used_when_override_absent() {
        let params = merge(
            &defaults(),
            RuntimeOverrides::new(Message::user("q")),
            &MergeFlags::new().merge("tools"),
        );
        assert_eq!(names(&params), vec!["a", "b"]);
        assert_eq!(params.model, "gpt-4o");
    }

    #[test]
    fn test_metadata_union_override_wins() {
        let mut base = Map::new();
        base.insert("team".into(), json!("search"));
        base.insert("env".into(), json!("prod"));
        let defaults = ClientDefaults {
            metadata: Some(base),
            ..ClientDefaults::new("gpt-4o")
        };

        let overrides = RuntimeOverrides::new(Message::user("q"))
            .metadata("env", "staging")
            .metadata("trace", "t-1");

        let params = merge(&defaults, overrides.clone(), &MergeFlags::new().merge("metadata"));
        let metadata = params.metadata.unwrap();
        assert_eq!(metadata["team"], json!("search"));
        assert_eq!(metadata["env"], json!("staging"));
        assert_eq!(metadata["trace"], json!("t-1"));

        let params = merge(&defaults, overrides, &MergeFlags::new());
        let metadata = params.metadata.unwrap();
        assert!(!metadata.contains_key("team"));
        assert_eq!(metadata.len(), 2);
    }

    #[test]
    fn test_scalar_override_wins_even_when_flagged() {
        let defaults = ClientDefaults {
            user: Some("default-user".into()),
            reasoning_effort: Some(ReasoningEffort::Low),
            ..ClientDefaults::new("o1")
        };
        let overrides = RuntimeOverrides::new(Message::user("q"))
            .user("caller")
            .reasoning_effort(ReasoningEffort::High)
            .model("o3-mini");

        let params = merge(&defaults, overrides, &MergeFlags::new().merge("user"));
        assert_eq!(params.user.as_deref(), Some("caller"));
        assert_eq!(params.reasoning_effort, Some(ReasoningEffort::High));
        assert_eq!(params.model, "o3-mini");
    }

    #[test]
    fn test_extra_keys_pass_through() {
        let overrides = RuntimeOverrides::new(Message::user("q"))
            .extra("temperature", 0.3)
            .extra("seed", 7);
        let params = merge(&ClientDefaults::new("gpt-4o"), overrides, &MergeFlags::new());
        assert_eq!(params.extra["temperature"], json!(0.3));
        assert_eq!(params.extra["seed"], json!(7));
    }

    #[test]
    fn test_messages_only_from_call() {
        let params = merge(
            &defaults(),
            RuntimeOverrides::default(),
            &MergeFlags::new(),
        );
        assert!(params.messages.is_empty());
    }

    #[test]
    fn test_flags_deserialize_from_map() {
        let flags: MergeFlags = serde_json::from_value(json!({"tools": true, "metadata": false}))
            .unwrap();
        assert!(flags.is_enabled("tools"));
        assert!(!flags.is_enabled("metadata"));
        assert!(!flags.is_enabled("user"));
    }
}
