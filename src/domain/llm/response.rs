use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::model::Provider;

/// Reason why the generation finished
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ContentFilter,
    ToolCalls,
    Other(String),
}

impl FinishReason {
    /// Map both providers' stop reasons onto one vocabulary
    pub fn from_provider(reason: &str) -> Self {
        match reason {
            "stop" | "end_turn" | "stop_sequence" => Self::Stop,
            "length" | "max_tokens" => Self::Length,
            "content_filter" | "refusal" => Self::ContentFilter,
            "tool_calls" | "tool_use" | "function_call" => Self::ToolCalls,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Token counts exactly as the provider reported them
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenCounts {
    pub prompt_tokens: u64,
    pub cached_prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl TokenCounts {
    pub fn new(prompt_tokens: u64, cached_prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            cached_prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// A function invocation requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

/// One completion candidate
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// Parsed JSON payload of a structured completion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structured: Option<Value>,
    pub finish_reason: Option<FinishReason>,
}

impl Choice {
    pub fn has_content(&self) -> bool {
        self.content.as_deref().is_some_and(|c| !c.is_empty()) || !self.tool_calls.is_empty()
    }
}

/// Completion returned by a provider, normalized across providers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub id: String,
    pub model: String,
    pub provider: Provider,
    pub choices: Vec<Choice>,
    pub token_counts: TokenCounts,
    /// Provider body as received
    #[serde(skip)]
    pub raw: Value,
}

impl ChatResponse {
    pub fn content(&self) -> Option<&str> {
        self.choices.first().and_then(|c| c.content.as_deref())
    }

    pub fn first_choice(&self) -> Option<&Choice> {
        self.choices.first()
    }
}

impl AsRef<ChatResponse> for ChatResponse {
    fn as_ref(&self) -> &ChatResponse {
        self
    }
}

/// Structured completion deserialized into the caller's type
#[derive(Debug, Clone)]
pub struct StructuredResponse<T> {
    pub parsed: T,
    pub payload: Value,
    pub response: ChatResponse,
}

impl<T> AsRef<ChatResponse> for StructuredResponse<T> {
    fn as_ref(&self) -> &ChatResponse {
        &self.response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_counts_total() {
        let counts = TokenCounts::new(10, 4, 20);
        assert_eq!(counts.total_tokens, 30);
        assert_eq!(counts.cached_prompt_tokens, 4);
    }

    #[test]
    fn test_finish_reason_mapping() {
        assert_eq!(FinishReason::from_provider("end_turn"), FinishReason::Stop);
        assert_eq!(FinishReason::from_provider("max_tokens"), FinishReason::Length);
        assert_eq!(FinishReason::from_provider("tool_use"), FinishReason::ToolCalls);
        assert_eq!(
            FinishReason::from_provider("pause_turn"),
            FinishReason::Other("pause_turn".to_string())
        );
    }

    #[test]
    fn test_choice_content() {
        assert!(!Choice::default().has_content());

        let choice = Choice {
            content: Some(String::new()),
            ..Default::default()
        };
        assert!(!choice.has_content());

        let choice = Choice {
            tool_calls: vec![ToolCall {
                id: "call_1".to_string(),
                name: "lookup".to_string(),
                arguments: serde_json::json!({}),
            }],
            ..Default::default()
        };
        assert!(choice.has_content());
    }
}
