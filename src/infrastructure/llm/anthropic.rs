use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::debug;

use super::http_client::TransportError;
use super::provider::{ProviderRequest, merge_extra};
use crate::domain::{
    CallParameters, ChatResponse, Choice, ContentPart, FinishReason, Message, MessageContent,
    MessageRole, Provider, ReasoningEffort, StructuredOutputSchema, TokenCounts, Tool, ToolCall,
    ToolChoice,
};

const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u64 = 4096;

/// Anthropic messages API shaping
#[derive(Clone)]
pub struct AnthropicAdapter {
    api_key: String,
    base_url: String,
}

impl std::fmt::Debug for AnthropicAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicAdapter")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl AnthropicAdapter {
    pub fn new(api_key: &str) -> Self {
        Self::with_base_url(api_key, DEFAULT_ANTHROPIC_BASE_URL)
    }

    pub fn with_base_url(api_key: &str, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.to_string(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.base_url)
    }

    pub fn build_request(&self, model_id: &str, params: &CallParameters) -> ProviderRequest {
        let (system, messages) = split_system_message(params.messages.as_slice());

        let anthropic_messages: Vec<AnthropicMessage> =
            messages.into_iter().map(AnthropicMessage::from_domain).collect();

        let mut extra = params.extra.clone();
        let mut max_tokens = extra
            .remove("max_tokens")
            .and_then(|v| v.as_u64())
            .unwrap_or(DEFAULT_MAX_TOKENS);

        let mut body = Map::new();
        body.insert("model".into(), json!(model_id));
        body.insert("messages".into(), json!(anthropic_messages));

        if let Some(system) = system {
            body.insert("system".into(), json!(system));
        }

        if let Some(ref user) = params.user {
            body.insert("metadata".into(), json!({ "user_id": user }));
        }
        if params.metadata.is_some() {
            debug!("Anthropic accepts only user_id metadata; dropping the rest");
        }

        let mut tools: Vec<Value> = params
            .tools
            .iter()
            .flatten()
            .map(tool_to_anthropic)
            .collect();
        let mut tool_choice = params.tool_choice.as_ref().map(tool_choice_to_anthropic);

        if let Some(ref schema) = params.structured_output_schema {
            tools.push(json!({
                "name": schema.name,
                "description": "Respond with a JSON object matching this schema",
                "input_schema": schema.schema
            }));
            tool_choice = Some(json!({ "type": "tool", "name": schema.name }));
        }

        if !tools.is_empty() {
            body.insert("tools".into(), Value::Array(tools));
        }
        if let Some(choice) = tool_choice {
            body.insert("tool_choice".into(), choice);
        }

        if let Some(effort) = params.reasoning_effort {
            let budget = thinking_budget(effort);
            if max_tokens <= budget {
                max_tokens = budget + DEFAULT_MAX_TOKENS;
            }
            body.insert(
                "thinking".into(),
                json!({ "type": "enabled", "budget_tokens": budget }),
            );
        }

        body.insert("max_tokens".into(), json!(max_tokens));
        merge_extra(&mut body, &extra);

        ProviderRequest {
            url: self.messages_url(),
            headers: vec![
                ("x-api-key".to_string(), self.api_key.clone()),
                ("anthropic-version".to_string(), ANTHROPIC_VERSION.to_string()),
                ("Content-Type".to_string(), "application/json".to_string()),
            ],
            body: Value::Object(body),
        }
    }

    pub fn parse_response(
        &self,
        json: Value,
        structured: Option<&StructuredOutputSchema>,
    ) -> Result<ChatResponse, TransportError> {
        let raw = json.clone();
        let response: AnthropicResponse =
            serde_json::from_value(json).map_err(|e| TransportError::Decode(e.to_string()))?;

        let mut texts = Vec::new();
        let mut tool_calls = Vec::new();
        let mut structured_payload = None;

        for block in response.content {
            match block {
                ContentBlock::Text { text } => texts.push(text),
                ContentBlock::ToolUse { id, name, input } => {
                    if structured.is_some_and(|s| s.name == name) {
                        structured_payload = Some(input);
                    } else {
                        tool_calls.push(ToolCall {
                            id,
                            name,
                            arguments: input,
                        });
                    }
                }
                ContentBlock::Other => {}
            }
        }

        // The forced tool carries the payload; expose it as content too.
        let content = match (&structured_payload, texts.is_empty()) {
            (Some(payload), true) => Some(payload.to_string()),
            (_, false) => Some(texts.join("")),
            (None, true) => None,
        };

        let choice = Choice {
            content,
            tool_calls,
            structured: structured_payload,
            finish_reason: response.stop_reason.as_deref().map(FinishReason::from_provider),
        };

        let usage = response.usage;
        let token_counts = TokenCounts {
            prompt_tokens: usage.input_tokens,
            cached_prompt_tokens: usage.cache_read_input_tokens.unwrap_or(0),
            completion_tokens: usage.output_tokens,
            total_tokens: usage.input_tokens + usage.output_tokens,
        };

        Ok(ChatResponse {
            id: response.id,
            model: response.model,
            provider: Provider::Anthropic,
            choices: vec![choice],
            token_counts,
            raw,
        })
    }
}

/// Lift the instruction message out of the conversation
fn split_system_message(messages: &[Message]) -> (Option<String>, Vec<&Message>) {
    let mut system = None;
    let mut rest = Vec::with_capacity(messages.len());

    for message in messages {
        if message.role.is_instruction() && system.is_none() {
            system = Some(message.content_text());
        } else {
            rest.push(message);
        }
    }

    (system, rest)
}

fn thinking_budget(effort: ReasoningEffort) -> u64 {
    match effort {
        ReasoningEffort::Low => 1024,
        ReasoningEffort::Medium => 4096,
        ReasoningEffort::High => 16384,
    }
}

fn tool_to_anthropic(tool: &Tool) -> Value {
    json!({
        "name": tool.name,
        "description": tool.description,
        "input_schema": tool.parameters
    })
}

fn tool_choice_to_anthropic(choice: &ToolChoice) -> Value {
    match choice {
        ToolChoice::Auto => json!({ "type": "auto" }),
        ToolChoice::None => json!({ "type": "none" }),
        ToolChoice::Required => json!({ "type": "any" }),
        ToolChoice::Function { name } => json!({ "type": "tool", "name": name }),
    }
}

// Anthropic API types

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: &'static str,
    content: AnthropicContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum AnthropicContent {
    Text(String),
    Blocks(Vec<AnthropicBlock>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicBlock {
    Text { text: String },
    Image { source: ImageSource },
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ImageSource {
    Url { url: String },
    Base64 { media_type: String, data: String },
}

impl AnthropicMessage {
    fn from_domain(message: &Message) -> Self {
        let role = match message.role {
            MessageRole::Assistant => "assistant",
            MessageRole::User | MessageRole::System | MessageRole::Developer => "user",
        };

        let content = match &message.content {
            MessageContent::Text(text) => AnthropicContent::Text(text.clone()),
            MessageContent::Parts(parts) => {
                AnthropicContent::Blocks(parts.iter().map(AnthropicBlock::from_domain).collect())
            }
        };

        Self { role, content }
    }
}

impl AnthropicBlock {
    fn from_domain(part: &ContentPart) -> Self {
        match part {
            ContentPart::Text { text } => Self::Text { text: text.clone() },
            ContentPart::ImageUrl { url, .. } => Self::Image {
                source: ImageSource::Url { url: url.clone() },
            },
            ContentPart::ImageBase64 { data, media_type } => Self::Image {
                source: ImageSource::Base64 {
                    media_type: media_type.clone(),
                    data: data.clone(),
                },
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    id: String,
    model: String,
    content: Vec<ContentBlock>,
    stop_reason: Option<String>,
    usage: AnthropicUsage,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u64,
    output_tokens: u64,
    cache_read_input_tokens: Option<u64>,
}
