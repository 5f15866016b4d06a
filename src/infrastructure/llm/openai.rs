use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::http_client::TransportError;
use super::provider::{ProviderRequest, merge_extra};
use crate::domain::{
    CallParameters, ChatResponse, Choice, ContentPart, FinishReason, Message, MessageContent,
    Provider, StructuredOutputSchema, TokenCounts, Tool, ToolCall, ToolChoice,
};

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";

/// OpenAI chat completions shaping
#[derive(Clone)]
pub struct OpenAiAdapter {
    auth_header: String,
    base_url: String,
}

impl std::fmt::Debug for OpenAiAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiAdapter")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl OpenAiAdapter {
    pub fn new(api_key: &str) -> Self {
        Self::with_base_url(api_key, DEFAULT_OPENAI_BASE_URL)
    }

    pub fn with_base_url(api_key: &str, base_url: impl Into<String>) -> Self {
        Self {
            auth_header: format!("Bearer {}", api_key),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn chat_completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }

    pub fn build_request(&self, model_id: &str, params: &CallParameters) -> ProviderRequest {
        let messages: Vec<OpenAiMessage> =
            params.messages.iter().map(OpenAiMessage::from_domain).collect();

        let mut body = Map::new();
        body.insert("model".into(), json!(model_id));
        body.insert("messages".into(), json!(messages));

        if let Some(ref user) = params.user {
            body.insert("user".into(), json!(user));
        }

        if let Some(ref metadata) = params.metadata {
            body.insert("metadata".into(), Value::Object(metadata.clone()));
        }

        if let Some(ref tools) = params.tools {
            let tools: Vec<Value> = tools.iter().map(tool_to_openai).collect();
            body.insert("tools".into(), Value::Array(tools));
        }

        if let Some(ref choice) = params.tool_choice {
            body.insert("tool_choice".into(), tool_choice_to_openai(choice));
        }

        if let Some(effort) = params.reasoning_effort {
            body.insert("reasoning_effort".into(), json!(effort.as_str()));
        }

        if let Some(ref schema) = params.structured_output_schema {
            body.insert(
                "response_format".into(),
                json!({
                    "type": "json_schema",
                    "json_schema": {
                        "name": schema.name,
                        "strict": schema.strict,
                        "schema": schema.schema
                    }
                }),
            );
        }

        merge_extra(&mut body, &params.extra);

        ProviderRequest {
            url: self.chat_completions_url(),
            headers: vec![
                ("Authorization".to_string(), self.auth_header.clone()),
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
        let response: OpenAiResponse =
            serde_json::from_value(json).map_err(|e| TransportError::Decode(e.to_string()))?;

        let choices = response
            .choices
            .into_iter()
            .map(|choice| {
                let structured_payload = structured
                    .and(choice.message.content.as_deref())
                    .and_then(|content| serde_json::from_str::<Value>(content).ok());

                Choice {
                    content: choice.message.content,
                    tool_calls: choice
                        .message
                        .tool_calls
                        .into_iter()
                        .map(OpenAiToolCall::into_domain)
                        .collect(),
                    structured: structured_payload,
                    finish_reason: choice.finish_reason.as_deref().map(FinishReason::from_provider),
                }
            })
            .collect();

        let token_counts = response
            .usage
            .map(|usage| TokenCounts {
                prompt_tokens: usage.prompt_tokens,
                cached_prompt_tokens: usage
                    .prompt_tokens_details
                    .map(|d| d.cached_tokens)
                    .unwrap_or(0),
                completion_tokens: usage.completion_tokens,
                total_tokens: usage.total_tokens,
            })
            .unwrap_or_default();

        Ok(ChatResponse {
            id: response.id,
            model: response.model,
            provider: Provider::OpenAi,
            choices,
            token_counts,
            raw,
        })
    }
}

fn tool_to_openai(tool: &Tool) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": tool.name,
            "description": tool.description,
            "parameters": tool.parameters,
            "strict": tool.strict
        }
    })
}

fn tool_choice_to_openai(choice: &ToolChoice) -> Value {
    match choice {
        ToolChoice::Auto => json!("auto"),
        ToolChoice::None => json!("none"),
        ToolChoice::Required => json!("required"),
        ToolChoice::Function { name } => json!({
            "type": "function",
            "function": { "name": name }
        }),
    }
}

// OpenAI API types

#[derive(Debug, Serialize)]
struct OpenAiMessage {
    role: &'static str,
    content: OpenAiContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum OpenAiContent {
    Text(String),
    Blocks(Vec<OpenAiContentBlock>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum OpenAiContentBlock {
    Text { text: String },
    ImageUrl { image_url: OpenAiImageUrl },
}

#[derive(Debug, Serialize)]
struct OpenAiImageUrl {
    url: String,
    detail: &'static str,
}

impl OpenAiMessage {
    fn from_domain(message: &Message) -> Self {
        let content = match &message.content {
            MessageContent::Text(text) => OpenAiContent::Text(text.clone()),
            MessageContent::Parts(parts) => {
                OpenAiContent::Blocks(parts.iter().map(OpenAiContentBlock::from_domain).collect())
            }
        };

        Self {
            role: message.role.as_str(),
            content,
        }
    }
}

impl OpenAiContentBlock {
    fn from_domain(part: &ContentPart) -> Self {
        match part {
            ContentPart::Text { text } => Self::Text { text: text.clone() },
            ContentPart::ImageUrl { url, detail } => Self::ImageUrl {
                image_url: OpenAiImageUrl {
                    url: url.clone(),
                    detail: detail.as_str(),
                },
            },
            ContentPart::ImageBase64 { data, media_type } => Self::ImageUrl {
                image_url: OpenAiImageUrl {
                    url: format!("data:{};base64,{}", media_type, data),
                    detail: "auto",
                },
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    id: String,
    model: String,
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<OpenAiToolCall>,
}

#[derive(Debug, Deserialize)]
struct OpenAiToolCall {
    id: String,
    function: OpenAiFunctionCall,
}

#[derive(Debug, Deserialize)]
struct OpenAiFunctionCall {
    name: String,
    arguments: String,
}

impl OpenAiToolCall {
    fn into_domain(self) -> ToolCall {
        let arguments = serde_json::from_str(&self.function.arguments)
            .unwrap_or(Value::String(self.function.arguments));
        ToolCall {
            id: self.id,
            name: self.function.name,
            arguments,
        }
    }
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
    total_tokens: u64,
    prompt_tokens_details: Option<OpenAiPromptTokensDetails>,
}

#[derive(Debug, Deserialize)]
struct OpenAiPromptTokensDetails {
    #[serde(default)]
    cached_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ImageDetail, ReasoningEffort};

    fn adapter() -> OpenAiAdapter {
        OpenAiAdapter::new("test-api-key")
    }

    fn completion(content: Value) -> Value {
        json!({
            "id": "chatcmpl-123",
            "model": "gpt-4o-2024-11-20",
            "choices": [{
                "message": { "role": "assistant", "content": content },
                "finish_reason": "stop"
            }],
            "usage": {
                "prompt_tokens": 10,
                "completion_tokens": 8,
                "total_tokens": 18,
                "prompt_tokens_details": { "cached_tokens": 4 }
            }
        })
    }

    #[test]
    fn test_build_basic_request() {
        let params = CallParameters::builder("gpt-4o")
            .system("Be brief")
            .user_message("Hello!")
            .user("user-1")
            .metadata("team", "search")
            .build();

        let request = adapter().build_request("gpt-4o-12-17-24", &params);

        assert_eq!(request.url, "https://api.openai.com/v1/chat/completions");
        assert!(
            request
                .header_pairs()
                .contains(&("Authorization", "Bearer test-api-key"))
        );
        assert_eq!(request.body["model"], "gpt-4o-12-17-24");
        assert_eq!(
            request.body["messages"],
            json!([
                {"role": "system", "content": "Be brief"},
                {"role": "user", "content": "Hello!"}
            ])
        );
        assert_eq!(request.body["user"], "user-1");
        assert_eq!(request.body["metadata"]["team"], "search");
        assert!(request.body.get("tools").is_none());
        assert!(request.body.get("response_format").is_none());
    }

    #[test]
    fn test_build_multimodal_message() {
        let params = CallParameters::builder("gpt-4o")
            .message(Message::user_with_parts(vec![
                ContentPart::text("What is this?"),
                ContentPart::ImageUrl {
                    url: "https://example.com/cat.png".into(),
                    detail: ImageDetail::High,
                },
                ContentPart::ImageBase64 {
                    data: "aGVsbG8=".into(),
                    media_type: "image/png".into(),
                },
            ]))
            .build();

        let request = adapter().build_request("gpt-4o-12-17-24", &params);
        assert_eq!(
            request.body["messages"][0]["content"],
            json!([
                {"type": "text", "text": "What is this?"},
                {"type": "image_url", "image_url": {"url": "https://example.com/cat.png", "detail": "high"}},
                {"type": "image_url", "image_url": {"url": "data:image/png;base64,aGVsbG8=", "detail": "auto"}}
            ])
        );
    }

    #[test]
    fn test_build_tools_and_reasoning() {
        let params = CallParameters::builder("o1")
            .developer("Think step by step")
            .user_message("Weather in Paris?")
            .tool(Tool::new("get_weather", "Look up weather", json!({"type": "object"})))
            .tool_choice(ToolChoice::function("get_weather"))
            .reasoning_effort(ReasoningEffort::Medium)
            .extra("seed", 11)
            .build();

        let request = adapter().build_request("o1-12-17-24", &params);
        let body = &request.body;

        assert_eq!(body["messages"][0]["role"], "developer");
        assert_eq!(body["tools"][0]["type"], "function");
        assert_eq!(body["tools"][0]["function"]["name"], "get_weather");
        assert_eq!(
            body["tool_choice"],
            json!({"type": "function", "function": {"name": "get_weather"}})
        );
        assert_eq!(body["reasoning_effort"], "medium");
        assert_eq!(body["seed"], 11);
    }

    #[test]
    fn test_build_structured_request() {
        let schema = StructuredOutputSchema::new(
            "answer",
            json!({"type": "object", "properties": {"text": {"type": "string"}}}),
        )
        .with_strict(true);
        let params = CallParameters::builder("gpt-4o")
            .user_message("Answer")
            .structured_output(schema)
            .build();

        let request = adapter().build_request("gpt-4o-12-17-24", &params);
        let format = &request.body["response_format"];
        assert_eq!(format["type"], "json_schema");
        assert_eq!(format["json_schema"]["name"], "answer");
        assert_eq!(format["json_schema"]["strict"], true);
    }

    #[test]
    fn test_parse_response() {
        let response = adapter()
            .parse_response(completion(json!("Hello! How can I help you?")), None)
            .unwrap();

        assert_eq!(response.id, "chatcmpl-123");
        assert_eq!(response.provider, Provider::OpenAi);
        assert_eq!(response.content(), Some("Hello! How can I help you?"));
        assert_eq!(response.choices[0].finish_reason, Some(FinishReason::Stop));
        assert!(response.choices[0].structured.is_none());
        assert_eq!(
            response.token_counts,
            TokenCounts {
                prompt_tokens: 10,
                cached_prompt_tokens: 4,
                completion_tokens: 8,
                total_tokens: 18,
            }
        );
    }

    #[test]
    fn test_parse_structured_payload() {
        let schema = StructuredOutputSchema::new("answer", json!({"type": "object"}));
        let response = adapter()
            .parse_response(completion(json!(r#"{"text":"hi"}"#)), Some(&schema))
            .unwrap();
        assert_eq!(response.choices[0].structured, Some(json!({"text": "hi"})));

        let response = adapter()
            .parse_response(completion(json!("not json")), Some(&schema))
            .unwrap();
        assert!(response.choices[0].structured.is_none());
    }

    #[test]
    fn test_parse_tool_calls() {
        let body = json!({
            "id": "chatcmpl-9",
            "model": "gpt-4o",
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "get_weather", "arguments": "{\"city\":\"Paris\"}"}
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        });

        let response = adapter().parse_response(body, None).unwrap();
        let choice = &response.choices[0];
        assert!(choice.content.is_none());
        assert_eq!(choice.tool_calls[0].arguments, json!({"city": "Paris"}));
        assert_eq!(choice.finish_reason, Some(FinishReason::ToolCalls));
        assert_eq!(response.token_counts, TokenCounts::default());
    }

    #[test]
    fn test_parse_malformed_body() {
        let result = adapter().parse_response(json!({"error": "boom"}), None);
        assert!(matches!(result, Err(TransportError::Decode(_))));
    }
}
