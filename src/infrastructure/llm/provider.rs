use serde_json::{Map, Value};
use tracing::warn;

use super::anthropic::AnthropicAdapter;
use super::http_client::TransportError;
use super::openai::OpenAiAdapter;
use crate::domain::{CallParameters, ChatResponse, Provider, StructuredOutputSchema};

/// Fully shaped HTTP request for one provider call
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Value,
}

impl ProviderRequest {
    pub fn header_pairs(&self) -> Vec<(&str, &str)> {
        self.headers
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }
}

/// Request shaper and response parser for the client's provider
#[derive(Debug, Clone)]
pub enum ProviderAdapter {
    OpenAi(OpenAiAdapter),
    Anthropic(AnthropicAdapter),
}

impl ProviderAdapter {
    pub fn new(provider: Provider, api_key: &str, base_url: Option<&str>) -> Self {
        match (provider, base_url) {
            (Provider::OpenAi, Some(url)) => Self::OpenAi(OpenAiAdapter::with_base_url(api_key, url)),
            (Provider::OpenAi, None) => Self::OpenAi(OpenAiAdapter::new(api_key)),
            (Provider::Anthropic, Some(url)) => {
                Self::Anthropic(AnthropicAdapter::with_base_url(api_key, url))
            }
            (Provider::Anthropic, None) => Self::Anthropic(AnthropicAdapter::new(api_key)),
        }
    }

    pub fn provider(&self) -> Provider {
        match self {
            Self::OpenAi(_) => Provider::OpenAi,
            Self::Anthropic(_) => Provider::Anthropic,
        }
    }

    pub fn build_request(&self, model_id: &str, params: &CallParameters) -> ProviderRequest {
        match self {
            Self::OpenAi(adapter) => adapter.build_request(model_id, params),
            Self::Anthropic(adapter) => adapter.build_request(model_id, params),
        }
    }

    pub fn parse_response(
        &self,
        body: Value,
        structured: Option<&StructuredOutputSchema>,
    ) -> Result<ChatResponse, TransportError> {
        match self {
            Self::OpenAi(adapter) => adapter.parse_response(body, structured),
            Self::Anthropic(adapter) => adapter.parse_response(body, structured),
        }
    }
}

/// Copy provider-specific keys into the body without clobbering shaped fields
pub(super) fn merge_extra(body: &mut Map<String, Value>, extra: &Map<String, Value>) {
    for (key, value) in extra {
        if body.contains_key(key) {
            warn!(key = %key, "Ignoring extra parameter that collides with a shaped field");
            continue;
        }
        body.insert(key.clone(), value.clone());
    }
}
