//! Model definition and related types

use std::fmt;

use serde::{Deserialize, Serialize};

/// LLM provider serving a model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Provider {
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "anthropic")]
    Anthropic,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Anthropic => "anthropic",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request feature a model may or may not support
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    ReasoningEffort,
    StructuredOutput,
    ImageIngestion,
    FunctionCall,
    SystemMessage,
    DeveloperMessage,
}

impl Capability {
    pub const ALL: [Capability; 6] = [
        Capability::ReasoningEffort,
        Capability::StructuredOutput,
        Capability::ImageIngestion,
        Capability::FunctionCall,
        Capability::SystemMessage,
        Capability::DeveloperMessage,
    ];
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::ReasoningEffort => "reasoning effort",
            Capability::StructuredOutput => "structured output",
            Capability::ImageIngestion => "image ingestion",
            Capability::FunctionCall => "tools",
            Capability::SystemMessage => "system messages",
            Capability::DeveloperMessage => "developer messages",
        };
        f.write_str(name)
    }
}

/// Feature support declared for a model family
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapabilityFlags {
    pub reasoning_effort: bool,
    pub structured_output: bool,
    pub image_ingestion: bool,
    pub function_call: bool,
    pub system_message: bool,
    pub developer_message: bool,
}

impl CapabilityFlags {
    pub fn supports(&self, capability: Capability) -> bool {
        match capability {
            Capability::ReasoningEffort => self.reasoning_effort,
            Capability::StructuredOutput => self.structured_output,
            Capability::ImageIngestion => self.image_ingestion,
            Capability::FunctionCall => self.function_call,
            Capability::SystemMessage => self.system_message,
            Capability::DeveloperMessage => self.developer_message,
        }
    }

    /// Neither system nor developer instructions are accepted
    pub fn is_user_only(&self) -> bool {
        !self.system_message && !self.developer_message
    }
}

/// Price per one million tokens for each token category
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingEntry {
    pub prompt_tokens: f64,
    pub cached_prompt_tokens: f64,
    pub output_tokens: f64,
}

impl PricingEntry {
    pub fn new(prompt_tokens: f64, cached_prompt_tokens: f64, output_tokens: f64) -> Self {
        Self {
            prompt_tokens,
            cached_prompt_tokens,
            output_tokens,
        }
    }

    pub fn is_free(&self) -> bool {
        self.prompt_tokens == 0.0 && self.cached_prompt_tokens == 0.0 && self.output_tokens == 0.0
    }
}

/// A model alias together with every versioned id it spans
#[derive(Debug, Clone, PartialEq)]
pub struct ModelDefinition {
    alias: String,
    provider: Provider,
    model_ids: Vec<String>,
    capabilities: CapabilityFlags,
    pricing: PricingEntry,
    most_recent_id: String,
}

impl ModelDefinition {
    pub(crate) fn new(
        alias: String,
        provider: Provider,
        model_ids: Vec<String>,
        capabilities: CapabilityFlags,
        pricing: PricingEntry,
        most_recent_id: String,
    ) -> Self {
        Self {
            alias,
            provider,
            model_ids,
            capabilities,
            pricing,
            most_recent_id,
        }
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn model_ids(&self) -> &[String] {
        &self.model_ids
    }

    pub fn capabilities(&self) -> &CapabilityFlags {
        &self.capabilities
    }

    pub fn pricing(&self) -> &PricingEntry {
        &self.pricing
    }

    pub fn most_recent_id(&self) -> &str {
        &self.most_recent_id
    }

    pub fn contains(&self, name: &str) -> bool {
        self.alias == name || self.model_ids.iter().any(|id| id == name)
    }
}

/// Result of resolving a caller-supplied model name
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedModel {
    /// Name exactly as the caller supplied it
    pub requested: String,
    pub alias: String,
    pub model_id: String,
    pub provider: Provider,
    pub capabilities: CapabilityFlags,
    pub pricing: PricingEntry,
}
