//! Domain layer - models, validation and accounting, free of I/O

pub mod credentials;
pub mod error;
pub mod llm;
pub mod model;
pub mod usage;
pub mod validation;

pub use credentials::{Credential, CredentialProvider};
pub use error::DomainError;
pub use llm::{
    CallParameters, ChatResponse, Choice, ContentPart, FinishReason, ImageDetail, Message,
    MessageContent, MessageList, MessageRole, ReasoningEffort, StructuredOutputSchema,
    StructuredResponse, TokenCounts, Tool, ToolCall, ToolChoice,
};
pub use model::{
    Capability, CapabilityFlags, ModelDefinition, ModelRegistry, PricingEntry, Provider,
    ResolvedModel,
};
pub use usage::{Cost, Usage, UsageRequest};
pub use validation::{
    CapabilityError, ClientDefaults, MergeFlags, RoleRewrite, RuntimeOverrides, ValidatedCall,
    validate_call,
};
