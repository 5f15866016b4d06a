//! Provider-agnostic call, message and response types

mod message;
mod request;
mod response;

pub use message::{ContentPart, ImageDetail, Message, MessageContent, MessageList, MessageRole};
pub use request::{
    CallParameters, CallParametersBuilder, ReasoningEffort, StructuredOutputSchema, Tool,
    ToolChoice,
};
pub use response::{
    ChatResponse, Choice, FinishReason, StructuredResponse, TokenCounts, ToolCall,
};
