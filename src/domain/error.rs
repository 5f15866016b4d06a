use thiserror::Error;

use super::validation::CapabilityError;

/// Core domain errors
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Unknown model: '{model}' not found in available models")]
    UnknownModel { model: String },

    #[error("No messages provided to the model {model}")]
    NoMessagesProvided { model: String },

    #[error("Invalid message: {message}")]
    InvalidMessage { message: String },

    #[error(transparent)]
    Capability(#[from] CapabilityError),

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Credential error: {message}")]
    Credential { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Response completion error for model '{model}': {message}")]
    ResponseCompletion { model: String, message: String },

    #[error("Response parse error for model '{model}': {message}")]
    ResponseParse { model: String, message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DomainError {
    pub fn unknown_model(model: impl Into<String>) -> Self {
        Self::UnknownModel {
            model: model.into(),
        }
    }

    pub fn no_messages(model: impl Into<String>) -> Self {
        Self::NoMessagesProvided {
            model: model.into(),
        }
    }

    pub fn invalid_message(message: impl Into<String>) -> Self {
        Self::InvalidMessage {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn credential(message: impl Into<String>) -> Self {
        Self::Credential {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn response_completion(model: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ResponseCompletion {
            model: model.into(),
            message: message.into(),
        }
    }

    pub fn response_parse(model: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ResponseParse {
            model: model.into(),
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// True for errors raised before any provider call was attempted
    pub fn is_validation_failure(&self) -> bool {
        !matches!(
            self,
            Self::ResponseCompletion { .. } | Self::ResponseParse { .. } | Self::Internal { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_model_error() {
        let error = DomainError::unknown_model("gpt-9");
        assert_eq!(
            error.to_string(),
            "Unknown model: 'gpt-9' not found in available models"
        );
    }

    #[test]
    fn test_no_messages_error_names_model() {
        let error = DomainError::no_messages("o1-mini");
        assert_eq!(error.to_string(), "No messages provided to the model o1-mini");
    }

    #[test]
    fn test_validation_failure_classification() {
        assert!(DomainError::invalid_message("two system messages").is_validation_failure());
        assert!(DomainError::credential("missing key").is_validation_failure());
        assert!(!DomainError::response_completion("gpt-4o", "timeout").is_validation_failure());
        assert!(!DomainError::response_parse("gpt-4o", "bad json").is_validation_failure());
    }
}
