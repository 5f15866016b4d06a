use std::fmt;

use crate::domain::model::Provider;

/// API key for one provider
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    provider: Provider,
    api_key: String,
}

impl Credential {
    pub fn new(provider: Provider, api_key: impl Into<String>) -> Self {
        Self {
            provider,
            api_key: api_key.into(),
        }
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("provider", &self.provider)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_creation() {
        let cred = Credential::new(Provider::OpenAi, "sk-test-key");
        assert_eq!(cred.provider(), Provider::OpenAi);
        assert_eq!(cred.api_key(), "sk-test-key");
    }

    #[test]
    fn test_debug_redacts_key() {
        let cred = Credential::new(Provider::Anthropic, "sk-ant-secret");
        let debug = format!("{:?}", cred);
        assert!(!debug.contains("sk-ant-secret"));
        assert!(debug.contains("redacted"));
    }
}
