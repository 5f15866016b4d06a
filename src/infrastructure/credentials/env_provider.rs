use std::collections::HashMap;
use std::env;

use crate::domain::{Credential, CredentialProvider, DomainError, Provider};

/// Credential provider that reads API keys from environment variables
#[derive(Debug, Clone)]
pub struct EnvCredentialProvider {
    mappings: HashMap<Provider, String>,
}

impl EnvCredentialProvider {
    pub fn new() -> Self {
        Self {
            mappings: HashMap::new(),
        }
    }

    pub fn with_mapping(mut self, provider: Provider, api_key_var: impl Into<String>) -> Self {
        self.mappings.insert(provider, api_key_var.into());
        self
    }

    pub fn with_defaults(self) -> Self {
        self.with_mapping(Provider::OpenAi, "OPENAI_API_KEY")
            .with_mapping(Provider::Anthropic, "ANTHROPIC_API_KEY")
    }

    pub fn variable_for(&self, provider: Provider) -> Option<&str> {
        self.mappings.get(&provider).map(String::as_str)
    }
}

impl Default for EnvCredentialProvider {
    fn default() -> Self {
        Self::new().with_defaults()
    }
}

impl CredentialProvider for EnvCredentialProvider {
    fn get_credential(&self, provider: Provider) -> Result<Credential, DomainError> {
        let var = self.variable_for(provider).ok_or_else(|| {
            DomainError::credential(format!(
                "No environment mapping configured for provider: {}",
                provider
            ))
        })?;

        let api_key = env::var(var).map_err(|_| {
            DomainError::credential(format!(
                "Environment variable '{}' not set for provider: {}",
                var, provider
            ))
        })?;

        if api_key.trim().is_empty() {
            return Err(DomainError::credential(format!(
                "Environment variable '{}' is empty",
                var
            )));
        }

        Ok(Credential::new(provider, api_key))
    }

    fn provider_name(&self) -> &'static str {
        "env"
    }
}
