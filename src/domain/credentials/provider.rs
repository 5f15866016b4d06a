use std::fmt::Debug;

#[cfg(test)]
use mockall::automock;

use super::Credential;
use crate::domain::DomainError;
use crate::domain::model::Provider;

/// Source of provider credentials, read once when a client is built
#[cfg_attr(test, automock)]
pub trait CredentialProvider: Send + Sync + Debug {
    fn get_credential(&self, provider: Provider) -> Result<Credential, DomainError>;

    /// Name for logging
    fn provider_name(&self) -> &'static str;
}
