use std::fmt::{self, Debug};
use std::sync::Arc;
use std::time::Duration;

#[cfg(test)]
use mockall::automock;
use tracing::debug;

use super::http_client::{
    BlockingHttpClient, BlockingHttpClientTrait, HttpClient, HttpClientTrait,
};
use crate::domain::DomainError;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Whether a client's transport performs blocking or async I/O
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportMode {
    Blocking,
    Async,
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportMode::Blocking => f.write_str("blocking"),
            TransportMode::Async => f.write_str("async"),
        }
    }
}

/// A connected HTTP transport in one mode
#[derive(Debug, Clone)]
pub enum TransportHandle {
    Blocking(Arc<dyn BlockingHttpClientTrait>),
    Async(Arc<dyn HttpClientTrait>),
}

impl TransportHandle {
    pub fn mode(&self) -> TransportMode {
        match self {
            TransportHandle::Blocking(_) => TransportMode::Blocking,
            TransportHandle::Async(_) => TransportMode::Async,
        }
    }
}

/// Creates transports on demand; invoked again whenever a client switches mode
#[cfg_attr(test, automock)]
pub trait TransportFactory: Send + Sync + Debug {
    fn connect(&self, mode: TransportMode) -> Result<TransportHandle, DomainError>;
}

/// Factory for reqwest-backed transports
#[derive(Debug, Clone)]
pub struct ReqwestTransportFactory {
    timeout: Duration,
}

impl ReqwestTransportFactory {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for ReqwestTransportFactory {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl TransportFactory for ReqwestTransportFactory {
    fn connect(&self, mode: TransportMode) -> Result<TransportHandle, DomainError> {
        debug!(mode = %mode, timeout_secs = self.timeout.as_secs(), "Creating HTTP transport");

        let handle = match mode {
            TransportMode::Blocking => {
                let client = BlockingHttpClient::with_timeout(self.timeout)
                    .map_err(|e| DomainError::configuration(e.to_string()))?;
                TransportHandle::Blocking(Arc::new(client))
            }
            TransportMode::Async => {
                let client = HttpClient::with_timeout(self.timeout)
                    .map_err(|e| DomainError::configuration(e.to_string()))?;
                TransportHandle::Async(Arc::new(client))
            }
        };

        Ok(handle)
    }
}
