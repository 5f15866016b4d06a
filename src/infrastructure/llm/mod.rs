//! Provider request shaping and HTTP transports

mod anthropic;
mod factory;
mod http_client;
mod openai;
mod provider;

pub use anthropic::AnthropicAdapter;
pub use factory::{ReqwestTransportFactory, TransportFactory, TransportHandle, TransportMode};
pub use http_client::{
    BlockingHttpClient, BlockingHttpClientTrait, HttpClient, HttpClientTrait, TransportError,
};
pub use openai::OpenAiAdapter;
pub use provider::{ProviderAdapter, ProviderRequest};

#[cfg(test)]
pub use factory::MockTransportFactory;
#[cfg(test)]
pub use http_client::mock::{MockHttpClient, RecordedRequest};
