//! Infrastructure layer - provider transports, credentials, dispatch and logging

pub mod credentials;
pub mod dispatch;
pub mod llm;
pub mod logging;
