use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::domain::usage::{account, timed, timed_async};
use crate::domain::validation::{CapabilityGate, merge, validate_tools};
use crate::domain::{
    CallParameters, ChatResponse, ClientDefaults, Cost, CredentialProvider, DomainError,
    MergeFlags, MessageList, ModelRegistry, Provider, ReasoningEffort, ResolvedModel, RoleRewrite,
    RuntimeOverrides, StructuredOutputSchema, StructuredResponse, Tool, ToolChoice, Usage,
    UsageRequest, ValidatedCall, validate_call,
};
use crate::infrastructure::credentials::EnvCredentialProvider;
use crate::infrastructure::llm::{
    BlockingHttpClientTrait, HttpClientTrait, ProviderAdapter, ProviderRequest,
    ReqwestTransportFactory, TransportError, TransportFactory, TransportHandle, TransportMode,
};

/// Stage of a single call, traced at debug level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallPhase {
    Validating,
    Shaping,
    Executing,
    Verifying,
    Done,
}

impl fmt::Display for CallPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CallPhase::Validating => "validating",
            CallPhase::Shaping => "shaping",
            CallPhase::Executing => "executing",
            CallPhase::Verifying => "verifying",
            CallPhase::Done => "done",
        };
        f.write_str(name)
    }
}

/// Per-call input: overrides of the client defaults plus accounting switches
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub overrides: RuntimeOverrides,
    pub merge_flags: MergeFlags,
    pub return_usage: bool,
    pub return_cost: bool,
}

impl RunOptions {
    pub fn new(messages: impl Into<MessageList>) -> Self {
        Self::from_overrides(RuntimeOverrides::new(messages))
    }

    pub fn from_overrides(overrides: RuntimeOverrides) -> Self {
        Self {
            overrides,
            merge_flags: MergeFlags::new(),
            return_usage: true,
            return_cost: true,
        }
    }

    pub fn merge_flags(mut self, flags: MergeFlags) -> Self {
        self.merge_flags = flags;
        self
    }

    pub fn return_usage(mut self, enabled: bool) -> Self {
        self.return_usage = enabled;
        self
    }

    pub fn return_cost(mut self, enabled: bool) -> Self {
        self.return_cost = enabled;
        self
    }

    fn usage_request(&self) -> UsageRequest {
        UsageRequest {
            usage: self.return_usage,
            cost: self.return_cost,
        }
    }
}

/// Result of a call with the accounting the caller asked for
#[derive(Debug, Clone)]
pub struct CallOutcome<R> {
    pub response: R,
    pub usage: Option<Usage>,
    pub cost: Option<Cost>,
    pub role_rewrite: Option<RoleRewrite>,
}

struct PreparedCall {
    call: ValidatedCall,
    request: ProviderRequest,
    usage_request: UsageRequest,
}

impl PreparedCall {
    fn model(&self) -> &str {
        &self.call.params.model
    }
}

/// Builder for [`LlmClient`]
pub struct LlmClientBuilder {
    registry: Arc<ModelRegistry>,
    defaults: ClientDefaults,
    credentials: Option<Arc<dyn CredentialProvider>>,
    factory: Option<Arc<dyn TransportFactory>>,
    base_url: Option<String>,
    mode: TransportMode,
}

impl LlmClientBuilder {
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        Self {
            registry,
            defaults: ClientDefaults::default(),
            credentials: None,
            factory: None,
            base_url: None,
            mode: TransportMode::Async,
        }
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.defaults.model = model.into();
        self
    }

    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.defaults.user = Some(user.into());
        self
    }

    pub fn tools(mut self, tools: Vec<Tool>) -> Self {
        self.defaults.tools = Some(tools);
        self
    }

    pub fn tool_choice(mut self, choice: ToolChoice) -> Self {
        self.defaults.tool_choice = Some(choice);
        self
    }

    pub fn reasoning_effort(mut self, effort: ReasoningEffort) -> Self {
        self.defaults.reasoning_effort = Some(effort);
        self
    }

    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.defaults
            .metadata
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn credentials(mut self, credentials: Arc<dyn CredentialProvider>) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn transport_factory(mut self, factory: Arc<dyn TransportFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Mode the transport is first connected in
    pub fn mode(mut self, mode: TransportMode) -> Self {
        self.mode = mode;
        self
    }

    /// Resolve the default model, gate the client defaults and read the credential once.
    pub fn build(self) -> Result<LlmClient, DomainError> {
        if self.defaults.model.trim().is_empty() {
            return Err(DomainError::configuration("A default model is required"));
        }

        let model = self.registry.resolve(&self.defaults.model)?;

        let gate = CapabilityGate::new(&self.registry, &model);
        gate.check_reasoning_effort(self.defaults.reasoning_effort)?;
        gate.check_tools(self.defaults.tools.as_deref())?;
        if let Some(tools) = self.defaults.tools.as_deref() {
            validate_tools(tools)?;
        }

        let credentials = self
            .credentials
            .unwrap_or_else(|| Arc::new(EnvCredentialProvider::default()));
        let credential = credentials.get_credential(model.provider)?;
        debug!(
            provider = %model.provider,
            source = credentials.provider_name(),
            "Loaded provider credential"
        );

        let adapter =
            ProviderAdapter::new(model.provider, credential.api_key(), self.base_url.as_deref());
        let factory = self
            .factory
            .unwrap_or_else(|| Arc::new(ReqwestTransportFactory::default()));

        info!(
            model = %model.requested,
            model_id = %model.model_id,
            provider = %model.provider,
            mode = %self.mode,
            "LLM client ready"
        );

        Ok(LlmClient {
            registry: self.registry,
            defaults: self.defaults,
            model,
            adapter,
            factory,
            mode: self.mode,
            transport: None,
        })
    }
}

/// Uniform call surface for one provider: validates, shapes, executes and accounts calls
pub struct LlmClient {
    registry: Arc<ModelRegistry>,
    defaults: ClientDefaults,
    model: ResolvedModel,
    adapter: ProviderAdapter,
    factory: Arc<dyn TransportFactory>,
    mode: TransportMode,
    transport: Option<TransportHandle>,
}

impl LlmClient {
    pub fn builder(registry: Arc<ModelRegistry>) -> LlmClientBuilder {
        LlmClientBuilder::new(registry)
    }

    pub fn model(&self) -> &ResolvedModel {
        &self.model
    }

    pub fn provider(&self) -> Provider {
        self.adapter.provider()
    }

    pub fn defaults(&self) -> &ClientDefaults {
        &self.defaults
    }

    /// Current transport mode tag
    pub fn mode(&self) -> TransportMode {
        self.mode
    }

    /// Blocking call.
    ///
    /// # Panics
    ///
    /// With the reqwest transport this panics when called on an async runtime worker thread;
    /// call it from `tokio::task::spawn_blocking` or outside a runtime.
    pub fn run(&mut self, options: RunOptions) -> Result<CallOutcome<ChatResponse>, DomainError> {
        let prepared = self.prepare(options, None)?;
        let transport = self.blocking_transport()?;

        let (result, latency) = timed(|| execute_blocking(transport.as_ref(), &prepared));
        let response = self.verify_completion(&prepared, result)?;
        Ok(self.finish(prepared, response, latency))
    }

    pub async fn run_async(
        &mut self,
        options: RunOptions,
    ) -> Result<CallOutcome<ChatResponse>, DomainError> {
        let prepared = self.prepare(options, None)?;
        let transport = self.async_transport()?;

        let (result, latency) = timed_async(execute_async(transport.as_ref(), &prepared)).await;
        let response = self.verify_completion(&prepared, result)?;
        Ok(self.finish(prepared, response, latency))
    }

    /// Call with a schema derived from `T` and deserialize the payload into it.
    ///
    /// # Panics
    ///
    /// Same as [`LlmClient::run`]: must not be called on an async runtime worker thread.
    pub fn run_structured<T>(
        &mut self,
        options: RunOptions,
    ) -> Result<CallOutcome<StructuredResponse<T>>, DomainError>
    where
        T: DeserializeOwned + schemars::JsonSchema,
    {
        let schema = StructuredOutputSchema::for_type::<T>()?;
        let prepared = self.prepare(options, Some(schema))?;
        let transport = self.blocking_transport()?;

        let (result, latency) = timed(|| execute_blocking(transport.as_ref(), &prepared));
        let response = self.verify_structured::<T>(&prepared, result)?;
        Ok(self.finish(prepared, response, latency))
    }

    pub async fn run_structured_async<T>(
        &mut self,
        options: RunOptions,
    ) -> Result<CallOutcome<StructuredResponse<T>>, DomainError>
    where
        T: DeserializeOwned + schemars::JsonSchema,
    {
        let schema = StructuredOutputSchema::for_type::<T>()?;
        let prepared = self.prepare(options, Some(schema))?;
        let transport = self.async_transport()?;

        let (result, latency) = timed_async(execute_async(transport.as_ref(), &prepared)).await;
        let response = self.verify_structured::<T>(&prepared, result)?;
        Ok(self.finish(prepared, response, latency))
    }

    /// Connect a transport in `mode`, replacing the current one when the tag differs.
    ///
    /// A replaced blocking transport is dropped on the blocking pool when called from
    /// inside a tokio runtime.
    pub fn ensure_mode(&mut self, mode: TransportMode) -> Result<&TransportHandle, DomainError> {
        let current = self.transport.as_ref().map(TransportHandle::mode);

        if current != Some(mode) {
            match current {
                Some(from) => info!(from = %from, to = %mode, "Switching transport mode"),
                None => debug!(mode = %mode, "Connecting transport"),
            }

            let handle = self.factory.connect(mode)?;
            if handle.mode() != mode {
                return Err(DomainError::internal(format!(
                    "Transport factory returned a {} transport for a {} request",
                    handle.mode(),
                    mode
                )));
            }

            if let Some(previous) = self.transport.replace(handle) {
                release_transport(previous);
            }
            self.mode = mode;
        }

        self.transport
            .as_ref()
            .ok_or_else(|| DomainError::internal("Transport not connected"))
    }

    fn blocking_transport(&mut self) -> Result<Arc<dyn BlockingHttpClientTrait>, DomainError> {
        match self.ensure_mode(TransportMode::Blocking)? {
            TransportHandle::Blocking(client) => Ok(Arc::clone(client)),
            TransportHandle::Async(_) => Err(DomainError::internal("Expected a blocking transport")),
        }
    }

    fn async_transport(&mut self) -> Result<Arc<dyn HttpClientTrait>, DomainError> {
        match self.ensure_mode(TransportMode::Async)? {
            TransportHandle::Async(client) => Ok(Arc::clone(client)),
            TransportHandle::Blocking(_) => Err(DomainError::internal("Expected an async transport")),
        }
    }

    fn prepare(
        &self,
        options: RunOptions,
        structured: Option<StructuredOutputSchema>,
    ) -> Result<PreparedCall, DomainError> {
        let usage_request = options.usage_request();
        let RunOptions {
            mut overrides,
            merge_flags,
            ..
        } = options;

        if let Some(schema) = structured {
            overrides.structured_output_schema = Some(schema);
        }

        let params: CallParameters = merge(&self.defaults, overrides, &merge_flags);
        trace_phase(&params.model, CallPhase::Validating);

        let call = validate_call(&self.registry, params)?;
        if call.model.provider != self.adapter.provider() {
            return Err(DomainError::configuration(format!(
                "Model '{}' is served by {} but this client is configured for {}",
                call.params.model,
                call.model.provider,
                self.adapter.provider()
            )));
        }

        trace_phase(&call.params.model, CallPhase::Shaping);
        let request = self.adapter.build_request(&call.model.model_id, &call.params);

        trace_phase(&call.params.model, CallPhase::Executing);
        Ok(PreparedCall {
            call,
            request,
            usage_request,
        })
    }

    fn parse(
        &self,
        prepared: &PreparedCall,
        result: Result<Value, TransportError>,
    ) -> Result<ChatResponse, DomainError> {
        let model = prepared.model();
        let body = result.map_err(|e| {
            warn!(model = %model, error = %e, "Provider call failed");
            DomainError::response_completion(model, e.to_string())
        })?;

        trace_phase(model, CallPhase::Verifying);
        self.adapter
            .parse_response(body, prepared.call.params.structured_output_schema.as_ref())
            .map_err(|e| DomainError::response_completion(model, e.to_string()))
    }

    fn verify_completion(
        &self,
        prepared: &PreparedCall,
        result: Result<Value, TransportError>,
    ) -> Result<ChatResponse, DomainError> {
        let response = self.parse(prepared, result)?;
        let model = prepared.model();

        let choice = response
            .first_choice()
            .ok_or_else(|| DomainError::response_completion(model, "No choices in response"))?;
        if !choice.has_content() {
            return Err(DomainError::response_completion(
                model,
                "Response contained no content",
            ));
        }

        Ok(response)
    }

    fn verify_structured<T: DeserializeOwned>(
        &self,
        prepared: &PreparedCall,
        result: Result<Value, TransportError>,
    ) -> Result<StructuredResponse<T>, DomainError> {
        let response = self.parse(prepared, result)?;
        let model = prepared.model();
        let schema = prepared
            .call
            .params
            .structured_output_schema
            .as_ref()
            .ok_or_else(|| DomainError::internal("Structured call without a schema"))?;

        let choice = response
            .first_choice()
            .ok_or_else(|| DomainError::response_parse(model, "No choices in response"))?;
        let payload = choice.structured.clone().ok_or_else(|| {
            DomainError::response_parse(model, "Response carried no structured payload")
        })?;

        let validator = jsonschema::validator_for(&schema.schema)
            .map_err(|e| DomainError::response_parse(model, e.to_string()))?;
        let violations: Vec<String> = validator
            .iter_errors(&payload)
            .map(|e| e.to_string())
            .collect();
        if !violations.is_empty() {
            return Err(DomainError::response_parse(
                model,
                format!(
                    "Payload does not match schema '{}': {}",
                    schema.name,
                    violations.join("; ")
                ),
            ));
        }

        let parsed = serde_json::from_value::<T>(payload.clone())
            .map_err(|e| DomainError::response_parse(model, e.to_string()))?;

        Ok(StructuredResponse {
            parsed,
            payload,
            response,
        })
    }

    fn finish<R>(&self, prepared: PreparedCall, response: R, latency: Duration) -> CallOutcome<R>
    where
        R: AsRef<ChatResponse>,
    {
        let (usage, cost) = account(
            prepared.model(),
            &response.as_ref().token_counts,
            latency,
            Some(&prepared.call.model.pricing),
            prepared.usage_request,
        );
        trace_phase(prepared.model(), CallPhase::Done);

        CallOutcome {
            response,
            usage,
            cost,
            role_rewrite: prepared.call.rewrite,
        }
    }
}

impl fmt::Debug for LlmClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmClient")
            .field("model", &self.model.requested)
            .field("model_id", &self.model.model_id)
            .field("provider", &self.adapter.provider())
            .field("mode", &self.mode)
            .field("connected", &self.transport.is_some())
            .finish()
    }
}

impl Drop for LlmClient {
    fn drop(&mut self) {
        if let Some(handle) = self.transport.take() {
            release_transport(handle);
        }
    }
}

fn trace_phase(model: &str, phase: CallPhase) {
    debug!(model = %model, phase = %phase, "Call phase");
}

fn execute_blocking(
    transport: &dyn BlockingHttpClientTrait,
    prepared: &PreparedCall,
) -> Result<Value, TransportError> {
    let request = &prepared.request;
    transport.post_json(&request.url, request.header_pairs(), &request.body)
}

async fn execute_async(
    transport: &dyn HttpClientTrait,
    prepared: &PreparedCall,
) -> Result<Value, TransportError> {
    let request = &prepared.request;
    transport
        .post_json(&request.url, request.header_pairs(), &request.body)
        .await
}

/// Blocking reqwest clients own a runtime and must not be dropped on an async worker
fn release_transport(handle: TransportHandle) {
    if let TransportHandle::Blocking(client) = handle {
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            runtime.spawn_blocking(move || drop(client));
        }
    }
}
