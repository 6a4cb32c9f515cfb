//! Gateway: one typed RPC operation with schema negotiation
//!
//! Each call walks an explicit state machine:
//!
//! ```text
//! Idle ─▶ Sent ─┬────────────────────▶ Decoding ─▶ Done
//!               └─▶ AwaitingSchema ─▶─┘
//! any non-terminal state ─▶ Failed
//! ```
//!
//! A response framed with an unknown fingerprint costs one schema fetch.
//! The fetched schema goes into the shared cache, so later calls with the
//! same fingerprint skip it, whichever gateway made them.

use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use reqwest::Url;
use serde_json::Value as Json;
use tokio::time::{sleep, timeout};

use super::config::GatewayConfig;
use super::errors::{GatewayError, GatewayResult};
use super::transport::{HttpTransport, Transport, TransportRequest, TransportResponse};
use crate::codec::{from_json, AvroRecord, CodecError, JsonStyle, Value};
use crate::envelope::{
    decode_payload, encode_message, ContentKind, WireEnvelope, ACCEPT_HEADER_VALUE, APPLICATION_JSON, AVRO_BINARY,
    SCHEMA_LOCATION_HEADER,
};
use crate::fingerprint::{Fingerprint, SchemaCache};
use crate::observability::{Event, Logger};
use crate::schema::{parse_schema, parse_schema_json, SchemaNode};

/// Status and error code the server answers with when it does not know
/// the request schema
const UNKNOWN_SCHEMA_STATUS: u16 = 409;
const UNKNOWN_SCHEMA_CODE: &str = "AVRO_UNKNOWN_SCHEMA";

/// States of one call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    Idle,
    Sent,
    AwaitingSchema,
    Decoding,
    Done,
    Failed,
}

impl CallState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallState::Idle => "Idle",
            CallState::Sent => "Sent",
            CallState::AwaitingSchema => "AwaitingSchema",
            CallState::Decoding => "Decoding",
            CallState::Done => "Done",
            CallState::Failed => "Failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, CallState::Done | CallState::Failed)
    }

    pub fn can_transition_to(&self, next: CallState) -> bool {
        use CallState::*;
        match (self, next) {
            (Idle, Sent) | (Sent, Decoding) | (Sent, AwaitingSchema) | (AwaitingSchema, Decoding) | (Decoding, Done) => {
                true
            }
            (state, Failed) => !state.is_terminal(),
            _ => false,
        }
    }
}

/// States visited by one call, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallTrace {
    states: Vec<CallState>,
}

impl CallTrace {
    fn new() -> Self {
        Self {
            states: vec![CallState::Idle],
        }
    }

    pub fn current(&self) -> CallState {
        self.states.last().copied().unwrap_or(CallState::Idle)
    }

    pub fn states(&self) -> &[CallState] {
        &self.states
    }

    fn advance(&mut self, next: CallState) {
        debug_assert!(
            self.current().can_transition_to(next),
            "illegal call transition {} -> {}",
            self.current().as_str(),
            next.as_str()
        );
        self.states.push(next);
    }
}

/// Typed client for one operation
pub struct Gateway<Req, Resp, T = HttpTransport> {
    config: GatewayConfig,
    transport: T,
    cache: Arc<SchemaCache>,
    request_schema: SchemaNode,
    response_schema: SchemaNode,
    schema_fetches: AtomicU64,
    _types: PhantomData<fn(Req) -> Resp>,
}

impl<Req: AvroRecord, Resp: AvroRecord> Gateway<Req, Resp, HttpTransport> {
    /// Gateway over HTTP
    pub fn new(config: GatewayConfig, cache: Arc<SchemaCache>) -> GatewayResult<Self> {
        Self::with_transport(config, HttpTransport::new()?, cache)
    }
}

impl<Req: AvroRecord, Resp: AvroRecord, T: Transport> Gateway<Req, Resp, T> {
    /// Derive both schemas and register them in `cache`
    pub fn with_transport(config: GatewayConfig, transport: T, cache: Arc<SchemaCache>) -> GatewayResult<Self> {
        config.validate()?;
        let request_schema = Req::schema()?;
        let response_schema = Resp::schema()?;
        cache.register(request_schema.clone())?;
        cache.register(response_schema.clone())?;

        Ok(Self {
            config,
            transport,
            cache,
            request_schema,
            response_schema,
            schema_fetches: AtomicU64::new(0),
            _types: PhantomData,
        })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn request_schema(&self) -> &SchemaNode {
        &self.request_schema
    }

    pub fn response_schema(&self) -> &SchemaNode {
        &self.response_schema
    }

    /// Schema-exchange fetches made by this gateway
    pub fn schema_fetches(&self) -> u64 {
        self.schema_fetches.load(Ordering::Relaxed)
    }

    /// Call the operation; `None` sends no body
    pub async fn call(&self, request: Option<&Req>) -> GatewayResult<Resp> {
        self.traced(request.map(Req::to_value), |value| Ok(Resp::from_value(value)?))
            .await
            .0
    }

    pub async fn call_value(&self, request: Option<Value>) -> GatewayResult<Value> {
        self.call_traced(request).await.0
    }

    /// Call and also report every state the call went through
    pub async fn call_traced(&self, request: Option<Value>) -> (GatewayResult<Value>, CallTrace) {
        self.traced(request, Ok).await
    }

    /// Run one call; `convert` turns the decoded value into the result
    /// before the call counts as done
    async fn traced<O, F>(&self, request: Option<Value>, convert: F) -> (GatewayResult<O>, CallTrace)
    where
        F: FnOnce(Value) -> GatewayResult<O>,
    {
        let mut trace = CallTrace::new();
        self.cache.metrics().increment_gateway_calls();

        let result = self.run(request, &mut trace).await.and_then(convert);
        match &result {
            Ok(_) => trace.advance(CallState::Done),
            Err(err) => {
                let state = trace.current();
                trace.advance(CallState::Failed);
                self.cache.metrics().increment_gateway_failures();
                Logger::error(
                    Event::GatewayCallFailed,
                    &[
                        ("code", err.code()),
                        ("endpoint", &self.config.endpoint),
                        ("error", &err.to_string()),
                        ("state", state.as_str()),
                    ],
                );
            }
        }
        (result, trace)
    }

    async fn run(&self, request: Option<Value>, trace: &mut CallTrace) -> GatewayResult<Value> {
        let body = match request {
            Some(value) => {
                let bytes = encode_message(&value, &self.request_schema)?;
                self.cache.metrics().increment_messages_encoded();
                Some(bytes)
            }
            None => None,
        };

        trace.advance(CallState::Sent);
        let response = self.exchange(body.as_deref()).await?;

        let content_type = response.content_type().unwrap_or_default().to_string();
        match ContentKind::from_content_type(&content_type) {
            Some(ContentKind::AvroBinary) => {
                let envelope = WireEnvelope::parse(&response.body)?;
                let writer = match self.cache.resolve(&envelope.fingerprint)? {
                    Some(schema) => schema,
                    None => {
                        trace.advance(CallState::AwaitingSchema);
                        self.fetch_schema(envelope.fingerprint, response.header(SCHEMA_LOCATION_HEADER))
                            .await?
                    }
                };
                trace.advance(CallState::Decoding);
                let value = decode_payload(envelope.payload, &writer, &self.response_schema)?;
                self.cache.metrics().increment_messages_decoded();
                Ok(value)
            }
            Some(ContentKind::Json) => {
                trace.advance(CallState::Decoding);
                let json: Json = serde_json::from_slice(&response.body)
                    .map_err(|e| CodecError::decode("response", e.to_string()))?;
                Ok(from_json(&json, &self.response_schema, JsonStyle::Plain)?)
            }
            None => Err(GatewayError::UnexpectedContentType { content_type }),
        }
    }

    /// Post the request with retries; a 409 registers the request schema
    /// with the peer and is retried once without consuming an attempt.
    async fn exchange(&self, body: Option<&[u8]>) -> GatewayResult<TransportResponse> {
        let mut attempt = 1;
        let mut registered = false;
        loop {
            let mut request = TransportRequest::post(&self.config.endpoint, body.map(<[u8]>::to_vec).unwrap_or_default())
                .header("accept", ACCEPT_HEADER_VALUE);
            if body.is_some() {
                request = request.header("content-type", AVRO_BINARY);
            }

            let error = match self.send(request).await {
                Ok(response) if response.is_success() => return Ok(response),
                Ok(response) if body.is_some() && !registered && is_unknown_schema(&response) => {
                    self.register_request_schema().await?;
                    registered = true;
                    continue;
                }
                Ok(response) => remote_error(&response),
                Err(err) => err,
            };

            if !error.is_retryable() || attempt >= self.config.attempts {
                return Err(error);
            }
            let delay = self.config.backoff(attempt);
            self.cache.metrics().increment_gateway_retries();
            Logger::warn(
                Event::GatewayRetry,
                &[
                    ("attempt", &attempt.to_string()),
                    ("delay_ms", &delay.as_millis().to_string()),
                    ("endpoint", &self.config.endpoint),
                    ("error", &error.to_string()),
                ],
            );
            sleep(delay).await;
            attempt += 1;
        }
    }

    async fn send(&self, request: TransportRequest) -> GatewayResult<TransportResponse> {
        let url = request.url.clone();
        match timeout(self.config.timeout(), self.transport.send(request)).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout {
                url,
                timeout_ms: self.config.timeout_ms,
            }),
        }
    }

    /// Resolve a writer schema from the peer and cache it
    async fn fetch_schema(&self, fingerprint: Fingerprint, hint: Option<&str>) -> GatewayResult<Arc<SchemaNode>> {
        let url = match hint {
            // relative hints resolve against the operation endpoint
            Some(location) => Url::parse(&self.config.endpoint)
                .and_then(|base| base.join(location))
                .map(|url| url.to_string())
                .unwrap_or_else(|_| location.to_string()),
            None => format!("{}/{}", self.config.schema_endpoint(), fingerprint.to_hex()),
        };
        self.schema_fetches.fetch_add(1, Ordering::Relaxed);
        self.cache.metrics().increment_schema_fetches();

        match self.fetch_schema_from(fingerprint, &url).await {
            Ok(schema) => {
                let schema = self.cache.insert(fingerprint, schema)?;
                Logger::info(Event::SchemaFetch, &[("fingerprint", &fingerprint.to_hex()), ("url", &url)]);
                Ok(schema)
            }
            Err(err) => {
                self.cache.metrics().increment_schema_fetch_failures();
                Logger::warn(
                    Event::SchemaFetchFailed,
                    &[
                        ("error", &err.to_string()),
                        ("fingerprint", &fingerprint.to_hex()),
                        ("url", &url),
                    ],
                );
                Err(err)
            }
        }
    }

    async fn fetch_schema_from(&self, fingerprint: Fingerprint, url: &str) -> GatewayResult<SchemaNode> {
        let request = TransportRequest::get(url).header("accept", APPLICATION_JSON);
        let response = self
            .send(request)
            .await
            .map_err(|e| GatewayError::unresolvable(fingerprint, e.to_string()))?;

        if !response.is_success() {
            return Err(GatewayError::unresolvable(
                fingerprint,
                format!("schema exchange answered {}", response.status),
            ));
        }

        let body: Json = serde_json::from_slice(&response.body)
            .map_err(|e| GatewayError::unresolvable(fingerprint, format!("malformed schema response: {}", e)))?;
        let schema = match body.get("schema") {
            Some(Json::String(text)) => parse_schema(text),
            Some(json) => parse_schema_json(json),
            None => parse_schema_json(&body),
        }
        .map_err(|e| GatewayError::unresolvable(fingerprint, e.to_string()))?;

        let actual = Fingerprint::of(&schema);
        if actual != fingerprint {
            return Err(GatewayError::unresolvable(
                fingerprint,
                format!("peer returned a schema with fingerprint {}", actual),
            ));
        }
        Ok(schema)
    }

    /// Tell the peer about the local request schema
    async fn register_request_schema(&self) -> GatewayResult<()> {
        let url = self.config.schema_endpoint();
        let body = self.request_schema.to_json()?.to_string().into_bytes();
        let request = TransportRequest::post(&url, body)
            .header("content-type", APPLICATION_JSON)
            .header("accept", APPLICATION_JSON);

        let response = self.send(request).await?;
        if !response.is_success() {
            return Err(remote_error(&response));
        }

        let expected = Fingerprint::of(&self.request_schema);
        let registered = serde_json::from_slice::<Json>(&response.body)
            .ok()
            .and_then(|json| json.get("fingerprint").and_then(Json::as_str).map(str::to_string));
        if registered.as_deref() != Some(expected.to_hex().as_str()) {
            return Err(GatewayError::Remote {
                status: response.status,
                message: format!("schema registration did not acknowledge {}", expected),
            });
        }

        self.cache.metrics().increment_schema_registrations();
        Logger::info(
            Event::SchemaRegistered,
            &[("fingerprint", &expected.to_hex()), ("url", &url)],
        );
        Ok(())
    }
}

/// A 409 whose body says the request schema is unknown; other conflicts are
/// ordinary remote errors
fn is_unknown_schema(response: &TransportResponse) -> bool {
    response.status == UNKNOWN_SCHEMA_STATUS
        && serde_json::from_slice::<Json>(&response.body)
            .ok()
            .is_some_and(|json| json.get("code").and_then(Json::as_str) == Some(UNKNOWN_SCHEMA_CODE))
}

/// Error for a non-success response, using the peer's message when it sent one
fn remote_error(response: &TransportResponse) -> GatewayError {
    let message = serde_json::from_slice::<Json>(&response.body)
        .ok()
        .and_then(|json| json.get("error").and_then(Json::as_str).map(str::to_string))
        .unwrap_or_else(|| String::from_utf8_lossy(&response.body).into_owned());
    GatewayError::Remote {
        status: response.status,
        message,
    }
}
