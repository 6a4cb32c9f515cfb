//! Avro operation routes
//!
//! Glue between an axum POST route and an operation handler:
//!
//! - `avro/binary` request bodies are decoded with the writer schema named
//!   by their fingerprint. An unknown fingerprint is answered with
//!   409 `AVRO_UNKNOWN_SCHEMA`, and the caller registers its schema and
//!   retries.
//! - `application/json` request bodies go through the JSON bridge.
//! - Responses are framed binary when `accept` allows `avro/binary`, with
//!   an `avro-schema-location` header naming the response schema;
//!   otherwise JSON.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use axum::{
    body::Bytes,
    http::{
        header::{ACCEPT, CONTENT_TYPE},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
    routing::{post, MethodRouter},
    Json,
};

use super::errors::{ApiError, ApiResult};
use super::exchange::SchemaExchange;
use crate::codec::{from_json, to_json, AvroRecord, CodecError, JsonStyle, Value};
use crate::envelope::{
    accepts_avro, decode_payload, encode_message, ContentKind, WireEnvelope, APPLICATION_JSON, AVRO_BINARY,
    SCHEMA_LOCATION_HEADER,
};
use crate::fingerprint::Fingerprint;
use crate::observability::{Event, Logger};
use crate::schema::SchemaNode;

type HandlerFuture = Pin<Box<dyn Future<Output = ApiResult<Value>> + Send>>;
type ValueHandler = Arc<dyn Fn(Value) -> HandlerFuture + Send + Sync>;

struct AvroOperation {
    name: String,
    exchange: Arc<SchemaExchange>,
    /// Reader schema of the request; `None` for operations without a body
    request: Option<SchemaNode>,
    response: SchemaNode,
    response_fp: Fingerprint,
    handler: ValueHandler,
}

/// Route for a typed operation
pub fn avro_route<Req, Resp, H, Fut>(
    exchange: Arc<SchemaExchange>,
    operation: &str,
    handler: H,
) -> ApiResult<MethodRouter>
where
    Req: AvroRecord + Send + 'static,
    Resp: AvroRecord + Send + 'static,
    H: Fn(Req) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = ApiResult<Resp>> + Send + 'static,
{
    let request = Req::schema()?;
    let response = Resp::schema()?;
    avro_value_route(exchange, operation, Some(request), response, move |value: Value| {
        let handler = handler.clone();
        async move {
            let request = Req::from_value(value)?;
            let response = handler(request).await?;
            Ok(response.to_value())
        }
    })
}

/// Route for an operation working on [`Value`]s directly
pub fn avro_value_route<H, Fut>(
    exchange: Arc<SchemaExchange>,
    operation: &str,
    request: Option<SchemaNode>,
    response: SchemaNode,
    handler: H,
) -> ApiResult<MethodRouter>
where
    H: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ApiResult<Value>> + Send + 'static,
{
    let schemas = exchange.register_operation(operation, request.clone(), response.clone())?;
    let handler: ValueHandler = Arc::new(move |value: Value| Box::pin(handler(value)) as HandlerFuture);
    let op = Arc::new(AvroOperation {
        name: operation.to_string(),
        exchange,
        request,
        response,
        response_fp: schemas.response.fingerprint,
        handler,
    });

    Ok(post(move |headers: HeaderMap, body: Bytes| {
        let op = Arc::clone(&op);
        async move { op.handle(headers, body).await }
    }))
}

impl AvroOperation {
    async fn handle(&self, headers: HeaderMap, body: Bytes) -> Response {
        let metrics = self.exchange.cache().metrics();
        metrics.increment_avro_requests();

        match self.respond(&headers, &body).await {
            Ok(response) => response,
            Err(err) => {
                if let ApiError::Codec(_) = err {
                    metrics.increment_decode_failures();
                }
                if err.status_code().is_client_error() {
                    metrics.increment_avro_rejections();
                    Logger::warn(
                        Event::AvroRequestRejected,
                        &[
                            ("code", err.code()),
                            ("error", &err.to_string()),
                            ("operation", &self.name),
                        ],
                    );
                }
                err.into_response()
            }
        }
    }

    async fn respond(&self, headers: &HeaderMap, body: &[u8]) -> ApiResult<Response> {
        let request = self.read_request(headers, body)?;
        let result = (self.handler)(request).await?;
        self.write_response(headers, &result)
    }

    fn read_request(&self, headers: &HeaderMap, body: &[u8]) -> ApiResult<Value> {
        let Some(schema) = &self.request else {
            return Ok(Value::Null);
        };
        if body.is_empty() {
            return Ok(Value::Record(Vec::new()));
        }

        let content_type = header_str(headers, CONTENT_TYPE.as_str()).unwrap_or(APPLICATION_JSON);
        match ContentKind::from_content_type(content_type) {
            Some(ContentKind::AvroBinary) => {
                let envelope = WireEnvelope::parse(body)?;
                let writer = self
                    .exchange
                    .cache()
                    .resolve(&envelope.fingerprint)?
                    .ok_or(ApiError::UnknownSchema(envelope.fingerprint))?;
                let value = decode_payload(envelope.payload, &writer, schema)?;
                self.exchange.cache().metrics().increment_messages_decoded();
                Ok(value)
            }
            Some(ContentKind::Json) => {
                let json: serde_json::Value = serde_json::from_slice(body)
                    .map_err(|e| ApiError::BadRequest(format!("malformed JSON body: {}", e)))?;
                Ok(from_json(&json, schema, JsonStyle::Plain)?)
            }
            None => Err(ApiError::UnsupportedMediaType(content_type.to_string())),
        }
    }

    fn write_response(&self, headers: &HeaderMap, result: &Value) -> ApiResult<Response> {
        let accept = header_str(headers, ACCEPT.as_str()).unwrap_or_default();
        if accepts_avro(accept) {
            let bytes = encode_message(result, &self.response).map_err(response_error)?;
            self.exchange.cache().metrics().increment_messages_encoded();

            let mut response = (StatusCode::OK, bytes).into_response();
            let response_headers = response.headers_mut();
            response_headers.insert(CONTENT_TYPE, HeaderValue::from_static(AVRO_BINARY));
            if let Ok(location) = HeaderValue::from_str(&format!("/schemas/{}", self.response_fp)) {
                response_headers.insert(SCHEMA_LOCATION_HEADER, location);
            }
            Ok(response)
        } else {
            let json = to_json(result, &self.response, JsonStyle::Plain).map_err(response_error)?;
            Ok((StatusCode::OK, Json(json)).into_response())
        }
    }
}

/// A handler result that does not fit its own response schema is a server fault
fn response_error(err: CodecError) -> ApiError {
    ApiError::Internal(format!("response does not match its schema: {}", err))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use axum::Router;
    use tower::ServiceExt;

    use super::*;
    use crate::codec::RecordFields;
    use crate::envelope::{decode_message, frame};
    use crate::fingerprint::SchemaCache;
    use crate::observability::Severity;
    use crate::schema::{FieldDef, RecordDef, TypeDef};

    #[derive(Debug, Clone, PartialEq)]
    struct Greeting {
        name: String,
    }

    impl AvroRecord for Greeting {
        fn record_def() -> RecordDef {
            RecordDef::new("Greeting", vec![FieldDef::required("name", TypeDef::Text)])
        }

        fn to_value(&self) -> Value {
            Value::record([("name", Value::from(self.name.clone()))])
        }

        fn from_value(value: Value) -> crate::codec::CodecResult<Self> {
            let mut fields = RecordFields::new(value, "Greeting")?;
            Ok(Self { name: fields.take("name")? })
        }
    }

    fn app() -> (Router, Arc<SchemaExchange>) {
        Logger::set_min_severity(Severity::Fatal);
        let exchange = Arc::new(SchemaExchange::new(Arc::new(SchemaCache::new())));
        let route = avro_route(Arc::clone(&exchange), "greet", |g: Greeting| async move {
            Ok(Greeting {
                name: format!("hello {}", g.name),
            })
        })
        .unwrap();
        (Router::new().route("/operations/greet", route), exchange)
    }

    fn greeting(name: &str) -> Value {
        Greeting { name: name.into() }.to_value()
    }

    #[tokio::test]
    async fn test_binary_in_binary_out() {
        let (app, exchange) = app();
        let schema = Greeting::schema().unwrap();
        let body = encode_message(&greeting("ada"), &schema).unwrap();

        let response = app
            .oneshot(
                Request::post("/operations/greet")
                    .header(CONTENT_TYPE, AVRO_BINARY)
                    .header(ACCEPT, "avro/binary, application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], AVRO_BINARY);
        let fp = Fingerprint::of(&schema);
        assert_eq!(response.headers()[SCHEMA_LOCATION_HEADER], format!("/schemas/{}", fp).as_str());

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = decode_message(&bytes, &schema, &schema).unwrap();
        assert_eq!(value, greeting("hello ada"));
        assert_eq!(exchange.cache().metrics().snapshot().messages_decoded, 1);
    }

    #[tokio::test]
    async fn test_json_in_json_out() {
        let (app, _) = app();
        let response = app
            .oneshot(
                Request::post("/operations/greet")
                    .header(CONTENT_TYPE, APPLICATION_JSON)
                    .body(Body::from(r#"{"name":"ada"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["name"], "hello ada");
    }

    #[tokio::test]
    async fn test_unknown_request_fingerprint_is_409() {
        let (app, exchange) = app();
        let body = frame(Fingerprint::from_u64(77), &[0]);
        let response = app
            .oneshot(
                Request::post("/operations/greet")
                    .header(CONTENT_TYPE, AVRO_BINARY)
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["code"], "AVRO_UNKNOWN_SCHEMA");
        assert_eq!(json["status"], 409);
        assert_eq!(exchange.cache().metrics().snapshot().avro_rejections, 1);
    }

    #[tokio::test]
    async fn test_truncated_body_is_400() {
        let (app, _) = app();
        let schema = Greeting::schema().unwrap();
        let mut body = encode_message(&greeting("ada"), &schema).unwrap();
        body.truncate(body.len() - 1);
        let response = app
            .oneshot(
                Request::post("/operations/greet")
                    .header(CONTENT_TYPE, AVRO_BINARY)
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unsupported_media_type() {
        let (app, _) = app();
        let response = app
            .oneshot(
                Request::post("/operations/greet")
                    .header(CONTENT_TYPE, "text/plain")
                    .body(Body::from("ada"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[tokio::test]
    async fn test_operation_is_registered_with_exchange() {
        let (_, exchange) = app();
        let schemas = exchange.operation("greet").unwrap();
        assert_eq!(schemas.response.fingerprint, Fingerprint::of(&Greeting::schema().unwrap()));
    }
}
