//! Schema exchange routes
//!
//! - `GET  /schemas/:fingerprint` - schema for a fingerprint, 404 if unknown
//! - `POST /schemas` - register a peer's writer schema; it must resolve
//!   against a served operation's request schema
//! - `GET  /operations/:operation/schema` - request and response schemas

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;

use super::errors::{ApiError, ApiResult};
use super::exchange::{KnownSchema, SchemaDocument, SchemaExchange};
use crate::fingerprint::Fingerprint;
use crate::schema::parse_schema;

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub fingerprint: String,
}

#[derive(Debug, Serialize)]
pub struct OperationResponse {
    pub operation: String,
    pub request: Option<SchemaDocument>,
    pub response: SchemaDocument,
}

pub fn exchange_routes(exchange: Arc<SchemaExchange>) -> Router {
    Router::new()
        .route("/schemas", post(register_schema_handler))
        .route("/schemas/:fingerprint", get(get_schema_handler))
        .route("/operations/:operation/schema", get(operation_schema_handler))
        .with_state(exchange)
}

async fn get_schema_handler(
    State(exchange): State<Arc<SchemaExchange>>,
    Path(fingerprint): Path<String>,
) -> ApiResult<Json<SchemaDocument>> {
    let fingerprint: Fingerprint = fingerprint.parse()?;
    let known = exchange
        .lookup(&fingerprint)?
        .ok_or(ApiError::SchemaNotFound(fingerprint))?;
    Ok(Json(known.to_document()?))
}

async fn register_schema_handler(
    State(exchange): State<Arc<SchemaExchange>>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    let text = std::str::from_utf8(&body).map_err(|e| ApiError::BadRequest(format!("schema text is not UTF-8: {}", e)))?;
    // a JSON string holding the schema text is accepted as well as the schema itself
    let schema = match serde_json::from_str::<Value>(text) {
        Ok(Value::String(inner)) => parse_schema(&inner)?,
        _ => parse_schema(text)?,
    };
    let fingerprint = exchange.register_schema(schema)?;
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            fingerprint: fingerprint.to_hex(),
        }),
    ))
}

async fn operation_schema_handler(
    State(exchange): State<Arc<SchemaExchange>>,
    Path(operation): Path<String>,
) -> ApiResult<Json<OperationResponse>> {
    let schemas = exchange
        .operation(&operation)
        .ok_or_else(|| ApiError::OperationNotFound(operation.clone()))?;
    Ok(Json(OperationResponse {
        operation,
        request: schemas.request.as_ref().map(KnownSchema::to_document).transpose()?,
        response: schemas.response.to_document()?,
    }))
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    use super::*;
    use crate::fingerprint::SchemaCache;
    use crate::observability::{Logger, Severity};
    use crate::schema::SchemaNode;

    fn app() -> (Router, Arc<SchemaExchange>) {
        Logger::set_min_severity(Severity::Fatal);
        let exchange = Arc::new(SchemaExchange::new(Arc::new(SchemaCache::new())));
        (exchange_routes(Arc::clone(&exchange)), exchange)
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_get_known_schema() {
        let (app, exchange) = app();
        let fp = exchange.cache().register(SchemaNode::String).unwrap();

        let response = app
            .oneshot(Request::get(format!("/schemas/{}", fp)).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["fingerprint"], "c70345637248018f");
        assert_eq!(json["schema"], "string");
    }

    #[tokio::test]
    async fn test_get_unknown_schema_is_404() {
        let (app, _) = app();
        let response = app
            .oneshot(Request::get("/schemas/0000000000000001").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["code"], "AVRO_SCHEMA_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_get_malformed_fingerprint_is_400() {
        let (app, _) = app();
        let response = app
            .oneshot(Request::get("/schemas/xyz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["code"], "AVRO_INVALID_FINGERPRINT");
    }

    #[tokio::test]
    async fn test_post_registers_schema() {
        let (app, exchange) = app();
        let ping = parse_schema(r#"{"type":"record","name":"Ping","fields":[{"name":"id","type":"long"}]}"#).unwrap();
        exchange.register_operation("ping", Some(ping), SchemaNode::Long).unwrap();

        let schema = r#"{"type":"record","name":"Ping","fields":[
            {"name":"id","type":"int"},
            {"name":"trace","type":"string"}
        ]}"#;
        let response = app
            .oneshot(Request::post("/schemas").body(Body::from(schema)).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let fp: Fingerprint = body_json(response).await["fingerprint"].as_str().unwrap().parse().unwrap();
        assert!(exchange.cache().contains(&fp));
    }

    #[tokio::test]
    async fn test_post_unrelated_schema_is_400() {
        let (app, exchange) = app();
        let ping = parse_schema(r#"{"type":"record","name":"Ping","fields":[{"name":"id","type":"long"}]}"#).unwrap();
        exchange.register_operation("ping", Some(ping), SchemaNode::Long).unwrap();
        let before = exchange.cache().len();

        let schema = r#"{"type":"record","name":"Filler","fields":[{"name":"junk","type":"string"}]}"#;
        let response = app
            .oneshot(Request::post("/schemas").body(Body::from(schema)).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["code"], "AVRO_SCHEMA_REJECTED");
        assert_eq!(exchange.cache().len(), before);
        assert!(!exchange.cache().is_halted());
    }

    #[tokio::test]
    async fn test_post_invalid_schema_is_400() {
        let (app, _) = app();
        let response = app
            .oneshot(Request::post("/schemas").body(Body::from(r#"{"type":"nope"}"#)).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_operation_schema() {
        let (app, exchange) = app();
        exchange
            .register_operation("ping", None, SchemaNode::Long)
            .unwrap();

        let response = app
            .clone()
            .oneshot(Request::get("/operations/ping/schema").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["operation"], "ping");
        assert!(json["request"].is_null());
        assert_eq!(json["response"]["canonical"], "\"long\"");

        let response = app
            .oneshot(Request::get("/operations/nope/schema").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
