//! HTTP error responses
//!
//! Every failure leaves the server as
//! `{ "status": <u16>, "code": "AVRO_*", "error": <message>, "refid": <uuid|null> }`.
//! Only 500s carry a `refid`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::codec::CodecError;
use crate::fingerprint::{CacheError, Fingerprint, FingerprintError};
use crate::schema::SchemaError;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Binary request framed with a writer schema the server has not seen
    #[error("unknown request schema {0}; register it with POST /schemas")]
    UnknownSchema(Fingerprint),

    #[error("no schema with fingerprint {0}")]
    SchemaNotFound(Fingerprint),

    #[error("no operation named '{0}'")]
    OperationNotFound(String),

    #[error("unsupported media type '{0}'")]
    UnsupportedMediaType(String),

    #[error("{0}")]
    BadRequest(String),

    /// Posted schema matches no operation's request schema
    #[error("{0}")]
    SchemaRejected(String),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Fingerprint(#[from] FingerprintError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::UnknownSchema(_) | ApiError::Cache(CacheError::PeerCollision { .. }) => StatusCode::CONFLICT,
            ApiError::SchemaNotFound(_) | ApiError::OperationNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::BadRequest(_)
            | ApiError::SchemaRejected(_)
            | ApiError::Codec(_)
            | ApiError::Schema(_)
            | ApiError::Fingerprint(_) => StatusCode::BAD_REQUEST,
            ApiError::Cache(CacheError::FingerprintMismatch { .. }) => StatusCode::BAD_REQUEST,
            ApiError::Cache(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::UnknownSchema(_) => "AVRO_UNKNOWN_SCHEMA",
            ApiError::SchemaNotFound(_) => "AVRO_SCHEMA_NOT_FOUND",
            ApiError::OperationNotFound(_) => "AVRO_OPERATION_NOT_FOUND",
            ApiError::UnsupportedMediaType(_) => "AVRO_UNSUPPORTED_MEDIA_TYPE",
            ApiError::BadRequest(_) => "AVRO_BAD_REQUEST",
            ApiError::SchemaRejected(_) => "AVRO_SCHEMA_REJECTED",
            ApiError::Codec(e) => e.code(),
            ApiError::Schema(e) => e.code(),
            ApiError::Fingerprint(e) => e.code(),
            ApiError::Cache(e) => e.code(),
            ApiError::Internal(_) => "AVRO_INTERNAL",
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub status: u16,
    pub code: &'static str,
    pub error: String,
    pub refid: Option<String>,
}

impl From<&ApiError> for ErrorResponse {
    fn from(err: &ApiError) -> Self {
        let status = err.status_code();
        Self {
            status: status.as_u16(),
            code: err.code(),
            error: err.to_string(),
            refid: status
                .is_server_error()
                .then(|| Uuid::new_v4().to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse::from(&self);
        (self.status_code(), Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::UnknownSchema(Fingerprint::from_u64(1)).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::OperationNotFound("echo".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(CodecError::decode("x", "truncated")).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(CacheError::Halted).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        let collision = ApiError::from(CacheError::PeerCollision {
            fingerprint: Fingerprint::from_u64(1),
            existing: "\"long\"".into(),
            incoming: "\"int\"".into(),
        });
        assert_eq!(collision.status_code(), StatusCode::CONFLICT);
        assert_eq!(collision.code(), "AVRO_FINGERPRINT_COLLISION");
    }

    #[test]
    fn test_refid_only_on_server_errors() {
        let body = ErrorResponse::from(&ApiError::Internal("boom".into()));
        assert_eq!(body.status, 500);
        assert!(body.refid.is_some());

        let body = ErrorResponse::from(&ApiError::UnknownSchema(Fingerprint::from_u64(1)));
        assert_eq!(body.code, "AVRO_UNKNOWN_SCHEMA");
        assert!(body.refid.is_none());
    }
}
