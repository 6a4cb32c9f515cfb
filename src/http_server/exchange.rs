//! Schema exchange registry
//!
//! Knows the request and response schema of every served operation and
//! answers fingerprint lookups from the shared cache. Peers use it to
//! resolve a fingerprint they cannot decode, and to register their own
//! request schemas before sending binary bodies.
//!
//! A peer's schema is accepted only when it is a record that resolves
//! against the request schema of a served operation. A collision caused by
//! a peer's schema refuses that schema and leaves the cache running.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;
use serde_json::Value as Json;

use super::errors::{ApiError, ApiResult};
use crate::codec::check_resolution;
use crate::fingerprint::{CacheResult, Fingerprint, SchemaCache};
use crate::schema::{SchemaNode, SchemaResult};

/// A schema with its fingerprint
#[derive(Debug, Clone)]
pub struct KnownSchema {
    pub fingerprint: Fingerprint,
    pub schema: Arc<SchemaNode>,
}

impl KnownSchema {
    pub fn to_document(&self) -> SchemaResult<SchemaDocument> {
        Ok(SchemaDocument {
            fingerprint: self.fingerprint.to_hex(),
            canonical: self.schema.canonical_form(),
            schema: self.schema.to_json()?,
        })
    }
}

/// Wire form of a schema lookup
#[derive(Debug, Clone, Serialize)]
pub struct SchemaDocument {
    pub fingerprint: String,
    pub canonical: String,
    pub schema: Json,
}

/// Schemas of one operation
#[derive(Debug, Clone)]
pub struct OperationSchemas {
    pub request: Option<KnownSchema>,
    pub response: KnownSchema,
}

/// Operation registry backed by the shared cache
pub struct SchemaExchange {
    cache: Arc<SchemaCache>,
    operations: RwLock<BTreeMap<String, OperationSchemas>>,
}

impl SchemaExchange {
    pub fn new(cache: Arc<SchemaCache>) -> Self {
        Self {
            cache,
            operations: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn cache(&self) -> &Arc<SchemaCache> {
        &self.cache
    }

    /// Register an operation; both schemas are cached
    pub fn register_operation(
        &self,
        operation: &str,
        request: Option<SchemaNode>,
        response: SchemaNode,
    ) -> CacheResult<OperationSchemas> {
        let request = request.map(|schema| self.known(schema)).transpose()?;
        let response = self.known(response)?;
        let schemas = OperationSchemas { request, response };
        self.operations
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(operation.to_string(), schemas.clone());
        Ok(schemas)
    }

    fn known(&self, schema: SchemaNode) -> CacheResult<KnownSchema> {
        let fingerprint = Fingerprint::of(&schema);
        let schema = self.cache.insert(fingerprint, schema)?;
        Ok(KnownSchema { fingerprint, schema })
    }

    /// Cache a peer's request schema and return its fingerprint
    pub fn register_schema(&self, schema: SchemaNode) -> ApiResult<Fingerprint> {
        let name = match schema.as_record() {
            Some(record) => record.name.fullname(),
            None => {
                return Err(ApiError::SchemaRejected(format!(
                    "a registered schema must be a record, got {}",
                    schema.type_name()
                )))
            }
        };
        let accepted = self
            .operations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter_map(|ops| ops.request.as_ref())
            .any(|request| check_resolution(&schema, &request.schema).is_ok());
        if !accepted {
            return Err(ApiError::SchemaRejected(format!(
                "record '{}' does not resolve against the request schema of any operation",
                name
            )));
        }
        Ok(self.cache.offer(schema)?)
    }

    /// Schema for a fingerprint; `Ok(None)` means unknown
    pub fn lookup(&self, fingerprint: &Fingerprint) -> CacheResult<Option<KnownSchema>> {
        Ok(self.cache.resolve(fingerprint)?.map(|schema| KnownSchema {
            fingerprint: *fingerprint,
            schema,
        }))
    }

    pub fn operation(&self, operation: &str) -> Option<OperationSchemas> {
        self.operations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(operation)
            .cloned()
    }

    /// Registered operation names, sorted
    pub fn operations(&self) -> Vec<String> {
        self.operations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }
}
