//! Process-wide schema cache
//!
//! Fingerprint → schema, insert-if-absent, never mutated or evicted.
//! One cache is built per process and handed explicitly to every gateway
//! and server that needs it.
//!
//! The cache never performs I/O. A miss is reported to the caller, which
//! decides how to resolve it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use super::errors::{CacheError, CacheResult};
use super::rabin::Fingerprint;
use crate::observability::{log_event, Event, MetricsRegistry};
use crate::schema::{canonical_form, SchemaNode};

struct Entry {
    schema: Arc<SchemaNode>,
    canonical: String,
}

/// Where an incoming schema came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    /// Derived locally or fetched on our own initiative
    Trusted,
    /// Posted by a peer
    Peer,
}

/// Shared fingerprint → schema mapping
pub struct SchemaCache {
    entries: RwLock<HashMap<Fingerprint, Entry>>,
    halted: AtomicBool,
    metrics: Arc<MetricsRegistry>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::with_metrics(Arc::new(MetricsRegistry::new()))
    }

    pub fn with_metrics(metrics: Arc<MetricsRegistry>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            halted: AtomicBool::new(false),
            metrics,
        }
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    /// True once a collision has been detected
    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::Acquire)
    }

    fn ensure_running(&self) -> CacheResult<()> {
        if self.is_halted() {
            Err(CacheError::Halted)
        } else {
            Ok(())
        }
    }

    /// Look up a fingerprint. `Ok(None)` is a miss.
    pub fn resolve(&self, fingerprint: &Fingerprint) -> CacheResult<Option<Arc<SchemaNode>>> {
        self.ensure_running()?;
        // entries are only ever added whole, so a poisoned map is still consistent
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        match entries.get(fingerprint) {
            Some(entry) => {
                self.metrics.increment_cache_hits();
                Ok(Some(Arc::clone(&entry.schema)))
            }
            None => {
                self.metrics.increment_cache_misses();
                Ok(None)
            }
        }
    }

    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(fingerprint)
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cache `schema` under `fingerprint`.
    ///
    /// The schema must hash to `fingerprint`. Inserting a schema with the
    /// same canonical form again is a no-op and returns the first entry.
    pub fn insert(&self, fingerprint: Fingerprint, schema: SchemaNode) -> CacheResult<Arc<SchemaNode>> {
        self.ensure_running()?;
        let canonical = canonical_form(&schema);
        let actual = Fingerprint::of_canonical(&canonical);
        if actual != fingerprint {
            return Err(CacheError::FingerprintMismatch {
                claimed: fingerprint,
                actual,
            });
        }
        self.store(fingerprint, schema, canonical, Origin::Trusted)
    }

    /// Fingerprint `schema` and cache it
    pub fn register(&self, schema: SchemaNode) -> CacheResult<Fingerprint> {
        let fingerprint = Fingerprint::of(&schema);
        self.insert(fingerprint, schema)?;
        Ok(fingerprint)
    }

    /// Fingerprint and cache a schema a peer sent us.
    ///
    /// A collision with a cached schema refuses the incoming one with
    /// `PeerCollision` and leaves the cache running.
    pub fn offer(&self, schema: SchemaNode) -> CacheResult<Fingerprint> {
        self.ensure_running()?;
        let canonical = canonical_form(&schema);
        let fingerprint = Fingerprint::of_canonical(&canonical);
        self.store(fingerprint, schema, canonical, Origin::Peer)?;
        Ok(fingerprint)
    }

    fn store(
        &self,
        fingerprint: Fingerprint,
        schema: SchemaNode,
        canonical: String,
        origin: Origin,
    ) -> CacheResult<Arc<SchemaNode>> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        // re-check under the write lock; a collision may have landed meanwhile
        self.ensure_running()?;

        if let Some(existing) = entries.get(&fingerprint) {
            if existing.canonical == canonical {
                return Ok(Arc::clone(&existing.schema));
            }
            let fp = fingerprint.to_hex();
            if origin == Origin::Peer {
                log_event(Event::SchemaCacheRefused, &[("fingerprint", &fp), ("incoming", &canonical)]);
                return Err(CacheError::PeerCollision {
                    fingerprint,
                    existing: existing.canonical.clone(),
                    incoming: canonical,
                });
            }
            self.halted.store(true, Ordering::Release);
            log_event(
                Event::SchemaCacheCollision,
                &[
                    ("fingerprint", &fp),
                    ("existing", &existing.canonical),
                    ("incoming", &canonical),
                ],
            );
            return Err(CacheError::FingerprintCollision {
                fingerprint,
                existing: existing.canonical.clone(),
                incoming: canonical,
            });
        }

        let schema = Arc::new(schema);
        let name = schema.name().map(|n| n.fullname()).unwrap_or_else(|| schema.type_name().to_string());
        entries.insert(
            fingerprint,
            Entry {
                schema: Arc::clone(&schema),
                canonical,
            },
        );
        drop(entries);

        self.metrics.increment_cache_inserts();
        log_event(
            Event::SchemaCacheInsert,
            &[("fingerprint", &fingerprint.to_hex()), ("schema", &name)],
        );
        Ok(schema)
    }
}

impl Default for SchemaCache {
    fn default() -> Self {
        Self::new()
    }
}
