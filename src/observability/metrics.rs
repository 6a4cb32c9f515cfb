//! Metrics registry
//!
//! - Counters only, monotonic, reset on process start
//! - Relaxed atomics; values are exact once writers are quiescent

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

macro_rules! counters {
    ($($field:ident => $increment:ident),+ $(,)?) => {
        /// Operational counters, shared behind an `Arc`
        #[derive(Debug, Default)]
        pub struct MetricsRegistry {
            $($field: AtomicU64,)+
        }

        impl MetricsRegistry {
            pub fn new() -> Self {
                Self::default()
            }

            $(
                pub fn $increment(&self) {
                    self.$field.fetch_add(1, Ordering::Relaxed);
                }
            )+

            /// All counters at this moment
            pub fn snapshot(&self) -> MetricsSnapshot {
                MetricsSnapshot {
                    $($field: self.$field.load(Ordering::Relaxed),)+
                }
            }
        }

        /// Point-in-time copy of every counter
        #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
        pub struct MetricsSnapshot {
            $(pub $field: u64,)+
        }
    };
}

counters! {
    messages_encoded => increment_messages_encoded,
    messages_decoded => increment_messages_decoded,
    decode_failures => increment_decode_failures,
    cache_hits => increment_cache_hits,
    cache_misses => increment_cache_misses,
    cache_inserts => increment_cache_inserts,
    schema_fetches => increment_schema_fetches,
    schema_fetch_failures => increment_schema_fetch_failures,
    schema_registrations => increment_schema_registrations,
    gateway_calls => increment_gateway_calls,
    gateway_retries => increment_gateway_retries,
    gateway_failures => increment_gateway_failures,
    avro_requests => increment_avro_requests,
    avro_rejections => increment_avro_rejections,
}

impl MetricsRegistry {
    /// Snapshot rendered as a JSON object
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self.snapshot()).unwrap_or_default()
    }
}
