//! Observability subsystem
//!
//! - Structured JSON logging of lifecycle, cache and negotiation events
//! - Counters for encode/decode, cache and gateway activity
//!
//! Observability is read-only: it never changes the outcome of the
//! operation being observed.

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};

/// Log an event at INFO, or FATAL for fatal events
pub fn log_event(event: Event, fields: &[(&str, &str)]) {
    let severity = if event.is_fatal() {
        Severity::Fatal
    } else {
        Severity::Info
    };
    Logger::log(severity, event, fields);
}
