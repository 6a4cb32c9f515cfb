//! Structured JSON logger
//!
//! - One line per event, `event` then `severity` then fields sorted by key
//! - Synchronous, written with a single call, no buffering
//! - INFO and below go to stdout, ERROR and FATAL to stderr
//!
//! Logging is for negotiation, cache and server lifecycle only; the codec
//! never logs.

use std::fmt;
use std::io::{self, Write};
use std::sync::atomic::{AtomicU8, Ordering};

use serde_json::Value as Json;

use super::events::Event;

/// Log severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Trace = 0,
    Info = 1,
    Warn = 2,
    Error = 3,
    Fatal = 4,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
            Severity::Fatal => "FATAL",
        }
    }

    /// Parse a level name, case-insensitive
    pub fn parse(text: &str) -> Option<Self> {
        match text.to_ascii_uppercase().as_str() {
            "TRACE" => Some(Severity::Trace),
            "INFO" => Some(Severity::Info),
            "WARN" => Some(Severity::Warn),
            "ERROR" => Some(Severity::Error),
            "FATAL" => Some(Severity::Fatal),
            _ => None,
        }
    }

    fn from_u8(n: u8) -> Self {
        match n {
            0 => Severity::Trace,
            1 => Severity::Info,
            2 => Severity::Warn,
            3 => Severity::Error,
            _ => Severity::Fatal,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

static MIN_SEVERITY: AtomicU8 = AtomicU8::new(Severity::Info as u8);

/// Process-wide structured logger
pub struct Logger;

impl Logger {
    /// Drop events below `severity`
    pub fn set_min_severity(severity: Severity) {
        MIN_SEVERITY.store(severity as u8, Ordering::Relaxed);
    }

    pub fn min_severity() -> Severity {
        Severity::from_u8(MIN_SEVERITY.load(Ordering::Relaxed))
    }

    pub fn log(severity: Severity, event: Event, fields: &[(&str, &str)]) {
        if severity < Self::min_severity() {
            return;
        }
        let line = Self::render(severity, event, fields);
        if severity >= Severity::Error {
            Self::write_line(&mut io::stderr().lock(), &line);
        } else {
            Self::write_line(&mut io::stdout().lock(), &line);
        }
    }

    fn write_line<W: Write>(writer: &mut W, line: &str) {
        // a failed log write must not fail the operation being logged
        let _ = writer.write_all(line.as_bytes());
        let _ = writer.flush();
    }

    /// Format one log line, newline included
    pub fn render(severity: Severity, event: Event, fields: &[(&str, &str)]) -> String {
        let mut sorted: Vec<_> = fields.iter().collect();
        sorted.sort_by_key(|(k, _)| *k);

        let mut line = String::with_capacity(128);
        line.push_str("{\"event\":");
        line.push_str(&quoted(event.as_str()));
        line.push_str(",\"severity\":");
        line.push_str(&quoted(severity.as_str()));
        for (key, value) in sorted {
            line.push(',');
            line.push_str(&quoted(key));
            line.push(':');
            line.push_str(&quoted(value));
        }
        line.push_str("}\n");
        line
    }

    pub fn info(event: Event, fields: &[(&str, &str)]) {
        Self::log(Severity::Info, event, fields);
    }

    pub fn warn(event: Event, fields: &[(&str, &str)]) {
        Self::log(Severity::Warn, event, fields);
    }

    pub fn error(event: Event, fields: &[(&str, &str)]) {
        Self::log(Severity::Error, event, fields);
    }

    pub fn fatal(event: Event, fields: &[(&str, &str)]) {
        Self::log(Severity::Fatal, event, fields);
    }
}

fn quoted(text: &str) -> String {
    Json::String(text.to_string()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Trace < Severity::Info);
        assert!(Severity::Warn < Severity::Error);
        assert!(Severity::Error < Severity::Fatal);
    }

    #[test]
    fn test_severity_parse() {
        assert_eq!(Severity::parse("warn"), Some(Severity::Warn));
        assert_eq!(Severity::parse("FATAL"), Some(Severity::Fatal));
        assert_eq!(Severity::parse("verbose"), None);
    }

    #[test]
    fn test_render_is_json_line() {
        let line = Logger::render(Severity::Info, Event::SchemaFetch, &[("fingerprint", "8f5c393f1ad57572")]);
        assert!(line.ends_with('\n'));
        assert_eq!(line.matches('\n').count(), 1);
        let parsed: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["event"], "SCHEMA_FETCH");
        assert_eq!(parsed["severity"], "INFO");
        assert_eq!(parsed["fingerprint"], "8f5c393f1ad57572");
    }

    #[test]
    fn test_event_and_severity_lead_then_sorted_fields() {
        let a = Logger::render(Severity::Warn, Event::GatewayRetry, &[("url", "x"), ("attempt", "2")]);
        let b = Logger::render(Severity::Warn, Event::GatewayRetry, &[("attempt", "2"), ("url", "x")]);
        assert_eq!(a, b);
        assert!(a.starts_with(r#"{"event":"GATEWAY_RETRY","severity":"WARN","attempt""#));
    }

    #[test]
    fn test_render_escapes() {
        let line = Logger::render(Severity::Error, Event::GatewayCallFailed, &[("error", "bad \"quote\"\nnext")]);
        let parsed: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["error"], "bad \"quote\"\nnext");
    }
}
