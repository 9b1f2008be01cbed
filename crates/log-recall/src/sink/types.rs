//! Core record types.
//!
//! - LogLevel: ordered severity levels
//! - Attr: a single structured key/value attribute
//! - Record: one log call with its timestamp, level, message and attributes

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::panic::Location;

/// Severity of a log record.
///
/// Levels are ordered from most verbose (Trace) to least verbose (Off).
/// `Off` is only meaningful as a threshold; records never carry it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Most verbose level.
    Trace,
    /// Debug information, usually suppressed in production.
    Debug,
    /// General informational messages (default).
    #[default]
    Info,
    /// Potentially problematic situations.
    Warn,
    /// Failures. An error record flushes any buffered context.
    Error,
    /// Threshold that disables everything.
    Off,
}

impl LogLevel {
    /// Returns the uppercase name used in plain-text rendering.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "TRACE",
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
            Self::Off => "OFF",
        }
    }

    /// Checks whether a sink with this threshold emits records at `target`.
    pub fn allows(&self, target: LogLevel) -> bool {
        *self != LogLevel::Off && target != LogLevel::Off && target >= *self
    }

    /// Converts this level to a `tracing::Level`.
    ///
    /// Returns None for `Off` since tracing has no such level.
    pub fn to_tracing_level(&self) -> Option<tracing::Level> {
        match self {
            Self::Trace => Some(tracing::Level::TRACE),
            Self::Debug => Some(tracing::Level::DEBUG),
            Self::Info => Some(tracing::Level::INFO),
            Self::Warn => Some(tracing::Level::WARN),
            Self::Error => Some(tracing::Level::ERROR),
            Self::Off => None,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structured key/value attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attr {
    /// Attribute key, possibly prefixed by a group name (`group.key`).
    pub key: String,
    /// Attribute value.
    pub value: Value,
}

impl Attr {
    /// Creates a new attribute.
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Returns a copy of this attribute with its key placed under `group`.
    pub fn grouped(&self, group: &str) -> Self {
        Self {
            key: format!("{}.{}", group, self.key),
            value: self.value.clone(),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> From<(K, V)> for Attr {
    fn from((key, value): (K, V)) -> Self {
        Self::new(key, value)
    }
}

impl fmt::Display for Attr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Value::String(s) => write!(f, "{}={}", self.key, s),
            other => write!(f, "{}={}", self.key, other),
        }
    }
}

/// Shorthand for [`Attr::new`].
pub fn attr(key: impl Into<String>, value: impl Into<Value>) -> Attr {
    Attr::new(key, value)
}

/// One log call.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// When the log call was made.
    pub timestamp: DateTime<Utc>,
    /// Severity.
    pub level: LogLevel,
    /// Message text.
    pub message: String,
    /// Attributes in insertion order.
    pub attrs: Vec<Attr>,
    /// Call site of the log call, when known.
    pub location: Option<&'static Location<'static>>,
}

impl Record {
    /// Creates a record stamped with the current time.
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            message: message.into(),
            attrs: Vec::new(),
            location: None,
        }
    }

    /// Appends attributes.
    pub fn with_attrs(mut self, attrs: impl IntoIterator<Item = Attr>) -> Self {
        self.attrs.extend(attrs);
        self
    }

    /// Sets the call-site location.
    pub fn with_location(mut self, location: &'static Location<'static>) -> Self {
        self.location = Some(location);
        self
    }

    /// Appends a single attribute in place.
    pub fn add_attr(&mut self, attr: Attr) {
        self.attrs.push(attr);
    }

    /// Looks up the first attribute with the given key.
    pub fn attr(&self, key: &str) -> Option<&Value> {
        self.attrs.iter().find(|a| a.key == key).map(|a| &a.value)
    }

    /// Builds a copy with the same timestamp, level, message and location
    /// but with every attribute key placed under `group`.
    pub fn regrouped(&self, group: &str) -> Self {
        Self {
            timestamp: self.timestamp,
            level: self.level,
            message: self.message.clone(),
            attrs: self.attrs.iter().map(|a| a.grouped(group)).collect(),
            location: self.location,
        }
    }

    /// Renders the attributes as space separated `key=value` pairs.
    pub fn render_attrs(&self) -> String {
        self.attrs
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Plain-text rendering: `RFC3339 LEVEL message key=value ...`.
    pub fn render_plain(&self) -> String {
        let mut line = format!(
            "{} {} {}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            self.level,
            self.message
        );
        for attr in &self.attrs {
            line.push(' ');
            line.push_str(&attr.to_string());
        }
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_level_ordering() {
        assert!(LogLevel::Trace < LogLevel::Debug);
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Warn < LogLevel::Error);
        assert!(LogLevel::Error < LogLevel::Off);
    }

    #[test]
    fn test_level_allows() {
        assert!(LogLevel::Info.allows(LogLevel::Error));
        assert!(LogLevel::Info.allows(LogLevel::Info));
        assert!(!LogLevel::Info.allows(LogLevel::Debug));
        assert!(!LogLevel::Off.allows(LogLevel::Error));
        assert!(LogLevel::Trace.allows(LogLevel::Trace));
    }

    #[test]
    fn test_level_serializes_lowercase() {
        assert_eq!(serde_json::to_value(LogLevel::Warn).unwrap(), json!("warn"));
    }

    #[test]
    fn test_regrouped_preserves_metadata() {
        let record = Record::new(LogLevel::Debug, "msg").with_attrs([attr("a", "b")]);
        let copy = record.regrouped("g");
        assert_eq!(copy.timestamp, record.timestamp);
        assert_eq!(copy.level, LogLevel::Debug);
        assert_eq!(copy.attrs[0].key, "g.a");
    }

    #[test]
    fn test_render_plain() {
        let record = Record::new(LogLevel::Info, "hello").with_attrs([attr("q", 42), attr("s", "x")]);
        let line = record.render_plain();
        assert!(line.ends_with("INFO hello q=42 s=x"), "{}", line);
    }
}
