//! Front end for emitting records through a sink.

use crate::sink::{Attr, LogLevel, Record, SinkRef};
use std::panic::Location;

/// A logger bound to a sink.
///
/// Checks [`crate::Sink::enabled`] before building a record, so a suppressed
/// call costs one level check. Every record carries the caller's location.
///
/// # Example
/// ```rust,ignore
/// let log = ctx.logger().with([attr("user", 42)]);
/// log.debug("loading profile", [attr("cache", "miss")]);
/// ```
#[derive(Clone)]
pub struct Logger {
    sink: SinkRef,
}

impl Logger {
    /// Creates a logger writing to `sink`.
    pub fn new(sink: SinkRef) -> Self {
        Self { sink }
    }

    /// Returns the underlying sink.
    pub fn sink(&self) -> &SinkRef {
        &self.sink
    }

    /// Reports whether records at `level` would be handled.
    pub fn enabled(&self, level: LogLevel) -> bool {
        self.sink.enabled(level)
    }

    /// Returns a logger whose records carry `attrs`.
    pub fn with(&self, attrs: impl IntoIterator<Item = Attr>) -> Self {
        Self {
            sink: self.sink.with_attrs(attrs.into_iter().collect()),
        }
    }

    /// Returns a logger whose record attributes are placed under `name`.
    pub fn with_group(&self, name: &str) -> Self {
        Self {
            sink: self.sink.with_group(name),
        }
    }

    /// Emits a record at `level`.
    #[track_caller]
    pub fn log(
        &self,
        level: LogLevel,
        message: impl Into<String>,
        attrs: impl IntoIterator<Item = Attr>,
    ) {
        if !self.sink.enabled(level) {
            return;
        }
        let record = Record::new(level, message)
            .with_attrs(attrs)
            .with_location(Location::caller());
        if let Err(err) = self.sink.handle(record) {
            tracing::warn!(error = %err, "log sink failed to handle record");
        }
    }

    /// Emits a trace record.
    #[track_caller]
    pub fn trace(&self, message: impl Into<String>, attrs: impl IntoIterator<Item = Attr>) {
        self.log(LogLevel::Trace, message, attrs);
    }

    /// Emits a debug record.
    #[track_caller]
    pub fn debug(&self, message: impl Into<String>, attrs: impl IntoIterator<Item = Attr>) {
        self.log(LogLevel::Debug, message, attrs);
    }

    /// Emits an info record.
    #[track_caller]
    pub fn info(&self, message: impl Into<String>, attrs: impl IntoIterator<Item = Attr>) {
        self.log(LogLevel::Info, message, attrs);
    }

    /// Emits a warn record.
    #[track_caller]
    pub fn warn(&self, message: impl Into<String>, attrs: impl IntoIterator<Item = Attr>) {
        self.log(LogLevel::Warn, message, attrs);
    }

    /// Emits an error record.
    #[track_caller]
    pub fn error(&self, message: impl Into<String>, attrs: impl IntoIterator<Item = Attr>) {
        self.log(LogLevel::Error, message, attrs);
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger").finish_non_exhaustive()
    }
}
