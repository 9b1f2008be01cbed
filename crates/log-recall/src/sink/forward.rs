use super::{Attr, LogLevel, Record, Scope, Sink, SinkRef};
use crate::error::SinkError;
use std::sync::Arc;

/// Default sink that forwards records into the `tracing` ecosystem.
///
/// `enabled` asks the current subscriber, so the sink follows whatever
/// filter the application installed.
///
/// # Limitations
///
/// - Attributes are rendered into one display field, `attrs = "a=1 g.b=x"`,
///   because tracing field names are static. A JSON or other structured
///   subscriber sees a single string rather than separate fields.
/// - Every event and every `enabled` check uses this module's target,
///   `log_recall::sink::forward`. Per-module filter directives aimed at the
///   caller's crate do not apply; filter on that target instead.
#[derive(Debug, Clone, Default)]
pub struct TracingSink {
    scope: Scope,
}

impl TracingSink {
    /// Creates a new tracing sink.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Sink for TracingSink {
    fn enabled(&self, level: LogLevel) -> bool {
        match level {
            LogLevel::Trace => tracing::enabled!(tracing::Level::TRACE),
            LogLevel::Debug => tracing::enabled!(tracing::Level::DEBUG),
            LogLevel::Info => tracing::enabled!(tracing::Level::INFO),
            LogLevel::Warn => tracing::enabled!(tracing::Level::WARN),
            LogLevel::Error => tracing::enabled!(tracing::Level::ERROR),
            LogLevel::Off => false,
        }
    }

    fn handle(&self, record: Record) -> Result<(), SinkError> {
        let record = self.scope.apply(record);
        let attrs = record.render_attrs();
        let location = record
            .location
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_default();
        let message = &record.message;

        match record.level {
            LogLevel::Trace => tracing::trace!(attrs = %attrs, location = %location, "{}", message),
            LogLevel::Debug => tracing::debug!(attrs = %attrs, location = %location, "{}", message),
            LogLevel::Info => tracing::info!(attrs = %attrs, location = %location, "{}", message),
            LogLevel::Warn => tracing::warn!(attrs = %attrs, location = %location, "{}", message),
            LogLevel::Error => tracing::error!(attrs = %attrs, location = %location, "{}", message),
            LogLevel::Off => {}
        }
        Ok(())
    }

    fn with_attrs(&self, attrs: Vec<Attr>) -> SinkRef {
        Arc::new(Self {
            scope: self.scope.with_attrs(attrs),
        })
    }

    fn with_group(&self, name: &str) -> SinkRef {
        Arc::new(Self {
            scope: self.scope.with_group(name),
        })
    }
}
