use super::{Attr, LogLevel, Record, Sink, SinkRef};
use crate::error::SinkError;
use crate::format::MessageFormat;
use std::sync::Arc;

/// Decorator that makes debug records visible on a sink that suppresses them.
///
/// Reports itself enabled for Debug and above so the logger hands it debug
/// calls. A debug record has its message rewritten through the format and is
/// emitted at Info, or at Warn when the inner sink does not accept Info.
/// Records at other levels pass through untouched.
#[derive(Clone)]
pub struct LevelPromotingSink {
    inner: SinkRef,
    format: MessageFormat,
}

impl LevelPromotingSink {
    /// Wraps `inner`.
    pub fn new(inner: SinkRef, format: MessageFormat) -> Self {
        Self { inner, format }
    }

    /// Returns the wrapped sink.
    pub fn inner(&self) -> &SinkRef {
        &self.inner
    }

    fn promoted_level(&self) -> LogLevel {
        if self.inner.enabled(LogLevel::Info) {
            LogLevel::Info
        } else {
            LogLevel::Warn
        }
    }
}

impl Sink for LevelPromotingSink {
    fn enabled(&self, level: LogLevel) -> bool {
        level >= LogLevel::Debug && level != LogLevel::Off
    }

    fn handle(&self, mut record: Record) -> Result<(), SinkError> {
        if record.level == LogLevel::Debug {
            record.message = self.format.apply(&record.message);
            record.level = self.promoted_level();
        }
        self.inner.handle(record)
    }

    fn with_attrs(&self, attrs: Vec<Attr>) -> SinkRef {
        Arc::new(Self {
            inner: self.inner.with_attrs(attrs),
            format: self.format.clone(),
        })
    }

    fn with_group(&self, name: &str) -> SinkRef {
        Arc::new(Self {
            inner: self.inner.with_group(name),
            format: self.format.clone(),
        })
    }
}

impl std::fmt::Debug for LevelPromotingSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LevelPromotingSink")
            .field("format", &self.format)
            .finish_non_exhaustive()
    }
}
