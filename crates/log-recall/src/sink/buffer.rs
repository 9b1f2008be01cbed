use super::{Attr, LogLevel, Record, Sink, SinkRef};
use crate::constants::RECALL_ATTR_KEY;
use crate::error::SinkError;
use crate::format::MessageFormat;
use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

struct Shared {
    records: Mutex<Vec<Record>>,
    sink: SinkRef,
    format: MessageFormat,
    fallback: Mutex<Box<dyn Write + Send>>,
}

/// Sink that holds back the records its underlying sink would suppress.
///
/// - An Error record flushes everything buffered so far, then is forwarded.
/// - A record the underlying sink does not accept is appended to the buffer.
/// - Anything else is forwarded directly.
///
/// Cloning is cheap and every clone, as well as every [`ChildSink`] derived
/// through `with_attrs`/`with_group`, shares one buffer. Appends and the
/// replay-then-clear of [`BufferingSink::flush`] happen under a single mutex.
#[derive(Clone)]
pub struct BufferingSink {
    shared: Arc<Shared>,
}

impl BufferingSink {
    /// Creates a buffer in front of `sink`. Records the sink fails to accept
    /// during a flush are written to stderr.
    pub fn new(sink: SinkRef, format: MessageFormat) -> Self {
        Self::with_fallback(sink, format, std::io::stderr())
    }

    /// Creates a buffer with a custom last-resort writer.
    pub fn with_fallback(
        sink: SinkRef,
        format: MessageFormat,
        fallback: impl Write + Send + 'static,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                records: Mutex::new(Vec::new()),
                sink,
                format,
                fallback: Mutex::new(Box::new(fallback)),
            }),
        }
    }

    /// Number of records currently held.
    pub fn len(&self) -> usize {
        self.records().len()
    }

    /// Returns true if nothing is held.
    pub fn is_empty(&self) -> bool {
        self.records().is_empty()
    }

    /// Drops every held record without replaying it.
    pub fn discard(&self) {
        let mut records = self.records();
        if !records.is_empty() {
            tracing::trace!(count = records.len(), "discarding buffered records");
            records.clear();
        }
    }

    /// Replays every held record, oldest first, then clears the buffer.
    ///
    /// Each record gets its message rewritten through the format, a
    /// `recall = true` attribute, and its level raised to Info (Warn when the
    /// underlying sink does not accept Info). A record the sink fails to
    /// accept is written as plain text to the fallback writer and the replay
    /// continues.
    pub fn flush(&self) {
        let mut records = self.records();
        if records.is_empty() {
            return;
        }
        let visible = if self.shared.sink.enabled(LogLevel::Info) {
            LogLevel::Info
        } else {
            LogLevel::Warn
        };
        let count = records.len();

        for mut record in records.drain(..) {
            record.message = self.shared.format.apply(&record.message);
            record.add_attr(Attr::new(RECALL_ATTR_KEY, true));
            record.level = record.level.max(visible);
            if let Err(err) = self.shared.sink.handle(record.clone()) {
                self.write_fallback(&record, &err);
            }
        }
        tracing::trace!(count, "flushed buffered records");
    }

    fn write_fallback(&self, record: &Record, err: &SinkError) {
        tracing::warn!(error = %err, "sink rejected recalled record, writing to fallback");
        let mut out = self
            .shared
            .fallback
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let _ = writeln!(out, "{}", record.render_plain());
        let _ = out.flush();
    }

    fn records(&self) -> MutexGuard<'_, Vec<Record>> {
        self.shared
            .records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Sink for BufferingSink {
    fn enabled(&self, _level: LogLevel) -> bool {
        // filtering happens in handle
        true
    }

    fn handle(&self, record: Record) -> Result<(), SinkError> {
        if record.level >= LogLevel::Error {
            self.flush();
            return self.shared.sink.handle(record);
        }
        if !self.shared.sink.enabled(record.level) {
            self.records().push(record);
            return Ok(());
        }
        self.shared.sink.handle(record)
    }

    fn with_attrs(&self, attrs: Vec<Attr>) -> SinkRef {
        Arc::new(ChildSink {
            root: self.clone(),
            attrs,
            group: None,
        })
    }

    fn with_group(&self, name: &str) -> SinkRef {
        Arc::new(ChildSink {
            root: self.clone(),
            attrs: Vec::new(),
            group: Some(name.to_string()),
        })
    }
}

impl std::fmt::Debug for BufferingSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferingSink")
            .field("buffered", &self.len())
            .field("format", &self.shared.format)
            .finish_non_exhaustive()
    }
}

/// A view of a [`BufferingSink`] with bound attributes and/or a group.
///
/// Holds no records of its own; it rewrites the record and hands it to the
/// root. The group applies to the record's own attributes and only the
/// immediate group is used, so `g2` derived under `g1` yields `g2.key`.
/// Bound attributes are appended after the record's attributes.
#[derive(Clone, Debug)]
pub struct ChildSink {
    root: BufferingSink,
    attrs: Vec<Attr>,
    group: Option<String>,
}

impl ChildSink {
    /// Returns the buffer this view writes to.
    pub fn root(&self) -> &BufferingSink {
        &self.root
    }
}

impl Sink for ChildSink {
    fn enabled(&self, _level: LogLevel) -> bool {
        true
    }

    fn handle(&self, record: Record) -> Result<(), SinkError> {
        let mut record = match &self.group {
            Some(group) => record.regrouped(group),
            None => record,
        };
        record.attrs.extend(self.attrs.iter().cloned());
        self.root.handle(record)
    }

    fn with_attrs(&self, attrs: Vec<Attr>) -> SinkRef {
        let mut bound = self.attrs.clone();
        bound.extend(attrs);
        Arc::new(Self {
            root: self.root.clone(),
            attrs: bound,
            group: self.group.clone(),
        })
    }

    fn with_group(&self, name: &str) -> SinkRef {
        Arc::new(Self {
            root: self.root.clone(),
            attrs: self.attrs.clone(),
            group: Some(name.to_string()),
        })
    }
}
