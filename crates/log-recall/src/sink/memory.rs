use super::{Attr, LogLevel, Record, Scope, Sink, SinkRef};
use crate::error::SinkError;
use std::sync::{Arc, Mutex, PoisonError};

/// A sink that stores every handled record in memory.
///
/// Derived sinks (`with_attrs`/`with_group`) share the same storage, so a
/// single handle observes everything written through any of them. Useful in
/// tests and wherever log output has to be inspected programmatically.
#[derive(Debug, Clone)]
pub struct MemorySink {
    min_level: LogLevel,
    records: Arc<Mutex<Vec<Record>>>,
    scope: Scope,
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new(LogLevel::Info)
    }
}

impl MemorySink {
    /// Creates a sink that accepts records at `min_level` and above.
    pub fn new(min_level: LogLevel) -> Self {
        Self {
            min_level,
            records: Arc::new(Mutex::new(Vec::new())),
            scope: Scope::default(),
        }
    }

    /// Returns the configured threshold.
    pub fn min_level(&self) -> LogLevel {
        self.min_level
    }

    /// Returns a snapshot of all captured records.
    pub fn records(&self) -> Vec<Record> {
        self.lock().clone()
    }

    /// Returns the messages of all captured records.
    pub fn messages(&self) -> Vec<String> {
        self.lock().iter().map(|r| r.message.clone()).collect()
    }

    /// Clears all captured records.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Returns the number of captured records.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true if nothing has been captured.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Record>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Sink for MemorySink {
    fn enabled(&self, level: LogLevel) -> bool {
        self.min_level.allows(level)
    }

    fn handle(&self, record: Record) -> Result<(), SinkError> {
        let record = self.scope.apply(record);
        self.lock().push(record);
        Ok(())
    }

    fn with_attrs(&self, attrs: Vec<Attr>) -> SinkRef {
        Arc::new(Self {
            min_level: self.min_level,
            records: Arc::clone(&self.records),
            scope: self.scope.with_attrs(attrs),
        })
    }

    fn with_group(&self, name: &str) -> SinkRef {
        Arc::new(Self {
            min_level: self.min_level,
            records: Arc::clone(&self.records),
            scope: self.scope.with_group(name),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::attr;

    #[test]
    fn test_threshold() {
        let sink = MemorySink::new(LogLevel::Warn);
        assert!(!sink.enabled(LogLevel::Info));
        assert!(sink.enabled(LogLevel::Warn));
        assert!(sink.enabled(LogLevel::Error));
    }

    #[test]
    fn test_derived_sinks_share_storage() {
        let sink = MemorySink::new(LogLevel::Debug);
        let derived = sink.with_attrs(vec![attr("id", 1)]);
        derived
            .handle(Record::new(LogLevel::Info, "from child"))
            .unwrap();
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.records()[0].attr("id"), Some(&serde_json::json!(1)));
    }
}
