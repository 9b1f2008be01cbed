//! Test module for log-recall
//!
//! Unit and property-based tests (proptest) for the sinks, the recall policy
//! and the request-boundary adapters.


#[cfg(test)]
pub mod promote_tests;




#[cfg(test)]
pub mod interceptor_tests;

use crate::error::{PanicError, SinkError};
use crate::sink::{Attr, LogLevel, Record, Sink, SinkRef};
use std::io::Write;
use std::sync::{Arc, Mutex};

/// Error type returned by work in tests.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WorkError {
    #[error("failed: {0}")]
    Failed(String),
    #[error("not found")]
    NotFound,
    #[error(transparent)]
    Panic(#[from] PanicError),
}

impl WorkError {
    pub fn failed(msg: &str) -> Self {
        Self::Failed(msg.to_string())
    }
}

/// A sink that suppresses everything and rejects every record it is handed.
#[derive(Debug, Clone, Default)]
pub struct FailingSink;

impl Sink for FailingSink {
    fn enabled(&self, _level: LogLevel) -> bool {
        false
    }

    fn handle(&self, _record: Record) -> Result<(), SinkError> {
        Err(SinkError::rejected("bad"))
    }

    fn with_attrs(&self, _attrs: Vec<Attr>) -> SinkRef {
        Arc::new(self.clone())
    }

    fn with_group(&self, _name: &str) -> SinkRef {
        Arc::new(self.clone())
    }
}

/// An in-memory writer whose contents stay readable after it is moved.
#[derive(Debug, Clone, Default)]
pub struct SharedWriter(Arc<Mutex<Vec<u8>>>);

impl SharedWriter {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for SharedWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
