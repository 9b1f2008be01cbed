//! Structured log sinks.
//!
//! A [`Sink`] is a leveled, attributed log destination. The crate ships a
//! small closed set of implementations behind the one trait:
//!
//! - **forward**: [`TracingSink`], the process default, forwards into `tracing`
//! - **memory**: [`MemorySink`], captures records in memory
//! - **promote**: [`LevelPromotingSink`], makes debug records visible
//! - **buffer**: [`BufferingSink`] and [`ChildSink`], hold suppressed records
//!   until a failure replays them
//!
//! Callers normally go through a [`crate::Logger`], which checks
//! [`Sink::enabled`] before building a record, so `handle` may assume the
//! level was already accepted.

mod buffer;
mod forward;
mod memory;
mod promote;
mod types;

use crate::error::SinkError;
use std::sync::Arc;

pub use buffer::{BufferingSink, ChildSink};
pub use forward::TracingSink;
pub use memory::MemorySink;
pub use promote::LevelPromotingSink;
pub use types::{Attr, LogLevel, Record, attr};

/// Shared handle to a sink.
pub type SinkRef = Arc<dyn Sink>;

/// A structured log destination.
pub trait Sink: Send + Sync {
    /// Reports whether records at `level` would be emitted.
    fn enabled(&self, level: LogLevel) -> bool;

    /// Emits a record.
    fn handle(&self, record: Record) -> Result<(), SinkError>;

    /// Derives a sink that appends `attrs` to every record.
    fn with_attrs(&self, attrs: Vec<Attr>) -> SinkRef;

    /// Derives a sink that places record attributes under `name`.
    fn with_group(&self, name: &str) -> SinkRef;
}

/// Attributes and group bound onto a derived sink.
///
/// Shared by the sinks that implement the usual nesting semantics, where a
/// group chain `g1` then `g2` places call-site attributes under `g1.g2.`.
#[derive(Debug, Clone, Default)]
pub(crate) struct Scope {
    attrs: Vec<Attr>,
    group: Option<String>,
}

impl Scope {
    pub(crate) fn with_attrs(&self, attrs: Vec<Attr>) -> Self {
        let mut next = self.clone();
        next.attrs.extend(attrs.into_iter().map(|a| match &self.group {
            Some(group) => a.grouped(group),
            None => a,
        }));
        next
    }

    pub(crate) fn with_group(&self, name: &str) -> Self {
        let group = match &self.group {
            Some(parent) => format!("{}.{}", parent, name),
            None => name.to_string(),
        };
        Self {
            attrs: self.attrs.clone(),
            group: Some(group),
        }
    }

    /// Applies the scope to a record: groups its own attributes, then appends
    /// the bound attributes.
    pub(crate) fn apply(&self, record: Record) -> Record {
        if self.attrs.is_empty() && self.group.is_none() {
            return record;
        }
        let mut record = match &self.group {
            Some(group) => record.regrouped(group),
            None => record,
        };
        record.attrs.extend(self.attrs.iter().cloned());
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_nests_groups() {
        let scope = Scope::default().with_group("g1").with_group("g2");
        let record = scope.apply(Record::new(LogLevel::Info, "m").with_attrs([attr("a", 1)]));
        assert_eq!(record.attrs[0].key, "g1.g2.a");
    }

    #[test]
    fn test_scope_attrs_bound_after_group_are_grouped() {
        let scope = Scope::default()
            .with_attrs(vec![attr("id", 7)])
            .with_group("req")
            .with_attrs(vec![attr("path", "/x")]);
        let record = scope.apply(Record::new(LogLevel::Info, "m").with_attrs([attr("a", 1)]));
        let keys: Vec<_> = record.attrs.iter().map(|a| a.key.as_str()).collect();
        assert_eq!(keys, vec!["req.a", "id", "req.path"]);
    }
}
