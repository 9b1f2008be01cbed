//! Unit-of-work context carrying a log sink.
//!
//! A [`Context`] wraps caller state (request ids, handles, anything the work
//! needs) together with an optional sink. Work wrapped by a
//! [`crate::Recaller`] logs through [`Context::logger`], so the policy can swap
//! the sink without the work noticing.
//!
//! When no sink is attached the process-wide default is used. The default is
//! a [`TracingSink`] until replaced with [`set_default_sink`];
//! [`reset_default_sink`] restores it, which keeps tests isolated.

use crate::logger::Logger;
use crate::sink::{SinkRef, TracingSink};
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

static DEFAULT_SINK: LazyLock<RwLock<SinkRef>> =
    LazyLock::new(|| RwLock::new(Arc::new(TracingSink::new())));

/// Returns the process-wide default sink.
pub fn default_sink() -> SinkRef {
    DEFAULT_SINK
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// Replaces the process-wide default sink, returning the previous one.
pub fn set_default_sink(sink: SinkRef) -> SinkRef {
    let mut guard = DEFAULT_SINK.write().unwrap_or_else(PoisonError::into_inner);
    std::mem::replace(&mut *guard, sink)
}

/// Restores the process-wide default sink to a [`TracingSink`].
pub fn reset_default_sink() {
    set_default_sink(Arc::new(TracingSink::new()));
}

/// Context for a unit of work.
///
/// Cloning is cheap: the caller state sits behind an `Arc` and the sink is a
/// shared handle.
pub struct Context<T: Send + Sync + 'static = ()> {
    inner: Arc<T>,
    sink: Option<SinkRef>,
}

impl Context<()> {
    /// An empty context with no attached sink.
    pub fn background() -> Self {
        Self::new(())
    }
}

impl<T: Send + Sync + 'static> Context<T> {
    /// Creates a context wrapping the given value.
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(value),
            sink: None,
        }
    }

    /// Returns a copy of this context carrying `sink`.
    pub fn with_sink(&self, sink: SinkRef) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            sink: Some(sink),
        }
    }

    /// Returns the attached sink, or the process-wide default.
    pub fn sink(&self) -> SinkRef {
        match &self.sink {
            Some(sink) => Arc::clone(sink),
            None => default_sink(),
        }
    }

    /// Returns true if a sink was attached to this context.
    pub fn has_sink(&self) -> bool {
        self.sink.is_some()
    }

    /// Returns a logger writing to [`Context::sink`].
    pub fn logger(&self) -> Logger {
        Logger::new(self.sink())
    }

    /// Get a reference to the inner value
    pub fn inner(&self) -> &T {
        &self.inner
    }

    /// Get the Arc for sharing
    pub fn arc(&self) -> Arc<T> {
        Arc::clone(&self.inner)
    }
}

impl<T: Send + Sync + 'static> Clone for Context<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            sink: self.sink.clone(),
        }
    }
}

impl<T: Send + Sync + 'static> std::ops::Deref for Context<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<T: Send + Sync + 'static + Default> Default for Context<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Send + Sync + 'static + std::fmt::Debug> std::fmt::Debug for Context<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("inner", &self.inner)
            .field("has_sink", &self.sink.is_some())
            .finish()
    }
}
