//! Error types.
//!
//! - [`ConfigError`]: invalid configuration, reported at construction time
//! - [`PanicError`]: a recovered panic of the wrapped work
//! - [`SinkError`]: a sink refused a record
//!
//! Errors returned by the wrapped work itself are the caller's own type and
//! pass through unchanged. [`crate::Recaller::call`] only requires that type to
//! implement `From<PanicError>`.

use std::any::Any;
use std::backtrace::Backtrace;
use thiserror::Error;

/// Configuration validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The message format does not contain exactly one placeholder.
    #[error("message format {format:?} must contain exactly one %s placeholder, found {placeholders}")]
    InvalidMessageFormat {
        /// The rejected format string.
        format: String,
        /// How many placeholders were found.
        placeholders: usize,
    },
}

/// A panic of the wrapped work, recovered and converted into an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("panic: {message}, stack:{backtrace}")]
pub struct PanicError {
    /// The panic payload rendered as text.
    pub message: String,
    /// Backtrace taken where the panic was raised.
    pub backtrace: String,
}

impl PanicError {
    /// Builds a panic error from a `catch_unwind` payload.
    ///
    /// Uses the backtrace recorded on this thread when the panic was raised
    /// under an armed recovery guard. Otherwise the backtrace is captured
    /// here and only shows the caller.
    pub fn from_payload(payload: Box<dyn Any + Send>) -> Self {
        Self {
            message: panic_message(payload.as_ref()),
            backtrace: crate::recovery::take_panic_backtrace()
                .unwrap_or_else(|| Backtrace::force_capture().to_string()),
        }
    }
}

/// Extracts the panic message from a payload.
///
/// `panic!` with a literal produces `&'static str`, a formatted panic
/// produces `String`; anything else is opaque.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Box<dyn Any>".to_string()
    }
}

/// A sink failed to accept a record.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SinkError {
    /// The sink rejected the record.
    #[error("sink rejected record: {0}")]
    Rejected(String),
    /// Writing the record failed.
    #[error("sink write failed: {0}")]
    Io(#[from] std::io::Error),
}

impl SinkError {
    /// Convenience constructor for [`SinkError::Rejected`].
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected(reason.into())
    }
}
