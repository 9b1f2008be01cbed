#![warn(missing_docs)]
//! # log-recall
//!
//! Debug logs for free on error, silence on success.
//!
//! Work wrapped by a [`Recaller`] logs through the sink carried by its
//! [`Context`]. Debug records below the active level stay invisible while the
//! work succeeds. When the work fails they are recalled: replayed from a
//! buffer, or produced again by a second run with debug promoted.
//!
//! ## Architecture
//!
//! ```text
//!  caller ──► Recaller::call(f) ──► guard (panic recovery)
//!                 │                        │
//!                 │ RecallOnError          │ Recording
//!                 ▼                        ▼
//!      run f; on failure run f      run f once with BufferingSink
//!      again with LevelPromotingSink  │  success → discard
//!                 │                   │  failure → flush (replay)
//!                 ▼                   ▼
//!            context sink ──────► real sink (TracingSink by default)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use log_recall::{CaptureStrategy, Context, Recaller, attr};
//!
//! let recaller = Recaller::new(Context::background())
//!     .with_capture_strategy(CaptureStrategy::Recording);
//!
//! let user = recaller.call(|ctx| {
//!     let log = ctx.logger();
//!     log.debug("looking up user", [attr("id", 42)]);
//!     find_user(42)
//! })?;
//! ```
//!
//! ## Module Structure
//!
//! - [`policy`] - the [`Recaller`] engine and [`CaptureStrategy`]
//! - [`sink`] - the [`Sink`] trait and its implementations
//! - [`context`] - [`Context`] and the process-wide default sink
//! - [`boundary`] - HTTP request-boundary adapter
//! - [`interceptor`] - RPC middleware adapter

pub mod boundary;
mod constants;
pub mod context;
mod error;
mod format;
pub mod interceptor;
mod logger;
pub mod policy;
mod recovery;
pub mod sink;

pub use constants::{
    DEFAULT_BODY_CAPTURE_LIMIT, DEFAULT_MESSAGE_FORMAT, DEFAULT_REDACTION_REPLACEMENT,
    DEFAULT_SENSITIVE_HEADERS, MESSAGE_PLACEHOLDER, PROCEDURE_KEY, RECALL_ATTR_KEY,
    REQUEST_ID_KEY,
};
pub use context::{Context, default_sink, reset_default_sink, set_default_sink};
pub use error::{ConfigError, PanicError, SinkError, panic_message};
pub use format::MessageFormat;
pub use logger::Logger;
pub use policy::{CaptureStrategy, ErrorFilter, Recaller};
pub use sink::{
    Attr, BufferingSink, ChildSink, LevelPromotingSink, LogLevel, MemorySink, Record, Sink,
    SinkRef, TracingSink, attr,
};

/// Convenient re-exports for wrapping work.
pub mod prelude {
    pub use crate::{
        Attr, CaptureStrategy, Context, LogLevel, Logger, PanicError, Recaller, Sink, SinkRef,
        attr,
    };
}

#[cfg(test)]
mod tests;
