//! The recall policy.
//!
//! A [`Recaller`] wraps a unit of work and makes its suppressed debug records
//! visible when the work fails. Two strategies are available:
//!
//! - [`CaptureStrategy::RecallOnError`] runs the work once on the unmodified
//!   context and, on failure, runs it a second time with debug records
//!   promoted to a visible level. The work is called twice.
//! - [`CaptureStrategy::Recording`] runs the work once with a
//!   [`BufferingSink`] installed. Suppressed records are held back, dropped on
//!   success and replayed on failure.
//!
//! # Example
//! ```rust,ignore
//! use log_recall::{CaptureStrategy, Context, Recaller};
//!
//! let recaller = Recaller::new(Context::background())
//!     .with_message_format("[RECALL] %s")?
//!     .with_capture_strategy(CaptureStrategy::Recording);
//!
//! recaller.call(|ctx| {
//!     ctx.logger().debug("loading profile", []);
//!     load_profile()
//! })?;
//! ```

use crate::context::Context;
use crate::error::{ConfigError, PanicError};
use crate::format::MessageFormat;
use crate::recovery::{guard, guard_async};
use crate::sink::{BufferingSink, LevelPromotingSink, LogLevel, SinkRef};
use std::future::Future;
use std::sync::Arc;

/// How a [`Recaller`] captures debug records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureStrategy {
    /// Call the work again with debug records promoted when it fails.
    ///
    /// The work must be safe to invoke twice.
    #[default]
    RecallOnError,
    /// Buffer suppressed records during a single call, replay them on failure.
    ///
    /// The buffer sits in front of the policy context's sink. Only a context
    /// without an attached sink falls back to the process default, so
    /// records replay wherever the caller's context already writes.
    Recording,
}

/// Predicate deciding whether a failure is worth recalling.
///
/// Returning false skips the recall: no second call for
/// [`CaptureStrategy::RecallOnError`], no replay for
/// [`CaptureStrategy::Recording`].
pub type ErrorFilter<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// Policy that runs work and recalls its debug records on failure.
///
/// `Recaller` is an immutable value: every `with_*` method returns a modified
/// policy and cloning is cheap, so one base policy can be shared across calls
/// and threads.
///
/// # Idempotency
///
/// With the default [`CaptureStrategy::RecallOnError`] a failing (or
/// panicking) call runs the work a second time and returns the second
/// result, which may differ from the first and may even succeed. The work
/// must tolerate being invoked twice. Pick [`CaptureStrategy::Recording`]
/// for work with side effects that must not repeat.
pub struct Recaller<T: Send + Sync + 'static, E> {
    context: Context<T>,
    format: MessageFormat,
    strategy: CaptureStrategy,
    panic_recovery: bool,
    error_filter: Option<ErrorFilter<E>>,
}

impl<T: Send + Sync + 'static, E> Recaller<T, E> {
    /// Creates a policy over `context` with the default message format,
    /// [`CaptureStrategy::RecallOnError`] and panic recovery enabled.
    pub fn new(context: Context<T>) -> Self {
        Self {
            context,
            format: MessageFormat::default(),
            strategy: CaptureStrategy::default(),
            panic_recovery: true,
            error_filter: None,
        }
    }

    /// Sets the format applied to recalled messages.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidMessageFormat`] unless the format holds
    /// exactly one `%s`.
    pub fn with_message_format(mut self, format: &str) -> Result<Self, ConfigError> {
        self.format = MessageFormat::new(format)?;
        Ok(self)
    }

    /// Sets the capture strategy.
    pub fn with_capture_strategy(mut self, strategy: CaptureStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Enables or disables panic recovery. Default is enabled.
    ///
    /// When disabled, panics of the work propagate to the caller unchanged.
    pub fn with_panic_recovery(mut self, enabled: bool) -> Self {
        self.panic_recovery = enabled;
        self
    }

    /// Sets the predicate deciding which failures are recalled.
    pub fn with_error_filter(mut self, filter: impl Fn(&E) -> bool + Send + Sync + 'static) -> Self {
        self.error_filter = Some(Arc::new(filter));
        self
    }

    /// Replaces the unit-of-work context, keeping every other setting.
    pub fn with_context(mut self, context: Context<T>) -> Self {
        self.context = context;
        self
    }

    /// Returns the base context.
    pub fn context(&self) -> &Context<T> {
        &self.context
    }

    /// Returns the message format.
    pub fn message_format(&self) -> &MessageFormat {
        &self.format
    }

    /// Returns the capture strategy.
    pub fn capture_strategy(&self) -> CaptureStrategy {
        self.strategy
    }

    /// Returns whether panics are recovered.
    pub fn panic_recovery(&self) -> bool {
        self.panic_recovery
    }

    fn is_recalled(&self, err: &E) -> bool {
        self.error_filter.as_ref().is_none_or(|filter| filter(err))
    }

    fn promoted_context(&self, sink: SinkRef) -> Context<T> {
        let promoted = LevelPromotingSink::new(sink, self.format.clone());
        self.context.with_sink(Arc::new(promoted))
    }

    fn recording_sink(&self) -> BufferingSink {
        BufferingSink::new(self.context.sink(), self.format.clone())
    }
}

impl<T: Send + Sync + 'static, E: From<PanicError>> Recaller<T, E> {
    /// Runs `f` under the policy and returns its result.
    ///
    /// A recovered panic is returned as `E::from(PanicError)`.
    pub fn call<R, F>(&self, f: F) -> Result<R, E>
    where
        F: Fn(Context<T>) -> Result<R, E>,
    {
        match self.strategy {
            CaptureStrategy::RecallOnError => self.recall_on_error(&f),
            CaptureStrategy::Recording => self.record(&f),
        }
    }

    /// Runs the future returned by `f` under the policy.
    ///
    /// Behaves like [`Recaller::call`]; a panic while the future is polled
    /// counts as a panic of the work.
    pub async fn call_async<R, F, Fut>(&self, f: F) -> Result<R, E>
    where
        F: Fn(Context<T>) -> Fut,
        Fut: Future<Output = Result<R, E>>,
    {
        match self.strategy {
            CaptureStrategy::RecallOnError => self.recall_on_error_async(&f).await,
            CaptureStrategy::Recording => self.record_async(&f).await,
        }
    }

    fn recall_on_error<R, F>(&self, f: &F) -> Result<R, E>
    where
        F: Fn(Context<T>) -> Result<R, E>,
    {
        let sink = self.context.sink();
        if sink.enabled(LogLevel::Debug) {
            return settle(guard(self.panic_recovery, || f(self.context.clone())));
        }

        match guard(self.panic_recovery, || f(self.context.clone())) {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) if !self.is_recalled(&err) => Err(err),
            Ok(Err(_)) | Err(_) => {
                tracing::debug!("work failed, calling again with debug records promoted");
                let ctx = self.promoted_context(sink);
                settle(guard(self.panic_recovery, || f(ctx)))
            }
        }
    }

    async fn recall_on_error_async<R, F, Fut>(&self, f: &F) -> Result<R, E>
    where
        F: Fn(Context<T>) -> Fut,
        Fut: Future<Output = Result<R, E>>,
    {
        let sink = self.context.sink();
        if sink.enabled(LogLevel::Debug) {
            return settle(guard_async(self.panic_recovery, f(self.context.clone())).await);
        }

        match guard_async(self.panic_recovery, f(self.context.clone())).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) if !self.is_recalled(&err) => Err(err),
            Ok(Err(_)) | Err(_) => {
                tracing::debug!("work failed, calling again with debug records promoted");
                let ctx = self.promoted_context(sink);
                settle(guard_async(self.panic_recovery, f(ctx)).await)
            }
        }
    }

    fn record<R, F>(&self, f: &F) -> Result<R, E>
    where
        F: Fn(Context<T>) -> Result<R, E>,
    {
        let buffer = self.recording_sink();
        let ctx = self.context.with_sink(Arc::new(buffer.clone()));
        self.replay_on_failure(&buffer, guard(self.panic_recovery, || f(ctx)))
    }

    async fn record_async<R, F, Fut>(&self, f: &F) -> Result<R, E>
    where
        F: Fn(Context<T>) -> Fut,
        Fut: Future<Output = Result<R, E>>,
    {
        let buffer = self.recording_sink();
        let ctx = self.context.with_sink(Arc::new(buffer.clone()));
        let outcome = guard_async(self.panic_recovery, f(ctx)).await;
        self.replay_on_failure(&buffer, outcome)
    }

    fn replay_on_failure<R>(
        &self,
        buffer: &BufferingSink,
        outcome: Result<Result<R, E>, PanicError>,
    ) -> Result<R, E> {
        match outcome {
            Ok(Ok(value)) => {
                buffer.discard();
                Ok(value)
            }
            Ok(Err(err)) => {
                if self.is_recalled(&err) {
                    buffer.flush();
                } else {
                    buffer.discard();
                }
                Err(err)
            }
            Err(panic) => {
                buffer.flush();
                Err(panic.into())
            }
        }
    }
}

fn settle<R, E: From<PanicError>>(outcome: Result<Result<R, E>, PanicError>) -> Result<R, E> {
    outcome.unwrap_or_else(|panic| Err(panic.into()))
}

impl<T: Send + Sync + 'static, E> Clone for Recaller<T, E> {
    fn clone(&self) -> Self {
        Self {
            context: self.context.clone(),
            format: self.format.clone(),
            strategy: self.strategy,
            panic_recovery: self.panic_recovery,
            error_filter: self.error_filter.clone(),
        }
    }
}

impl<T: Send + Sync + 'static, E> std::fmt::Debug for Recaller<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Recaller")
            .field("format", &self.format)
            .field("strategy", &self.strategy)
            .field("panic_recovery", &self.panic_recovery)
            .field("error_filter", &self.error_filter.is_some())
            .finish_non_exhaustive()
    }
}
