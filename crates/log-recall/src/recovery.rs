//! Guarded execution boundary.
//!
//! Each execution attempt of wrapped work runs behind exactly one guard. With
//! recovery enabled a panic is caught and turned into a [`PanicError`];
//! without it the panic unwinds through the guard untouched.
//!
//! The stack snapshot has to be taken while the panicking frames still exist,
//! so the first armed guard installs a process panic hook (chained in front of
//! the previous one). While a guard is armed on the current thread the hook
//! records a backtrace in a thread-local slot, which [`PanicError::from_payload`]
//! takes after the unwind is caught. A hook installed later with
//! `std::panic::set_hook` replaces ours; the snapshot then falls back to the
//! recovery boundary.

use crate::error::PanicError;
use futures::FutureExt;
use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};
use std::future::{Future, poll_fn};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::pin::pin;
use std::sync::Once;

thread_local! {
    static ARMED: Cell<usize> = const { Cell::new(0) };
    static PANIC_BACKTRACE: RefCell<Option<String>> = const { RefCell::new(None) };
}

static HOOK: Once = Once::new();

fn install_hook() {
    HOOK.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            if ARMED.try_with(Cell::get).unwrap_or(0) > 0 {
                let trace = Backtrace::force_capture().to_string();
                let _ = PANIC_BACKTRACE.try_with(|slot| *slot.borrow_mut() = Some(trace));
            }
            previous(info);
        }));
    });
}

/// Marks the current thread as running guarded work until dropped.
struct Armed;

impl Armed {
    fn new() -> Self {
        install_hook();
        ARMED.with(|depth| depth.set(depth.get() + 1));
        Self
    }
}

impl Drop for Armed {
    fn drop(&mut self) {
        ARMED.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// Takes the backtrace recorded by the panic hook on this thread, if any.
pub(crate) fn take_panic_backtrace() -> Option<String> {
    PANIC_BACKTRACE.with(|slot| slot.borrow_mut().take())
}

fn recovered(payload: Box<dyn std::any::Any + Send>) -> PanicError {
    let err = PanicError::from_payload(payload);
    tracing::debug!(panic = %err.message, "recovered panic in wrapped work");
    err
}

/// Runs `f`, catching a panic when `recover` is set.
pub(crate) fn guard<R>(recover: bool, f: impl FnOnce() -> R) -> Result<R, PanicError> {
    if !recover {
        return Ok(f());
    }
    let armed = Armed::new();
    take_panic_backtrace();
    let outcome = catch_unwind(AssertUnwindSafe(f));
    drop(armed);
    outcome.map_err(recovered)
}

/// Async counterpart of [`guard`]: a panic while polling `fut` is caught.
///
/// The guard is armed for the duration of each poll, on whichever thread
/// performs it.
pub(crate) async fn guard_async<Fut: Future>(
    recover: bool,
    fut: Fut,
) -> Result<Fut::Output, PanicError> {
    if !recover {
        return Ok(fut.await);
    }
    let mut caught = pin!(AssertUnwindSafe(fut).catch_unwind());
    let outcome = poll_fn(|cx| {
        let _armed = Armed::new();
        caught.as_mut().poll(cx)
    })
    .await;
    outcome.map_err(recovered)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_passes_value_through() {
        assert_eq!(guard(true, || 7).unwrap(), 7);
        assert_eq!(guard(false, || 7).unwrap(), 7);
    }

    #[test]
    fn test_guard_catches_panic() {
        let err = guard(true, || -> u8 { panic!("boom") }).unwrap_err();
        assert_eq!(err.message, "boom");
        assert!(!err.backtrace.is_empty());
    }

    #[test]
    #[should_panic(expected = "boom")]
    fn test_guard_without_recovery_propagates() {
        let _ = guard(false, || -> u8 { panic!("boom") });
    }

    #[inline(never)]
    fn exploding_helper() -> u8 {
        panic!("deep")
    }

    #[test]
    fn test_backtrace_points_at_panic_site() {
        let err = guard(true, exploding_helper).unwrap_err();
        assert!(
            err.backtrace.contains("exploding_helper"),
            "backtrace lacks the panicking frame:\n{}",
            err.backtrace
        );
    }

    #[test]
    fn test_hook_is_disarmed_after_guard() {
        let _ = guard(true, || 1);
        let _ = catch_unwind(|| -> u8 { panic!("outside any guard") });
        assert!(take_panic_backtrace().is_none());
    }

    #[test]
    fn test_guard_async_catches_panic() {
        let outcome = futures::executor::block_on(guard_async(true, async {
            panic!("async boom");
        }));
        let err: PanicError = outcome.unwrap_err();
        assert_eq!(err.message, "async boom");
    }

    #[test]
    fn test_guard_async_backtrace_points_at_panic_site() {
        let outcome = futures::executor::block_on(guard_async(true, async {
            exploding_helper()
        }));
        let err = outcome.unwrap_err();
        assert!(err.backtrace.contains("exploding_helper"), "{}", err.backtrace);
    }
}
