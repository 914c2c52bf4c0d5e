//! Raising failures.
//!
//! The first failure on a thread panics with a [`Failure`] payload and
//! becomes the primary failure. Anything raised while that panic unwinds
//! (typically from a drop guard) is turned into a note and queued instead,
//! since panicking while already panicking aborts the process.

use std::error::Error;
use std::panic;

use crate::signal::{render_values, Failure, ReportValue};
use crate::state;

/// Prefix of every note queued during an unwind.
pub const DEFER_NOTE_PREFIX: &str = "Failure on defer: ";

/// Mark this thread as failing and build the signal, capturing the stack.
///
/// Outside a guard the failing flag is left clear; raises made while the
/// resulting panic unwinds are still queued.
pub fn build_failure(values: Vec<ReportValue>) -> Failure {
    state::begin_failure(render_values(&values));
    Failure::new(values, Some(state::capture()))
}

/// Raise a failure now.
///
/// Panics with the failure unless this thread is already unwinding, in
/// which case the values are queued as a note and this returns normally.
pub fn fail_now(values: Vec<ReportValue>) {
    if state::is_failing() {
        let note = format!("{DEFER_NOTE_PREFIX}{}", render_values(&values));
        tracing::debug!(%note, "failure raised during unwind, queued");
        state::enqueue(note);
        return;
    }

    let failure = build_failure(values);
    tracing::debug!(failure = %failure, "raising failure");
    panic::panic_any(failure);
}

/// Raise if `result` is an error. The error becomes the first value.
pub fn if_err<E>(result: Result<(), E>, extra: Vec<ReportValue>)
where
    E: Error + Send + Sync + 'static,
{
    if let Err(err) = result {
        let mut values = Vec::with_capacity(extra.len() + 1);
        values.push(ReportValue::error(err));
        values.extend(extra);
        fail_now(values);
    }
}

/// Run a cleanup operation and raise if it fails.
pub fn if_deferred_err<F, E>(close: F, extra: Vec<ReportValue>)
where
    F: FnOnce() -> Result<(), E>,
    E: Error + Send + Sync + 'static,
{
    if_err(close(), extra);
}

/// Raise with `extra` if `condition` does not hold.
pub fn if_not(condition: bool, extra: Vec<ReportValue>) {
    if !condition {
        fail_now(extra);
    }
}

/// Runs a closure when dropped. Returned by [`defer`] and [`defer_close`].
#[must_use = "the closure runs when the guard is dropped"]
pub struct Deferred<F: FnOnce()> {
    run: Option<F>,
}

impl<F: FnOnce()> Deferred<F> {
    /// Drop the guard without running the closure.
    pub fn cancel(mut self) {
        self.run = None;
    }
}

impl<F: FnOnce()> Drop for Deferred<F> {
    fn drop(&mut self) {
        if let Some(run) = self.run.take() {
            run();
        }
    }
}

/// Run `f` when the returned guard goes out of scope.
pub fn defer<F: FnOnce()>(f: F) -> Deferred<F> {
    Deferred { run: Some(f) }
}

/// Run a cleanup operation when the returned guard goes out of scope,
/// raising if it fails.
pub fn defer_close<C, E>(close: C, extra: Vec<ReportValue>) -> Deferred<impl FnOnce()>
where
    C: FnOnce() -> Result<(), E>,
    E: Error + Send + Sync + 'static,
{
    defer(move || if_deferred_err(close, extra))
}

/// Build a `Vec<ReportValue>` from anything convertible.
#[macro_export]
macro_rules! report_args {
    ($($value:expr),* $(,)?) => {
        ::std::vec![$($crate::ReportValue::from($value)),*]
    };
}

/// Raise if the `Result<(), E>` is an error.
///
/// ```ignore
/// if_err!(file.sync_all(), "syncing ", path.display().to_string());
/// ```
#[macro_export]
macro_rules! if_err {
    ($result:expr $(, $value:expr)* $(,)?) => {
        $crate::raise::if_err($result, $crate::report_args!($($value),*))
    };
}

/// Run a cleanup closure and raise if it fails.
#[macro_export]
macro_rules! if_deferred {
    ($close:expr $(, $value:expr)* $(,)?) => {
        $crate::raise::if_deferred_err($close, $crate::report_args!($($value),*))
    };
}

/// Raise if the condition is false.
#[macro_export]
macro_rules! if_not {
    ($condition:expr $(, $value:expr)* $(,)?) => {
        $crate::raise::if_not($condition, $crate::report_args!($($value),*))
    };
}

/// Raise unconditionally.
#[macro_export]
macro_rules! fail_now {
    ($($value:expr),* $(,)?) => {
        $crate::raise::fail_now($crate::report_args!($($value),*))
    };
}
