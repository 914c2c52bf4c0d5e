//! Completion probes: does a procedure finish before a deadline?
//!
//! The procedure is never cancelled. When the deadline wins, the thread or
//! task running it is abandoned and left to finish on its own.

use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::thread;
use std::time::Duration;

use crossbeam::channel::{self, RecvTimeoutError};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum TimeoutError {
    #[error("Failed to spawn probe thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Outcome of racing a procedure against a deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Completion {
    Completed,
    TimedOut,
    /// The procedure panicked before the deadline.
    Panicked,
}

impl Completion {
    pub fn is_completed(self) -> bool {
        self == Completion::Completed
    }
}

/// Run `procedure` on its own thread and wait at most `deadline` for it.
pub fn within<F>(deadline: Duration, procedure: F) -> Result<Completion, TimeoutError>
where
    F: FnOnce() + Send + 'static,
{
    let (done_tx, done_rx) = channel::bounded(1);
    thread::Builder::new()
        .name("bailout-probe".to_string())
        .spawn(move || {
            let finished = panic::catch_unwind(AssertUnwindSafe(procedure)).is_ok();
            // The receiver is gone once the deadline has passed.
            let _ = done_tx.send(finished);
        })?;

    let completion = match done_rx.recv_timeout(deadline) {
        Ok(true) => Completion::Completed,
        Ok(false) | Err(RecvTimeoutError::Disconnected) => Completion::Panicked,
        Err(RecvTimeoutError::Timeout) => Completion::TimedOut,
    };
    tracing::debug!(?deadline, ?completion, "probe finished");
    Ok(completion)
}

/// Whether `procedure` completes within `deadline`. Spawn failures count
/// as not completing.
pub fn completes_within<F>(deadline: Duration, procedure: F) -> bool
where
    F: FnOnce() + Send + 'static,
{
    matches!(within(deadline, procedure), Ok(Completion::Completed))
}

/// Spawn `future` on the current tokio runtime and wait at most `deadline`
/// for it. On timeout the task is detached, not aborted.
pub async fn within_async<Fut>(deadline: Duration, future: Fut) -> Completion
where
    Fut: Future<Output = ()> + Send + 'static,
{
    let handle = tokio::spawn(future);
    let completion = match tokio::time::timeout(deadline, handle).await {
        Ok(Ok(())) => Completion::Completed,
        Ok(Err(_join_error)) => Completion::Panicked,
        Err(_elapsed) => Completion::TimedOut,
    };
    tracing::debug!(?deadline, ?completion, "async probe finished");
    completion
}
