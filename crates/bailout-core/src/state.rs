//! Per-thread failure state.
//!
//! Each guard owns a fresh state for the duration of its body: the
//! "failing" flag and the queue of notes raised while the primary failure
//! unwinds. Entering a guard saves the enclosing state and leaving it
//! restores that state, so nested guards and tests on other threads never
//! observe each other.

use std::cell::RefCell;
use std::sync::Arc;

use bailout_trace::{BacktraceCapture, RawTrace, StackCapture};

#[derive(Default)]
struct FailureState {
    failing: bool,
    /// Rendered values of the primary failure, while `failing` is set.
    primary: Option<String>,
    queued: Vec<String>,
    guarded: bool,
    capture: Option<Arc<dyn StackCapture + Send + Sync>>,
}

thread_local! {
    static STATE: RefCell<FailureState> = RefCell::new(FailureState::default());
}

/// True while a primary failure is unwinding on this thread, or while the
/// thread is unwinding any other panic. Raising in either case must not
/// panic again. Stays true under a guard when user code caught the
/// failure; the guard reports it when the body returns.
pub fn is_failing() -> bool {
    std::thread::panicking() || STATE.with(|state| state.borrow().failing)
}

/// True while a guard is running on this thread.
pub fn is_guarded() -> bool {
    STATE
        .try_with(|state| state.try_borrow().map(|s| s.guarded).unwrap_or(false))
        .unwrap_or(false)
}

/// Notes queued so far in the current unwind.
pub fn queued() -> Vec<String> {
    STATE.with(|state| state.borrow().queued.clone())
}

/// Mark the start of a primary failure.
///
/// The flag is only set under a guard: outside one nothing would ever
/// reset it, and every later raise on the thread would be queued.
pub(crate) fn begin_failure(primary: String) {
    STATE.with(|state| {
        let mut state = state.borrow_mut();
        state.failing = state.guarded;
        state.primary = state.guarded.then_some(primary);
        state.queued.clear();
    });
}

pub(crate) fn enqueue(note: String) {
    STATE.with(|state| state.borrow_mut().queued.push(note));
}

/// Reset to "not failing" and hand back the queued notes.
pub(crate) fn finish() -> Vec<String> {
    STATE.with(|state| {
        let mut state = state.borrow_mut();
        state.failing = false;
        state.primary = None;
        std::mem::take(&mut state.queued)
    })
}

/// State left behind by an unwind that user code stopped before it reached
/// the guard.
#[derive(Debug, Default, PartialEq)]
pub(crate) struct Swallowed {
    /// Rendered values of the caught primary failure, if it was one.
    pub primary: Option<String>,
    pub notes: Vec<String>,
}

/// Reset the state, returning what was left in it if anything was.
pub(crate) fn take_swallowed() -> Option<Swallowed> {
    STATE.with(|state| {
        let mut state = state.borrow_mut();
        if !state.failing && state.queued.is_empty() {
            return None;
        }
        state.failing = false;
        Some(Swallowed {
            primary: state.primary.take(),
            notes: std::mem::take(&mut state.queued),
        })
    })
}

/// Capture the current stack with the active guard's capture.
pub(crate) fn capture() -> RawTrace {
    let capture = STATE.with(|state| state.borrow().capture.clone());
    match capture {
        Some(capture) => capture.capture(),
        None => BacktraceCapture.capture(),
    }
}

/// Restores the enclosing state on drop.
pub(crate) struct Scope {
    previous: Option<FailureState>,
}

pub(crate) fn enter(capture: Arc<dyn StackCapture + Send + Sync>) -> Scope {
    let fresh = FailureState {
        guarded: true,
        capture: Some(capture),
        ..FailureState::default()
    };
    let previous = STATE.with(|state| state.replace(fresh));
    Scope {
        previous: Some(previous),
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            let _ = STATE.try_with(|state| state.replace(previous));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bailout_trace::FixedCapture;

    #[test]
    fn test_begin_failure_clears_queue() {
        let _scope = enter(Arc::new(FixedCapture::default()));
        enqueue("stale".to_string());
        begin_failure("primary".to_string());
        assert!(is_failing());
        assert!(queued().is_empty());
    }

    #[test]
    fn test_finish_resets_state() {
        let _scope = enter(Arc::new(FixedCapture::default()));
        begin_failure("primary".to_string());
        enqueue("a".to_string());
        enqueue("b".to_string());
        assert_eq!(finish(), vec!["a", "b"]);
        assert!(!is_failing());
        assert!(queued().is_empty());
    }

    #[test]
    fn test_scope_restores_enclosing_state() {
        assert!(!is_guarded());
        {
            let _outer = enter(Arc::new(FixedCapture::default()));
            begin_failure("primary".to_string());
            enqueue("outer".to_string());
            {
                let _inner = enter(Arc::new(FixedCapture::default()));
                assert!(is_guarded());
                assert!(!is_failing());
                assert!(queued().is_empty());
            }
            assert!(is_failing());
            assert_eq!(queued(), vec!["outer"]);
            finish();
        }
        assert!(!is_guarded());
    }

    #[test]
    fn test_unguarded_failure_leaves_flag_clear() {
        begin_failure("primary".to_string());
        assert!(!is_failing());
        assert_eq!(take_swallowed(), None);
    }

    #[test]
    fn test_take_swallowed_returns_leftovers() {
        let _scope = enter(Arc::new(FixedCapture::default()));
        assert_eq!(take_swallowed(), None);

        begin_failure("caught".to_string());
        enqueue("Failure on defer: late".to_string());
        assert_eq!(
            take_swallowed(),
            Some(Swallowed {
                primary: Some("caught".to_string()),
                notes: vec!["Failure on defer: late".to_string()],
            })
        );
        assert!(!is_failing());
        assert_eq!(take_swallowed(), None);
    }
}
