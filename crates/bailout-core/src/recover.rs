//! The recovery point.
//!
//! A [`Guard`] runs a test body, catches the primary [`Failure`] it raises,
//! reduces the stack captured at the raise site to the user-code frames and
//! hands the combined report to a [`Reporter`] exactly once. Panics that are
//! not failures pass through untouched.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Once};

use bailout_trace::{
    reduce, render, BacktraceCapture, ConfigError, FrameFilter, RawTrace, StackCapture,
    TraceConfig,
};

use crate::signal::{render_report, Failure, ReportValue};
use crate::state;

/// Prefix of the report made when a failure was caught inside the test body
/// and never reached the guard.
pub const CAUGHT_NOTE_PREFIX: &str = "Failure caught before reaching the guard: ";

/// Receives the values of a caught failure.
pub trait Reporter {
    fn report(&self, values: Vec<ReportValue>);
}

impl<F> Reporter for F
where
    F: Fn(Vec<ReportValue>),
{
    fn report(&self, values: Vec<ReportValue>) {
        self(values)
    }
}

/// Fails the enclosing test by panicking with the rendered report.
#[derive(Debug, Clone, Copy, Default)]
pub struct PanicReporter;

impl Reporter for PanicReporter {
    fn report(&self, values: Vec<ReportValue>) {
        panic!("{}", render_report(&values));
    }
}

/// Recovery point for one test body.
#[derive(Clone)]
pub struct Guard {
    config: TraceConfig,
    filter: FrameFilter,
    capture: Arc<dyn StackCapture + Send + Sync>,
}

impl Guard {
    pub fn new(config: TraceConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            filter: FrameFilter::new(&config),
            config,
            capture: Arc::new(BacktraceCapture),
        })
    }

    /// Default config with environment overrides applied.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::new(TraceConfig::default().with_env_overrides()?)
    }

    /// Replace the stack capture used by failures raised under this guard.
    pub fn with_capture(mut self, capture: impl StackCapture + Send + Sync + 'static) -> Self {
        self.capture = Arc::new(capture);
        self
    }

    pub fn config(&self) -> &TraceConfig {
        &self.config
    }

    /// Run `body`, reporting a raised failure to `reporter`.
    pub fn run<R, F>(&self, reporter: &R, body: F)
    where
        R: Reporter + ?Sized,
        F: FnOnce(),
    {
        install_quiet_hook();
        let scope = state::enter(Arc::clone(&self.capture));

        let payload = match panic::catch_unwind(AssertUnwindSafe(|| enter_test_body(body))) {
            Ok(()) => {
                let swallowed = state::take_swallowed();
                drop(scope);
                if let Some(swallowed) = swallowed {
                    tracing::warn!(
                        primary = ?swallowed.primary,
                        notes = ?swallowed.notes,
                        "test body returned with a failure caught before the guard"
                    );
                    reporter.report(swallowed_report(swallowed));
                }
                return;
            }
            Err(payload) => payload,
        };

        match payload.downcast::<Failure>() {
            Ok(failure) => {
                let values = self.collect(*failure);
                drop(scope);
                reporter.report(values);
            }
            Err(foreign) => {
                let dropped = state::finish();
                if !dropped.is_empty() {
                    tracing::warn!(
                        notes = ?dropped,
                        "discarding queued failures, a foreign panic is unwinding"
                    );
                }
                drop(scope);
                panic::resume_unwind(foreign);
            }
        }
    }

    /// Append the reduced trace and the queued notes, then reset the state.
    fn collect(&self, failure: Failure) -> Vec<ReportValue> {
        let (mut values, raw) = failure.into_parts();
        let frames = raw.map(RawTrace::into_frames).unwrap_or_default();
        let reduced = reduce(&frames, &self.filter, self.config.max_passes);
        tracing::debug!(
            raw_frames = frames.len(),
            reduced_frames = reduced.len(),
            "recovered failure"
        );

        values.push(ReportValue::Trace(render(&reduced)));
        values.extend(state::finish().into_iter().map(ReportValue::Text));
        values
    }
}

/// Report for a body that returned normally after user code caught a
/// failure: the caught failure, an empty trace, then the queued notes.
fn swallowed_report(swallowed: state::Swallowed) -> Vec<ReportValue> {
    let primary = swallowed.primary.unwrap_or_else(|| "panic".to_string());
    let mut values = Vec::with_capacity(swallowed.notes.len() + 2);
    values.push(ReportValue::Text(format!("{CAUGHT_NOTE_PREFIX}{primary}")));
    values.push(ReportValue::Trace(String::new()));
    values.extend(swallowed.notes.into_iter().map(ReportValue::Text));
    values
}

impl Default for Guard {
    fn default() -> Self {
        Self {
            config: TraceConfig::default(),
            filter: FrameFilter::default(),
            capture: Arc::new(BacktraceCapture),
        }
    }
}

/// Run `body` under a default guard, reporting to `reporter`.
pub fn using<R, F>(reporter: &R, body: F)
where
    R: Reporter + ?Sized,
    F: FnOnce(),
{
    Guard::default().run(reporter, body)
}

/// Run `body` under a guard configured from the environment; a caught
/// failure fails the current test.
pub fn guarded<F: FnOnce()>(body: F) {
    let guard = Guard::from_env().unwrap_or_else(|err| {
        tracing::warn!(%err, "ignoring invalid trace configuration");
        Guard::default()
    });
    guard.run(&PanicReporter, body)
}

/// Frame marking where control enters user code; reduction stops here.
#[inline(never)]
fn enter_test_body<F: FnOnce()>(body: F) {
    body()
}

static QUIET_HOOK: Once = Once::new();

/// Silence the default panic message for failures raised under a guard;
/// the guard reports them itself.
fn install_quiet_hook() {
    QUIET_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if info.payload().is::<Failure>() && state::is_guarded() {
                return;
            }
            previous(info);
        }));
    });
}
