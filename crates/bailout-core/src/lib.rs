//! Fail-fast helpers for tests.
//!
//! Wrap a test body in [`guarded`] (or a configured [`Guard`]) and use the
//! raise helpers inside it. The first failure unwinds to the guard, which
//! reports the failure values, the stack trace of the user code that raised
//! it, and any failures raised by cleanup code during the unwind.
//!
//! ```ignore
//! #[test]
//! fn writes_config() {
//!     bailout_core::guarded(|| {
//!         let file = std::fs::File::create("/tmp/config.json");
//!         bailout_core::if_not!(file.is_ok(), "could not create config");
//!         let _close = bailout_core::defer_close(|| std::fs::remove_file("/tmp/config.json"), vec![]);
//!         bailout_core::if_err!(std::fs::write("/tmp/config.json", b"{}"), "writing config");
//!     });
//! }
//! ```

pub mod raise;
pub mod recover;
pub mod signal;
pub mod state;
pub mod timeout;

pub use raise::{
    build_failure, defer, defer_close, fail_now, if_deferred_err, if_err, if_not, Deferred,
    DEFER_NOTE_PREFIX,
};
pub use recover::{guarded, using, Guard, PanicReporter, Reporter, CAUGHT_NOTE_PREFIX};
pub use signal::{render_report, render_values, Failure, ReportValue};
pub use timeout::{completes_within, within, within_async, Completion, TimeoutError};

pub use bailout_trace::{FixedCapture, Frame, StackCapture, TraceConfig};
