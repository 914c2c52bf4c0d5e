#![allow(dead_code)]

use std::cell::RefCell;
use std::sync::Once;

use bailout_core::{FixedCapture, Frame, Guard, ReportValue, Reporter};

static TRACING: Once = Once::new();

/// Install a test-writer subscriber filtered by `RUST_LOG`, once per binary.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Records every report instead of failing the test.
#[derive(Default)]
pub struct Recorder {
    calls: RefCell<Vec<Vec<ReportValue>>>,
}

impl Recorder {
    pub fn calls(&self) -> Vec<Vec<ReportValue>> {
        self.calls.borrow().clone()
    }

    /// The single report, rendered value by value.
    pub fn only_report(&self) -> Vec<String> {
        let calls = self.calls.borrow();
        assert_eq!(calls.len(), 1, "expected exactly one report");
        calls[0].iter().map(ToString::to_string).collect()
    }
}

impl Reporter for Recorder {
    fn report(&self, values: Vec<ReportValue>) {
        self.calls.borrow_mut().push(values);
    }
}

/// Trace every failure in these tests resolves to.
pub const FIXED_TRACE: &str = "\nfixture::check_invoice\n\ttests/fixture.rs:21\nfixture::test_body\n\ttests/fixture.rs:9";

/// A guard whose failures always carry the same raw stack.
pub fn fixed_guard() -> Guard {
    Guard::default().with_capture(FixedCapture::new(vec![
        Frame::new("backtrace::capture::Backtrace::new_unresolved"),
        Frame::new("bailout_core::raise::build_failure"),
        Frame::new("bailout_core::raise::fail_now"),
        Frame::new("fixture::check_invoice::h0123456789abcdef").at("tests/fixture.rs", 21),
        Frame::new("core::ops::function::FnOnce::call_once"),
        Frame::new("fixture::test_body").at("tests/fixture.rs", 9),
        Frame::new("bailout_core::recover::enter_test_body"),
        Frame::new("std::panicking::try"),
        Frame::new("bailout_core::recover::Guard::run"),
        Frame::new("fixture::outer"),
        Frame::new("test::__rust_begin_short_backtrace"),
    ]))
}
