use bailout_trace::{reduce, reduce_once, render, Frame, FrameFilter, TraceConfig};
use proptest::prelude::*;

fn user_frame(idx: usize) -> Frame {
    Frame::new(format!("my_tests::step_{idx}")).at("tests/steps.rs", idx as u32 + 1)
}

/// Capture shim, raise helpers, user frames, guard, runner.
fn scenario(user_frames: &[Frame], helper_depth: usize) -> Vec<Frame> {
    let mut frames = vec![
        Frame::new("backtrace::backtrace::libunwind::trace"),
        Frame::new("backtrace::capture::Backtrace::new_unresolved"),
        Frame::new("<bailout_trace::capture::BacktraceCapture as bailout_trace::capture::StackCapture>::capture"),
        Frame::new("bailout_core::state::capture"),
        Frame::new("bailout_core::raise::build_failure"),
    ];
    for _ in 0..helper_depth {
        frames.push(Frame::new("bailout_core::raise::fail_now"));
    }
    frames.extend_from_slice(user_frames);
    frames.extend([
        Frame::new("bailout_core::recover::enter_test_body"),
        Frame::new("<core::panic::unwind_safe::AssertUnwindSafe<F> as core::ops::function::FnOnce<()>>::call_once"),
        Frame::new("std::panicking::try::do_call"),
        Frame::new("std::panic::catch_unwind"),
        Frame::new("bailout_core::recover::Guard::run"),
        Frame::new("my_tests::outer_test"),
        Frame::new("core::ops::function::FnOnce::call_once"),
        Frame::new("test::__rust_begin_short_backtrace"),
        Frame::new("test::run_test_in_process"),
    ]);
    frames
}

#[test]
fn test_realistic_stack_reduces_to_user_frames() {
    let user = vec![user_frame(0), user_frame(1)];
    let frames = scenario(&user, 3);
    let reduced = reduce(&frames, &FrameFilter::default(), 4);
    assert_eq!(reduced, user);

    let rendered = render(&reduced);
    assert_eq!(
        rendered,
        "\nmy_tests::step_0\n\ttests/steps.rs:1\nmy_tests::step_1\n\ttests/steps.rs:2"
    );
}

#[test]
fn test_mangled_symbols_are_cleaned_on_render() {
    let frames = vec![
        Frame::new("bailout_core::raise::if_err::h0011223344556677"),
        Frame::new("my_tests::open_config::h8899aabbccddeeff").at("tests/config.rs", 4),
        Frame::new("test::run_test"),
    ];
    let reduced = reduce(&frames, &FrameFilter::default(), 4);
    assert_eq!(render(&reduced), "\nmy_tests::open_config\n\ttests/config.rs:4");
}

#[test]
fn test_custom_runner_boundary() {
    let config = TraceConfig::default().with_boundary("my_harness::runner");
    let frames = vec![
        Frame::new("bailout_core::raise::fail_now"),
        user_frame(0),
        Frame::new("my_harness::runner::run_case"),
        Frame::new("my_harness::main"),
    ];
    let reduced = reduce(&frames, &FrameFilter::new(&config), config.max_passes);
    assert_eq!(reduced, vec![user_frame(0)]);
}

proptest! {
    #[test]
    fn prop_reduction_keeps_exactly_user_frames(n in 1usize..24, depth in 1usize..6) {
        let user: Vec<Frame> = (0..n).map(user_frame).collect();
        let frames = scenario(&user, depth);
        let reduced = reduce(&frames, &FrameFilter::default(), 4);
        prop_assert_eq!(reduced, user);
    }

    #[test]
    fn prop_reduced_trace_is_fixed_point(n in 0usize..24) {
        let user: Vec<Frame> = (0..n).map(user_frame).collect();
        let pass = reduce_once(&user, &FrameFilter::default());
        prop_assert!(!pass.stripped);
        prop_assert_eq!(pass.frames, user);
    }
}
