//! Stack capture and reduction for failure reports.
//!
//! A raw stack is captured where a failure is raised, then cut down to the
//! frames of user code between the failure site and the point where user
//! code was entered.

pub mod capture;
pub mod config;
pub mod frame;
pub mod reduce;

pub use capture::{BacktraceCapture, FixedCapture, RawTrace, StackCapture};
pub use config::{ConfigError, TraceConfig};
pub use frame::{display_symbol, Frame, ModulePath};
pub use reduce::{reduce, reduce_once, render, FrameFilter, FrameKind, Pass};
