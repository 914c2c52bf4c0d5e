//! Stack capture.
//!
//! Capturing happens at the raise site, resolving symbols happens at the
//! recovery site: capturing unresolved is cheap, and only the primary
//! failure of an unwind is ever resolved.

use std::fmt;

use crate::frame::Frame;

/// Source of raw stacks.
pub trait StackCapture {
    fn capture(&self) -> RawTrace;
}

/// A captured stack, innermost frame first.
#[derive(Clone)]
pub enum RawTrace {
    Unresolved(backtrace::Backtrace),
    Frames(Vec<Frame>),
}

impl RawTrace {
    /// Resolve symbols and flatten inlined frames.
    pub fn into_frames(self) -> Vec<Frame> {
        match self {
            RawTrace::Frames(frames) => frames,
            RawTrace::Unresolved(mut trace) => {
                trace.resolve();
                let mut frames = Vec::new();
                for frame in trace.frames() {
                    let symbols = frame.symbols();
                    if symbols.is_empty() {
                        frames.push(Frame::new(format!("{:p}", frame.ip())));
                        continue;
                    }
                    for symbol in symbols {
                        frames.push(Frame {
                            symbol: symbol
                                .name()
                                .map(|name| format!("{name:#}"))
                                .unwrap_or_else(|| format!("{:p}", frame.ip())),
                            file: symbol.filename().map(|p| p.display().to_string()),
                            line: symbol.lineno(),
                        });
                    }
                }
                frames
            }
        }
    }
}

impl fmt::Debug for RawTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawTrace::Unresolved(trace) => {
                write!(f, "RawTrace::Unresolved({} frames)", trace.frames().len())
            }
            RawTrace::Frames(frames) => f.debug_tuple("RawTrace::Frames").field(frames).finish(),
        }
    }
}

/// Captures the real call stack with the `backtrace` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct BacktraceCapture;

impl StackCapture for BacktraceCapture {
    fn capture(&self) -> RawTrace {
        RawTrace::Unresolved(backtrace::Backtrace::new_unresolved())
    }
}

/// Always returns the same frames. Used to make reports deterministic.
#[derive(Debug, Clone, Default)]
pub struct FixedCapture {
    frames: Vec<Frame>,
}

impl FixedCapture {
    pub fn new(frames: Vec<Frame>) -> Self {
        Self { frames }
    }
}

impl StackCapture for FixedCapture {
    fn capture(&self) -> RawTrace {
        RawTrace::Frames(self.frames.clone())
    }
}
