//! Trace reduction.
//!
//! A captured stack runs from the capture primitive, through the utility's
//! raise helpers, through user code, into the recovery guard and finally the
//! test runner. Reduction keeps only the user-code segment: everything after
//! an internal frame and before the next boundary frame.

use crate::config::TraceConfig;
use crate::frame::{Frame, ModulePath};

/// How a frame takes part in reduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// Belongs to the utility or the capture primitive beneath it.
    Internal,
    /// Marks the point where control entered user code.
    Boundary,
    /// Call or unwind glue: dropped without affecting the scan.
    Hidden,
    /// Anything else.
    User,
}

/// Classifies frames against configured module path prefixes.
#[derive(Debug, Clone)]
pub struct FrameFilter {
    internal: Vec<ModulePath>,
    hidden: Vec<ModulePath>,
    boundaries: Vec<ModulePath>,
}

impl FrameFilter {
    pub fn new(config: &TraceConfig) -> Self {
        Self {
            internal: config
                .internal_modules
                .iter()
                .map(|p| ModulePath::parse(p))
                .collect(),
            hidden: config
                .hidden_modules
                .iter()
                .map(|p| ModulePath::parse(p))
                .collect(),
            boundaries: config
                .boundary_modules
                .iter()
                .map(|p| ModulePath::parse(p))
                .collect(),
        }
    }

    /// Checked in order: internal, boundary, hidden.
    pub fn classify(&self, frame: &Frame) -> FrameKind {
        let path = frame.module_path();
        if any_prefix(&self.internal, &path) {
            FrameKind::Internal
        } else if any_prefix(&self.boundaries, &path) {
            FrameKind::Boundary
        } else if any_prefix(&self.hidden, &path) {
            FrameKind::Hidden
        } else {
            FrameKind::User
        }
    }
}

fn any_prefix(set: &[ModulePath], path: &ModulePath) -> bool {
    set.iter().any(|prefix| path.starts_with(prefix))
}

impl Default for FrameFilter {
    fn default() -> Self {
        Self::new(&TraceConfig::default())
    }
}

/// Output of a single reduction pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pass {
    pub frames: Vec<Frame>,
    /// False once the input held no internal frame; the frames are then
    /// returned unchanged and further passes are pointless.
    pub stripped: bool,
}

/// Run one reduction pass.
pub fn reduce_once(frames: &[Frame], filter: &FrameFilter) -> Pass {
    let mut kept = Vec::new();
    let mut found_internal = false;
    let mut include = false;
    let mut stripped = false;

    for frame in frames {
        match filter.classify(frame) {
            FrameKind::Internal => {
                found_internal = true;
                stripped = true;
                continue;
            }
            FrameKind::Boundary => {
                found_internal = false;
                include = false;
            }
            FrameKind::Hidden => continue,
            FrameKind::User if found_internal => include = true,
            FrameKind::User => {}
        }
        if include {
            kept.push(frame.clone());
        }
    }

    if !stripped {
        return Pass {
            frames: frames.to_vec(),
            stripped: false,
        };
    }
    Pass {
        frames: kept,
        stripped: true,
    }
}

/// Repeat [`reduce_once`] up to `max_passes` times, stopping as soon as a
/// pass finds nothing to strip.
pub fn reduce(frames: &[Frame], filter: &FrameFilter, max_passes: usize) -> Vec<Frame> {
    let mut current = frames.to_vec();
    for pass_number in 0..max_passes.max(1) {
        let pass = reduce_once(&current, filter);
        tracing::trace!(
            pass = pass_number,
            before = current.len(),
            after = pass.frames.len(),
            stripped = pass.stripped,
            "trace reduction pass"
        );
        current = pass.frames;
        if !pass.stripped {
            break;
        }
    }
    current
}

/// Render frames for a report. The result starts on its own line.
pub fn render(frames: &[Frame]) -> String {
    let mut out = String::new();
    for frame in frames {
        out.push('\n');
        out.push_str(&frame.to_string());
    }
    out
}
