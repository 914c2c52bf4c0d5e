//! The failure signal: the values a failure reports, plus the stack captured
//! where it was raised.

use std::error::Error;
use std::fmt;
use std::sync::Arc;

use bailout_trace::RawTrace;

/// One value handed to the reporter.
#[derive(Debug, Clone)]
pub enum ReportValue {
    /// The error that triggered the failure.
    Error(Arc<dyn Error + Send + Sync + 'static>),
    Text(String),
    Int(i64),
    Uint(u64),
    Float(f64),
    Bool(bool),
    /// The reduced stack trace of the primary failure.
    Trace(String),
}

impl ReportValue {
    pub fn error<E>(err: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        ReportValue::Error(Arc::new(err))
    }

    pub fn as_error(&self) -> Option<&(dyn Error + Send + Sync + 'static)> {
        match self {
            ReportValue::Error(err) => Some(err.as_ref()),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ReportValue::Text(text) | ReportValue::Trace(text) => Some(text),
            _ => None,
        }
    }

    pub fn is_trace(&self) -> bool {
        matches!(self, ReportValue::Trace(_))
    }

    fn is_text(&self) -> bool {
        matches!(self, ReportValue::Text(_) | ReportValue::Trace(_))
    }
}

impl fmt::Display for ReportValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportValue::Error(err) => write!(f, "{err}"),
            ReportValue::Text(text) | ReportValue::Trace(text) => write!(f, "{text}"),
            ReportValue::Int(v) => write!(f, "{v}"),
            ReportValue::Uint(v) => write!(f, "{v}"),
            ReportValue::Float(v) => write!(f, "{v}"),
            ReportValue::Bool(v) => write!(f, "{v}"),
        }
    }
}

impl From<&str> for ReportValue {
    fn from(v: &str) -> Self {
        ReportValue::Text(v.to_string())
    }
}

impl From<String> for ReportValue {
    fn from(v: String) -> Self {
        ReportValue::Text(v)
    }
}

impl From<&String> for ReportValue {
    fn from(v: &String) -> Self {
        ReportValue::Text(v.clone())
    }
}

impl From<bool> for ReportValue {
    fn from(v: bool) -> Self {
        ReportValue::Bool(v)
    }
}

impl From<f32> for ReportValue {
    fn from(v: f32) -> Self {
        ReportValue::Float(f64::from(v))
    }
}

impl From<f64> for ReportValue {
    fn from(v: f64) -> Self {
        ReportValue::Float(v)
    }
}

macro_rules! from_signed {
    ($($ty:ty),*) => {
        $(impl From<$ty> for ReportValue {
            fn from(v: $ty) -> Self {
                ReportValue::Int(v as i64)
            }
        })*
    };
}

macro_rules! from_unsigned {
    ($($ty:ty),*) => {
        $(impl From<$ty> for ReportValue {
            fn from(v: $ty) -> Self {
                ReportValue::Uint(v as u64)
            }
        })*
    };
}

from_signed!(i8, i16, i32, i64, isize);
from_unsigned!(u8, u16, u32, u64, usize);

/// Render values the way a failure message reads: values are concatenated,
/// with a single space between two neighbours when neither is text.
pub fn render_values(values: &[ReportValue]) -> String {
    let mut out = String::new();
    for (idx, value) in values.iter().enumerate() {
        if idx > 0 && !value.is_text() && !values[idx - 1].is_text() {
            out.push(' ');
        }
        out.push_str(&value.to_string());
    }
    out
}

/// Render a full report: the leading values as one message, then the trace,
/// then every later value (queued notes) on its own line.
pub fn render_report(values: &[ReportValue]) -> String {
    match values.iter().position(ReportValue::is_trace) {
        None => render_values(values),
        Some(trace_idx) => {
            let mut out = render_values(&values[..trace_idx]);
            out.push_str(&values[trace_idx].to_string());
            for note in &values[trace_idx + 1..] {
                out.push('\n');
                out.push_str(&note.to_string());
            }
            out
        }
    }
}

/// The panic payload of a raised failure.
#[derive(Debug)]
pub struct Failure {
    values: Vec<ReportValue>,
    trace: Option<RawTrace>,
}

impl Failure {
    pub fn new(values: Vec<ReportValue>, trace: Option<RawTrace>) -> Self {
        Self { values, trace }
    }

    pub fn values(&self) -> &[ReportValue] {
        &self.values
    }

    pub fn trace(&self) -> Option<&RawTrace> {
        self.trace.as_ref()
    }

    pub fn into_parts(self) -> (Vec<ReportValue>, Option<RawTrace>) {
        (self.values, self.trace)
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", render_values(&self.values))
    }
}
