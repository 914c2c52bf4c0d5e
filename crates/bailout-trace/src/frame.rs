//! Structured stack frames.
//!
//! A frame is identified by its demangled symbol. Classification never
//! matches on rendered text: the symbol is split into a module path
//! (`crate::module::item`) and compared segment by segment.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One resolved frame of a captured stack, innermost first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    /// Demangled symbol, e.g. `my_tests::opens_file::{{closure}}`.
    pub symbol: String,
    /// Source file (if debug info is available).
    pub file: Option<String>,
    /// Source line (if debug info is available).
    pub line: Option<u32>,
}

impl Frame {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            file: None,
            line: None,
        }
    }

    /// Attach a source location.
    pub fn at(mut self, file: impl Into<String>, line: u32) -> Self {
        self.file = Some(file.into());
        self.line = Some(line);
        self
    }

    /// Module path segments of the symbol, generic arguments removed.
    pub fn module_path(&self) -> ModulePath {
        ModulePath::of_symbol(&self.symbol)
    }

    /// Symbol with the detail a reader does not need stripped.
    pub fn display_name(&self) -> String {
        display_symbol(&self.symbol)
    }

    /// Location as `file:line`, if known.
    pub fn location(&self) -> Option<String> {
        match (&self.file, self.line) {
            (Some(file), Some(line)) => Some(format!("{file}:{line}")),
            (Some(file), None) => Some(file.clone()),
            _ => None,
        }
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())?;
        if let Some(location) = self.location() {
            write!(f, "\n\t{location}")?;
        }
        Ok(())
    }
}

/// A `::`-separated path, compared segment-wise.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ModulePath {
    segments: Vec<String>,
}

impl ModulePath {
    /// Parse a configured prefix such as `std::backtrace`.
    pub fn parse(path: &str) -> Self {
        Self::of_symbol(path)
    }

    /// Derive the path of a demangled symbol.
    ///
    /// `<T as Trait>::method` resolves to the path of `T` followed by
    /// `method`; generic arguments and a trailing legacy hash are dropped.
    pub fn of_symbol(symbol: &str) -> Self {
        let symbol = clean_symbol(symbol.trim());
        let mut segments = Vec::new();

        let rest = if symbol.starts_with('<') {
            match matching_close(symbol) {
                Some(close) => {
                    let inner = &symbol[1..close];
                    let self_ty = split_top_level(inner, " as ")
                        .into_iter()
                        .next()
                        .unwrap_or(inner);
                    segments.extend(Self::of_symbol(self_ty).segments);
                    symbol[close + 1..].trim_start_matches("::")
                }
                None => symbol,
            }
        } else {
            symbol
        };

        segments.extend(
            split_top_level(rest, "::")
                .into_iter()
                .map(strip_generics)
                .filter(|segment| !segment.is_empty())
                .map(str::to_string),
        );
        Self { segments }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Whether `self` begins with every segment of `prefix`.
    pub fn starts_with(&self, prefix: &ModulePath) -> bool {
        !prefix.segments.is_empty() && self.segments.starts_with(&prefix.segments)
    }
}

impl fmt::Display for ModulePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("::"))
    }
}

/// Strip a trailing ` +0x..` offset, a legacy `::h<hash>` suffix and a
/// trailing argument list.
pub fn clean_symbol(symbol: &str) -> &str {
    let mut s = symbol.trim_end();

    if let Some(idx) = s.rfind(" +0x") {
        if s[idx + 4..].chars().all(|c| c.is_ascii_hexdigit()) {
            s = &s[..idx];
        }
    }

    if let Some(idx) = s.rfind("::h") {
        let hash = &s[idx + 3..];
        if hash.len() == 16 && hash.chars().all(|c| c.is_ascii_hexdigit()) {
            s = &s[..idx];
        }
    }

    if s.ends_with(')') {
        if let Some(open) = s.rfind('(') {
            if open > 0 {
                s = &s[..open];
            }
        }
    }

    s
}

/// [`clean_symbol`], then drop generic arguments and turbofish groups.
///
/// A leading `<T as Trait>` qualification keeps its brackets, so
/// `<my::Conn<T> as core::ops::drop::Drop>::drop` renders as
/// `<my::Conn as core::ops::drop::Drop>::drop`.
pub fn display_symbol(symbol: &str) -> String {
    let symbol = clean_symbol(symbol.trim());
    let qualified_close = if symbol.starts_with('<') {
        matching_close(symbol)
    } else {
        None
    };

    let mut out = String::with_capacity(symbol.len());
    let mut depth = 0usize;
    let mut prev = '\0';
    for (idx, c) in symbol.char_indices() {
        let qualifier = qualified_close.is_some() && (idx == 0 || Some(idx) == qualified_close);
        match c {
            _ if qualifier => out.push(c),
            '<' => depth += 1,
            '>' if prev != '-' && depth > 0 => depth -= 1,
            _ if depth == 0 => out.push(c),
            _ => {}
        }
        prev = c;
    }

    while let Some(idx) = out.find("::::") {
        out.replace_range(idx..idx + 4, "::");
    }
    let trimmed = out.trim_end_matches("::").len();
    out.truncate(trimmed);
    out
}

/// Index of the `>` closing the `<` at position 0.
fn matching_close(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut prev = '\0';
    for (idx, c) in s.char_indices() {
        match c {
            '<' => depth += 1,
            '>' if prev != '-' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
        prev = c;
    }
    None
}

/// Split on `sep` only where no `<...>` or `(...)` group is open.
fn split_top_level<'a>(s: &'a str, sep: &str) -> Vec<&'a str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut prev = '\0';
    let bytes = s.as_bytes();

    let mut idx = 0;
    while idx < s.len() {
        let c = bytes[idx] as char;
        match c {
            '<' | '(' | '[' => depth += 1,
            '>' if prev != '-' => depth = depth.saturating_sub(1),
            ')' | ']' => depth = depth.saturating_sub(1),
            _ => {}
        }
        if depth == 0 && bytes[idx..].starts_with(sep.as_bytes()) {
            parts.push(&s[start..idx]);
            idx += sep.len();
            start = idx;
            prev = '\0';
            continue;
        }
        prev = c;
        idx += 1;
    }
    parts.push(&s[start..]);
    parts
}

fn strip_generics(segment: &str) -> &str {
    let segment = segment.trim();
    match segment.find('<') {
        Some(0) | None => segment,
        Some(idx) => &segment[..idx],
    }
}
