//! The error taxonomy and per-VM error stack (spec §4.E, §7).
//!
//! Errors are first-class: a [`Error`] carries a [`ErrorKind`] for catch
//! discrimination, a message, and an optional [`Span`] for source-location
//! rendering. Throwing pushes onto an [`ErrorStack`]; catching pops.

use crate::span::Span;
use std::fmt;

/// The minimum error kind set from spec §4.E / §7, plus `StopIter` (§ SPEC_FULL
/// supplement 1) used internally by the `for` loop desugaring and never
/// surfaced to a script unless it escapes a malformed manual iterator use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    AttrError,
    KeyError,
    TypeError,
    ArgError,
    MathError,
    SizeError,
    SyntaxError,
    InternalError,
    ToDoError,
    /// Raised by an iterator that has been exhausted; caught internally by
    /// `for`-loop codegen and otherwise behaves like any other error.
    StopIter,
}

impl ErrorKind {
    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::AttrError => "AttrError",
            ErrorKind::KeyError => "KeyError",
            ErrorKind::TypeError => "TypeError",
            ErrorKind::ArgError => "ArgError",
            ErrorKind::MathError => "MathError",
            ErrorKind::SizeError => "SizeError",
            ErrorKind::SyntaxError => "SyntaxError",
            ErrorKind::InternalError => "InternalError",
            ErrorKind::ToDoError => "ToDoError",
            ErrorKind::StopIter => "StopIter",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A thrown error: a kind, a human-readable message, and the token span (if
/// any) it should be rendered against.
#[derive(Debug, Clone, PartialEq)]
pub struct Error {
    pub kind: ErrorKind,
    pub message: String,
    pub span: Option<Span>,
}

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Error {
            kind,
            message: message.into(),
            span: None,
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn attr(message: impl Into<String>) -> Self {
        Error::new(ErrorKind::AttrError, message)
    }
    pub fn key(message: impl Into<String>) -> Self {
        Error::new(ErrorKind::KeyError, message)
    }
    pub fn type_err(message: impl Into<String>) -> Self {
        Error::new(ErrorKind::TypeError, message)
    }
    pub fn arg(message: impl Into<String>) -> Self {
        Error::new(ErrorKind::ArgError, message)
    }
    pub fn math(message: impl Into<String>) -> Self {
        Error::new(ErrorKind::MathError, message)
    }
    pub fn size(message: impl Into<String>) -> Self {
        Error::new(ErrorKind::SizeError, message)
    }
    pub fn syntax(message: impl Into<String>) -> Self {
        Error::new(ErrorKind::SyntaxError, message)
    }
    pub fn internal(message: impl Into<String>) -> Self {
        Error::new(ErrorKind::InternalError, message)
    }
    pub fn todo(message: impl Into<String>) -> Self {
        Error::new(ErrorKind::ToDoError, message)
    }
    pub fn stop_iter() -> Self {
        Error::new(ErrorKind::StopIter, "iterator exhausted")
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for Error {}

/// Per-VM stack of thrown-but-not-yet-(fully)-handled errors (spec §4.E).
///
/// `try`/`catch` pops exactly the error its handler caught; this stack
/// exists mainly so an uncaught error can be dumped in full (all pending
/// errors, most recent last) by the host embedder, and so property tests
/// can assert it is empty at normal termination (§8).
#[derive(Debug, Default)]
pub struct ErrorStack {
    errors: Vec<Error>,
}

impl ErrorStack {
    pub fn new() -> Self {
        ErrorStack::default()
    }

    pub fn push(&mut self, err: Error) {
        tracing::debug!(kind = %err.kind, message = %err.message, "error thrown");
        self.errors.push(err);
    }

    pub fn pop(&mut self) -> Option<Error> {
        self.errors.pop()
    }

    /// The most recently thrown, still-unhandled error, if any. Used to
    /// tell a freshly raised error apart from one that is merely bubbling
    /// back up through an enclosing call frame (spec §4.E: push happens
    /// once per throw, not once per frame it passes through).
    pub fn last(&self) -> Option<&Error> {
        self.errors.last()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn clear(&mut self) {
        self.errors.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Error> {
        self.errors.iter()
    }

    /// Render every pending error against `source`, one block per error:
    /// kind, message, and — for token-tagged errors — one line of source
    /// with a caret-underlined span (spec §7 "User-visible behaviour").
    pub fn render(&self, source: &str) -> String {
        let mut out = String::new();
        for err in &self.errors {
            out.push_str(&format!("{}: {}\n", err.kind, err.message));
            if let Some(span) = err.span {
                if let Some(line_text) = source.lines().nth(span.line.saturating_sub(1) as usize)
                {
                    out.push_str(line_text);
                    out.push('\n');
                    let col = span.column.saturating_sub(1) as usize;
                    out.push_str(&" ".repeat(col));
                    out.push_str(&"^".repeat((span.len as usize).max(1)));
                    out.push('\n');
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_pop_is_lifo() {
        let mut stack = ErrorStack::new();
        stack.push(Error::key("missing 'a'"));
        stack.push(Error::math("div by zero"));
        assert_eq!(stack.len(), 2);
        assert_eq!(stack.pop().unwrap().kind, ErrorKind::MathError);
        assert_eq!(stack.pop().unwrap().kind, ErrorKind::KeyError);
        assert!(stack.is_empty());
    }

    #[test]
    fn render_underlines_span() {
        let mut stack = ErrorStack::new();
        stack.push(Error::math("division by zero").with_span(Span::new(4, 5, 1, 5)));
        let rendered = stack.render("ret 1 / 0");
        assert!(rendered.contains("MathError"));
        assert!(rendered.contains("ret 1 / 0"));
        assert!(rendered.contains("^^^^^"));
    }
}
