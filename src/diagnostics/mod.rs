//! # Diagnostics
//!
//! Every stage of the pipeline reports problems as *values*, never by
//! unwinding. The two carrier types mirror the two shapes a computation
//! can take:
//!
//! - [`Diagnosed<T>`]: a value that was produced, together with whatever
//!   diagnostics accumulated while producing it. This is the common case —
//!   recovery leaves something usable behind.
//! - [`Expected<T>`]: either a `Diagnosed<T>` or a bag alone, for the rare
//!   operations that can produce no value at all (a parser production that
//!   matched nothing).
//!
//! Diagnostics are never dropped: when a sub-computation fails, its bag is
//! merged into the caller's bag and the caller substitutes an error node or
//! error symbol and continues. A compilation succeeds iff the final bag
//! contains zero `Error`-severity entries.

mod kinds;
pub mod render;

pub use kinds::DiagnosticKind;
pub use render::RenderedDiagnostic;

use serde::Serialize;

use crate::source::SrcLocation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Severity {
    Info,
    Note,
    Warning,
    Error,
}

/// A single reported problem: what went wrong, where, and how bad.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub location: Option<SrcLocation>,
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    pub fn error(
        kind: DiagnosticKind,
        location: SrcLocation,
        message: impl Into<String>,
    ) -> Diagnostic {
        Diagnostic {
            severity: Severity::Error,
            location: Some(location),
            kind,
            message: message.into(),
        }
    }
}

/// An ordered accumulation of diagnostics. Bags merge upward through the
/// pipeline until the driver renders them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagnosticBag {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticBag {
    pub fn new() -> DiagnosticBag {
        DiagnosticBag::default()
    }

    pub fn add(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn merge(&mut self, other: DiagnosticBag) {
        self.diagnostics.extend(other.diagnostics);
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
    }

    pub fn of_kind(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.kind == kind)
    }

    /// Absorb the diagnostics of a sub-computation, keeping its value.
    pub fn unwrap<T>(&mut self, diagnosed: Diagnosed<T>) -> T {
        self.merge(diagnosed.diagnostics);
        diagnosed.value
    }

    /// Absorb an [`Expected`], substituting `fallback` when the
    /// sub-computation produced no value.
    pub fn unwrap_or<T>(&mut self, expected: Expected<T>, fallback: T) -> T {
        match expected {
            Ok(diagnosed) => self.unwrap(diagnosed),
            Err(bag) => {
                self.merge(bag);
                fallback
            }
        }
    }
}

impl IntoIterator for DiagnosticBag {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.diagnostics.into_iter()
    }
}

/// A produced value plus the diagnostics produced alongside it.
#[derive(Debug, Clone)]
pub struct Diagnosed<T> {
    pub value: T,
    pub diagnostics: DiagnosticBag,
}

impl<T> Diagnosed<T> {
    pub fn clean(value: T) -> Diagnosed<T> {
        Diagnosed {
            value,
            diagnostics: DiagnosticBag::new(),
        }
    }

    pub fn new(value: T, diagnostics: DiagnosticBag) -> Diagnosed<T> {
        Diagnosed { value, diagnostics }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Diagnosed<U> {
        Diagnosed {
            value: f(self.value),
            diagnostics: self.diagnostics,
        }
    }
}

/// A value-or-diagnostics result. `Err` carries the bag explaining why no
/// value could be produced.
pub type Expected<T> = Result<Diagnosed<T>, DiagnosticBag>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SrcBuffer;
    use std::rc::Rc;

    fn location() -> SrcLocation {
        SrcLocation::new(SrcBuffer::file("t.ace", "x"), 0, 1)
    }

    #[test]
    fn test_bag_merge_preserves_order() {
        let mut outer = DiagnosticBag::new();
        outer.add(Diagnostic::error(
            DiagnosticKind::UnexpectedCharacter,
            location(),
            "first",
        ));

        let mut inner = DiagnosticBag::new();
        inner.add(Diagnostic::error(
            DiagnosticKind::UnexpectedToken,
            location(),
            "second",
        ));

        outer.merge(inner);

        let messages = outer.iter().map(|d| d.message.as_str()).collect::<Vec<_>>();
        assert_eq!(messages, vec!["first", "second"]);
    }

    #[test]
    fn test_has_errors_ignores_warnings() {
        let mut bag = DiagnosticBag::new();
        bag.add(Diagnostic {
            severity: Severity::Warning,
            location: None,
            kind: DiagnosticKind::UnexpectedToken,
            message: "just a warning".into(),
        });

        assert!(!bag.has_errors());
    }

    #[test]
    fn test_unwrap_or_substitutes_fallback() {
        let mut bag = DiagnosticBag::new();
        let mut failure = DiagnosticBag::new();
        failure.add(Diagnostic::error(
            DiagnosticKind::MissingToken,
            location(),
            "missing",
        ));

        let value: i32 = bag.unwrap_or(Err(failure), 42);

        assert_eq!(value, 42);
        assert_eq!(bag.len(), 1);
    }
}
