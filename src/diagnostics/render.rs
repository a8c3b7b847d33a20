//! Human- and machine-readable rendering of accumulated diagnostics.

use std::fmt;

use colored::Colorize;
use serde::Serialize;

use super::{Diagnostic, DiagnosticBag, Severity};

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Note => write!(f, "note"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Error => format!("{}", self.severity).red().bold().to_string(),
            Severity::Warning => format!("{}", self.severity).yellow().bold().to_string(),
            _ => format!("{}", self.severity),
        };

        match &self.location {
            Some(location) => {
                let (line, col) = location.buffer.line_col(location.begin);
                write!(
                    f,
                    "{severity}: {} [{}:{}:{}]",
                    self.message,
                    location.buffer.display_name(),
                    line + 1,
                    col + 1
                )
            }
            None => write!(f, "{severity}: {}", self.message),
        }
    }
}

impl fmt::Display for DiagnosticBag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for diagnostic in self.iter() {
            writeln!(f, "{diagnostic}")?;
        }
        Ok(())
    }
}

/// Flat serializable form of a diagnostic for `--json` output.
#[derive(Debug, Serialize)]
pub struct RenderedDiagnostic {
    pub severity: Severity,
    pub kind: super::DiagnosticKind,
    pub message: String,
    pub file: Option<String>,
    pub line: Option<usize>,
    pub column: Option<usize>,
}

impl From<&Diagnostic> for RenderedDiagnostic {
    fn from(diagnostic: &Diagnostic) -> RenderedDiagnostic {
        let position = diagnostic
            .location
            .as_ref()
            .map(|l| (l.buffer.display_name(), l.buffer.line_col(l.begin)));

        RenderedDiagnostic {
            severity: diagnostic.severity,
            kind: diagnostic.kind,
            message: diagnostic.message.clone(),
            file: position.as_ref().map(|(file, _)| file.clone()),
            line: position.as_ref().map(|(_, (line, _))| line + 1),
            column: position.map(|(_, (_, col))| col + 1),
        }
    }
}
