//! Diagnostics collected while loading.

use std::fmt;

use tracing::{debug, error, info, warn};

use super::store::PropertyStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        f.write_str(label)
    }
}

/// A message recorded while interpreting a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    /// URL of the resource the message came from, if it has one.
    pub source: Option<String>,
    /// 1-based line number within `source`.
    pub line: Option<usize>,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.severity)?;
        match (&self.source, self.line) {
            (Some(source), Some(line)) => write!(f, " [{source}:{line}]")?,
            (Some(source), None) => write!(f, " [{source}]")?,
            (None, Some(line)) => write!(f, " [line {line}]")?,
            (None, None) => {}
        }
        write!(f, ": {}", self.message)
    }
}

/// A loaded store together with everything logged while loading it.
#[derive(Debug, Clone)]
pub struct LoadReport {
    pub store: PropertyStore,
    pub diagnostics: Vec<Diagnostic>,
}

impl LoadReport {
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Diagnostics at or above `severity`.
    pub fn at_least(&self, severity: Severity) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(move |d| d.severity >= severity)
    }

    pub fn into_store(self) -> PropertyStore {
        self.store
    }
}

/// Emits diagnostics through `tracing` and keeps a copy for the report.
#[derive(Debug, Default)]
pub(crate) struct Recorder {
    diagnostics: Vec<Diagnostic>,
}

impl Recorder {
    pub(crate) fn record(
        &mut self,
        severity: Severity,
        source: Option<&str>,
        line: Option<usize>,
        message: impl Into<String>,
    ) {
        let message = message.into();
        let src = source.unwrap_or("");
        match severity {
            Severity::Debug => debug!(source = src, line, "{message}"),
            Severity::Info => info!(source = src, line, "{message}"),
            Severity::Warning => warn!(source = src, line, "{message}"),
            Severity::Error => error!(source = src, line, "{message}"),
        }
        self.diagnostics.push(Diagnostic {
            severity,
            source: source.map(str::to_string),
            line,
            message,
        });
    }

    /// Output of a `%log` directive.
    pub(crate) fn log_message(&mut self, source: Option<&str>, line: usize, message: String) {
        info!(target: "rtprops::log", "{message}");
        self.diagnostics.push(Diagnostic {
            severity: Severity::Info,
            source: source.map(str::to_string),
            line: Some(line),
            message,
        });
    }

    pub(crate) fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}
