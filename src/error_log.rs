//! Append-only record of errors reported by transforms and other components.
//!
//! A log is created by the application and handed to whatever should report into it, usually as
//! a [`SharedErrorLog`]; there is no process-wide instance.

use log::debug;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

pub type SharedErrorLog = Rc<RefCell<ErrorLog>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => f.write_str("Info"),
            Severity::Warning => f.write_str("Warning"),
            Severity::Critical => f.write_str("Critical"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ErrorEntry {
    pub message: String,
    /// Type that reported the error.
    pub component: String,
    /// Operation it was performing.
    pub operation: String,
    pub severity: Severity,
    /// Whether a user has already seen the error. Fixed once the entry is reported.
    pub acknowledged: bool,
}

impl ErrorEntry {
    pub fn new(
        message: impl Into<String>,
        component: impl Into<String>,
        operation: impl Into<String>,
        severity: Severity,
    ) -> Self {
        ErrorEntry {
            message: message.into(),
            component: component.into(),
            operation: operation.into(),
            severity,
            acknowledged: false,
        }
    }
}

impl fmt::Display for ErrorEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Error:")?;
        writeln!(f, "Severity: {}", self.severity)?;
        writeln!(f, "Message: {}", self.message)?;
        writeln!(f, "Occurred in: {}", self.component)?;
        writeln!(f, "Operation: {}", self.operation)
    }
}

#[derive(Debug, Default)]
pub struct ErrorLog {
    entries: Vec<ErrorEntry>,
}

impl ErrorLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedErrorLog {
        Rc::new(RefCell::new(ErrorLog::new()))
    }

    pub fn report(&mut self, entry: ErrorEntry) {
        debug!("{}: {} error. {}", entry.component, entry.severity, entry.message);
        self.entries.push(entry);
    }

    /// The most recent entry, composed as multi-line text.
    pub fn last_error(&self) -> Option<String> {
        self.entries.last().map(ErrorEntry::to_string)
    }

    pub fn last_entry(&self) -> Option<&ErrorEntry> {
        self.entries.last()
    }

    pub fn delete_last_error(&mut self) -> Option<ErrorEntry> {
        self.entries.pop()
    }

    pub fn entries(&self) -> &[ErrorEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn append_read_delete() {
        let mut log = ErrorLog::new();
        assert!(log.last_error().is_none());
        log.report(ErrorEntry::new("first", "Reader", "open", Severity::Info));
        log.report(ErrorEntry::new("bad datum", "CoordinateTransform", "initialize", Severity::Warning));
        assert_eq!(log.len(), 2);

        let text = log.last_error().unwrap();
        assert!(text.starts_with("Error:\n"));
        assert!(text.contains("Severity: Warning\n"));
        assert!(text.contains("Message: bad datum\n"));
        assert!(text.contains("Occurred in: CoordinateTransform\n"));

        assert_eq!(log.delete_last_error().unwrap().message, "bad datum");
        assert_eq!(log.last_entry().unwrap().message, "first");
    }

    #[test]
    fn entries_are_kept_as_reported() {
        let mut log = ErrorLog::new();
        assert!(log.delete_last_error().is_none());
        log.report(ErrorEntry::new("a", "X", "f", Severity::Critical));
        log.report(ErrorEntry {
            acknowledged: true,
            ..ErrorEntry::new("b", "X", "f", Severity::Critical)
        });
        assert!(!log.entries()[0].acknowledged);
        assert!(log.entries()[1].acknowledged);
    }
}
