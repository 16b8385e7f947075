//! Structured warnings and failures reported while reading VFP files.
//!
//! Hostile or malformed input never aborts the host: readers degrade to an
//! `Invalid` classification or a partial schema and describe what happened with
//! a [`Diagnostic`]. Each diagnostic is also written to the `log` facade under
//! the `vfp` target when it is created.

use std::fmt;

use crate::SourcePosition;

/// How serious a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Best-effort continuation, the result is still usable.
    Warning,
    /// The operation stopped early; the result is partial or negative.
    Failure,
}

impl Severity {
    /// Returns the string representation of this severity.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Warning => "Warning",
            Severity::Failure => "Failure",
        }
    }
}

/// What a diagnostic is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// The tokenizer rejected the input.
    MalformedXml,
    /// Character data volume within one chunk exceeded the expansion guard.
    SuspiciousExpansion,
    /// Nesting inside a target element that shallow inference does not follow.
    StructuralAnomaly,
    /// Too many chunks went by without any element or text event.
    Stalled,
    /// The document ended while elements were still open.
    Truncated,
    /// The format version could not be determined.
    UnknownVersion,
    /// The format version is not the one the driver was written for.
    UnsupportedVersion,
}

impl DiagnosticKind {
    /// Returns the string representation of this kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticKind::MalformedXml => "MalformedXml",
            DiagnosticKind::SuspiciousExpansion => "SuspiciousExpansion",
            DiagnosticKind::StructuralAnomaly => "StructuralAnomaly",
            DiagnosticKind::Stalled => "Stalled",
            DiagnosticKind::Truncated => "Truncated",
            DiagnosticKind::UnknownVersion => "UnknownVersion",
            DiagnosticKind::UnsupportedVersion => "UnsupportedVersion",
        }
    }
}

/// A single structured report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Seriousness of the report.
    pub severity: Severity,
    /// Category of the report.
    pub kind: DiagnosticKind,
    /// Human readable description.
    pub message: String,
    /// Where in the source the problem was noticed, if known.
    pub position: Option<SourcePosition>,
}

impl Diagnostic {
    /// Creates a warning and logs it.
    #[must_use]
    pub fn warning(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, kind, message.into(), None)
    }

    /// Creates a failure and logs it.
    #[must_use]
    pub fn failure(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self::new(Severity::Failure, kind, message.into(), None)
    }

    /// Creates a failure located at `position` and logs it.
    #[must_use]
    pub fn failure_at(
        kind: DiagnosticKind,
        message: impl Into<String>,
        position: SourcePosition,
    ) -> Self {
        Self::new(Severity::Failure, kind, message.into(), Some(position))
    }

    fn new(
        severity: Severity,
        kind: DiagnosticKind,
        message: String,
        position: Option<SourcePosition>,
    ) -> Self {
        let diagnostic = Self {
            severity,
            kind,
            message,
            position,
        };
        diagnostic.emit();
        diagnostic
    }

    fn emit(&self) {
        match self.severity {
            Severity::Warning => log::warn!(target: "vfp", "{self}"),
            Severity::Failure => log::error!(target: "vfp", "{self}"),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.position {
            Some(position) if !position.is_empty() => {
                write!(f, "{} at {position}", self.message)
            },
            _ => f.write_str(&self.message),
        }
    }
}
