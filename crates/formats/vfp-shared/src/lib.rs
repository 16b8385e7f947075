//! Positions, read errors and diagnostics shared by the VFP format crates.

use std::error::Error as StdError;
use std::fmt;

pub mod diagnostics;

pub use diagnostics::{Diagnostic, DiagnosticKind, Severity};

/// A position within an XML source.
///
/// Line and column are 1-based to align with what editors show.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourcePosition {
    /// Line number in the source (1-based)
    pub line: Option<u64>,
    /// Column number in the source (1-based, counted in bytes)
    pub column: Option<u64>,
    /// Byte offset from the start of the source
    pub byte_offset: Option<u64>,
}

impl SourcePosition {
    /// Position carrying only a byte offset.
    #[must_use]
    pub fn at_offset(byte_offset: u64) -> Self {
        Self {
            byte_offset: Some(byte_offset),
            ..Self::default()
        }
    }

    /// Returns true when the position does not contain any location metadata.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.line.is_none() && self.column.is_none() && self.byte_offset.is_none()
    }
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();

        if let Some(line) = self.line {
            parts.push(format!("line {line}"));
        }
        if let Some(column) = self.column {
            parts.push(format!("column {column}"));
        }
        if let Some(byte) = self.byte_offset {
            parts.push(format!("byte {byte}"));
        }

        if parts.is_empty() {
            write!(f, "unknown position")
        } else {
            write!(f, "{}", parts.join(", "))
        }
    }
}

/// Errors that abort reading a VFP source.
///
/// Recoverable problems (malformed XML, guard trips) are reported as
/// [`Diagnostic`]s instead; only failures that leave no usable result end up here.
#[derive(Debug)]
pub enum FormatReadError {
    /// An underlying I/O failure occurred.
    Io {
        /// The originating error.
        source: std::io::Error,
        /// Optional context describing what was being read.
        context: Option<String>,
    },
    /// Parsing failed for the input source.
    Parse {
        /// Human readable description of the failure.
        message: String,
        /// Optional position describing where the failure occurred.
        position: Option<SourcePosition>,
        /// Optional context describing what was being read.
        context: Option<String>,
    },
    /// A reader option is out of range.
    InvalidOption {
        /// The option name.
        option: String,
        /// Why the value was rejected.
        message: String,
    },
    /// Other error type not classified above.
    Other {
        /// Human readable description of the failure.
        message: String,
    },
}

impl FormatReadError {
    fn fmt_context(context: Option<&str>) -> String {
        context
            .map(|c| format!(" while reading {c}"))
            .unwrap_or_default()
    }

    fn fmt_position(position: Option<&SourcePosition>) -> String {
        position.map(|pos| format!(" at {pos}")).unwrap_or_default()
    }

    /// Wraps an I/O error with the path or source name being read.
    #[must_use]
    pub fn io(source: std::io::Error, context: impl Into<String>) -> Self {
        FormatReadError::Io {
            source,
            context: Some(context.into()),
        }
    }

    /// Builds an [`FormatReadError::InvalidOption`].
    #[must_use]
    pub fn invalid_option(option: impl Into<String>, message: impl Into<String>) -> Self {
        FormatReadError::InvalidOption {
            option: option.into(),
            message: message.into(),
        }
    }

    /// Attach additional context to the error, returning the updated error.
    #[must_use]
    pub fn with_additional_context(mut self, context: impl Into<String>) -> Self {
        let context = context.into();
        match &mut self {
            FormatReadError::Io {
                context: existing, ..
            }
            | FormatReadError::Parse {
                context: existing, ..
            } => match existing {
                Some(existing) if !existing.is_empty() => {
                    existing.push_str("; ");
                    existing.push_str(&context);
                },
                _ => *existing = Some(context),
            },
            FormatReadError::InvalidOption { message, .. }
            | FormatReadError::Other { message } => {
                message.push_str(" (");
                message.push_str(&context);
                message.push(')');
            },
        }
        self
    }
}

impl fmt::Display for FormatReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatReadError::Io { source, context } => {
                write!(
                    f,
                    "I/O error{}: {source}",
                    Self::fmt_context(context.as_deref())
                )
            },
            FormatReadError::Parse {
                message,
                position,
                context,
            } => write!(
                f,
                "Parse error{}{}: {message}",
                Self::fmt_context(context.as_deref()),
                Self::fmt_position(position.as_ref())
            ),
            FormatReadError::InvalidOption { option, message } => {
                write!(f, "Invalid {option} option: {message}")
            },
            FormatReadError::Other { message } => f.write_str(message),
        }
    }
}

impl StdError for FormatReadError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            FormatReadError::Io { source, .. } => Some(source),
            FormatReadError::Parse { .. }
            | FormatReadError::InvalidOption { .. }
            | FormatReadError::Other { .. } => None,
        }
    }
}

/// Result type alias that uses [`FormatReadError`].
pub type FormatReadResult<T> = Result<T, FormatReadError>;
