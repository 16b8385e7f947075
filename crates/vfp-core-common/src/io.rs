//! Open modes and format probing.

use std::fmt;
use std::path::Path;

use anyhow::Result;

use crate::drivers::Driver;

/// How a dataset is requested to be opened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OpenMode {
    /// Read-only access.
    #[default]
    ReadOnly,
    /// Read-write access.
    Update,
}

impl OpenMode {
    /// Returns `true` for [`OpenMode::Update`].
    #[must_use]
    pub fn is_update(&self) -> bool {
        matches!(self, OpenMode::Update)
    }
}

impl fmt::Display for OpenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpenMode::ReadOnly => f.write_str("read-only"),
            OpenMode::Update => f.write_str("update"),
        }
    }
}

/// Cheap content-based detection of a file format.
///
/// Probes must not fail on foreign content; they answer `false` instead and
/// reserve errors for I/O problems.
pub trait FormatProbe: Send + Sync {
    /// The driver this probe identifies.
    fn driver(&self) -> &'static Driver;

    /// Returns `true` if the file at `path` is an instance of the driver's format.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    fn identify(&self, path: &Path) -> Result<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_only_is_default() {
        assert_eq!(OpenMode::default(), OpenMode::ReadOnly);
        assert!(!OpenMode::ReadOnly.is_update());
        assert!(OpenMode::Update.is_update());
        assert_eq!(OpenMode::Update.to_string(), "update");
    }
}
