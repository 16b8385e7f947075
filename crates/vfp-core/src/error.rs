//! Error types for VFP operations.
//!
//! Only failures that leave the caller without a usable result are errors:
//! unreadable files, rejected options, unsupported operations and files that
//! are not VFP at all. Malformed or hostile content inside a VFP file is
//! reported through [`vfp_shared::Diagnostic`]s on the returned reports.

use std::path::PathBuf;

use thiserror::Error;
use vfp_shared::FormatReadError;

/// Main error type for VFP operations.
///
/// Display formatting is delegated to the underlying variant.
#[derive(Debug, Error)]
pub enum VfpError {
    /// Driver-related errors (not found, unsupported operations)
    #[error(transparent)]
    Driver(#[from] DriverError),

    /// I/O errors (file read, path issues, permissions)
    #[error(transparent)]
    Io(#[from] IoError),

    /// Format recognition and parsing errors
    #[error(transparent)]
    Format(#[from] FormatError),

    /// Configuration errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Generic errors from dependencies
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Driver-related errors.
#[derive(Debug, Error)]
pub enum DriverError {
    /// Driver was not found in the registry
    #[error("Driver '{name}' not found. Available drivers: {available}")]
    NotFound {
        /// The requested driver name
        name: String,
        /// Comma-separated list of available drivers
        available: String,
    },

    /// Driver does not support the requested operation
    #[error("Driver '{driver}' does not support {operation}")]
    OperationNotSupported {
        /// The driver name
        driver: String,
        /// The operation that's not supported
        operation: String,
    },

    /// No registered driver recognised the file
    #[error("No driver recognised '{path}'")]
    NotDetected {
        /// The probed file
        path: PathBuf,
    },
}

/// I/O related errors.
#[derive(Debug, Error)]
pub enum IoError {
    /// Failed to read from a file
    #[error("Failed to read {format} file '{path}': {source}")]
    Read {
        /// The format being read
        format: String,
        /// The file path
        path: PathBuf,
        /// The underlying error
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// File was not found
    #[error("File not found: '{path}'")]
    FileNotFound {
        /// The missing file path
        path: PathBuf,
    },

    /// Permission was denied
    #[error("Permission denied for '{path}'")]
    PermissionDenied {
        /// The path with permission issues
        path: PathBuf,
    },
}

/// Format recognition and parsing errors.
#[derive(Debug, Error)]
pub enum FormatError {
    /// The file is not a VFP document
    #[error("'{path}' is not a VFP file (classification: {classification})")]
    NotRecognized {
        /// The file path
        path: PathBuf,
        /// Classification reported by the sniffer
        classification: String,
    },

    /// Failed to parse a format
    #[error(
        "Failed to parse {format} at line {line}: {message}",
        line = line.map(|l| l.to_string()).unwrap_or_else(|| "unknown".to_string())
    )]
    Parse {
        /// The format being parsed
        format: String,
        /// The line number where parsing failed (if available)
        line: Option<u64>,
        /// Description of the parse error
        message: String,
    },

    /// Requested layer is not part of the catalogue
    #[error("Layer '{layer}' not found. Available layers: {available}")]
    LayerNotFound {
        /// The requested layer
        layer: String,
        /// Comma-separated list of layer names
        available: String,
    },
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Invalid option value
    #[error("Invalid {option} option: {message}")]
    InvalidOption {
        /// The option name
        option: String,
        /// Why it's invalid
        message: String,
    },
}

/// Type alias for Results using `VfpError`.
pub type Result<T> = std::result::Result<T, VfpError>;

impl VfpError {
    /// Get a user-friendly error message.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Driver(e) => e.user_message(),
            Self::Io(e) => e.user_message(),
            Self::Format(e) => e.user_message(),
            Self::Config(e) => format!("Configuration error: {e}"),
            Self::Other(e) => format!("Error: {e}"),
        }
    }

    /// Get recovery suggestions if available.
    #[must_use]
    pub fn recovery_suggestion(&self) -> Option<String> {
        match self {
            Self::Driver(e) => e.recovery_suggestion(),
            Self::Io(e) => e.recovery_suggestion(),
            Self::Format(e) => e.recovery_suggestion(),
            Self::Config(_) => {
                Some("Limits and sizes must be positive; see 'vfp --help'.".to_string())
            },
            Self::Other(_) => None,
        }
    }

    /// Check if this error is potentially recoverable.
    ///
    /// Recoverable errors go away when the command is retried with
    /// different parameters.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Config(_) | Self::Format(FormatError::LayerNotFound { .. })
        )
    }
}

impl DriverError {
    fn user_message(&self) -> String {
        match self {
            Self::NotFound { name, available } => {
                format!(
                    "Driver '{name}' not found.\n\nAvailable drivers:\n{}",
                    available
                        .split(", ")
                        .map(|d| format!("  - {d}"))
                        .collect::<Vec<_>>()
                        .join("\n")
                )
            },
            Self::OperationNotSupported { driver, operation } => {
                format!("The '{driver}' driver does not support {operation}.")
            },
            Self::NotDetected { .. } => self.to_string(),
        }
    }

    fn recovery_suggestion(&self) -> Option<String> {
        match self {
            Self::NotFound { .. } => {
                Some("Run 'vfp drivers' to see all available drivers.".to_string())
            },
            Self::OperationNotSupported { .. } => {
                Some("Open the file read-only.".to_string())
            },
            Self::NotDetected { .. } => None,
        }
    }
}

impl IoError {
    fn user_message(&self) -> String {
        match self {
            Self::Read { format, path, .. } => {
                format!("Failed to read {} file: {}", format, path.display())
            },
            Self::FileNotFound { path } => {
                format!("File not found: {}", path.display())
            },
            Self::PermissionDenied { .. } => self.to_string(),
        }
    }

    fn recovery_suggestion(&self) -> Option<String> {
        match self {
            Self::FileNotFound { .. } => {
                Some("Check that the file path is correct and the file exists.".to_string())
            },
            Self::PermissionDenied { .. } => {
                Some("Check file permissions and ensure you have access.".to_string())
            },
            Self::Read { .. } => None,
        }
    }
}

impl FormatError {
    fn user_message(&self) -> String {
        match self {
            Self::NotRecognized { path, .. } => {
                format!("{} is not a VFP file.", path.display())
            },
            Self::Parse {
                format,
                line,
                message,
            } => {
                if let Some(line_num) = line {
                    format!("Parse error in {format} at line {line_num}: {message}")
                } else {
                    format!("Parse error in {format}: {message}")
                }
            },
            Self::LayerNotFound { .. } => self.to_string(),
        }
    }

    fn recovery_suggestion(&self) -> Option<String> {
        match self {
            Self::NotRecognized { .. } => Some(
                "Run 'vfp sniff' on the file to see why it was not recognised.".to_string(),
            ),
            Self::Parse { .. } => Some("Check the file format and ensure it's valid.".to_string()),
            Self::LayerNotFound { .. } => {
                Some("Run 'vfp info' without --layer to list all layers.".to_string())
            },
        }
    }
}

impl From<FormatReadError> for VfpError {
    fn from(err: FormatReadError) -> Self {
        match err {
            FormatReadError::Io { source, context } => {
                let path = PathBuf::from(context.unwrap_or_default());
                match source.kind() {
                    std::io::ErrorKind::NotFound => IoError::FileNotFound { path }.into(),
                    std::io::ErrorKind::PermissionDenied => {
                        IoError::PermissionDenied { path }.into()
                    },
                    _ => IoError::Read {
                        format: "VFP".to_string(),
                        path,
                        source: Box::new(source),
                    }
                    .into(),
                }
            },
            FormatReadError::Parse {
                message, position, ..
            } => FormatError::Parse {
                format: "VFP".to_string(),
                line: position.and_then(|p| p.line),
                message,
            }
            .into(),
            FormatReadError::InvalidOption { option, message } => {
                ConfigError::InvalidOption { option, message }.into()
            },
            FormatReadError::Other { message } => Self::Other(anyhow::anyhow!(message)),
        }
    }
}

/// Extension trait for adding I/O context to errors.
pub trait IoErrorExt<T> {
    /// Add read context to an error.
    ///
    /// # Errors
    ///
    /// Returns an [`IoError::Read`] if the underlying operation fails.
    fn with_read_context(self, format: &str, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T, E> IoErrorExt<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn with_read_context(self, format: &str, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|e| {
            VfpError::Io(IoError::Read {
                format: format.to_string(),
                path: path.into(),
                source: Box::new(e),
            })
        })
    }
}

/// Helper to create `DriverError::NotFound` with available drivers.
#[must_use]
pub fn driver_not_found(name: &str) -> DriverError {
    use crate::drivers::get_driver_names;

    let available = get_driver_names().join(", ");
    DriverError::NotFound {
        name: name.to_string(),
        available,
    }
}
