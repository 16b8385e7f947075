//! Driver descriptions and their capability matrix.
//!
//! A driver names a file format, lists the file extensions it is usually found
//! under and states, per operation (info, read, write), whether the operation
//! is supported, planned or unsupported.

/// Support status for a specific driver operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupportStatus {
    /// The operation is implemented.
    Supported,
    /// The operation is not supported by the driver.
    NotSupported,
    /// The operation is planned for a later release.
    Planned,
}

impl SupportStatus {
    /// Returns `true` if the operation is implemented.
    #[must_use]
    pub fn is_supported(&self) -> bool {
        matches!(self, SupportStatus::Supported)
    }

    /// Returns `true` if the operation is supported or planned.
    #[must_use]
    pub fn is_available(&self) -> bool {
        !matches!(self, SupportStatus::NotSupported)
    }

    /// Returns the string representation of this support status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SupportStatus::Supported => "Supported",
            SupportStatus::NotSupported => "Not Supported",
            SupportStatus::Planned => "Planned",
        }
    }
}

/// What a driver can do with its format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverCapabilities {
    /// Opening a dataset and describing its layers and schemas.
    pub info: SupportStatus,
    /// Streaming features out of a dataset.
    pub read: SupportStatus,
    /// Creating or updating datasets.
    pub write: SupportStatus,
}

impl DriverCapabilities {
    /// Returns `true` if at least one operation is supported or planned.
    #[must_use]
    pub fn has_any_support(&self) -> bool {
        self.info.is_available() || self.read.is_available() || self.write.is_available()
    }

    /// Returns `true` if at least one operation is implemented.
    #[must_use]
    pub fn has_supported_operation(&self) -> bool {
        self.info.is_supported() || self.read.is_supported() || self.write.is_supported()
    }
}

/// File format driver definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Driver {
    /// Short name used on the command line (e.g., `"VFP"`).
    pub short_name: &'static str,
    /// Descriptive name for display.
    pub long_name: &'static str,
    /// File extensions, lowercase and without the leading dot.
    pub extensions: &'static [&'static str],
    /// Operations supported by this driver.
    pub capabilities: DriverCapabilities,
}

impl Driver {
    /// Creates a new driver definition.
    #[must_use]
    pub const fn new(
        short_name: &'static str,
        long_name: &'static str,
        extensions: &'static [&'static str],
        info: SupportStatus,
        read: SupportStatus,
        write: SupportStatus,
    ) -> Self {
        Self {
            short_name,
            long_name,
            extensions,
            capabilities: DriverCapabilities { info, read, write },
        }
    }

    /// Returns `true` if `extension` (with or without a leading dot) belongs to this driver.
    #[must_use]
    pub fn handles_extension(&self, extension: &str) -> bool {
        let extension = extension.trim_start_matches('.');
        self.extensions
            .iter()
            .any(|known| known.eq_ignore_ascii_case(extension))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: Driver = Driver::new(
        "VFP",
        "Sample",
        &["vfp", "xml"],
        SupportStatus::Supported,
        SupportStatus::Planned,
        SupportStatus::NotSupported,
    );

    #[test]
    fn status_helpers() {
        assert!(SupportStatus::Supported.is_supported());
        assert!(SupportStatus::Planned.is_available());
        assert!(!SupportStatus::Planned.is_supported());
        assert!(!SupportStatus::NotSupported.is_available());
        assert_eq!(SupportStatus::NotSupported.as_str(), "Not Supported");
    }

    #[test]
    fn capabilities_summary() {
        assert!(SAMPLE.capabilities.has_any_support());
        assert!(SAMPLE.capabilities.has_supported_operation());

        let none = DriverCapabilities {
            info: SupportStatus::NotSupported,
            read: SupportStatus::NotSupported,
            write: SupportStatus::NotSupported,
        };
        assert!(!none.has_any_support());
    }

    #[test]
    fn extension_matching_ignores_case_and_dot() {
        assert!(SAMPLE.handles_extension("VFP"));
        assert!(SAMPLE.handles_extension(".xml"));
        assert!(!SAMPLE.handles_extension("gpx"));
    }
}
