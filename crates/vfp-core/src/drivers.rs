//! Driver registry and content-based driver detection.
//!
//! The registry holds the VFP driver and its capabilities. Only drivers with a
//! [`FormatProbe`] take part in [`detect_driver`].
//!
//! # Examples
//!
//! ```
//! use vfp_core::drivers::{find_driver, get_available_drivers};
//!
//! let vfp = find_driver("vfp").expect("VFP driver should exist");
//! assert!(vfp.capabilities.info.is_supported());
//!
//! let available = get_available_drivers();
//! assert_eq!(available.len(), 1);
//! ```

use std::path::Path;

use vfp_core_common::{Driver, FormatProbe, SupportStatus};
use vfp_xml::{FormatSniffer, SniffOptions};

use crate::error::{DriverError, IoErrorExt, Result};

use SupportStatus::{NotSupported, Planned, Supported};

/// The VFP driver definition.
pub static VFP_DRIVER: Driver = Driver::new(
    "VFP",
    "Czech cadastral land consolidation exchange format (VFP)",
    &["vfp", "xml"],
    Supported,
    Planned,
    NotSupported,
);

/// Returns the list of all known drivers.
#[must_use]
pub fn get_drivers() -> Vec<Driver> {
    vec![VFP_DRIVER.clone()]
}

/// Returns all drivers that have at least one supported operation.
#[must_use]
pub fn get_available_drivers() -> Vec<Driver> {
    get_drivers()
        .into_iter()
        .filter(|d| d.capabilities.has_supported_operation())
        .collect()
}

/// Finds a driver by its short name (case-insensitive).
#[must_use]
pub fn find_driver(name: &str) -> Option<Driver> {
    get_drivers()
        .into_iter()
        .find(|d| d.short_name.eq_ignore_ascii_case(name))
}

/// Returns all driver short names in alphabetical order.
#[must_use]
pub fn get_driver_names() -> Vec<&'static str> {
    let mut names: Vec<_> = get_drivers().iter().map(|d| d.short_name).collect();
    names.sort_unstable();
    names
}

/// Recognises VFP files by their root element.
#[derive(Debug, Clone, Default)]
pub struct VfpProbe {
    options: SniffOptions,
}

impl VfpProbe {
    /// Creates a probe using the given sniff options.
    #[must_use]
    pub fn new(options: SniffOptions) -> Self {
        Self { options }
    }
}

impl FormatProbe for VfpProbe {
    fn driver(&self) -> &'static Driver {
        &VFP_DRIVER
    }

    fn identify(&self, path: &Path) -> anyhow::Result<bool> {
        let report = FormatSniffer::new(self.options.clone()).classify(path)?;
        Ok(report.classification.is_valid())
    }
}

/// Probes registered for [`detect_driver`].
#[must_use]
pub fn probes() -> Vec<Box<dyn FormatProbe>> {
    vec![Box::new(VfpProbe::default())]
}

/// Finds the driver able to read `path` by inspecting its content.
///
/// # Errors
///
/// Returns an I/O error if the file cannot be read, and
/// [`DriverError::NotDetected`] when no probe recognises it.
pub fn detect_driver(path: &Path) -> Result<Driver> {
    std::fs::metadata(path).with_read_context("input", path)?;

    for probe in probes() {
        let driver = probe.driver();
        if probe.identify(path)? {
            log::debug!("{} detected as {}", path.display(), driver.short_name);
            return Ok(driver.clone());
        }
        log::debug!("{} is not {}", path.display(), driver.short_name);
    }

    Err(DriverError::NotDetected {
        path: path.to_path_buf(),
    }
    .into())
}
