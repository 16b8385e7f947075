//! Top-level operations behind the `vfp` commands.

use std::path::Path;

use log::info;
use vfp_core_common::OpenMode;
use vfp_xml::{FormatSniffer, SniffOptions, SniffReport};

use crate::datasource::{OpenOptions, VfpDataSource};
use crate::drivers::VFP_DRIVER;
use crate::error::{DriverError, FormatError, Result};
use crate::types::{DatasetInfo, LayerInfo};

/// Classifies `path` without opening it as a data source.
///
/// # Errors
///
/// Returns an error for invalid options or an unreadable file. Files that are
/// not VFP are reported through the returned classification.
pub fn sniff(path: &Path, options: &SniffOptions) -> Result<SniffReport> {
    info!("Sniffing {}", path.display());
    let report = FormatSniffer::new(options.clone()).classify(path)?;
    info!(
        "{} classified as {} after {} chunk(s)",
        path.display(),
        report.classification,
        report.chunks_read
    );
    Ok(report)
}

/// Opens `path` read-only and describes its layers.
///
/// # Errors
///
/// Returns an error if the driver cannot describe datasets or the data
/// source cannot be opened (see [`VfpDataSource::open`]).
pub fn info(path: &Path, options: &OpenOptions) -> Result<DatasetInfo> {
    if !VFP_DRIVER.capabilities.info.is_supported() {
        return Err(DriverError::OperationNotSupported {
            driver: VFP_DRIVER.short_name.to_string(),
            operation: "info".to_string(),
        }
        .into());
    }

    info!("Reading dataset information from {}", path.display());
    let dataset = VfpDataSource::open(path, OpenMode::ReadOnly, options)?;
    Ok(dataset.dataset_info())
}

/// Scans a single layer of `path`.
///
/// # Errors
///
/// Returns [`FormatError::LayerNotFound`] for names outside the catalogue,
/// and any error [`VfpDataSource::open`] reports.
pub fn scan_layer(path: &Path, layer: &str, options: &OpenOptions) -> Result<LayerInfo> {
    let options = options
        .clone()
        .with_layers(Some(vec![layer.to_string()]));
    let dataset = VfpDataSource::open(path, OpenMode::ReadOnly, &options)?;

    dataset
        .layer_by_name(layer)
        .map(|found| found.info())
        .ok_or_else(|| {
            FormatError::LayerNotFound {
                layer: layer.to_string(),
                available: String::new(),
            }
            .into()
        })
}
