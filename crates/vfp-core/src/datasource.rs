//! Opening a VFP file as a data source.
//!
//! [`VfpDataSource::open`] rejects update mode before touching the file,
//! classifies the file, and then scans one schema per catalogue layer, each
//! scan with its own file handle. Layers own their scan reports; nothing is
//! cached between opens.

use std::path::{Path, PathBuf};

use log::{debug, info};
use vfp_core_common::OpenMode;
use vfp_shared::Diagnostic;
use vfp_xml::{
    ScanOptions, ScanReport, SchemaDescriptor, SchemaScanner, SchemaStrategies, SniffOptions,
    SniffReport, FormatSniffer, SUPPORTED_VERSION,
};

use crate::catalogue::{LAYER_CATALOGUE, catalogue_elements, exposed_layer_names};
use crate::drivers::VFP_DRIVER;
use crate::error::{ConfigError, DriverError, FormatError, Result, VfpError};
use crate::types::{DatasetInfo, FieldInfo, LayerInfo};
use crate::utils::FieldTypeExt;

/// Options for [`VfpDataSource::open`].
#[derive(Debug, Clone, Default)]
pub struct OpenOptions {
    /// Classification options
    pub sniff: SniffOptions,
    /// Schema scan options
    pub scan: ScanOptions,
    /// Per-element schema strategies (default: none, schemas stay empty)
    pub strategies: SchemaStrategies,
    /// Exposed layer names to scan; all layers when `None`
    pub layers: Option<Vec<String>>,
}

impl OpenOptions {
    /// Create open options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the classification options
    #[must_use]
    pub fn with_sniff_options(mut self, sniff: SniffOptions) -> Self {
        self.sniff = sniff;
        self
    }

    /// Set the schema scan options
    #[must_use]
    pub fn with_scan_options(mut self, scan: ScanOptions) -> Self {
        self.scan = scan;
        self
    }

    /// Set the schema strategies
    #[must_use]
    pub fn with_strategies(mut self, strategies: SchemaStrategies) -> Self {
        self.strategies = strategies;
        self
    }

    /// Infer field types from text for every catalogue element
    #[must_use]
    pub fn with_text_inference(self) -> Self {
        self.with_strategies(SchemaStrategies::text_inference(catalogue_elements()))
    }

    /// Restrict the layers that are scanned
    #[must_use]
    pub fn with_layers(mut self, layers: Option<Vec<String>>) -> Self {
        self.layers = layers;
        self
    }

    /// Checks the sniff and scan bounds.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] describing the first invalid option.
    pub fn validate(&self) -> Result<()> {
        self.sniff.validate()?;
        self.scan.validate()?;
        if let Some(layers) = &self.layers
            && layers.iter().any(String::is_empty)
        {
            return Err(ConfigError::InvalidOption {
                option: "layer".to_string(),
                message: "layer names must not be empty".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

/// One layer of an opened data source.
#[derive(Debug, Clone)]
pub struct VfpLayer {
    name: String,
    element: &'static str,
    scan: ScanReport,
}

impl VfpLayer {
    /// Exposed, unique layer name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Element scanned for this layer.
    #[must_use]
    pub fn element(&self) -> &'static str {
        self.element
    }

    /// Discovered field schema.
    #[must_use]
    pub fn schema(&self) -> &SchemaDescriptor {
        &self.scan.schema
    }

    /// Full scan report.
    #[must_use]
    pub fn scan(&self) -> &ScanReport {
        &self.scan
    }

    /// Display snapshot of this layer.
    #[must_use]
    pub fn info(&self) -> LayerInfo {
        LayerInfo {
            name: self.name.clone(),
            element: self.element.to_string(),
            found: self.scan.found_target(),
            child_elements: self.scan.child_elements.clone(),
            fields: self
                .scan
                .schema
                .fields()
                .iter()
                .map(|field| FieldInfo {
                    name: field.name.clone(),
                    data_type: field.data_type.label(),
                    ogr_type: field.data_type.ogr_type().to_string(),
                    nullable: field.nullable,
                })
                .collect(),
            status: self
                .scan
                .stop_reason
                .map_or_else(|| "Complete".to_string(), |reason| reason.to_string()),
        }
    }
}

/// An opened VFP file.
#[derive(Debug, Clone)]
pub struct VfpDataSource {
    path: PathBuf,
    sniff: SniffReport,
    layers: Vec<VfpLayer>,
}

impl VfpDataSource {
    /// Opens `path` and scans the schema of every requested layer.
    ///
    /// # Errors
    ///
    /// - [`DriverError::OperationNotSupported`] for [`OpenMode::Update`]
    /// - a configuration error for invalid options or unknown layer names
    /// - an I/O error when the file cannot be read
    /// - [`FormatError::NotRecognized`] when the file is not VFP
    pub fn open(path: impl AsRef<Path>, mode: OpenMode, options: &OpenOptions) -> Result<Self> {
        let path = path.as_ref();
        if mode.is_update() {
            return Err(DriverError::OperationNotSupported {
                driver: VFP_DRIVER.short_name.to_string(),
                operation: "opening a file in update mode".to_string(),
            }
            .into());
        }
        options.validate()?;

        let exposed = exposed_layer_names(&LAYER_CATALOGUE);
        if let Some(wanted) = &options.layers {
            for layer in wanted {
                if !exposed.contains(layer) {
                    return Err(FormatError::LayerNotFound {
                        layer: layer.clone(),
                        available: exposed.join(", "),
                    }
                    .into());
                }
            }
        }

        let sniff = FormatSniffer::new(options.sniff.clone()).classify(path)?;
        if !sniff.classification.is_valid() {
            return Err(FormatError::NotRecognized {
                path: path.to_path_buf(),
                classification: sniff.classification.to_string(),
            }
            .into());
        }
        debug!("{} seems to be a VFP file", path.display());

        let scanner = SchemaScanner::new(options.scan).with_strategies(options.strategies.clone());
        let mut layers = Vec::new();
        for (entry, name) in LAYER_CATALOGUE.iter().zip(exposed) {
            if let Some(wanted) = &options.layers
                && !wanted.contains(&name)
            {
                continue;
            }
            let scan = scanner.scan(path, entry.element).map_err(|err| {
                VfpError::from(err.with_additional_context(format!("layer {name}")))
            })?;
            layers.push(VfpLayer {
                name,
                element: entry.element,
                scan,
            });
        }

        info!(
            "Opened {} with {} layer(s)",
            path.display(),
            layers.len()
        );
        Ok(Self {
            path: path.to_path_buf(),
            sniff,
            layers,
        })
    }

    /// Dataset name (the path it was opened from).
    #[must_use]
    pub fn name(&self) -> String {
        self.path.display().to_string()
    }

    /// Path the dataset was opened from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Format version in effect.
    #[must_use]
    pub fn version(&self) -> &str {
        self.sniff.version.as_deref().unwrap_or(SUPPORTED_VERSION)
    }

    /// Classification report.
    #[must_use]
    pub fn sniff_report(&self) -> &SniffReport {
        &self.sniff
    }

    /// Number of layers.
    #[must_use]
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Layer at `index`, if in range.
    #[must_use]
    pub fn layer(&self, index: usize) -> Option<&VfpLayer> {
        self.layers.get(index)
    }

    /// Layer with the exposed name `name`.
    #[must_use]
    pub fn layer_by_name(&self, name: &str) -> Option<&VfpLayer> {
        self.layers.iter().find(|layer| layer.name == name)
    }

    /// All layers in catalogue order.
    #[must_use]
    pub fn layers(&self) -> &[VfpLayer] {
        &self.layers
    }

    /// Classification diagnostics followed by every layer's scan diagnostics.
    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.sniff
            .diagnostics
            .iter()
            .chain(self.layers.iter().flat_map(|layer| layer.scan.diagnostics.iter()))
    }

    /// Display snapshot of the whole dataset.
    #[must_use]
    pub fn dataset_info(&self) -> DatasetInfo {
        DatasetInfo {
            dataset: self.name(),
            driver: VFP_DRIVER.short_name.to_string(),
            driver_long_name: VFP_DRIVER.long_name.to_string(),
            version: self.version().to_string(),
            layers: self.layers.iter().map(VfpLayer::info).collect(),
            diagnostics: self.diagnostics().map(ToString::to_string).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;
    use vfp_shared::DiagnosticKind;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<v:vfp xmlns:v="urn:vfp">
  <zs><cislo>1</cislo><vymera>10.5</vymera></zs>
  <bpej><kod>3.26.11</kod></bpej>
</v:vfp>
"#;

    fn file_with(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn update_mode_is_rejected_before_reading() {
        let err = VfpDataSource::open(
            "definitely/not/here.vfp",
            OpenMode::Update,
            &OpenOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            VfpError::Driver(DriverError::OperationNotSupported { .. })
        ));
    }

    #[test]
    fn opens_all_catalogue_layers() {
        let file = file_with(SAMPLE);
        let ds = VfpDataSource::open(file.path(), OpenMode::ReadOnly, &OpenOptions::default())
            .unwrap();

        assert_eq!(ds.layer_count(), 19);
        assert_eq!(ds.version(), "2.0");
        assert_eq!(ds.layer(0).unwrap().name(), "ucastnici");
        assert!(ds.layer(19).is_none());

        let zs = ds.layer_by_name("zs").unwrap();
        assert_eq!(zs.scan().child_elements, ["cislo", "vymera"]);
        assert!(zs.schema().is_empty());
        let zs_2 = ds.layer_by_name("zs_2").unwrap();
        assert_eq!(zs_2.element(), "zs");
        assert_eq!(zs_2.scan().child_elements, zs.scan().child_elements);

        assert!(
            ds.diagnostics()
                .any(|d| d.kind == DiagnosticKind::UnknownVersion)
        );
    }

    #[test]
    fn text_inference_fills_schemas() {
        let file = file_with(SAMPLE);
        let options = OpenOptions::default()
            .with_text_inference()
            .with_layers(Some(vec!["zs".to_string(), "bpej".to_string()]));
        let ds = VfpDataSource::open(file.path(), OpenMode::ReadOnly, &options).unwrap();

        assert_eq!(ds.layer_count(), 2);
        let info = ds.dataset_info();
        assert_eq!(info.driver, "VFP");
        assert_eq!(info.layers[0].name, "bpej");
        assert_eq!(info.layers[0].fields[0].data_type, "String");
        assert_eq!(info.layers[1].name, "zs");
        let vymera = &info.layers[1].fields[1];
        assert_eq!((vymera.name.as_str(), vymera.ogr_type.as_str()), ("vymera", "Real"));
        assert_eq!(info.layers[1].status, "Complete");
    }

    #[test]
    fn unknown_layer_is_rejected() {
        let file = file_with(SAMPLE);
        let options = OpenOptions::default().with_layers(Some(vec!["parcely".to_string()]));
        let err = VfpDataSource::open(file.path(), OpenMode::ReadOnly, &options).unwrap_err();
        assert!(matches!(err, VfpError::Format(FormatError::LayerNotFound { .. })));
        assert!(err.is_recoverable());
    }

    #[test]
    fn foreign_file_is_not_recognized() {
        let file = file_with("<?xml version=\"1.0\"?><gpx/>");
        let err = VfpDataSource::open(file.path(), OpenMode::ReadOnly, &OpenOptions::default())
            .unwrap_err();
        match err {
            VfpError::Format(FormatError::NotRecognized { classification, .. }) => {
                assert_eq!(classification, "Invalid");
            },
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn invalid_scan_options_are_config_errors() {
        let file = file_with(SAMPLE);
        let options =
            OpenOptions::default().with_scan_options(ScanOptions::default().with_chunk_size(0));
        let err = VfpDataSource::open(file.path(), OpenMode::ReadOnly, &options).unwrap_err();
        assert!(matches!(err, VfpError::Config(_)));
    }
}
