//! Data types describing an opened VFP data source.
//!
//! These are plain, display-ready snapshots: the CLI renders them and tests
//! compare them without touching parser state.

/// Information about a dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetInfo {
    /// Path to the dataset
    pub dataset: String,
    /// Driver name
    pub driver: String,
    /// Driver long name
    pub driver_long_name: String,
    /// Format version in effect
    pub version: String,
    /// Layers in catalogue order
    pub layers: Vec<LayerInfo>,
    /// Warnings and failures reported while opening
    pub diagnostics: Vec<String>,
}

/// Information about a layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerInfo {
    /// Exposed layer name
    pub name: String,
    /// Element scanned for the schema
    pub element: String,
    /// Whether the element occurs in the file
    pub found: bool,
    /// Distinct direct child elements
    pub child_elements: Vec<String>,
    /// Schema fields
    pub fields: Vec<FieldInfo>,
    /// `Complete` or the reason the scan stopped
    pub status: String,
}

/// Information about a field/column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    /// Field name
    pub name: String,
    /// Data type
    pub data_type: String,
    /// Equivalent OGR field type
    pub ogr_type: String,
    /// Whether the field is nullable
    pub nullable: bool,
}
