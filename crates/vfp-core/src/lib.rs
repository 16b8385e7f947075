//! `vfp-core` opens VFP cadastral exchange files as layered data sources.
//!
//! This crate includes:
//! - **Driver registry**: the VFP driver, its capabilities and content-based detection.
//! - **Layer catalogue**: the fixed list of layers every VFP file exposes.
//! - **Data source**: classification, update-mode rejection and per-layer schema scans.
//! - **Operations**: the `sniff`, `info` and `scan_layer` entry points used by the CLI.

pub mod catalogue;
pub mod datasource;
pub mod drivers;
pub mod error;
pub mod operations;
pub mod types;
pub mod utils;

pub use datasource::{OpenOptions, VfpDataSource, VfpLayer};
pub use error::{Result, VfpError};
pub use vfp_core_common::OpenMode;
