//! Streaming classification and schema discovery for VFP cadastral XML files.
//!
//! Two components share one bounded streaming tokenizer:
//!
//! - [`FormatSniffer`] decides from the first start tag whether a file is a VFP
//!   document.
//! - [`SchemaScanner`] replays a file and collects the direct children of one
//!   target element into a [`SchemaDescriptor`].
//!
//! Both read fixed-size chunks and defend against entity-expansion bombs and
//! degenerate input; hostile files degrade to an `Invalid` classification or a
//! partial schema plus [`Diagnostic`](vfp_shared::Diagnostic)s.

pub mod entities;
pub mod limits;
pub mod scanner;
pub mod schema;
pub mod sniffer;
pub mod source;
pub mod stream;

pub use limits::{
    DEFAULT_CHUNK_SIZE, EXPECTED_ROOT, MAX_EXPANDED_BYTES_PER_CHUNK, MAX_SNIFF_CHUNKS,
    STALL_CHUNK_LIMIT, SUPPORTED_VERSION, StreamLimits,
};
pub use scanner::{ScanOptions, ScanReport, SchemaScanner, StopReason};
pub use schema::{
    ElementSchema, FieldMap, SchemaDescriptor, SchemaField, SchemaStrategies, TextInference,
};
pub use sniffer::{Classification, FormatSniffer, SniffOptions, SniffReport};
