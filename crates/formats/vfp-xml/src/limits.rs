//! Resource bounds applied while tokenizing untrusted XML.

/// Size of one read from the underlying file, in bytes.
pub const DEFAULT_CHUNK_SIZE: usize = 8192;

/// Chunks the sniffer reads before giving up on finding a root element.
pub const MAX_SNIFF_CHUNKS: u64 = 50;

/// Consecutive chunks without an element or text event before a scan is
/// considered stuck.
pub const STALL_CHUNK_LIMIT: u64 = 10;

/// Expanded entity bytes allowed per chunk.
pub const MAX_EXPANDED_BYTES_PER_CHUNK: usize = 1 << 20;

/// Qualified name of the root element of a VFP document.
pub const EXPECTED_ROOT: &str = "v:vfp";

/// The VFP schema version this driver understands.
pub const SUPPORTED_VERSION: &str = "2.0";

/// Bounds enforced by [`crate::stream::XmlStream`] and its chunk source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamLimits {
    /// Bytes per chunk.
    pub chunk_size: usize,
    /// Stop after this many chunks in total.
    pub max_chunks: Option<u64>,
    /// Stop after this many consecutive chunks without progress.
    pub stall_chunks: Option<u64>,
    /// Character-data callbacks allowed per chunk; also caps the entities
    /// entered and left while expanding references.
    pub max_data_events: usize,
    /// Expanded entity bytes allowed per chunk.
    pub max_expanded_bytes: usize,
}

impl Default for StreamLimits {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_chunks: None,
            stall_chunks: None,
            max_data_events: DEFAULT_CHUNK_SIZE,
            max_expanded_bytes: MAX_EXPANDED_BYTES_PER_CHUNK,
        }
    }
}
