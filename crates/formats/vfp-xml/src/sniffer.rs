//! Root element classification.
//!
//! The first start tag of the document decides whether a file is VFP. Reading
//! stops as soon as a decision is made; the rest of the chunk already read is
//! still tokenized so that a hostile payload placed right after the root tag is
//! noticed.

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use vfp_shared::{Diagnostic, DiagnosticKind, FormatReadError, FormatReadResult};

use crate::limits::{
    DEFAULT_CHUNK_SIZE, EXPECTED_ROOT, MAX_EXPANDED_BYTES_PER_CHUNK, MAX_SNIFF_CHUNKS,
    SUPPORTED_VERSION, StreamLimits,
};
use crate::stream::{Control, StartTag, StreamError, XmlHandler, XmlStream};

/// Outcome of classifying a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// No start tag was seen before the sniffer gave up.
    Unknown,
    /// The file is not a VFP document.
    Invalid,
    /// The root element is the expected one.
    Valid,
}

impl Classification {
    /// Returns the string representation of this classification.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Unknown => "Unknown",
            Classification::Invalid => "Invalid",
            Classification::Valid => "Valid",
        }
    }

    /// Returns `true` for [`Classification::Valid`].
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Classification::Valid)
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options for [`FormatSniffer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SniffOptions {
    /// Qualified root element name (default: `v:vfp`)
    pub expected_root: String,
    /// Version the driver was written for (default: `2.0`)
    pub supported_version: String,
    /// Root attribute carrying the format version, if any (default: none)
    pub version_attribute: Option<String>,
    /// Bytes read per chunk (default: 8192)
    pub chunk_size: usize,
    /// Chunks read before giving up (default: 50)
    pub max_chunks: u64,
    /// Character-data callbacks per chunk; defaults to the chunk size
    pub expansion_threshold: Option<usize>,
    /// Expanded entity bytes per chunk (default: 1 MiB)
    pub max_expanded_bytes: usize,
}

impl Default for SniffOptions {
    fn default() -> Self {
        Self {
            expected_root: EXPECTED_ROOT.to_string(),
            supported_version: SUPPORTED_VERSION.to_string(),
            version_attribute: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_chunks: MAX_SNIFF_CHUNKS,
            expansion_threshold: None,
            max_expanded_bytes: MAX_EXPANDED_BYTES_PER_CHUNK,
        }
    }
}

impl SniffOptions {
    /// Create sniff options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the expected root element name
    #[must_use]
    pub fn with_expected_root(mut self, root: impl Into<String>) -> Self {
        self.expected_root = root.into();
        self
    }

    /// Set the supported format version
    #[must_use]
    pub fn with_supported_version(mut self, version: impl Into<String>) -> Self {
        self.supported_version = version.into();
        self
    }

    /// Read the format version from this root attribute
    #[must_use]
    pub fn with_version_attribute(mut self, attribute: Option<String>) -> Self {
        self.version_attribute = attribute;
        self
    }

    /// Set the chunk size
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Set the number of chunks read before giving up
    #[must_use]
    pub fn with_max_chunks(mut self, max_chunks: u64) -> Self {
        self.max_chunks = max_chunks;
        self
    }

    /// Set the per-chunk character-data callback threshold
    #[must_use]
    pub fn with_expansion_threshold(mut self, threshold: Option<usize>) -> Self {
        self.expansion_threshold = threshold;
        self
    }

    /// Set the per-chunk expanded byte limit
    #[must_use]
    pub fn with_max_expanded_bytes(mut self, bytes: usize) -> Self {
        self.max_expanded_bytes = bytes;
        self
    }

    /// Checks that every bound is usable.
    ///
    /// # Errors
    ///
    /// Returns [`FormatReadError::InvalidOption`] for zero bounds or an empty root name.
    pub fn validate(&self) -> FormatReadResult<()> {
        if self.expected_root.is_empty() {
            return Err(FormatReadError::invalid_option(
                "expected_root",
                "root element name must not be empty",
            ));
        }
        if self.chunk_size == 0 {
            return Err(FormatReadError::invalid_option(
                "chunk_size",
                "must be at least 1 byte",
            ));
        }
        if self.max_chunks == 0 {
            return Err(FormatReadError::invalid_option(
                "max_chunks",
                "must be at least 1",
            ));
        }
        if self.expansion_threshold == Some(0) || self.max_expanded_bytes == 0 {
            return Err(FormatReadError::invalid_option(
                "expansion_threshold",
                "expansion bounds must be positive",
            ));
        }
        Ok(())
    }

    fn limits(&self) -> StreamLimits {
        StreamLimits {
            chunk_size: self.chunk_size,
            max_chunks: Some(self.max_chunks),
            stall_chunks: None,
            max_data_events: self.expansion_threshold.unwrap_or(self.chunk_size),
            max_expanded_bytes: self.max_expanded_bytes,
        }
    }
}

/// Result of [`FormatSniffer::classify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SniffReport {
    /// Final classification.
    pub classification: Classification,
    /// Format version; defaulted when a valid file does not declare one.
    pub version: Option<String>,
    /// Chunks read from the file.
    pub chunks_read: u64,
    /// Warnings and failures noticed along the way.
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug)]
struct RootProbe<'a> {
    expected_root: &'a str,
    version_attribute: Option<&'a str>,
    classification: Classification,
    version: Option<String>,
}

impl XmlHandler for RootProbe<'_> {
    fn start_element(&mut self, tag: &StartTag<'_>) -> Control {
        if self.classification != Classification::Unknown {
            return Control::Continue;
        }

        if tag.name() == self.expected_root {
            self.classification = Classification::Valid;
            self.version = self
                .version_attribute
                .and_then(|attribute| tag.attribute(attribute));
        } else {
            self.classification = Classification::Invalid;
        }
        Control::Drain
    }
}

/// Decides whether a file is a VFP document.
#[derive(Debug, Clone, Default)]
pub struct FormatSniffer {
    options: SniffOptions,
}

impl FormatSniffer {
    /// Creates a sniffer with the given options.
    #[must_use]
    pub fn new(options: SniffOptions) -> Self {
        Self { options }
    }

    /// The options in use.
    #[must_use]
    pub fn options(&self) -> &SniffOptions {
        &self.options
    }

    /// Classifies the file at `path`.
    ///
    /// # Errors
    ///
    /// Fails only when the options are invalid or the file cannot be read.
    /// Malformed and hostile content is reported through the returned
    /// diagnostics.
    pub fn classify(&self, path: &Path) -> FormatReadResult<SniffReport> {
        self.options.validate()?;
        let context = path.display().to_string();
        let file = File::open(path).map_err(|err| FormatReadError::io(err, context.clone()))?;
        self.classify_reader(file, &context)
    }

    /// Classifies an arbitrary reader; `context` names it in errors.
    ///
    /// # Errors
    ///
    /// See [`FormatSniffer::classify`].
    pub fn classify_reader<R: Read>(
        &self,
        reader: R,
        context: &str,
    ) -> FormatReadResult<SniffReport> {
        self.options.validate()?;

        let mut stream = XmlStream::new(reader, &self.options.limits());
        let mut probe = RootProbe {
            expected_root: &self.options.expected_root,
            version_attribute: self.options.version_attribute.as_deref(),
            classification: Classification::Unknown,
            version: None,
        };

        let outcome = stream.run(&mut probe);
        let mut classification = probe.classification;
        let mut diagnostics = Vec::new();

        match outcome {
            Ok(_) => {},
            Err(StreamError::Io(err)) => return Err(FormatReadError::io(err, context)),
            Err(StreamError::Malformed { message, position }) => {
                let root_tag = format!("<{}", self.options.expected_root);
                if looks_like(stream.last_chunk(), &root_tag) {
                    diagnostics.push(Diagnostic::failure_at(
                        DiagnosticKind::MalformedXml,
                        format!("XML parsing of VFP file failed : {message}"),
                        position,
                    ));
                } else {
                    log::debug!("{context} is not well-formed XML: {message}");
                }
                classification = Classification::Invalid;
            },
            Err(StreamError::SuspiciousExpansion {
                events,
                bytes,
                position,
            }) => {
                diagnostics.push(Diagnostic::failure_at(
                    DiagnosticKind::SuspiciousExpansion,
                    format!(
                        "File probably corrupted (million laugh pattern): {events} character \
                         data callbacks or expansion steps, {bytes} expanded bytes in one chunk"
                    ),
                    position,
                ));
                classification = Classification::Invalid;
            },
            Err(StreamError::ChunkLimit { chunks }) => {
                log::debug!("{context}: no root element within {chunks} chunks, giving up");
            },
            Err(StreamError::Stalled { chunks, .. }) => {
                log::debug!("{context}: stalled after {chunks} chunks");
            },
        }

        let mut version = probe.version;
        if classification == Classification::Valid {
            log::debug!("{context} seems to be a VFP file");
            let supported = &self.options.supported_version;
            match version.as_deref() {
                None => {
                    diagnostics.push(Diagnostic::warning(
                        DiagnosticKind::UnknownVersion,
                        format!(
                            "VFP schema version is unknown. The driver may not be able to handle \
                             the file correctly and will behave as if it is VFP {supported}."
                        ),
                    ));
                    version = Some(supported.clone());
                },
                Some(found) if found != supported => {
                    diagnostics.push(Diagnostic::warning(
                        DiagnosticKind::UnsupportedVersion,
                        format!(
                            "VFP schema version '{found}' is not handled by the driver. The driver \
                             may not be able to handle the file correctly and will behave as if it \
                             is VFP {supported}."
                        ),
                    ));
                },
                Some(_) => {},
            }
        } else {
            version = None;
        }

        Ok(SniffReport {
            classification,
            version,
            chunks_read: stream.chunks_read(),
            diagnostics,
        })
    }
}

fn looks_like(chunk: &[u8], root_tag: &str) -> bool {
    let text = String::from_utf8_lossy(chunk);
    text.contains("<?xml") && text.contains(root_tag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use vfp_shared::Severity;

    fn sniff(xml: &str, options: SniffOptions) -> SniffReport {
        FormatSniffer::new(options)
            .classify_reader(Cursor::new(xml.as_bytes().to_vec()), "test")
            .unwrap()
    }

    #[test]
    fn valid_root_defaults_version() {
        let report = sniff(
            r#"<?xml version="1.0" encoding="UTF-8"?><v:vfp xmlns:v="urn:vfp"><v:zs/></v:vfp>"#,
            SniffOptions::default(),
        );
        assert_eq!(report.classification, Classification::Valid);
        assert_eq!(report.version.as_deref(), Some("2.0"));
        assert_eq!(report.chunks_read, 1);
        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(report.diagnostics[0].kind, DiagnosticKind::UnknownVersion);
        assert_eq!(report.diagnostics[0].severity, Severity::Warning);
    }

    #[test]
    fn other_root_is_invalid() {
        let report = sniff(
            r#"<?xml version="1.0"?><gpx><v:vfp/></gpx>"#,
            SniffOptions::default(),
        );
        assert_eq!(report.classification, Classification::Invalid);
        assert_eq!(report.version, None);
        assert!(report.diagnostics.is_empty());
    }

    #[test]
    fn unprefixed_root_is_invalid() {
        let report = sniff(r#"<vfp xmlns="urn:vfp"/>"#, SniffOptions::default());
        assert_eq!(report.classification, Classification::Invalid);
    }

    #[test]
    fn version_attribute_is_checked() {
        let options = SniffOptions::default().with_version_attribute(Some("verze".to_string()));

        let supported = sniff(r#"<v:vfp verze="2.0"/>"#, options.clone());
        assert_eq!(supported.version.as_deref(), Some("2.0"));
        assert!(supported.diagnostics.is_empty());

        let newer = sniff(r#"<v:vfp verze="3.1"/>"#, options);
        assert_eq!(newer.classification, Classification::Valid);
        assert_eq!(newer.version.as_deref(), Some("3.1"));
        assert_eq!(newer.diagnostics[0].kind, DiagnosticKind::UnsupportedVersion);
    }

    #[test]
    fn empty_input_is_unknown() {
        let report = sniff("", SniffOptions::default());
        assert_eq!(report.classification, Classification::Unknown);
        assert_eq!(report.chunks_read, 0);
    }

    #[test]
    fn gives_up_after_chunk_limit() {
        let xml = format!("<!--{}--><v:vfp/>", "x".repeat(4096));
        let report = sniff(
            &xml,
            SniffOptions::default().with_chunk_size(64).with_max_chunks(5),
        );
        assert_eq!(report.classification, Classification::Unknown);
        assert_eq!(report.chunks_read, 5);
    }

    #[test]
    fn malformed_vfp_candidate_is_reported() {
        let report = sniff(
            "<?xml version=\"1.0\"?>\n<v:vfp>\n<a></b>\n</v:vfp>",
            SniffOptions::default(),
        );
        assert_eq!(report.classification, Classification::Invalid);
        assert_eq!(report.diagnostics.len(), 1);
        let diagnostic = &report.diagnostics[0];
        assert_eq!(diagnostic.kind, DiagnosticKind::MalformedXml);
        assert_eq!(diagnostic.position.and_then(|p| p.line), Some(3));
    }

    #[test]
    fn malformed_non_candidate_is_silent() {
        let report = sniff("<<<not xml", SniffOptions::default());
        assert_eq!(report.classification, Classification::Invalid);
        assert!(report.diagnostics.is_empty());
    }

    fn nested_entities(leaf: &str) -> String {
        let mut doc = format!("<?xml version=\"1.0\"?>\n<!DOCTYPE v:vfp [\n{leaf}\n");
        for level in 1..=8 {
            let body = format!("&e{};", level - 1).repeat(10);
            doc.push_str(&format!("<!ENTITY e{level} \"{body}\">\n"));
        }
        doc.push_str("]>\n<v:vfp>&e8;</v:vfp>\n");
        doc
    }

    #[test]
    fn empty_entity_bomb_is_invalid() {
        let report = sniff(&nested_entities(r#"<!ENTITY e0 "">"#), SniffOptions::default());
        assert_eq!(report.classification, Classification::Invalid);
        assert_eq!(report.version, None);
        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(report.diagnostics[0].kind, DiagnosticKind::SuspiciousExpansion);
    }

    #[test]
    fn external_entity_bomb_is_invalid() {
        let report = sniff(
            &nested_entities(r#"<!ENTITY e0 SYSTEM "leaf.xml">"#),
            SniffOptions::default(),
        );
        assert_eq!(report.classification, Classification::Invalid);
        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(report.diagnostics[0].kind, DiagnosticKind::SuspiciousExpansion);
    }

    #[test]
    fn zero_bounds_are_rejected() {
        let err = FormatSniffer::new(SniffOptions::default().with_chunk_size(0))
            .classify_reader(Cursor::new(Vec::new()), "test")
            .unwrap_err();
        assert!(matches!(
            err,
            FormatReadError::InvalidOption { ref option, .. } if option == "chunk_size"
        ));

        assert!(SniffOptions::default().with_expected_root("").validate().is_err());
        assert!(SniffOptions::default().with_max_chunks(0).validate().is_err());
    }
}
