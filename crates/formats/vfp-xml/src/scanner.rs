//! Shallow schema discovery for one target element.
//!
//! The scanner replays a file from the start, tracks nesting depth and records
//! the direct children of every occurrence of the target element. It never
//! looks further down: an element nested below a direct child stops the scan
//! with [`StopReason::StructuralAnomaly`] and the schema collected so far is
//! returned.

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use vfp_shared::{Diagnostic, DiagnosticKind, FormatReadError, FormatReadResult};

use crate::limits::{
    DEFAULT_CHUNK_SIZE, MAX_EXPANDED_BYTES_PER_CHUNK, STALL_CHUNK_LIMIT, StreamLimits,
};
use crate::schema::{ElementSchema, SchemaDescriptor, SchemaStrategies};
use crate::stream::{Control, StartTag, StreamError, XmlHandler, XmlStream};

/// Default bytes of text kept per child for type refinement.
pub const DEFAULT_SAMPLE_TEXT_LIMIT: usize = 4096;

/// Options for [`SchemaScanner`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    /// Bytes read per chunk (default: 8192)
    pub chunk_size: usize,
    /// Consecutive chunks without events before the scan is abandoned (default: 10)
    pub stall_limit: u64,
    /// Character-data callbacks per chunk; defaults to the chunk size
    pub expansion_threshold: Option<usize>,
    /// Expanded entity bytes per chunk (default: 1 MiB)
    pub max_expanded_bytes: usize,
    /// Text bytes sampled per child element (default: 4096)
    pub sample_text_limit: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            stall_limit: STALL_CHUNK_LIMIT,
            expansion_threshold: None,
            max_expanded_bytes: MAX_EXPANDED_BYTES_PER_CHUNK,
            sample_text_limit: DEFAULT_SAMPLE_TEXT_LIMIT,
        }
    }
}

impl ScanOptions {
    /// Create scan options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the chunk size
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Set the number of quiet chunks tolerated
    #[must_use]
    pub fn with_stall_limit(mut self, stall_limit: u64) -> Self {
        self.stall_limit = stall_limit;
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

    /// Set the text sample size per child
    #[must_use]
    pub fn with_sample_text_limit(mut self, limit: usize) -> Self {
        self.sample_text_limit = limit;
        self
    }

    /// Checks that every bound is usable.
    ///
    /// # Errors
    ///
    /// Returns [`FormatReadError::InvalidOption`] for zero bounds.
    pub fn validate(&self) -> FormatReadResult<()> {
        if self.chunk_size == 0 {
            return Err(FormatReadError::invalid_option(
                "chunk_size",
                "must be at least 1 byte",
            ));
        }
        if self.stall_limit == 0 {
            return Err(FormatReadError::invalid_option(
                "stall_limit",
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
            max_chunks: None,
            stall_chunks: Some(self.stall_limit),
            max_data_events: self.expansion_threshold.unwrap_or(self.chunk_size),
            max_expanded_bytes: self.max_expanded_bytes,
        }
    }
}

/// Why a scan ended before the end of the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// An element was nested below a direct child of the target.
    StructuralAnomaly,
    /// The tokenizer rejected the input.
    MalformedXml,
    /// Too many chunks went by without any event.
    Stalled,
    /// Character data exploded within one chunk.
    SuspiciousExpansion,
    /// The input ended with elements still open.
    Truncated,
}

impl StopReason {
    /// Returns the string representation of this reason.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            StopReason::StructuralAnomaly => "StructuralAnomaly",
            StopReason::MalformedXml => "MalformedXml",
            StopReason::Stalled => "Stalled",
            StopReason::SuspiciousExpansion => "SuspiciousExpansion",
            StopReason::Truncated => "Truncated",
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-scan parse state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct ParseCursor {
    /// Number of currently open elements.
    depth: usize,
    /// Whether the cursor is inside an occurrence of the target.
    inside_target: bool,
    /// Depth at which the current (or last) target occurrence started.
    target_depth: Option<usize>,
    /// Set once the scan must not continue.
    stop: bool,
}

impl ParseCursor {
    fn is_direct_child_depth(&self) -> bool {
        self.target_depth.map(|depth| depth + 1) == Some(self.depth)
    }

    fn control(&self) -> Control {
        if self.stop {
            Control::Stop
        } else {
            Control::Continue
        }
    }
}

/// Result of [`SchemaScanner::scan`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanReport {
    /// Fields recorded for the target.
    pub schema: SchemaDescriptor,
    /// Depth of the first target occurrence, if the target was found.
    pub target_depth: Option<usize>,
    /// Distinct direct child names, first seen first.
    pub child_elements: Vec<String>,
    /// Depth when the scan ended; 0 for a complete, well-formed document.
    pub final_depth: usize,
    /// Why the scan ended early, if it did.
    pub stop_reason: Option<StopReason>,
    /// Failures noticed along the way.
    pub diagnostics: Vec<Diagnostic>,
}

impl ScanReport {
    /// Returns `true` when the whole document was scanned.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.stop_reason.is_none()
    }

    /// Returns `true` when the target element occurred.
    #[must_use]
    pub fn found_target(&self) -> bool {
        self.target_depth.is_some()
    }
}

struct ScanState<'a> {
    target: &'a str,
    strategy: Option<&'a dyn ElementSchema>,
    cursor: ParseCursor,
    first_target_depth: Option<usize>,
    children: Vec<String>,
    schema: SchemaDescriptor,
    sampling: Option<String>,
    sample: String,
    sample_limit: usize,
    anomaly: Option<(String, usize)>,
}

impl<'a> ScanState<'a> {
    fn new(
        target: &'a str,
        strategy: Option<&'a dyn ElementSchema>,
        sample_limit: usize,
    ) -> Self {
        Self {
            target,
            strategy,
            cursor: ParseCursor::default(),
            first_target_depth: None,
            children: Vec::new(),
            schema: SchemaDescriptor::new(),
            sampling: None,
            sample: String::new(),
            sample_limit,
            anomaly: None,
        }
    }

    fn enter_child(&mut self, child: &str) {
        if !self.children.iter().any(|seen| seen == child) {
            self.children.push(child.to_string());
        }
        let Some(strategy) = self.strategy else {
            return;
        };
        if let Some(data_type) = strategy.child_field(child) {
            self.schema.record(child, data_type);
        }
        if self.schema.field(child).is_some() {
            self.sampling = Some(child.to_string());
            self.sample.clear();
        }
    }

    fn leave_child(&mut self) {
        let Some(child) = self.sampling.take() else {
            return;
        };
        if let Some(strategy) = self.strategy
            && let Some(field) = self.schema.field(&child)
            && let Some(refined) = strategy.refine(&child, &field.data_type, &self.sample)
        {
            self.schema.set_type(&child, refined);
        }
        self.sample.clear();
    }

    fn finish_schema(&mut self) {
        let Some(strategy) = self.strategy else {
            return;
        };
        let finished: Vec<_> = self
            .schema
            .fields()
            .iter()
            .map(|field| (field.name.clone(), strategy.finish(field.data_type.clone())))
            .collect();
        for (name, data_type) in finished {
            self.schema.set_type(&name, data_type);
        }
    }
}

impl XmlHandler for ScanState<'_> {
    fn start_element(&mut self, tag: &StartTag<'_>) -> Control {
        let name = tag.name();

        if !self.cursor.inside_target {
            if name == self.target {
                self.cursor.inside_target = true;
                self.cursor.target_depth = Some(self.cursor.depth);
                self.first_target_depth.get_or_insert(self.cursor.depth);
            }
        } else if self.cursor.is_direct_child_depth() {
            self.enter_child(name);
        } else {
            self.anomaly = Some((name.to_string(), self.cursor.depth));
            self.cursor.stop = true;
        }

        self.cursor.depth += 1;
        self.cursor.control()
    }

    fn end_element(&mut self, _name: &str) -> Control {
        self.cursor.depth = self.cursor.depth.saturating_sub(1);

        if self.cursor.inside_target {
            if self.cursor.is_direct_child_depth() {
                self.leave_child();
            } else if self.cursor.target_depth == Some(self.cursor.depth) {
                self.cursor.inside_target = false;
            }
        }
        Control::Continue
    }

    fn characters(&mut self, text: &str) -> Control {
        if self.sampling.is_none() {
            return Control::Continue;
        }
        let room = self.sample_limit.saturating_sub(self.sample.len());
        if text.len() <= room {
            self.sample.push_str(text);
        } else {
            let mut end = room;
            while !text.is_char_boundary(end) {
                end -= 1;
            }
            self.sample.push_str(&text[..end]);
        }
        Control::Continue
    }
}

/// Collects the field schema of one target element.
#[derive(Debug, Clone, Default)]
pub struct SchemaScanner {
    options: ScanOptions,
    strategies: SchemaStrategies,
}

impl SchemaScanner {
    /// Creates a scanner with an empty strategy table.
    #[must_use]
    pub fn new(options: ScanOptions) -> Self {
        Self {
            options,
            strategies: SchemaStrategies::default(),
        }
    }

    /// Replaces the strategy table.
    #[must_use]
    pub fn with_strategies(mut self, strategies: SchemaStrategies) -> Self {
        self.strategies = strategies;
        self
    }

    /// The options in use.
    #[must_use]
    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    /// Scans the file at `path` for `target`, from the first byte.
    ///
    /// # Errors
    ///
    /// Fails only when the options are invalid or the file cannot be read.
    /// Malformed, hostile and truncated content yields a partial report.
    pub fn scan(&self, path: &Path, target: &str) -> FormatReadResult<ScanReport> {
        let context = path.display().to_string();
        let file = File::open(path).map_err(|err| FormatReadError::io(err, context.clone()))?;
        self.scan_reader(file, target, &context)
    }

    /// Scans an arbitrary reader; `context` names it in errors.
    ///
    /// # Errors
    ///
    /// See [`SchemaScanner::scan`].
    pub fn scan_reader<R: Read>(
        &self,
        reader: R,
        target: &str,
        context: &str,
    ) -> FormatReadResult<ScanReport> {
        self.options.validate()?;

        let mut stream = XmlStream::new(reader, &self.options.limits());
        let mut state = ScanState::new(
            target,
            self.strategies.get(target),
            self.options.sample_text_limit,
        );
        let outcome = stream.run(&mut state);
        state.finish_schema();
        let ScanState {
            cursor,
            first_target_depth: target_depth,
            children: child_elements,
            schema,
            anomaly,
            ..
        } = state;

        let mut diagnostics = Vec::new();
        let stop_reason = match outcome {
            Ok(_) => match anomaly {
                Some((element, depth)) => {
                    diagnostics.push(Diagnostic::failure_at(
                        DiagnosticKind::StructuralAnomaly,
                        format!(
                            "<{element}> at depth {depth} is nested below a direct child of \
                             <{target}>; only one level is inspected"
                        ),
                        stream.position(),
                    ));
                    Some(StopReason::StructuralAnomaly)
                },
                None if cursor.depth > 0 => {
                    diagnostics.push(Diagnostic::failure(
                        DiagnosticKind::Truncated,
                        format!("document ended with {} open element(s)", cursor.depth),
                    ));
                    Some(StopReason::Truncated)
                },
                None => None,
            },
            Err(StreamError::Io(err)) => return Err(FormatReadError::io(err, context)),
            Err(StreamError::Malformed { message, position }) => {
                diagnostics.push(Diagnostic::failure_at(
                    DiagnosticKind::MalformedXml,
                    format!("XML parsing of VFP file failed : {message}"),
                    position,
                ));
                Some(StopReason::MalformedXml)
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
                Some(StopReason::SuspiciousExpansion)
            },
            Err(StreamError::Stalled { position, .. }) => {
                diagnostics.push(Diagnostic::failure_at(
                    DiagnosticKind::Stalled,
                    "Too much data inside one element. File probably corrupted",
                    position,
                ));
                Some(StopReason::Stalled)
            },
            Err(StreamError::ChunkLimit { chunks }) => {
                diagnostics.push(Diagnostic::failure(
                    DiagnosticKind::Stalled,
                    format!("gave up after {chunks} chunks"),
                ));
                Some(StopReason::Stalled)
            },
        };

        log::debug!(
            "scanned {context} for <{target}>: {} field(s), {} child element(s), stop: {:?}",
            schema.len(),
            child_elements.len(),
            stop_reason
        );

        Ok(ScanReport {
            schema,
            target_depth,
            child_elements,
            final_depth: cursor.depth,
            stop_reason,
            diagnostics,
        })
    }
}
