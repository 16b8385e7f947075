//! Callback-style streaming over `quick-xml`.
//!
//! [`XmlStream::run`] pulls events from a [`ChunkSource`] and dispatches them to
//! an [`XmlHandler`]. Start tags, end tags and character data are the only
//! events a handler sees; comments, processing instructions, the XML
//! declaration and the DOCTYPE are consumed silently (the DOCTYPE feeds the
//! [`EntityTable`]).
//!
//! Every character-data callback within one chunk is counted, and so is every
//! byte produced by entity expansion and every entity entered or left while
//! expanding. Crossing any bound aborts the stream with
//! [`StreamError::SuspiciousExpansion`]: a chunk of physical input can only
//! legitimately carry a bounded amount of text, so anything beyond that is
//! expansion feeding on itself.

use std::io::{self, Read};

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use thiserror::Error;
use vfp_shared::SourcePosition;

use crate::entities::{EntityError, EntityTable, Expansion, Reference};
use crate::limits::StreamLimits;
use crate::source::{ChunkSource, Trip};

/// What the stream should do after a callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Control {
    /// Keep going.
    Continue,
    /// Finish the chunk already read, then end with [`StreamEnd::Drained`].
    Drain,
    /// End immediately with [`StreamEnd::Stopped`].
    Stop,
}

/// How a stream ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    /// End of input.
    Eof,
    /// A handler returned [`Control::Stop`].
    Stopped,
    /// A handler returned [`Control::Drain`] and the buffered chunk was consumed.
    Drained,
}

/// Failures that end a stream.
#[derive(Debug, Error)]
pub enum StreamError {
    /// The tokenizer rejected the input.
    #[error("{message}")]
    Malformed {
        /// Tokenizer message.
        message: String,
        /// Where the error was detected.
        position: SourcePosition,
    },
    /// Too much character data within one chunk.
    #[error(
        "character data exceeded the per-chunk bound ({events} callbacks or expansion steps, \
         {bytes} expanded bytes)"
    )]
    SuspiciousExpansion {
        /// Callbacks, or expansion steps if those ran out first, counted in the
        /// offending chunk.
        events: usize,
        /// Expanded bytes counted in the offending chunk.
        bytes: usize,
        /// Where the expansion was detected.
        position: SourcePosition,
    },
    /// The total chunk budget ran out.
    #[error("gave up after {chunks} chunks")]
    ChunkLimit {
        /// Chunks read.
        chunks: u64,
    },
    /// Too many chunks without any element or text event.
    #[error("no element or text event for too many chunks (read {chunks} chunks)")]
    Stalled {
        /// Chunks read.
        chunks: u64,
        /// Where reading stopped.
        position: SourcePosition,
    },
    /// The underlying reader failed.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// A start tag as seen by a handler.
#[derive(Debug)]
pub struct StartTag<'a> {
    name: &'a str,
    raw: &'a BytesStart<'a>,
}

impl StartTag<'_> {
    /// Qualified tag name, prefix included (e.g. `v:vfp`).
    #[must_use]
    pub fn name(&self) -> &str {
        self.name
    }

    /// Raw value of the attribute with qualified name `key`.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<String> {
        self.raw
            .attributes()
            .flatten()
            .find(|attr| attr.key.as_ref() == key.as_bytes())
            .map(|attr| String::from_utf8_lossy(&attr.value).into_owned())
    }
}

/// Receiver of streaming XML events.
pub trait XmlHandler {
    /// Called for every start tag, including the start half of `<empty/>`.
    fn start_element(&mut self, tag: &StartTag<'_>) -> Control;

    /// Called for every end tag.
    fn end_element(&mut self, _name: &str) -> Control {
        Control::Continue
    }

    /// Called for every run of character data and every expanded entity piece.
    fn characters(&mut self, _text: &str) -> Control {
        Control::Continue
    }
}

#[derive(Debug)]
struct ExpansionGuard {
    chunk: u64,
    events: usize,
    steps: usize,
    bytes: usize,
    max_events: usize,
    max_bytes: usize,
}

impl ExpansionGuard {
    fn new(limits: &StreamLimits) -> Self {
        Self {
            chunk: 0,
            events: 0,
            steps: 0,
            bytes: 0,
            max_events: limits.max_data_events,
            max_bytes: limits.max_expanded_bytes,
        }
    }

    fn sync(&mut self, chunk: u64) {
        if chunk != self.chunk {
            self.chunk = chunk;
            self.events = 0;
            self.steps = 0;
            self.bytes = 0;
        }
    }

    /// Counts one callback; returns `false` once the chunk is over budget.
    fn admit(&mut self, chunk: u64, len: usize, expanded: bool) -> bool {
        self.sync(chunk);
        self.events += 1;
        if expanded {
            self.bytes += len;
        }
        self.events < self.max_events && self.bytes <= self.max_bytes
    }

    /// Expansion steps still allowed in `chunk`.
    fn steps_left(&mut self, chunk: u64) -> usize {
        self.sync(chunk);
        self.max_events.saturating_sub(self.steps)
    }

    /// Counts finished expansion steps; returns `false` once over budget.
    fn charge_steps(&mut self, steps: usize) -> bool {
        self.steps += steps;
        self.steps <= self.max_events
    }

    fn exceeded<R: Read>(&self, reader: &Reader<ChunkSource<R>>) -> StreamError {
        StreamError::SuspiciousExpansion {
            events: self.events.max(self.steps),
            bytes: self.bytes,
            position: current_position(reader),
        }
    }
}

/// Streaming tokenizer over a chunked reader.
#[derive(Debug)]
pub struct XmlStream<R: Read> {
    reader: Reader<ChunkSource<R>>,
    entities: EntityTable,
    guard: ExpansionGuard,
    buf: Vec<u8>,
}

impl<R: Read> XmlStream<R> {
    /// Creates a stream reading `inner` under `limits`.
    pub fn new(inner: R, limits: &StreamLimits) -> Self {
        let mut reader = Reader::from_reader(ChunkSource::new(inner, limits));
        let config = reader.config_mut();
        config.expand_empty_elements = true;
        config.check_end_names = true;

        Self {
            reader,
            entities: EntityTable::default(),
            guard: ExpansionGuard::new(limits),
            buf: Vec::new(),
        }
    }

    /// Chunks read from the input so far.
    #[must_use]
    pub fn chunks_read(&self) -> u64 {
        self.reader.get_ref().chunks_read()
    }

    /// Raw bytes of the most recently read chunk.
    #[must_use]
    pub fn last_chunk(&self) -> &[u8] {
        self.reader.get_ref().last_chunk()
    }

    /// Current tokenizer position.
    #[must_use]
    pub fn position(&self) -> SourcePosition {
        current_position(&self.reader)
    }

    /// Dispatches events to `handler` until input ends, a handler asks to stop,
    /// or a guard trips.
    ///
    /// # Errors
    ///
    /// Returns a [`StreamError`] for malformed input, guard trips and I/O failures.
    pub fn run<H: XmlHandler>(&mut self, handler: &mut H) -> Result<StreamEnd, StreamError> {
        let Self {
            reader,
            entities,
            guard,
            buf,
        } = self;

        loop {
            buf.clear();
            let event = match reader.read_event_into(buf) {
                Ok(event) => event,
                Err(err) => return end_on_error(reader, err),
            };

            let control = match event {
                Event::Start(start) => {
                    let name = element_name(reader, start.name().into_inner())?;
                    reader.get_mut().mark_progress();
                    handler.start_element(&StartTag { name, raw: &start })
                },
                Event::End(end) => {
                    let name = element_name(reader, end.name().into_inner())?;
                    reader.get_mut().mark_progress();
                    handler.end_element(name)
                },
                Event::Text(text) => {
                    reader.get_mut().mark_progress();
                    deliver(handler, guard, reader, &String::from_utf8_lossy(&text), false)?
                },
                Event::CData(data) => {
                    reader.get_mut().mark_progress();
                    deliver(handler, guard, reader, &String::from_utf8_lossy(&data), false)?
                },
                Event::GeneralRef(reference) => {
                    reader.get_mut().mark_progress();
                    let name = String::from_utf8_lossy(&reference).into_owned();
                    match entities.resolve(&name) {
                        Ok(Reference::Text(text)) => {
                            deliver(handler, guard, reader, &text, false)?
                        },
                        Ok(Reference::Skipped) => Control::Continue,
                        Ok(Reference::Expansion(expansion)) => {
                            expand(handler, guard, reader, expansion)?
                        },
                        Err(err) => return Err(malformed(reader, err.to_string())),
                    }
                },
                Event::DocType(doctype) => {
                    *entities = EntityTable::from_doctype(&String::from_utf8_lossy(&doctype));
                    Control::Continue
                },
                Event::Eof => return Ok(StreamEnd::Eof),
                _ => Control::Continue,
            };

            match control {
                Control::Continue => {},
                Control::Drain => reader.get_mut().seal(),
                Control::Stop => return Ok(StreamEnd::Stopped),
            }
        }
    }
}

fn deliver<H: XmlHandler, R: Read>(
    handler: &mut H,
    guard: &mut ExpansionGuard,
    reader: &Reader<ChunkSource<R>>,
    text: &str,
    expanded: bool,
) -> Result<Control, StreamError> {
    let chunk = reader.get_ref().chunks_read();
    if !guard.admit(chunk, text.len(), expanded) {
        return Err(guard.exceeded(reader));
    }
    Ok(handler.characters(text))
}

/// Delivers the pieces of one internal entity, charging the entities entered
/// and left to the current chunk.
fn expand<H: XmlHandler, R: Read>(
    handler: &mut H,
    guard: &mut ExpansionGuard,
    reader: &Reader<ChunkSource<R>>,
    expansion: Expansion<'_>,
) -> Result<Control, StreamError> {
    let chunk = reader.get_ref().chunks_read();
    let mut expansion = expansion.with_step_limit(guard.steps_left(chunk));
    let mut control = Control::Continue;

    for piece in expansion.by_ref() {
        let piece = match piece {
            Ok(piece) => piece,
            Err(EntityError::StepLimit(_)) => break,
            Err(err) => return Err(malformed(reader, err.to_string())),
        };
        control = control.max(deliver(handler, guard, reader, &piece, true)?);
        if control == Control::Stop {
            break;
        }
    }

    if !guard.charge_steps(expansion.steps()) {
        return Err(guard.exceeded(reader));
    }
    Ok(control)
}

fn element_name<'a, R: Read>(
    reader: &Reader<ChunkSource<R>>,
    raw: &'a [u8],
) -> Result<&'a str, StreamError> {
    std::str::from_utf8(raw)
        .map_err(|err| malformed(reader, format!("element name is not valid UTF-8: {err}")))
}

fn current_position<R: Read>(reader: &Reader<ChunkSource<R>>) -> SourcePosition {
    reader
        .get_ref()
        .position_of(reader.buffer_position() as u64)
}

fn malformed<R: Read>(reader: &Reader<ChunkSource<R>>, message: String) -> StreamError {
    StreamError::Malformed {
        message,
        position: current_position(reader),
    }
}

fn end_on_error<R: Read>(
    reader: &Reader<ChunkSource<R>>,
    err: quick_xml::Error,
) -> Result<StreamEnd, StreamError> {
    let source = reader.get_ref();
    match source.tripped() {
        Some(Trip::Sealed) => return Ok(StreamEnd::Drained),
        Some(Trip::ChunkLimit) => {
            return Err(StreamError::ChunkLimit {
                chunks: source.chunks_read(),
            });
        },
        Some(Trip::Stalled) => {
            return Err(StreamError::Stalled {
                chunks: source.chunks_read(),
                position: current_position(reader),
            });
        },
        None => {},
    }

    match err {
        quick_xml::Error::Io(err) => Err(StreamError::Io(io::Error::new(
            err.kind(),
            err.to_string(),
        ))),
        other => Err(StreamError::Malformed {
            message: other.to_string(),
            position: source.position_of(reader.error_position() as u64),
        }),
    }
}
