//! Fixed-size chunked reader feeding the XML tokenizer.
//!
//! [`ChunkSource`] refills its buffer one whole chunk at a time, which gives the
//! guards in [`crate::stream`] a stable notion of "the current chunk". All
//! limits are enforced here, at refill time, so a single oversized token
//! (a comment or processing instruction that never ends) cannot make the
//! tokenizer buffer more than the permitted number of chunks.
//!
//! A chunk that ends inside character data counts as progress: the tokenizer
//! only reports text once it reaches the next `<`, so a long text node would
//! otherwise look exactly like a runaway comment.

use std::collections::VecDeque;
use std::io::{self, BufRead, Read};

use vfp_shared::SourcePosition;

use crate::limits::StreamLimits;

/// Chunks whose newline offsets are kept for line/column lookup.
const LINE_WINDOW_CHUNKS: usize = 4;

/// Why a [`ChunkSource`] refused to read another chunk. Once set it is sticky.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trip {
    /// The total chunk budget was used up.
    ChunkLimit,
    /// Too many chunks were read since the last progress mark.
    Stalled,
    /// The source was sealed by its consumer.
    Sealed,
}

/// Lexical context at a chunk boundary, tracked byte by byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Markup {
    Text,
    AfterLt,
    AfterBang,
    /// Partially matched `--` or `[CDATA[` after `<!`.
    Keyword {
        keyword: &'static [u8],
        matched: usize,
    },
    /// Start or end tag, with the open attribute quote.
    Tag(Option<u8>),
    /// Comment, with the number of trailing dashes.
    Comment(u8),
    /// Processing instruction; `true` after a `?`.
    Pi(bool),
    /// CDATA section, with the number of trailing `]`.
    CData(u8),
    /// DOCTYPE or another `<!` declaration.
    Decl {
        depth: usize,
        quote: Option<u8>,
    },
}

impl Markup {
    fn is_character_data(self) -> bool {
        matches!(self, Markup::Text | Markup::CData(_))
    }

    fn next(self, byte: u8) -> Self {
        match self {
            Markup::Text if byte == b'<' => Markup::AfterLt,
            Markup::Text => Markup::Text,
            Markup::AfterLt => match byte {
                b'?' => Markup::Pi(false),
                b'!' => Markup::AfterBang,
                _ => Markup::Tag(None).next(byte),
            },
            Markup::AfterBang => match byte {
                b'-' => Markup::Keyword {
                    keyword: b"--",
                    matched: 1,
                },
                b'[' => Markup::Keyword {
                    keyword: b"[CDATA[",
                    matched: 1,
                },
                _ => Markup::declaration().next(byte),
            },
            Markup::Keyword { keyword, matched } if keyword[matched] == byte => {
                if matched + 1 < keyword.len() {
                    Markup::Keyword {
                        keyword,
                        matched: matched + 1,
                    }
                } else if keyword == b"--" {
                    Markup::Comment(0)
                } else {
                    Markup::CData(0)
                }
            },
            Markup::Keyword { keyword, matched } => keyword[..matched]
                .iter()
                .fold(Markup::declaration(), |state, &b| state.next(b))
                .next(byte),
            Markup::Tag(None) => match byte {
                b'>' => Markup::Text,
                b'"' | b'\'' => Markup::Tag(Some(byte)),
                _ => Markup::Tag(None),
            },
            Markup::Tag(Some(quote)) if byte == quote => Markup::Tag(None),
            Markup::Tag(open) => Markup::Tag(open),
            Markup::Comment(dashes) => match byte {
                b'-' => Markup::Comment((dashes + 1).min(2)),
                b'>' if dashes == 2 => Markup::Text,
                _ => Markup::Comment(0),
            },
            Markup::Pi(question) => match byte {
                b'>' if question => Markup::Text,
                b'?' => Markup::Pi(true),
                _ => Markup::Pi(false),
            },
            Markup::CData(brackets) => match byte {
                b']' => Markup::CData((brackets + 1).min(2)),
                b'>' if brackets == 2 => Markup::Text,
                _ => Markup::CData(0),
            },
            Markup::Decl {
                depth,
                quote: Some(quote),
            } => Markup::Decl {
                depth,
                quote: (byte != quote).then_some(quote),
            },
            Markup::Decl { depth, quote: None } => match byte {
                b'"' | b'\'' => Markup::Decl {
                    depth,
                    quote: Some(byte),
                },
                b'[' => Markup::Decl {
                    depth: depth + 1,
                    quote: None,
                },
                b']' => Markup::Decl {
                    depth: depth.saturating_sub(1),
                    quote: None,
                },
                b'>' if depth == 0 => Markup::Text,
                _ => Markup::Decl { depth, quote: None },
            },
        }
    }

    fn declaration() -> Self {
        Markup::Decl {
            depth: 0,
            quote: None,
        }
    }
}

#[derive(Debug)]
struct ChunkLines {
    start: u64,
    newlines: Vec<usize>,
}

/// A [`BufRead`] adapter that reads its inner reader in fixed-size chunks.
#[derive(Debug)]
pub struct ChunkSource<R> {
    inner: R,
    buf: Vec<u8>,
    pos: usize,
    filled: usize,
    chunks_read: u64,
    bytes_read: u64,
    eof: bool,
    sealed: bool,
    tripped: Option<Trip>,
    max_chunks: Option<u64>,
    stall_chunks: Option<u64>,
    progress_chunk: u64,
    markup: Markup,
    window: VecDeque<ChunkLines>,
    newlines_before_window: u64,
    last_newline_before_window: Option<u64>,
}

impl<R: Read> ChunkSource<R> {
    /// Wraps `inner`, reading `limits.chunk_size` bytes per chunk.
    pub fn new(inner: R, limits: &StreamLimits) -> Self {
        Self {
            inner,
            buf: vec![0; limits.chunk_size.max(1)],
            pos: 0,
            filled: 0,
            chunks_read: 0,
            bytes_read: 0,
            eof: false,
            sealed: false,
            tripped: None,
            max_chunks: limits.max_chunks,
            stall_chunks: limits.stall_chunks,
            progress_chunk: 0,
            markup: Markup::Text,
            window: VecDeque::with_capacity(LINE_WINDOW_CHUNKS + 1),
            newlines_before_window: 0,
            last_newline_before_window: None,
        }
    }

    /// Number of non-empty chunks read so far.
    #[must_use]
    pub fn chunks_read(&self) -> u64 {
        self.chunks_read
    }

    /// Total bytes read from the inner reader.
    #[must_use]
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Raw bytes of the most recently read chunk.
    #[must_use]
    pub fn last_chunk(&self) -> &[u8] {
        &self.buf[..self.filled]
    }

    /// The limit that stopped this source, if any.
    #[must_use]
    pub fn tripped(&self) -> Option<Trip> {
        self.tripped
    }

    /// Refuse to read any further chunk; buffered bytes remain readable.
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    /// Restart the stall budget from the current chunk.
    pub fn mark_progress(&mut self) {
        self.progress_chunk = self.chunks_read;
    }

    /// Converts a byte offset into a line/column position.
    ///
    /// Only offsets inside the last few chunks can be resolved to a line;
    /// older offsets are reported by byte offset alone.
    #[must_use]
    pub fn position_of(&self, offset: u64) -> SourcePosition {
        let mut position = SourcePosition::at_offset(offset);
        if let Some(front) = self.window.front()
            && offset < front.start
        {
            return position;
        }

        let mut line = self.newlines_before_window;
        let mut last_newline = self.last_newline_before_window;
        'chunks: for chunk in &self.window {
            if offset < chunk.start {
                break;
            }
            for &relative in &chunk.newlines {
                let absolute = chunk.start + relative as u64;
                if absolute >= offset {
                    break 'chunks;
                }
                line += 1;
                last_newline = Some(absolute);
            }
        }

        position.line = Some(line + 1);
        position.column = Some(match last_newline {
            Some(newline) => offset - newline,
            None => offset + 1,
        });
        position
    }

    fn trip(&mut self, trip: Trip) -> io::Error {
        self.tripped = Some(trip);
        io::Error::other(format!("chunk source stopped: {trip:?}"))
    }

    fn refill(&mut self) -> io::Result<()> {
        if self.eof {
            return Ok(());
        }
        if let Some(trip) = self.tripped {
            return Err(self.trip(trip));
        }
        if self.sealed {
            return Err(self.trip(Trip::Sealed));
        }
        if let Some(max) = self.max_chunks
            && self.chunks_read >= max
        {
            return Err(self.trip(Trip::ChunkLimit));
        }
        if self.markup.is_character_data() {
            self.progress_chunk = self.chunks_read;
        }
        if let Some(limit) = self.stall_chunks
            && self.chunks_read - self.progress_chunk >= limit
        {
            return Err(self.trip(Trip::Stalled));
        }

        // An empty final read keeps the previous chunk visible through `last_chunk`.
        let mut filled = 0;
        while filled < self.buf.len() {
            match self.inner.read(&mut self.buf[filled..]) {
                Ok(0) => {
                    self.eof = true;
                    break;
                },
                Ok(n) => filled += n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {},
                Err(err) => return Err(err),
            }
        }

        if filled > 0 {
            self.pos = 0;
            self.filled = filled;
            self.index_lines();
            self.markup = self.buf[..filled]
                .iter()
                .fold(self.markup, |state, &byte| state.next(byte));
            self.chunks_read += 1;
            self.bytes_read += filled as u64;
        }
        Ok(())
    }

    fn index_lines(&mut self) {
        let newlines = self.buf[..self.filled]
            .iter()
            .enumerate()
            .filter_map(|(idx, byte)| (*byte == b'\n').then_some(idx))
            .collect();
        self.window.push_back(ChunkLines {
            start: self.bytes_read,
            newlines,
        });

        if self.window.len() > LINE_WINDOW_CHUNKS
            && let Some(evicted) = self.window.pop_front()
        {
            self.newlines_before_window += evicted.newlines.len() as u64;
            if let Some(last) = evicted.newlines.last() {
                self.last_newline_before_window = Some(evicted.start + *last as u64);
            }
        }
    }
}

impl<R: Read> BufRead for ChunkSource<R> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        if self.pos >= self.filled {
            self.refill()?;
        }
        Ok(&self.buf[self.pos..self.filled])
    }

    fn consume(&mut self, amt: usize) {
        self.pos = (self.pos + amt).min(self.filled);
    }
}

impl<R: Read> Read for ChunkSource<R> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        let available = self.fill_buf()?;
        let n = available.len().min(out.len());
        out[..n].copy_from_slice(&available[..n]);
        self.consume(n);
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn limits(chunk_size: usize) -> StreamLimits {
        StreamLimits {
            chunk_size,
            ..StreamLimits::default()
        }
    }

    fn drain<R: Read>(source: &mut ChunkSource<R>) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();
        source.read_to_end(&mut out)?;
        Ok(out)
    }

    #[test]
    fn reads_whole_input_in_chunks() {
        let data = b"0123456789abcdef0123".to_vec();
        let mut source = ChunkSource::new(Cursor::new(data.clone()), &limits(8));

        assert_eq!(drain(&mut source).unwrap(), data);
        assert_eq!(source.chunks_read(), 3);
        assert_eq!(source.bytes_read(), 20);
        assert_eq!(source.last_chunk(), b"0123");
        assert!(source.tripped().is_none());
    }

    #[test]
    fn chunk_limit_trips() {
        let mut source = ChunkSource::new(
            Cursor::new(vec![b'x'; 100]),
            &StreamLimits {
                chunk_size: 10,
                max_chunks: Some(3),
                ..StreamLimits::default()
            },
        );

        assert!(drain(&mut source).is_err());
        assert_eq!(source.chunks_read(), 3);
        assert_eq!(source.tripped(), Some(Trip::ChunkLimit));
    }

    #[test]
    fn stall_budget_restarts_on_progress() {
        let mut data = b"<!--".to_vec();
        data.extend(vec![b'x'; 96]);
        let mut source = ChunkSource::new(
            Cursor::new(data),
            &StreamLimits {
                chunk_size: 10,
                stall_chunks: Some(2),
                ..StreamLimits::default()
            },
        );
        let mut byte = [0u8; 10];

        source.read_exact(&mut byte).unwrap();
        source.read_exact(&mut byte).unwrap();
        source.mark_progress();
        source.read_exact(&mut byte).unwrap();
        source.read_exact(&mut byte).unwrap();
        assert!(source.read_exact(&mut byte).is_err());
        assert_eq!(source.chunks_read(), 4);
        assert_eq!(source.tripped(), Some(Trip::Stalled));
    }

    #[test]
    fn long_text_keeps_stall_budget_alive() {
        let stalled = |prefix: &[u8]| {
            let mut data = prefix.to_vec();
            data.extend(vec![b'x'; 100]);
            let mut source = ChunkSource::new(
                Cursor::new(data),
                &StreamLimits {
                    chunk_size: 10,
                    stall_chunks: Some(2),
                    ..StreamLimits::default()
                },
            );
            drain(&mut source).is_err()
        };

        assert!(!stalled(b"<a>"));
        assert!(!stalled(b"<a><![CDATA["));
        assert!(stalled(b"<a><!--"));
        assert!(stalled(b"<a><?pi "));
        assert!(stalled(b"<a b=\""));
    }

    #[test]
    fn markup_state_at_chunk_end() {
        let end = |input: &[u8]| input.iter().fold(Markup::Text, |state, &b| state.next(b));

        assert_eq!(end(b"<a x='>'>text"), Markup::Text);
        assert_eq!(end(b"<a/></a>"), Markup::Text);
        assert!(matches!(end(b"<!-- a > b"), Markup::Comment(_)));
        assert_eq!(end(b"<!-- a -->"), Markup::Text);
        assert!(end(b"<![CDATA[ x").is_character_data());
        assert_eq!(end(b"<![CDATA[ ]] > ]]>"), Markup::Text);
        assert!(matches!(end(b"<?pi x > y"), Markup::Pi(_)));
        assert!(matches!(
            end(b"<!DOCTYPE r [<!ENTITY a \"x\">"),
            Markup::Decl { .. }
        ));
        assert_eq!(end(b"<!DOCTYPE r [<!ENTITY a \"x\">]>"), Markup::Text);
    }

    #[test]
    fn sealed_source_serves_buffered_bytes_only() {
        let mut source = ChunkSource::new(Cursor::new(b"abcdefgh".to_vec()), &limits(4));
        let mut two = [0u8; 2];
        source.read_exact(&mut two).unwrap();
        source.seal();

        let mut rest = [0u8; 2];
        source.read_exact(&mut rest).unwrap();
        assert_eq!(&rest, b"cd");
        assert!(source.read_exact(&mut rest).is_err());
        assert_eq!(source.tripped(), Some(Trip::Sealed));
        assert_eq!(source.last_chunk(), b"abcd");
    }

    #[test]
    fn positions_resolve_lines_across_chunks() {
        let data = b"ab\ncd\nefgh\nij".to_vec();
        let mut source = ChunkSource::new(Cursor::new(data), &limits(4));
        drain(&mut source).unwrap();

        let start = source.position_of(0);
        assert_eq!((start.line, start.column), (Some(1), Some(1)));

        let d = source.position_of(4);
        assert_eq!((d.line, d.column), (Some(2), Some(2)));

        let j = source.position_of(12);
        assert_eq!((j.line, j.column), (Some(4), Some(2)));
        assert_eq!(j.byte_offset, Some(12));
    }

    #[test]
    fn positions_before_window_fall_back_to_offset() {
        let data = b"a\nb\nc\nd\ne\nf\ng\nh\n".to_vec();
        let mut source = ChunkSource::new(Cursor::new(data), &limits(2));
        drain(&mut source).unwrap();

        let old = source.position_of(1);
        assert_eq!(old.line, None);
        assert_eq!(old.byte_offset, Some(1));

        let recent = source.position_of(14);
        assert_eq!((recent.line, recent.column), (Some(8), Some(1)));
    }
}
