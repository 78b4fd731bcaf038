// Section decoder: header search, body decoding, trailer handling.
//
// One implementation serves both modes:
//   - single: decoded bytes go to the caller's destination, lines outside the
//     section pass through verbatim, and decoding stops after the first
//     trailer (everything after it passes through).
//   - multi: decoded bytes go to the session's open section, lines outside
//     sections are discarded, and the decoder re-arms after every trailer.
//
// Every transform call resumes from `state`; the only other input is the
// caller's source cursor.

use log::{debug, trace};

use crate::codec::body::{self, BodyStatus};
use crate::codec::header::{self, MAX_HEADER_LEN, SectionMetadata};
use crate::error::{FormatError, UuError};
use crate::multi::Session;
use crate::transform::{Progress, Status, Transform};

/// Scratch size for bytes decoded on their way to a section.
const SECTION_CHUNK: usize = 4096;

/// Where the decoder is within the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeState {
    /// Looking for a `begin` line. `line_start` is false while inside a line
    /// already judged not to be a header.
    SeekingHeader { line_start: bool },
    /// Decoding body lines.
    InBody,
    /// Trailer seen (single mode); remaining input passes through.
    Done,
}

enum Sink {
    Direct,
    Session(Box<Session>),
}

/// Progress of one transform call, threaded through the state handlers.
struct Cursor {
    src: usize,
    dst: usize,
}

enum Flow {
    Continue,
    Yield(Status),
}

/// Uuencode section decoder.
pub struct Decoder {
    state: DecodeState,
    sink: Sink,
    metadata: SectionMetadata,
    /// Absolute offset of the next unconsumed source byte.
    pos: u64,
    sections: u64,
    finished: bool,
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder {
    /// Single-section decoder.
    pub fn new() -> Self {
        Self::with_sink(Sink::Direct)
    }

    pub(crate) fn with_session(session: Session) -> Self {
        Self::with_sink(Sink::Session(Box::new(session)))
    }

    fn with_sink(sink: Sink) -> Self {
        Self {
            state: DecodeState::SeekingHeader { line_start: true },
            sink,
            metadata: SectionMetadata::default(),
            pos: 0,
            sections: 0,
            finished: false,
        }
    }

    /// Metadata of the most recent header.
    pub fn metadata(&self) -> &SectionMetadata {
        &self.metadata
    }

    pub fn filename(&self) -> Option<&str> {
        self.metadata.filename.as_deref()
    }

    pub fn mode(&self) -> Option<u32> {
        self.metadata.mode
    }

    pub fn state(&self) -> DecodeState {
        self.state
    }

    /// Number of `begin` headers found since the last reset.
    pub fn sections_found(&self) -> u64 {
        self.sections
    }

    pub fn is_multi(&self) -> bool {
        matches!(self.sink, Sink::Session(_))
    }

    /// Close the section channel of a multi-section session. Consumers see
    /// the channel end once they have taken every published section.
    /// Idempotent; a no-op for single-section decoders.
    pub fn close(&mut self) {
        if let Sink::Session(session) = &mut self.sink {
            session.close();
        }
    }

    fn run(&mut self, dst: &mut [u8], src: &[u8], at_eof: bool) -> Result<Progress, UuError> {
        if let Sink::Session(session) = &self.sink {
            if !self.finished {
                session.check_cancelled()?;
            }
        }

        let mut cur = Cursor { src: 0, dst: 0 };
        let status = loop {
            let flow = match self.state {
                DecodeState::SeekingHeader { line_start } => {
                    self.seek_header(dst, src, at_eof, &mut cur, line_start)?
                }
                DecodeState::InBody => self.decode_body(dst, src, at_eof, &mut cur)?,
                DecodeState::Done => self.pass_trailing(dst, src, &mut cur),
            };
            if let Flow::Yield(status) = flow {
                break status;
            }
        };

        if status == Status::Done && at_eof && cur.src == src.len() {
            self.end_of_stream(src.len())?;
        }
        self.pos += cur.src as u64;
        trace!(
            "decoder step: consumed={} written={} status={status:?} state={:?}",
            cur.src, cur.dst, self.state
        );
        Ok(Progress::new(cur.src, cur.dst, status))
    }

    // -----------------------------------------------------------------------
    // State handlers
    // -----------------------------------------------------------------------

    fn seek_header(
        &mut self,
        dst: &mut [u8],
        src: &[u8],
        at_eof: bool,
        cur: &mut Cursor,
        line_start: bool,
    ) -> Result<Flow, UuError> {
        let rest = &src[cur.src..];
        if rest.is_empty() {
            return Ok(Flow::Yield(Status::Done));
        }

        if !line_start {
            let (end, complete) = match rest.iter().position(|&b| b == b'\n') {
                Some(i) => (i + 1, true),
                None => (rest.len(), false),
            };
            let n = self.pass_through(dst, cur, &rest[..end]);
            if n < end {
                return Ok(Flow::Yield(Status::ShortDst));
            }
            if complete {
                self.state = DecodeState::SeekingHeader { line_start: true };
            }
            return Ok(Flow::Continue);
        }

        let eol = rest.iter().position(|&b| b == b'\n');
        let line = &rest[..eol.map_or(rest.len(), |i| i + 1)];
        if header::is_candidate(line) {
            if line.len() > MAX_HEADER_LEN {
                return Err(UuError::LineTooLong {
                    offset: self.pos + cur.src as u64,
                    limit: MAX_HEADER_LEN,
                });
            }
            match eol {
                Some(_) => {
                    if let Some(metadata) = header::parse(line) {
                        cur.src += line.len();
                        self.begin_section(metadata)?;
                        return Ok(Flow::Continue);
                    }
                }
                None if !at_eof => return Ok(Flow::Yield(Status::ShortSrc)),
                None => {}
            }
        }

        // Not a header: stream the line through without buffering it.
        self.state = DecodeState::SeekingHeader { line_start: false };
        Ok(Flow::Continue)
    }

    fn decode_body(
        &mut self,
        dst: &mut [u8],
        src: &[u8],
        at_eof: bool,
        cur: &mut Cursor,
    ) -> Result<Flow, UuError> {
        let base = self.pos + cur.src as u64;
        let p = match &mut self.sink {
            Sink::Direct => {
                let p = body::decode(&mut dst[cur.dst..], &src[cur.src..], at_eof, base)?;
                cur.dst += p.written;
                p
            }
            Sink::Session(session) => {
                let mut chunk = [0u8; SECTION_CHUNK];
                let p = body::decode(&mut chunk, &src[cur.src..], at_eof, base)?;
                session.write(&chunk[..p.written])?;
                p
            }
        };
        cur.src += p.consumed;

        match p.status {
            BodyStatus::Drained => Ok(Flow::Yield(Status::Done)),
            BodyStatus::ShortSrc if at_eof => Err(UuError::bad_format(
                self.pos + cur.src as u64,
                FormatError::Truncated,
            )),
            BodyStatus::ShortSrc => Ok(Flow::Yield(Status::ShortSrc)),
            BodyStatus::ShortDst if self.is_multi() => Ok(Flow::Continue),
            BodyStatus::ShortDst => Ok(Flow::Yield(Status::ShortDst)),
            // Hand back what was decoded; the next call fails on the bad line.
            BodyStatus::Malformed if self.is_multi() => Ok(Flow::Continue),
            BodyStatus::Malformed => Ok(Flow::Yield(Status::ShortDst)),
            BodyStatus::Trailer => {
                self.end_section()?;
                Ok(Flow::Continue)
            }
        }
    }

    fn pass_trailing(&mut self, dst: &mut [u8], src: &[u8], cur: &mut Cursor) -> Flow {
        let rest = &src[cur.src..];
        let n = self.pass_through(dst, cur, rest);
        if n < rest.len() {
            Flow::Yield(Status::ShortDst)
        } else {
            Flow::Yield(Status::Done)
        }
    }

    // -----------------------------------------------------------------------
    // Transition actions
    // -----------------------------------------------------------------------

    /// Copy (single) or discard (multi) bytes outside a section. Returns how
    /// many were taken.
    fn pass_through(&mut self, dst: &mut [u8], cur: &mut Cursor, bytes: &[u8]) -> usize {
        let n = match self.sink {
            Sink::Direct => {
                let n = bytes.len().min(dst.len() - cur.dst);
                dst[cur.dst..cur.dst + n].copy_from_slice(&bytes[..n]);
                cur.dst += n;
                n
            }
            Sink::Session(_) => bytes.len(),
        };
        cur.src += n;
        n
    }

    fn begin_section(&mut self, metadata: SectionMetadata) -> Result<(), UuError> {
        let index = self.sections;
        self.sections += 1;
        debug!(
            "section {index} header: mode={:?} filename={:?}",
            metadata.mode, metadata.filename
        );
        if let Sink::Session(session) = &mut self.sink {
            session.open(index, &metadata)?;
        }
        self.metadata = metadata;
        self.state = DecodeState::InBody;
        Ok(())
    }

    fn end_section(&mut self) -> Result<(), UuError> {
        debug!("section {} trailer", self.sections - 1);
        match &mut self.sink {
            Sink::Direct => self.state = DecodeState::Done,
            Sink::Session(session) => {
                session.finish()?;
                self.state = DecodeState::SeekingHeader { line_start: true };
            }
        }
        Ok(())
    }

    fn end_of_stream(&mut self, len: usize) -> Result<(), UuError> {
        let offset = self.pos + len as u64;
        match self.state {
            DecodeState::SeekingHeader { .. } if self.sections == 0 => {
                Err(UuError::bad_format(offset, FormatError::MissingHeader))
            }
            DecodeState::InBody => Err(UuError::bad_format(offset, FormatError::Truncated)),
            _ => {
                self.finished = true;
                Ok(())
            }
        }
    }
}

impl Transform for Decoder {
    fn transform(
        &mut self,
        dst: &mut [u8],
        src: &[u8],
        at_eof: bool,
    ) -> Result<Progress, UuError> {
        let result = self.run(dst, src, at_eof);
        if let (Err(err), Sink::Session(session)) = (&result, &mut self.sink) {
            session.abort_for(err);
        }
        result
    }

    /// Re-arm for a new input. Metadata and counters are cleared; a
    /// multi-section session keeps its channels, but a section still open is
    /// aborted.
    fn reset(&mut self) {
        if let Sink::Session(session) = &mut self.sink {
            session.abandon();
        }
        self.state = DecodeState::SeekingHeader { line_start: true };
        self.metadata.clear();
        self.pos = 0;
        self.sections = 0;
        self.finished = false;
    }
}

impl std::fmt::Debug for Decoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Decoder")
            .field("state", &self.state)
            .field("multi", &self.is_multi())
            .field("metadata", &self.metadata)
            .field("pos", &self.pos)
            .field("sections", &self.sections)
            .finish()
    }
}
