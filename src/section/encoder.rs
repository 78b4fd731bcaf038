// Section encoder: header line, body lines, trailer.

use log::debug;

use crate::codec::body::{self, BodyStatus};
use crate::codec::header::{self, DEFAULT_MODE, SectionMetadata};
use crate::error::UuError;
use crate::transform::{Progress, Status, Transform};

/// Filename written when none is configured.
pub const DEFAULT_FILENAME: &str = "data";

/// Encoder configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Encode zero sextets as '`' instead of ' '.
    pub grave: bool,
    /// Line terminator written after every line.
    pub eol: String,
    /// Header filename; `None` uses [`DEFAULT_FILENAME`].
    pub filename: Option<String>,
    /// Header permission bits; `None` uses `0o644`.
    pub mode: Option<u32>,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            grave: true,
            eol: "\n".to_owned(),
            filename: None,
            mode: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EncodeState {
    Header,
    Body,
    Done,
}

/// Uuencode section encoder.
#[derive(Debug)]
pub struct Encoder {
    state: EncodeState,
    grave: bool,
    eol: String,
    filename: String,
    mode: u32,
    /// Rendered header line.
    header: String,
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new(EncodeOptions::default())
    }
}

impl Encoder {
    pub fn new(opts: EncodeOptions) -> Self {
        let mut enc = Self {
            state: EncodeState::Header,
            grave: opts.grave,
            eol: opts.eol,
            filename: opts
                .filename
                .unwrap_or_else(|| DEFAULT_FILENAME.to_owned()),
            mode: opts.mode.unwrap_or(DEFAULT_MODE),
            header: String::new(),
        };
        enc.render_header();
        enc
    }

    /// Re-arm for a new section with different metadata, reusing the
    /// existing buffers.
    pub fn retarget(&mut self, mode: u32, filename: &str) {
        self.mode = mode;
        self.filename.clear();
        self.filename.push_str(filename);
        self.render_header();
        self.state = EncodeState::Header;
    }

    /// Metadata written in the header.
    pub fn metadata(&self) -> SectionMetadata {
        SectionMetadata {
            filename: Some(self.filename.clone()),
            mode: Some(self.mode),
        }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn mode(&self) -> u32 {
        self.mode
    }

    /// Whether the trailer of the current section has been written.
    pub fn is_done(&self) -> bool {
        self.state == EncodeState::Done
    }

    fn render_header(&mut self) {
        header::render(&mut self.header, self.mode, &self.filename, &self.eol);
    }
}

impl Transform for Encoder {
    fn transform(
        &mut self,
        dst: &mut [u8],
        src: &[u8],
        at_eof: bool,
    ) -> Result<Progress, UuError> {
        let mut n_dst = 0usize;

        if self.state == EncodeState::Done {
            if src.is_empty() {
                return Ok(Progress::new(0, 0, Status::Done));
            }
            debug!("encoder re-armed for a new section");
            self.state = EncodeState::Header;
        }

        if self.state == EncodeState::Header {
            let header = self.header.as_bytes();
            if dst.len() < header.len() {
                return Ok(Progress::new(0, 0, Status::ShortDst));
            }
            dst[..header.len()].copy_from_slice(header);
            n_dst = header.len();
            self.state = EncodeState::Body;
            debug!("section header: mode={:o} filename={:?}", self.mode, self.filename);
        }

        let p = body::encode(
            &mut dst[n_dst..],
            src,
            at_eof,
            self.grave,
            self.eol.as_bytes(),
        );
        n_dst += p.written;
        let status = match p.status {
            BodyStatus::Drained => Status::Done,
            BodyStatus::ShortSrc => Status::ShortSrc,
            // Malformed is decode-only.
            BodyStatus::ShortDst | BodyStatus::Malformed => Status::ShortDst,
            BodyStatus::Trailer => {
                self.state = EncodeState::Done;
                Status::Done
            }
        };
        Ok(Progress::new(p.consumed, n_dst, status))
    }

    fn reset(&mut self) {
        self.state = EncodeState::Header;
    }
}
