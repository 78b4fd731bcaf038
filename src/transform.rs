// Resumable transform contract and std::io adapters.
//
// A transformer converts a source window into a destination window and
// reports how much of each it used. `ShortSrc` and `ShortDst` are flow
// control: the caller refills or drains and calls again at the reported
// offsets. Errors are terminal.
//
// `TransformReader` and `TransformWriter` drive a transformer over
// `std::io::Read` / `Write` with fixed internal buffers.

use std::io::{self, Read, Write};

use crate::error::UuError;

// ---------------------------------------------------------------------------
// Contract
// ---------------------------------------------------------------------------

/// Flow-control outcome of a transform call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Everything offered was handled.
    Done,
    /// The source ends inside a unit; call again with more bytes at the
    /// same offset.
    ShortSrc,
    /// The destination cannot hold the next unit; drain and call again.
    /// Decoders also return it to hand back output decoded ahead of a
    /// malformed line, which the next call then reports.
    ShortDst,
}

/// Result of one transform call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Leading source bytes consumed.
    pub consumed: usize,
    /// Leading destination bytes written.
    pub written: usize,
    pub status: Status,
}

impl Progress {
    pub fn new(consumed: usize, written: usize, status: Status) -> Self {
        Self {
            consumed,
            written,
            status,
        }
    }
}

/// A resumable byte transformer.
pub trait Transform {
    /// Transform bytes from `src` into `dst`. `at_eof` marks `src` as the
    /// final window of the stream.
    fn transform(&mut self, dst: &mut [u8], src: &[u8], at_eof: bool)
    -> Result<Progress, UuError>;

    /// Return to the initial state for a new, independent input.
    fn reset(&mut self);
}

impl<T: Transform + ?Sized> Transform for &mut T {
    fn transform(
        &mut self,
        dst: &mut [u8],
        src: &[u8],
        at_eof: bool,
    ) -> Result<Progress, UuError> {
        (**self).transform(dst, src, at_eof)
    }

    fn reset(&mut self) {
        (**self).reset()
    }
}

/// Run a transformer over an in-memory input, growing the output as needed.
pub fn transform_all<T: Transform>(t: &mut T, input: &[u8]) -> Result<Vec<u8>, UuError> {
    let mut out = Vec::with_capacity(input.len() + 64);
    let mut buf = vec![0u8; BUF_SIZE];
    let mut src = input;
    loop {
        let p = t.transform(&mut buf, src, true)?;
        out.extend_from_slice(&buf[..p.written]);
        src = &src[p.consumed..];
        match p.status {
            Status::Done => return Ok(out),
            Status::ShortDst if p.consumed > 0 || p.written > 0 => {}
            Status::ShortDst => buf.resize(buf.len() * 2, 0),
            // The whole input was offered with at_eof; a compliant
            // transformer never asks for more.
            Status::ShortSrc => return Err(UuError::Io(io::ErrorKind::UnexpectedEof.into())),
        }
    }
}

/// Default adapter buffer size.
pub const BUF_SIZE: usize = 4096;

// ---------------------------------------------------------------------------
// Reader adapter
// ---------------------------------------------------------------------------

/// Reads transformed bytes from an underlying reader.
pub struct TransformReader<R: Read, T: Transform> {
    inner: R,
    transform: T,
    src: Box<[u8]>,
    src0: usize,
    src1: usize,
    dst: Box<[u8]>,
    dst0: usize,
    dst1: usize,
    eof: bool,
    complete: bool,
    failed: Option<UuError>,
}

impl<R: Read, T: Transform> TransformReader<R, T> {
    /// Wrap `inner`. The transformer is reset first.
    pub fn new(inner: R, mut transform: T) -> Self {
        transform.reset();
        Self {
            inner,
            transform,
            src: vec![0u8; BUF_SIZE].into_boxed_slice(),
            src0: 0,
            src1: 0,
            dst: vec![0u8; BUF_SIZE].into_boxed_slice(),
            dst0: 0,
            dst1: 0,
            eof: false,
            complete: false,
            failed: None,
        }
    }

    pub fn transformer(&self) -> &T {
        &self.transform
    }

    pub fn transformer_mut(&mut self) -> &mut T {
        &mut self.transform
    }

    pub fn into_parts(self) -> (R, T) {
        (self.inner, self.transform)
    }

    fn step(&mut self) -> Result<(), UuError> {
        if self.src0 != self.src1 || self.eof {
            let p = self.transform.transform(
                &mut self.dst,
                &self.src[self.src0..self.src1],
                self.eof,
            )?;
            self.dst0 = 0;
            self.dst1 = p.written;
            self.src0 += p.consumed;
            match p.status {
                Status::Done if self.eof => {
                    if self.src0 != self.src1 {
                        return Err(UuError::Io(io::Error::other(
                            "transform left input unconsumed at end of stream",
                        )));
                    }
                    self.complete = true;
                    return Ok(());
                }
                Status::Done => return Ok(()),
                Status::ShortDst if p.written > 0 || p.consumed > 0 => return Ok(()),
                Status::ShortDst => {
                    return Err(UuError::Io(io::Error::other(
                        "transform destination buffer too small",
                    )));
                }
                Status::ShortSrc if self.eof => {
                    return Err(UuError::Io(io::ErrorKind::UnexpectedEof.into()));
                }
                Status::ShortSrc if self.src1 - self.src0 == self.src.len() => {
                    return Err(UuError::LineTooLong {
                        offset: 0,
                        limit: self.src.len(),
                    });
                }
                Status::ShortSrc => {
                    if p.written > 0 || p.consumed > 0 {
                        return Ok(());
                    }
                }
            }
        }

        // Compact and refill.
        if self.src0 != 0 {
            self.src.copy_within(self.src0..self.src1, 0);
            self.src1 -= self.src0;
            self.src0 = 0;
        }
        loop {
            match self.inner.read(&mut self.src[self.src1..]) {
                Ok(0) => self.eof = true,
                Ok(n) => self.src1 += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(UuError::Io(e)),
            }
            return Ok(());
        }
    }
}

impl<R: Read, T: Transform> Read for TransformReader<R, T> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            if self.dst0 != self.dst1 {
                let n = buf.len().min(self.dst1 - self.dst0);
                buf[..n].copy_from_slice(&self.dst[self.dst0..self.dst0 + n]);
                self.dst0 += n;
                return Ok(n);
            }
            if let Some(err) = self.failed.take() {
                // Report once, then behave as ended.
                self.complete = true;
                return Err(err.into());
            }
            if self.complete || buf.is_empty() {
                return Ok(0);
            }
            if let Err(err) = self.step() {
                log::trace!("transform reader stopped: {err}");
                self.failed = Some(err);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Writer adapter
// ---------------------------------------------------------------------------

/// Transforms bytes written to it and forwards the result to `inner`.
///
/// Call [`finish`](Self::finish) to flush the final window; dropping the
/// writer without it loses buffered input.
pub struct TransformWriter<W: Write, T: Transform> {
    inner: W,
    transform: T,
    pending: Vec<u8>,
    dst: Box<[u8]>,
}

impl<W: Write, T: Transform> TransformWriter<W, T> {
    /// Wrap `inner`. The transformer is reset first.
    pub fn new(inner: W, mut transform: T) -> Self {
        transform.reset();
        Self {
            inner,
            transform,
            pending: Vec::new(),
            dst: vec![0u8; BUF_SIZE].into_boxed_slice(),
        }
    }

    pub fn transformer(&self) -> &T {
        &self.transform
    }

    /// Run the transformer over `src`; returns the unconsumed tail length.
    fn pump(&mut self, src: &[u8], at_eof: bool) -> Result<usize, UuError> {
        let mut src = src;
        loop {
            let p = self.transform.transform(&mut self.dst, src, at_eof)?;
            self.inner.write_all(&self.dst[..p.written])?;
            src = &src[p.consumed..];
            match p.status {
                Status::Done => return Ok(src.len()),
                Status::ShortDst if p.written > 0 || p.consumed > 0 => {}
                Status::ShortDst => {
                    return Err(UuError::Io(io::Error::other(
                        "transform destination buffer too small",
                    )));
                }
                Status::ShortSrc if at_eof => {
                    return Err(UuError::Io(io::ErrorKind::UnexpectedEof.into()));
                }
                Status::ShortSrc => return Ok(src.len()),
            }
        }
    }

    fn feed(&mut self, data: &[u8], at_eof: bool) -> Result<(), UuError> {
        if self.pending.is_empty() {
            let left = self.pump(data, at_eof)?;
            self.pending.extend_from_slice(&data[data.len() - left..]);
        } else {
            let mut pending = std::mem::take(&mut self.pending);
            pending.extend_from_slice(data);
            let left = self.pump(&pending, at_eof)?;
            let used = pending.len() - left;
            pending.drain(..used);
            self.pending = pending;
        }
        Ok(())
    }

    /// Signal end of input, flush the final output and return the writer
    /// together with the transformer.
    pub fn finish(mut self) -> Result<(W, T), UuError> {
        self.feed(&[], true)?;
        self.inner.flush()?;
        Ok((self.inner, self.transform))
    }
}

impl<W: Write, T: Transform> Write for TransformWriter<W, T> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.feed(buf, false)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
