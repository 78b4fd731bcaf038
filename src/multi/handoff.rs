// Rendezvous byte pipe between the scanning driver and one section reader.
//
// The channel has zero capacity, so every chunk sent by the driver waits for
// the reader to take it. A clean end is an explicit `Chunk::End`; a sender
// that disappears without one left a fault behind in the shared slot.

use std::io::{self, Read};
use std::sync::{Arc, OnceLock};

use crossbeam::channel::{self, Receiver, SendError, Sender, TryRecvError};
use crossbeam::select;

use crate::codec::SectionMetadata;
use crate::error::UuError;

/// Message carried by a handoff.
pub(crate) enum Chunk {
    Data(Vec<u8>),
    End,
}

/// Why a handoff ended without `Chunk::End`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Fault {
    Cancelled,
    Failed,
}

/// Whether the cancel channel has fired.
#[inline]
pub(crate) fn is_cancelled(cancel: &Receiver<()>) -> bool {
    matches!(cancel.try_recv(), Err(TryRecvError::Disconnected))
}

/// Outcome of a blocking send on a handoff or the section channel.
pub(crate) enum Sent<T> {
    Delivered,
    /// The receiving side is gone; the value is handed back.
    Refused(T),
    Cancelled,
}

/// Send `value` on a rendezvous channel unless `cancel` fires first.
pub(crate) fn send_or_cancel<T>(tx: &Sender<T>, value: T, cancel: &Receiver<()>) -> Sent<T> {
    if is_cancelled(cancel) {
        return Sent::Cancelled;
    }
    select! {
        send(tx, value) -> res => match res {
            Ok(()) => Sent::Delivered,
            Err(SendError(v)) => Sent::Refused(v),
        },
        recv(cancel) -> _ => Sent::Cancelled,
    }
}

/// Driver side of a handoff.
pub(crate) struct HandoffWriter {
    tx: Sender<Chunk>,
    fault: Arc<OnceLock<Fault>>,
}

/// Create a connected writer/section pair.
pub(crate) fn pair(
    index: u64,
    metadata: SectionMetadata,
    cancel: Receiver<()>,
) -> (HandoffWriter, Section) {
    let (tx, rx) = channel::bounded(0);
    let fault = Arc::new(OnceLock::new());
    let writer = HandoffWriter {
        tx,
        fault: Arc::clone(&fault),
    };
    let section = Section {
        index,
        metadata,
        rx,
        cancel,
        fault,
        buf: Vec::new(),
        pos: 0,
        ended: false,
    };
    (writer, section)
}

impl HandoffWriter {
    /// Blocking write of one chunk.
    pub(crate) fn write(&self, bytes: &[u8], cancel: &Receiver<()>) -> Sent<()> {
        match send_or_cancel(&self.tx, Chunk::Data(bytes.to_vec()), cancel) {
            Sent::Delivered => Sent::Delivered,
            Sent::Refused(_) => Sent::Refused(()),
            Sent::Cancelled => Sent::Cancelled,
        }
    }

    /// Blocking clean close.
    pub(crate) fn finish(self, cancel: &Receiver<()>) -> Sent<()> {
        match send_or_cancel(&self.tx, Chunk::End, cancel) {
            Sent::Delivered => Sent::Delivered,
            Sent::Refused(_) => Sent::Refused(()),
            Sent::Cancelled => {
                self.abort(Fault::Cancelled);
                Sent::Cancelled
            }
        }
    }

    /// Close without `End`; the reader reports `fault`.
    pub(crate) fn abort(self, fault: Fault) {
        let _ = self.fault.set(fault);
    }
}

// ---------------------------------------------------------------------------
// Reader side
// ---------------------------------------------------------------------------

/// One decoded section published by a multi-section decoder.
///
/// Reads block until the driver produces the next chunk. Dropping (or
/// [`close`](Self::close)-ing) the section early tells the driver to skip the
/// rest of it; other sections are unaffected.
pub struct Section {
    index: u64,
    metadata: SectionMetadata,
    rx: Receiver<Chunk>,
    cancel: Receiver<()>,
    fault: Arc<OnceLock<Fault>>,
    buf: Vec<u8>,
    pos: usize,
    ended: bool,
}

impl Section {
    /// Zero-based position of the section in the stream.
    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn metadata(&self) -> &SectionMetadata {
        &self.metadata
    }

    pub fn filename(&self) -> Option<&str> {
        self.metadata.filename.as_deref()
    }

    pub fn mode(&self) -> Option<u32> {
        self.metadata.mode
    }

    /// Stop reading; the driver discards the rest of this section.
    pub fn close(self) {}

    fn fault_error(&self) -> io::Error {
        match self.fault.get() {
            Some(Fault::Cancelled) => UuError::Cancelled.into(),
            Some(Fault::Failed) | None => io::Error::new(
                io::ErrorKind::InvalidData,
                "section ended before its trailer",
            ),
        }
    }
}

impl Read for Section {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        loop {
            if self.pos < self.buf.len() {
                let n = out.len().min(self.buf.len() - self.pos);
                out[..n].copy_from_slice(&self.buf[self.pos..self.pos + n]);
                self.pos += n;
                return Ok(n);
            }
            if self.ended || out.is_empty() {
                return Ok(0);
            }
            if is_cancelled(&self.cancel) {
                return Err(UuError::Cancelled.into());
            }
            let msg = select! {
                recv(self.rx) -> msg => msg,
                recv(self.cancel) -> _ => return Err(UuError::Cancelled.into()),
            };
            match msg {
                Ok(Chunk::Data(bytes)) => {
                    self.buf = bytes;
                    self.pos = 0;
                }
                Ok(Chunk::End) => self.ended = true,
                Err(_) => return Err(self.fault_error()),
            }
        }
    }
}

impl std::fmt::Debug for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Section")
            .field("index", &self.index)
            .field("metadata", &self.metadata)
            .field("ended", &self.ended)
            .finish_non_exhaustive()
    }
}
