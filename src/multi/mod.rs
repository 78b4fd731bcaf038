// Multi-section decoding session.
//
// `multi_decoder()` returns the driving decoder, a cancel handle and the
// receiving end of a rendezvous channel of `Section`s. The driver publishes a
// section when it parses a `begin` line, then streams the decoded bytes into
// that section's handoff; both operations block until the consumer takes
// them or the session is cancelled.
//
// The session owns the single in-flight handoff outright. It is moved into
// the session on publish and moved out again on finish/abort, so the only
// state shared with consumer threads is the channels themselves.

mod handoff;

use std::sync::{Arc, Mutex, PoisonError};

use crossbeam::channel::{self, Receiver, Sender};
use log::debug;

use crate::codec::SectionMetadata;
use crate::error::UuError;
use crate::section::Decoder;

use handoff::{Fault, HandoffWriter, Sent};

pub use handoff::Section;

/// Create a multi-section decoder.
///
/// Drive the returned [`Decoder`] (directly or through a
/// [`TransformReader`](crate::transform::TransformReader)) on one thread and
/// receive sections from the channel on another. Call [`Decoder::close`] once
/// driving has stopped so the consumer's receive loop ends.
pub fn multi_decoder() -> (Decoder, Canceller, Receiver<Section>) {
    let (sections_tx, sections_rx) = channel::bounded(0);
    let (cancel_tx, cancel_rx) = channel::bounded::<()>(0);
    let trigger = Arc::new(Mutex::new(Some(cancel_tx)));
    let session = Session {
        sections_tx: Some(sections_tx),
        cancel_rx,
        _trigger: Arc::clone(&trigger),
        handoff: None,
    };
    let canceller = Canceller { trigger };
    (Decoder::with_session(session), canceller, sections_rx)
}

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

/// One-shot, idempotent cancellation trigger. Cheap to clone and send to
/// other threads. Dropping every clone without calling
/// [`cancel`](Self::cancel) leaves the session running.
#[derive(Clone, Debug)]
pub struct Canceller {
    trigger: Arc<Mutex<Option<Sender<()>>>>,
}

impl Canceller {
    /// Cancel the session. Blocked publishes, blocked writes, waiting section
    /// readers and the next transform call all observe `Cancelled`. Calling
    /// it again, or after decoding finished, does nothing.
    pub fn cancel(&self) {
        let mut guard = self.trigger.lock().unwrap_or_else(PoisonError::into_inner);
        if guard.take().is_some() {
            debug!("multi-section decode cancelled");
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.trigger
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Driver-side state of a multi-section decode.
pub(crate) struct Session {
    sections_tx: Option<Sender<Section>>,
    cancel_rx: Receiver<()>,
    /// Holds the cancel sender alive until `Canceller::cancel` takes it.
    _trigger: Arc<Mutex<Option<Sender<()>>>>,
    handoff: Option<HandoffWriter>,
}

impl Session {
    pub(crate) fn check_cancelled(&self) -> Result<(), UuError> {
        if handoff::is_cancelled(&self.cancel_rx) {
            Err(UuError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Publish a new section and make it the write target.
    pub(crate) fn open(&mut self, index: u64, metadata: &SectionMetadata) -> Result<(), UuError> {
        self.abort(Fault::Failed);
        let Some(tx) = &self.sections_tx else {
            debug!("section {index} skipped: session closed");
            return Ok(());
        };
        let (writer, section) = handoff::pair(index, metadata.clone(), self.cancel_rx.clone());
        match handoff::send_or_cancel(tx, section, &self.cancel_rx) {
            Sent::Delivered => {
                debug!(
                    "section {index} published: {:?}",
                    metadata.filename.as_deref().unwrap_or("<unnamed>")
                );
                self.handoff = Some(writer);
                Ok(())
            }
            Sent::Refused(_) => {
                self.check_cancelled()?;
                debug!("section {index} skipped: no consumer");
                Ok(())
            }
            Sent::Cancelled => Err(UuError::Cancelled),
        }
    }

    /// Forward decoded bytes to the open section, if any.
    pub(crate) fn write(&mut self, bytes: &[u8]) -> Result<(), UuError> {
        if bytes.is_empty() {
            return Ok(());
        }
        let Some(writer) = &self.handoff else {
            return Ok(());
        };
        match writer.write(bytes, &self.cancel_rx) {
            Sent::Delivered => Ok(()),
            Sent::Refused(()) => {
                self.check_cancelled()?;
                debug!("section reader closed early; discarding the rest of the section");
                self.handoff = None;
                Ok(())
            }
            Sent::Cancelled => Err(UuError::Cancelled),
        }
    }

    /// Cleanly end the open section.
    pub(crate) fn finish(&mut self) -> Result<(), UuError> {
        let Some(writer) = self.handoff.take() else {
            return Ok(());
        };
        match writer.finish(&self.cancel_rx) {
            Sent::Delivered => Ok(()),
            Sent::Refused(()) => self.check_cancelled(),
            Sent::Cancelled => Err(UuError::Cancelled),
        }
    }

    /// Drop the open section without a clean end.
    pub(crate) fn abort_for(&mut self, err: &UuError) {
        let fault = match err {
            UuError::Cancelled => Fault::Cancelled,
            _ => Fault::Failed,
        };
        self.abort(fault);
    }

    /// Drop the open section, if any, as failed.
    pub(crate) fn abandon(&mut self) {
        self.abort(Fault::Failed);
    }

    fn abort(&mut self, fault: Fault) {
        if let Some(writer) = self.handoff.take() {
            debug!("open section aborted: {fault:?}");
            writer.abort(fault);
        }
    }

    /// Stop publishing; consumers' receive loops end.
    pub(crate) fn close(&mut self) {
        if self.sections_tx.take().is_some() {
            debug!("section channel closed");
        }
    }
}
