//! Relay for interim transcripts emitted by the engine while recording.

use std::sync::{Arc, Mutex, PoisonError};

use crate::transcription::PartialSink;

/// Single-slot, last-write-wins mailbox for partial transcripts.
///
/// The engine invokes its partial callback on an internal thread at its own
/// cadence; the UI loop polls [`PartialRelay::take`] on its tick and displays
/// whatever is newest. Partial text is advisory display only — it never
/// reaches the clipboard.
#[derive(Clone, Default)]
pub struct PartialRelay {
    slot: Arc<Mutex<Option<String>>>,
}

impl PartialRelay {
    /// New empty relay.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `text`, replacing any undisplayed predecessor.
    pub fn publish(&self, text: String) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(text);
    }

    /// Take the most recent undisplayed partial, if any.
    pub fn take(&self) -> Option<String> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Drop any pending partial (e.g. when a capture ends).
    pub fn clear(&self) {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    /// Sink suitable for [`crate::transcription::SpeechEngine::set_partial_sink`].
    #[must_use]
    pub fn sink(&self) -> PartialSink {
        let relay = self.clone();
        Box::new(move |text| relay.publish(text))
    }
}
