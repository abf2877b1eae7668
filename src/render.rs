//! Marshaling of session snapshots to the UI-owning thread.

use std::sync::{Arc, Mutex, PoisonError};

use crate::session::Snapshot;

/// Receiver of re-render requests. Implementations must not render on the
/// calling thread; they hand the snapshot to whichever thread owns the UI.
#[cfg_attr(test, mockall::automock)]
pub trait RenderSink: Send + Sync {
    /// Request a full re-render from `snapshot`.
    fn render(&self, snapshot: Snapshot);
}

/// Single-slot snapshot mailbox. The controller (from any thread) publishes
/// the latest snapshot; the UI loop drains it on its own tick. Intermediate
/// snapshots are superseded, which is fine: rendering is a pure projection
/// of the latest state.
#[derive(Clone, Default)]
pub struct RenderRelay {
    slot: Arc<Mutex<Option<Snapshot>>>,
}

impl RenderRelay {
    /// New empty relay.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the most recent unrendered snapshot, if any.
    pub fn take(&self) -> Option<Snapshot> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

impl RenderSink for RenderRelay {
    fn render(&self, snapshot: Snapshot) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Phase, Session};

    #[test]
    fn test_take_on_empty_relay() {
        let relay = RenderRelay::new();
        assert!(relay.take().is_none());
    }

    #[test]
    fn test_last_write_wins() {
        let relay = RenderRelay::new();
        let mut session = Session::new(0);
        relay.render(session.snapshot());
        session.phase = Phase::Recording;
        relay.render(session.snapshot());

        let snap = relay.take();
        assert_eq!(snap.map(|s| s.phase), Some(Phase::Recording));
        // Slot drained after take
        assert!(relay.take().is_none());
    }

    #[test]
    fn test_clones_share_the_slot() {
        let relay = RenderRelay::new();
        let publisher = relay.clone();
        publisher.render(Session::new(0).snapshot());
        assert!(relay.take().is_some());
    }
}
