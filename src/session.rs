//! Recording session state: the single source of truth for both front ends.

use crate::language::{self, Language};

/// Lifecycle phase of the recording session.
///
/// The only legal cycle is `Idle → Recording → Transcribing → Idle`. Any
/// other requested transition is a silent no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Not recording; hotkey starts a capture
    Idle,
    /// Microphone capture in progress
    Recording,
    /// Final transcription in flight; new captures are rejected
    Transcribing,
}

/// Mutable session state. Always accessed through the controller's lock;
/// nothing outside `controller.rs` mutates the fields.
#[derive(Debug)]
pub struct Session {
    pub(crate) phase: Phase,
    pub(crate) language_index: usize,
}

impl Session {
    /// New idle session with the given starting language index.
    #[must_use]
    pub fn new(language_index: usize) -> Self {
        Self {
            phase: Phase::Idle,
            language_index: language_index % language::LANGUAGES.len(),
        }
    }

    /// Read-only snapshot for rendering.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            phase: self.phase,
            language: language::at(self.language_index),
        }
    }
}

/// Immutable view of the session handed to UI projections. Rendering is
/// always a full recomputation from a snapshot, never an incremental patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    /// Current lifecycle phase
    pub phase: Phase,
    /// Currently selected language
    pub language: &'static Language,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_idle() {
        let session = Session::new(0);
        assert_eq!(session.phase, Phase::Idle);
        assert_eq!(session.language_index, 0);
    }

    #[test]
    fn test_new_session_wraps_out_of_range_index() {
        let session = Session::new(crate::language::LANGUAGES.len() + 2);
        assert_eq!(session.language_index, 2);
    }

    #[test]
    fn test_snapshot_reflects_state() {
        let mut session = Session::new(1);
        session.phase = Phase::Recording;
        let snap = session.snapshot();
        assert_eq!(snap.phase, Phase::Recording);
        assert_eq!(snap.language.code, "en");
    }
}
