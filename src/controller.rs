//! Recording lifecycle state machine and its concurrency coordination.
//!
//! All shared mutable state lives in one [`Session`] behind one lock. The
//! lock is held for phase checks and transitions only; engine calls that can
//! block (`start`, `stop`, `final_text`) happen after the transition has been
//! committed and the lock released, so a slow transcription never stalls
//! hotkey handling or rendering.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::delivery::TextDelivery;
use crate::language;
use crate::render::RenderSink;
use crate::session::{Phase, Session, Snapshot};
use crate::transcription::SpeechEngine;

/// Errors surfaced by controller operations.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Language code not present in the language table
    #[error("unknown language code: {0}")]
    UnknownLanguage(String),
}

/// Owns the [`Session`] and drives every legal phase transition.
///
/// Operations are callable from any thread (hotkey listener, UI loop, menu
/// handler); illegal transitions are silent no-ops per the state machine
/// `Idle → Recording → Transcribing → Idle`.
pub struct RecordingController {
    session: Arc<Mutex<Session>>,
    engine: Arc<dyn SpeechEngine>,
    delivery: Arc<dyn TextDelivery>,
    render: Arc<dyn RenderSink>,
}

impl RecordingController {
    /// New controller in `Idle` with the given starting language index.
    #[must_use]
    pub fn new(
        engine: Arc<dyn SpeechEngine>,
        delivery: Arc<dyn TextDelivery>,
        render: Arc<dyn RenderSink>,
        language_index: usize,
    ) -> Self {
        Self {
            session: Arc::new(Mutex::new(Session::new(language_index))),
            engine,
            delivery,
            render,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current session snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.lock().snapshot()
    }

    /// Atomically move `from → to`; returns the fresh snapshot on success.
    fn try_transition(&self, from: Phase, to: Phase) -> Option<Snapshot> {
        let mut session = self.lock();
        if session.phase == from {
            session.phase = to;
            Some(session.snapshot())
        } else {
            None
        }
    }

    /// Toggle-mode hotkey: start a capture when idle, finish it when
    /// recording, ignore the press while a transcription is in flight.
    pub fn toggle(&self) {
        if let Some(snapshot) = self.try_transition(Phase::Idle, Phase::Recording) {
            info!("toggle: Idle → Recording");
            self.engine.start();
            self.render.render(snapshot);
            return;
        }
        if let Some(snapshot) = self.try_transition(Phase::Recording, Phase::Transcribing) {
            info!("toggle: Recording → Transcribing");
            self.spawn_worker();
            self.render.render(snapshot);
            return;
        }
        debug!("toggle ignored: transcription in flight");
    }

    /// Push-to-talk press edge. Idempotent while already recording; ignored
    /// while transcribing.
    pub fn press_start(&self) {
        if let Some(snapshot) = self.try_transition(Phase::Idle, Phase::Recording) {
            info!("press: Idle → Recording");
            self.engine.start();
            self.render.render(snapshot);
        } else {
            debug!("press ignored outside Idle");
        }
    }

    /// Push-to-talk release edge. Ignored unless currently recording.
    pub fn press_release(&self) {
        if let Some(snapshot) = self.try_transition(Phase::Recording, Phase::Transcribing) {
            info!("release: Recording → Transcribing");
            self.spawn_worker();
            self.render.render(snapshot);
        } else {
            debug!("release ignored outside Recording");
        }
    }

    /// Select the transcription language by code. Legal in any phase; an
    /// in-flight recording keeps the audio it already captured.
    ///
    /// # Errors
    /// Returns [`ControllerError::UnknownLanguage`] if `code` is not in the
    /// language table; session and engine are left unchanged.
    pub fn set_language(&self, code: &str) -> Result<(), ControllerError> {
        let Some(index) = language::index_of(code) else {
            warn!(code, "unknown language code, selection unchanged");
            return Err(ControllerError::UnknownLanguage(code.to_owned()));
        };

        let snapshot = {
            let mut session = self.lock();
            session.language_index = index;
            self.engine.set_language(code);
            session.snapshot()
        };
        info!(code, "language selected");
        self.render.render(snapshot);
        Ok(())
    }

    /// Advance to the next language in table order, wrapping at the end.
    pub fn cycle_language(&self) {
        let snapshot = {
            let mut session = self.lock();
            session.language_index = (session.language_index + 1) % language::LANGUAGES.len();
            let code = language::at(session.language_index).code;
            self.engine.set_language(code);
            session.snapshot()
        };
        info!(code = snapshot.language.code, "language cycled");
        self.render.render(snapshot);
    }

    /// Stop any in-flight capture (best-effort) and release the engine.
    /// Hotkey unregistration and UI teardown are the front end's job.
    pub fn shutdown(&self) {
        let phase = self.lock().phase;
        if phase != Phase::Idle {
            info!(?phase, "shutdown during active session, force-stopping capture");
            self.engine.stop();
        }
        self.engine.shutdown();
        info!("engine released");
    }

    /// Spawn the transcription worker for a committed
    /// `Recording → Transcribing` edge. At most one worker can be in flight:
    /// no second edge into `Transcribing` is reachable until this one puts
    /// the phase back to `Idle`.
    fn spawn_worker(&self) {
        let session = Arc::clone(&self.session);
        let engine = Arc::clone(&self.engine);
        let delivery = Arc::clone(&self.delivery);
        let render = Arc::clone(&self.render);

        let spawned = std::thread::Builder::new()
            .name("transcription-worker".to_owned())
            .spawn(move || {
                engine.stop();

                let text = match engine.final_text() {
                    Ok(text) => text,
                    Err(e) => {
                        // Degrade to an empty transcript; the session must
                        // still make it back to Idle.
                        warn!(error = %e, "final transcript unavailable");
                        String::new()
                    }
                };

                let trimmed = text.trim();
                if trimmed.is_empty() {
                    debug!("empty transcript, nothing to deliver");
                } else if let Err(e) = delivery.deliver(trimmed) {
                    warn!(error = %e, "transcript delivery failed");
                }

                let snapshot = {
                    let mut session = session.lock().unwrap_or_else(PoisonError::into_inner);
                    session.phase = Phase::Idle;
                    session.snapshot()
                };
                info!("worker done: Transcribing → Idle");
                render.render(snapshot);
            });

        if let Err(e) = spawned {
            // Without a worker the phase would never resolve; undo the edge.
            error!(error = %e, "failed to spawn transcription worker");
            let mut session = self.lock();
            session.phase = Phase::Idle;
        }
    }
}
