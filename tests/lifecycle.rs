//! End-to-end lifecycle tests for the recording state machine.
//!
//! Drives the controller through the same sequences the hotkeys would, with
//! a scripted engine standing in for whisper and recording fakes for
//! delivery and rendering.

use std::collections::VecDeque;
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use voicekey::controller::{ControllerError, RecordingController};
use voicekey::delivery::{DeliveryError, TextDelivery};
use voicekey::render::RenderSink;
use voicekey::session::{Phase, Snapshot};
use voicekey::transcription::{EngineError, SpeechEngine};

/// Engine that replays a script of final transcripts.
struct ScriptedEngine {
    finals: Mutex<VecDeque<Result<String, String>>>,
    starts: Mutex<usize>,
    stops: Mutex<usize>,
    languages: Mutex<Vec<String>>,
    /// When set, final_text blocks until the paired sender fires
    gate: Option<Mutex<Receiver<()>>>,
}

impl ScriptedEngine {
    fn new(finals: Vec<Result<String, String>>) -> Self {
        Self {
            finals: Mutex::new(finals.into()),
            starts: Mutex::new(0),
            stops: Mutex::new(0),
            languages: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    fn gated(finals: Vec<Result<String, String>>, gate: Receiver<()>) -> Self {
        let mut engine = Self::new(finals);
        engine.gate = Some(Mutex::new(gate));
        engine
    }

    fn starts(&self) -> usize {
        *self.starts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn stops(&self) -> usize {
        *self.stops.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn languages(&self) -> Vec<String> {
        self.languages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl SpeechEngine for ScriptedEngine {
    fn start(&self) {
        *self.starts.lock().unwrap_or_else(PoisonError::into_inner) += 1;
    }

    fn stop(&self) {
        *self.stops.lock().unwrap_or_else(PoisonError::into_inner) += 1;
    }

    fn final_text(&self) -> Result<String, EngineError> {
        if let Some(gate) = &self.gate {
            gate.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .recv()
                .ok();
        }
        match self
            .finals
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
        {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(EngineError::Inference(anyhow::anyhow!(message))),
            None => Ok(String::new()),
        }
    }

    fn set_language(&self, code: &str) {
        self.languages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(code.to_owned());
    }

    fn shutdown(&self) {}
}

#[derive(Default)]
struct RecordingDelivery {
    delivered: Mutex<Vec<String>>,
}

impl RecordingDelivery {
    fn delivered(&self) -> Vec<String> {
        self.delivered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl TextDelivery for RecordingDelivery {
    fn deliver(&self, text: &str) -> Result<(), DeliveryError> {
        self.delivered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(text.to_owned());
        Ok(())
    }
}

#[derive(Default)]
struct RecordingRender {
    snapshots: Mutex<Vec<Snapshot>>,
}

impl RecordingRender {
    fn phases(&self) -> Vec<Phase> {
        self.snapshots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|snapshot| snapshot.phase)
            .collect()
    }
}

impl RenderSink for RecordingRender {
    fn render(&self, snapshot: Snapshot) {
        self.snapshots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(snapshot);
    }
}

struct Harness {
    controller: RecordingController,
    engine: Arc<ScriptedEngine>,
    delivery: Arc<RecordingDelivery>,
    render: Arc<RecordingRender>,
}

fn harness(engine: ScriptedEngine) -> Harness {
    let engine = Arc::new(engine);
    let delivery = Arc::new(RecordingDelivery::default());
    let render = Arc::new(RecordingRender::default());
    let controller = RecordingController::new(
        Arc::<ScriptedEngine>::clone(&engine),
        Arc::<RecordingDelivery>::clone(&delivery),
        Arc::<RecordingRender>::clone(&render),
        0,
    );
    Harness {
        controller,
        engine,
        delivery,
        render,
    }
}

fn wait_for_idle(controller: &RecordingController) {
    for _ in 0..200 {
        if controller.snapshot().phase == Phase::Idle {
            return;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(
        controller.snapshot().phase,
        Phase::Idle,
        "session stuck outside Idle"
    );
}

#[test]
fn toggle_cycle_delivers_trimmed_transcript() {
    let h = harness(ScriptedEngine::new(vec![Ok("  hello world ".to_owned())]));

    h.controller.toggle();
    assert_eq!(h.controller.snapshot().phase, Phase::Recording);
    assert_eq!(h.engine.starts(), 1);

    h.controller.toggle();
    wait_for_idle(&h.controller);

    assert_eq!(h.engine.stops(), 1);
    assert_eq!(h.delivery.delivered(), vec!["hello world".to_owned()]);
}

#[test]
fn render_follows_the_lifecycle() {
    let h = harness(ScriptedEngine::new(vec![Ok("text".to_owned())]));

    h.controller.toggle();
    h.controller.toggle();
    wait_for_idle(&h.controller);

    assert_eq!(
        h.render.phases(),
        vec![Phase::Recording, Phase::Transcribing, Phase::Idle]
    );
}

#[test]
fn whitespace_transcript_has_no_side_effects() {
    let h = harness(ScriptedEngine::new(vec![Ok("  \n ".to_owned())]));

    h.controller.toggle();
    h.controller.toggle();
    wait_for_idle(&h.controller);

    assert!(h.delivery.delivered().is_empty());
}

#[test]
fn engine_failure_degrades_to_empty_transcript() {
    let h = harness(ScriptedEngine::new(vec![Err("model exploded".to_owned())]));

    h.controller.toggle();
    h.controller.toggle();
    wait_for_idle(&h.controller);

    assert!(h.delivery.delivered().is_empty());
}

#[test]
fn toggle_is_rejected_while_transcribing() {
    let (release, gate) = std::sync::mpsc::channel();
    let h = harness(ScriptedEngine::gated(vec![Ok("late".to_owned())], gate));

    h.controller.toggle();
    h.controller.toggle();
    assert_eq!(h.controller.snapshot().phase, Phase::Transcribing);

    // Worker is parked inside final_text; every toggle here must bounce
    h.controller.toggle();
    h.controller.toggle();
    assert_eq!(h.controller.snapshot().phase, Phase::Transcribing);
    assert_eq!(h.engine.starts(), 1);

    release.send(()).ok();
    wait_for_idle(&h.controller);
    assert_eq!(h.delivery.delivered(), vec!["late".to_owned()]);
}

#[test]
fn push_to_talk_edges() {
    let h = harness(ScriptedEngine::new(vec![Ok("ptt text".to_owned())]));

    h.controller.press_start();
    assert_eq!(h.controller.snapshot().phase, Phase::Recording);

    // Held key auto-repeats press events; they must not restart the capture
    h.controller.press_start();
    h.controller.press_start();
    assert_eq!(h.engine.starts(), 1);

    h.controller.press_release();
    wait_for_idle(&h.controller);
    assert_eq!(h.delivery.delivered(), vec!["ptt text".to_owned()]);

    // Release with nothing recording is ignored
    h.controller.press_release();
    assert_eq!(h.controller.snapshot().phase, Phase::Idle);
    assert_eq!(h.engine.stops(), 1);
}

#[test]
fn language_selection_and_cycling() {
    let h = harness(ScriptedEngine::new(Vec::new()));

    assert!(h.controller.set_language("ja").is_ok());
    assert_eq!(h.controller.snapshot().language.code, "ja");

    let result = h.controller.set_language("xx");
    assert!(matches!(
        result,
        Err(ControllerError::UnknownLanguage(code)) if code == "xx"
    ));
    // Unknown code leaves both session and engine untouched
    assert_eq!(h.controller.snapshot().language.code, "ja");
    assert_eq!(h.engine.languages(), vec!["ja".to_owned()]);

    let table_len = voicekey::language::LANGUAGES.len();
    for _ in 0..table_len {
        h.controller.cycle_language();
    }
    assert_eq!(h.controller.snapshot().language.code, "ja");
    assert_eq!(h.engine.languages().len(), 1 + table_len);
}

#[test]
fn language_change_mid_recording_is_legal() {
    let h = harness(ScriptedEngine::new(vec![Ok("안녕".to_owned())]));

    h.controller.toggle();
    assert!(h.controller.set_language("en").is_ok());
    assert_eq!(h.controller.snapshot().phase, Phase::Recording);

    h.controller.toggle();
    wait_for_idle(&h.controller);
    assert_eq!(h.delivery.delivered(), vec!["안녕".to_owned()]);
}
