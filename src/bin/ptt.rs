//! Terminal front end: push-to-talk with live partial transcripts.

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use global_hotkey::{GlobalHotKeyEvent, HotKeyState};
use std::sync::Arc;
use std::time::Duration;

use voicekey::config::Config;
use voicekey::controller::RecordingController;
use voicekey::delivery::ClipboardPaste;
use voicekey::hotkey::{HotkeyAction, HotkeyManager};
use voicekey::language::{self, LANGUAGES};
use voicekey::relay::PartialRelay;
use voicekey::render::RenderRelay;
use voicekey::session::Phase;
use voicekey::telemetry;
use voicekey::transcription::{SpeechEngine, WhisperEngine};
use voicekey::window::WindowUi;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    telemetry::init(config.telemetry.enabled, &config.telemetry.log_path)?;
    tracing::info!("voicekey-ptt starting");

    let model_path = Config::expand_path(&config.model.path)?;
    let engine = WhisperEngine::new(
        &model_path,
        config.model.threads,
        config.model.beam_size,
        Duration::from_millis(config.model.partial_interval_ms),
        &config.language.default,
    )
    .context("speech engine construction failed")?;

    // Interim transcripts flow through the relay; the draw loop below is the
    // only place they reach the screen.
    let partial = PartialRelay::new();
    engine.set_partial_sink(partial.sink());

    let language_index = language::index_of(&config.language.default).unwrap_or_else(|| {
        tracing::warn!(
            code = %config.language.default,
            "configured default language unknown, falling back to table start"
        );
        0
    });

    let render = RenderRelay::new();
    let controller = Arc::new(RecordingController::new(
        Arc::new(engine),
        Arc::new(ClipboardPaste::new(Duration::from_millis(
            config.delivery.settle_ms,
        ))),
        Arc::new(render.clone()),
        language_index,
    ));

    let hotkeys = HotkeyManager::new(&[(&config.hotkeys.push_to_talk, HotkeyAction::PushToTalk)])?;

    let mut window = WindowUi::new()?;
    let mut snapshot = controller.snapshot();
    let mut partial_text: Option<String> = None;
    window.draw(snapshot, None)?;

    let receiver = GlobalHotKeyEvent::receiver();
    'main: loop {
        while let Ok(hotkey_event) = receiver.try_recv() {
            match hotkeys.resolve(&hotkey_event) {
                Some((HotkeyAction::PushToTalk, HotKeyState::Pressed)) => {
                    controller.press_start();
                }
                Some((HotkeyAction::PushToTalk, HotKeyState::Released)) => {
                    controller.press_release();
                }
                _ => {}
            }
        }

        while event::poll(Duration::ZERO).unwrap_or(false) {
            let Ok(Event::Key(key)) = event::read() else {
                continue;
            };
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Char('q') => break 'main,
                KeyCode::Left => {
                    let active = language::index_of(snapshot.language.code).unwrap_or(0);
                    let prev = language::at(active + LANGUAGES.len() - 1);
                    if let Err(e) = controller.set_language(prev.code) {
                        tracing::warn!(error = %e, "language selection rejected");
                    }
                }
                KeyCode::Right => controller.cycle_language(),
                _ => {}
            }
        }

        let mut dirty = false;
        if let Some(new_snapshot) = render.take() {
            if new_snapshot.phase != Phase::Recording {
                // Capture over; whatever partial is pending is stale
                partial.clear();
                partial_text = None;
            }
            snapshot = new_snapshot;
            dirty = true;
        }
        if let Some(text) = partial.take() {
            partial_text = Some(text);
            dirty = true;
        }
        if dirty {
            window.draw(snapshot, partial_text.as_deref())?;
        }

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutdown signal received");
                break;
            }
            () = tokio::time::sleep(Duration::from_millis(10)) => {}
        }
    }

    drop(window);
    controller.shutdown();
    drop(hotkeys);
    tracing::info!("voicekey-ptt stopped");
    Ok(())
}
