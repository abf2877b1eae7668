//! Tray front end: toggle-style recording from the menu bar.

use anyhow::{Context, Result};
use global_hotkey::{GlobalHotKeyEvent, HotKeyState};
use std::sync::Arc;
use std::time::Duration;

use voicekey::config::Config;
use voicekey::controller::RecordingController;
use voicekey::delivery::ClipboardPaste;
use voicekey::hotkey::{HotkeyAction, HotkeyManager};
use voicekey::render::RenderRelay;
use voicekey::transcription::WhisperEngine;
use voicekey::tray::{TrayCommand, TrayUi};
use voicekey::{language, telemetry};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    telemetry::init(config.telemetry.enabled, &config.telemetry.log_path)?;
    tracing::info!("voicekey-tray starting");

    // Engine first: a missing model or microphone must abort before any
    // hotkey is registered.
    let model_path = Config::expand_path(&config.model.path)?;
    let engine = WhisperEngine::new(
        &model_path,
        config.model.threads,
        config.model.beam_size,
        Duration::from_millis(config.model.partial_interval_ms),
        &config.language.default,
    )
    .context("speech engine construction failed")?;

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

    // Conflicts are fatal: bail out before entering the event loop
    let hotkeys = HotkeyManager::new(&[
        (&config.hotkeys.toggle, HotkeyAction::Toggle),
        (&config.hotkeys.cycle_language, HotkeyAction::CycleLanguage),
    ])?;

    let mut tray = TrayUi::new(controller.snapshot())?;
    tracing::info!("voicekey-tray running");

    let receiver = GlobalHotKeyEvent::receiver();
    'main: loop {
        while let Ok(event) = receiver.try_recv() {
            match hotkeys.resolve(&event) {
                Some((HotkeyAction::Toggle, HotKeyState::Pressed)) => controller.toggle(),
                Some((HotkeyAction::CycleLanguage, HotKeyState::Pressed)) => {
                    controller.cycle_language();
                }
                _ => {}
            }
        }

        while let Some(command) = TrayUi::poll_events() {
            match command {
                TrayCommand::Toggle => controller.toggle(),
                TrayCommand::SetLanguage(code) => {
                    if let Err(e) = controller.set_language(&code) {
                        tracing::warn!(error = %e, "menu language selection rejected");
                    }
                }
                TrayCommand::Quit => break 'main,
            }
        }

        // All rendering happens here, on the loop that owns the tray
        if let Some(snapshot) = render.take() {
            if let Err(e) = tray.apply(snapshot) {
                tracing::error!(error = %e, "tray re-render failed");
            }
        }

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutdown signal received");
                break;
            }
            () = tokio::time::sleep(Duration::from_millis(10)) => {}
        }
    }

    controller.shutdown();
    drop(hotkeys);
    tracing::info!("voicekey-tray stopped");
    Ok(())
}
