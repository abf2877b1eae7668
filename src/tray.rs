//! Tray-icon front end: a pure projection of the session snapshot.
//!
//! Every state change rebuilds the icon and menu in full from the snapshot;
//! no menu state is kept in sync incrementally.

use anyhow::{Context, Result};
use std::collections::HashMap;
use tray_icon::menu::{CheckMenuItem, Menu, MenuEvent, MenuItem, PredefinedMenuItem, Submenu};
use tray_icon::{Icon, TrayIconBuilder};

use crate::language::LANGUAGES;
use crate::session::{Phase, Snapshot};

const ICON_SIZE: u32 = 32;
const COLOR_IDLE: [u8; 4] = [0, 122, 255, 255];
const COLOR_RECORDING: [u8; 4] = [255, 50, 50, 255];
const COLOR_TRANSCRIBING: [u8; 4] = [255, 170, 0, 255];

/// Commands produced by tray menu clicks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrayCommand {
    /// Toggle recording (same as the hotkey)
    Toggle,
    /// Select a language by code
    SetLanguage(String),
    /// Exit the process
    Quit,
}

/// Tray icon + menu, rebuilt from each snapshot.
pub struct TrayUi {
    tray: tray_icon::TrayIcon,
    cached_icons: HashMap<Phase, Icon>,
}

impl TrayUi {
    /// Build the tray for the initial snapshot.
    ///
    /// # Errors
    /// Returns an error if icon or menu construction fails.
    pub fn new(snapshot: Snapshot) -> Result<Self> {
        let mut cached_icons = HashMap::new();
        for phase in [Phase::Idle, Phase::Recording, Phase::Transcribing] {
            cached_icons.insert(phase, solid_icon(phase_color(phase))?);
        }

        let tray = Self::build_tray(snapshot, &cached_icons)?;
        Ok(Self { tray, cached_icons })
    }

    /// Re-render from a fresh snapshot. Full rebuild, never a patch.
    ///
    /// # Errors
    /// Returns an error if the rebuilt tray cannot be constructed.
    pub fn apply(&mut self, snapshot: Snapshot) -> Result<()> {
        // Rebuilding the whole tray sidesteps set_icon inconsistencies on
        // macOS menu bars.
        self.tray = Self::build_tray(snapshot, &self.cached_icons)?;
        Ok(())
    }

    fn build_tray(
        snapshot: Snapshot,
        cached_icons: &HashMap<Phase, Icon>,
    ) -> Result<tray_icon::TrayIcon> {
        let icon = cached_icons
            .get(&snapshot.phase)
            .with_context(|| format!("icon for phase {:?} not in cache", snapshot.phase))?
            .clone();
        let menu = build_menu(snapshot)?;

        TrayIconBuilder::new()
            .with_menu(Box::new(menu))
            .with_tooltip(tooltip(snapshot))
            .with_icon(icon)
            .build()
            .context("failed to build tray icon")
    }

    /// Drain one pending menu event, if any.
    #[must_use]
    pub fn poll_events() -> Option<TrayCommand> {
        MenuEvent::receiver()
            .try_recv()
            .ok()
            .and_then(|event| parse_menu_event(event.id.0.as_str()))
    }
}

const fn phase_color(phase: Phase) -> [u8; 4] {
    match phase {
        Phase::Idle => COLOR_IDLE,
        Phase::Recording => COLOR_RECORDING,
        Phase::Transcribing => COLOR_TRANSCRIBING,
    }
}

fn solid_icon(rgba: [u8; 4]) -> Result<Icon> {
    let pixels = rgba.repeat((ICON_SIZE * ICON_SIZE) as usize);
    Icon::from_rgba(pixels, ICON_SIZE, ICON_SIZE).context("failed to create icon from RGBA data")
}

fn tooltip(snapshot: Snapshot) -> String {
    let prefix = match snapshot.phase {
        Phase::Idle => "",
        Phase::Recording => "[REC] ",
        Phase::Transcribing => "[…] ",
    };
    format!("{prefix}Voicekey — {}", snapshot.language.display_name)
}

fn toggle_label(phase: Phase) -> &'static str {
    match phase {
        Phase::Idle => "🎤 Start Recording",
        Phase::Recording => "🔴 Stop Recording",
        Phase::Transcribing => "⏳ Transcribing…",
    }
}

fn build_menu(snapshot: Snapshot) -> Result<Menu> {
    let menu = Menu::new();

    // Main toggle; disabled while a transcription is finishing
    let toggle = MenuItem::with_id(
        "toggle",
        toggle_label(snapshot.phase),
        snapshot.phase != Phase::Transcribing,
        None,
    );
    menu.append(&toggle).context("failed to append toggle item")?;

    let hint = MenuItem::new("Hotkey: Ctrl+Shift+Space", false, None);
    menu.append(&hint).context("failed to append hint item")?;

    menu.append(&PredefinedMenuItem::separator())
        .context("failed to append separator")?;

    let lang_submenu = Submenu::new("Language (Alt+Shift+L)", true);
    for lang in LANGUAGES {
        let item = CheckMenuItem::with_id(
            format!("lang:{}", lang.code),
            lang.display_name,
            true,
            lang.code == snapshot.language.code,
            None,
        );
        lang_submenu
            .append(&item)
            .context("failed to append language item")?;
    }
    menu.append(&lang_submenu)
        .context("failed to append language submenu")?;

    menu.append(&PredefinedMenuItem::separator())
        .context("failed to append separator")?;

    let quit = MenuItem::with_id("quit", "Quit", true, None);
    menu.append(&quit).context("failed to append quit item")?;

    Ok(menu)
}

fn parse_menu_event(id: &str) -> Option<TrayCommand> {
    match id {
        "toggle" => Some(TrayCommand::Toggle),
        "quit" => Some(TrayCommand::Quit),
        _ => id
            .strip_prefix("lang:")
            .map(|code| TrayCommand::SetLanguage(code.to_owned())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;

    #[test]
    fn test_parse_menu_event_toggle_and_quit() {
        assert_eq!(parse_menu_event("toggle"), Some(TrayCommand::Toggle));
        assert_eq!(parse_menu_event("quit"), Some(TrayCommand::Quit));
    }

    #[test]
    fn test_parse_menu_event_language() {
        assert_eq!(
            parse_menu_event("lang:en"),
            Some(TrayCommand::SetLanguage("en".to_owned()))
        );
        assert_eq!(
            parse_menu_event("lang:ko"),
            Some(TrayCommand::SetLanguage("ko".to_owned()))
        );
    }

    #[test]
    fn test_parse_menu_event_unknown() {
        assert_eq!(parse_menu_event("hint"), None);
        assert_eq!(parse_menu_event(""), None);
    }

    #[test]
    fn test_toggle_label_per_phase() {
        assert_eq!(toggle_label(Phase::Idle), "🎤 Start Recording");
        assert_eq!(toggle_label(Phase::Recording), "🔴 Stop Recording");
        assert_eq!(toggle_label(Phase::Transcribing), "⏳ Transcribing…");
    }

    #[test]
    fn test_tooltip_shows_language_and_phase() {
        let mut session = Session::new(1);
        assert_eq!(tooltip(session.snapshot()), "Voicekey — English");

        session.phase = Phase::Recording;
        assert!(tooltip(session.snapshot()).starts_with("[REC] "));
    }

    #[test]
    fn test_phase_colors_are_distinct() {
        assert_ne!(phase_color(Phase::Idle), phase_color(Phase::Recording));
        assert_ne!(
            phase_color(Phase::Recording),
            phase_color(Phase::Transcribing)
        );
    }

    #[test]
    fn test_solid_icon_dimensions() {
        let icon = solid_icon(COLOR_IDLE);
        assert!(icon.is_ok());
    }

    #[test]
    #[ignore = "Requires main thread for macOS menu creation"]
    fn test_build_menu_all_phases() {
        for phase in [Phase::Idle, Phase::Recording, Phase::Transcribing] {
            let mut session = Session::new(0);
            session.phase = phase;
            assert!(build_menu(session.snapshot()).is_ok());
        }
    }
}
