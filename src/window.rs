//! Terminal-window front end for the push-to-talk variant.
//!
//! `render_lines` is the pure projection: snapshot + latest partial in,
//! complete frame out. `WindowUi` just paints whatever the projection
//! produced; it holds no state of its own.

use std::io::{self, Write};

use anyhow::{Context, Result};
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    execute, queue,
    style::Print,
    terminal::{
        disable_raw_mode, enable_raw_mode, Clear, ClearType, EnterAlternateScreen,
        LeaveAlternateScreen,
    },
};

use crate::language::{self, LANGUAGES};
use crate::session::{Phase, Snapshot};

/// Project a session snapshot (plus the latest partial transcript) into a
/// full frame of display lines. Deterministic; recomputed on every change.
#[must_use]
pub fn render_lines(snapshot: Snapshot, partial: Option<&str>) -> Vec<String> {
    let record_button = match snapshot.phase {
        Phase::Idle => "[ ○ record ]",
        Phase::Recording => "[ ● recording ]",
        Phase::Transcribing => "[ ⏳ busy ]",
    };

    let status = match snapshot.phase {
        Phase::Idle => "idle — hold the hotkey to talk",
        Phase::Recording => "recording…",
        Phase::Transcribing => "transcribing…",
    };

    let active = language::index_of(snapshot.language.code).unwrap_or(0);
    let prev = language::at(active + LANGUAGES.len() - 1);
    let next = language::at(active + 1);

    let partial_line = match snapshot.phase {
        Phase::Recording => format!("partial: {}", partial.unwrap_or("")),
        // Partial text is only meaningful while capturing
        _ => "partial:".to_owned(),
    };

    vec![
        format!("voicekey — push to talk  [{}]", snapshot.language.badge),
        "──────────────────────────────────────".to_owned(),
        format!("{record_button}   {}", snapshot.language.display_name),
        format!("status: {status}"),
        format!("[◀ {}]  [{} ▶]   (Left/Right)", prev.display_name, next.display_name),
        partial_line,
        "hold Ctrl+Shift+Space to talk · q quits".to_owned(),
    ]
}

/// Raw-mode alternate-screen painter. Restores the terminal on drop.
pub struct WindowUi {
    stdout: io::Stdout,
}

impl WindowUi {
    /// Enter the alternate screen in raw mode.
    ///
    /// # Errors
    /// Returns an error if the terminal cannot be configured.
    pub fn new() -> Result<Self> {
        let mut stdout = io::stdout();
        enable_raw_mode().context("failed to enable raw mode")?;
        execute!(stdout, EnterAlternateScreen, Hide)
            .context("failed to enter alternate screen")?;
        Ok(Self { stdout })
    }

    /// Paint one full frame.
    ///
    /// # Errors
    /// Returns an error if writing to the terminal fails.
    pub fn draw(&mut self, snapshot: Snapshot, partial: Option<&str>) -> Result<()> {
        queue!(self.stdout, Clear(ClearType::All)).context("failed to clear screen")?;
        for (row, line) in render_lines(snapshot, partial).into_iter().enumerate() {
            #[allow(clippy::cast_possible_truncation)]
            queue!(self.stdout, MoveTo(0, row as u16), Print(line))
                .context("failed to queue line")?;
        }
        self.stdout.flush().context("failed to flush frame")?;
        Ok(())
    }
}

impl Drop for WindowUi {
    fn drop(&mut self) {
        execute!(self.stdout, Show, LeaveAlternateScreen).ok();
        disable_raw_mode().ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;

    fn snapshot_with(phase: Phase, index: usize) -> Snapshot {
        let mut session = Session::new(index);
        session.phase = phase;
        session.snapshot()
    }

    #[test]
    fn test_idle_frame() {
        let lines = render_lines(snapshot_with(Phase::Idle, 0), None);
        assert!(lines[0].contains("[KR]"));
        assert!(lines[2].contains("○ record"));
        assert!(lines[3].contains("idle"));
    }

    #[test]
    fn test_recording_frame_shows_partial() {
        let lines = render_lines(snapshot_with(Phase::Recording, 1), Some("hello wor"));
        assert!(lines[2].contains("● recording"));
        assert!(lines[5].contains("partial: hello wor"));
    }

    #[test]
    fn test_transcribing_frame_is_busy_and_drops_partial() {
        let lines = render_lines(snapshot_with(Phase::Transcribing, 0), Some("stale"));
        assert!(lines[2].contains("busy"));
        assert!(!lines[5].contains("stale"));
    }

    #[test]
    fn test_language_buttons_wrap_around_the_table() {
        // First entry: prev wraps to the last table entry
        let lines = render_lines(snapshot_with(Phase::Idle, 0), None);
        let last = LANGUAGES[LANGUAGES.len() - 1];
        assert!(lines[4].contains(last.display_name));
        assert!(lines[4].contains(LANGUAGES[1].display_name));
    }

    #[test]
    fn test_projection_is_deterministic() {
        let snap = snapshot_with(Phase::Recording, 2);
        assert_eq!(render_lines(snap, Some("x")), render_lines(snap, Some("x")));
    }
}
