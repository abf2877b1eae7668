//! Delivery of a final transcript into the focused application.

use std::time::Duration;

use enigo::{Direction, Enigo, Key, Keyboard, Settings};
use thiserror::Error;
use tracing::{debug, info};

/// Errors from clipboard or synthetic-keystroke operations.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// Clipboard access failed
    #[error("clipboard error: {0}")]
    Clipboard(#[from] arboard::Error),

    /// Could not construct the synthetic input backend
    #[error("input backend error: {0}")]
    InputBackend(#[from] enigo::NewConError),

    /// Posting the paste keystroke failed
    #[error("paste keystroke error: {0}")]
    Keystroke(#[from] enigo::InputError),
}

/// Side-effecting sink for a final transcript.
#[cfg_attr(test, mockall::automock)]
pub trait TextDelivery: Send + Sync {
    /// Deliver `text` into whichever application has input focus.
    ///
    /// # Errors
    /// Returns an error on clipboard or keystroke failure; callers treat
    /// delivery as best-effort and only log.
    fn deliver(&self, text: &str) -> Result<(), DeliveryError>;
}

/// Clipboard + simulated paste. The transcript is copied first, so even if
/// the paste keystroke misses the intended window the text stays available
/// for a manual paste.
pub struct ClipboardPaste {
    settle: Duration,
}

impl ClipboardPaste {
    /// New delivery with the given settle delay between copy and paste.
    /// Clipboard managers need a moment to observe the new content before
    /// the paste keystroke fires.
    #[must_use]
    pub const fn new(settle: Duration) -> Self {
        Self { settle }
    }

    const fn paste_modifier() -> Key {
        if cfg!(target_os = "macos") {
            Key::Meta
        } else {
            Key::Control
        }
    }
}

impl TextDelivery for ClipboardPaste {
    fn deliver(&self, text: &str) -> Result<(), DeliveryError> {
        debug!(text_len = text.len(), "copying transcript to clipboard");
        let mut clipboard = arboard::Clipboard::new()?;
        clipboard.set_text(text)?;

        std::thread::sleep(self.settle);

        let mut enigo = Enigo::new(&Settings::default())?;
        let modifier = Self::paste_modifier();
        enigo.key(modifier, Direction::Press)?;
        enigo.key(Key::Unicode('v'), Direction::Click)?;
        enigo.key(modifier, Direction::Release)?;

        info!(text_len = text.len(), "transcript delivered via paste");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paste_modifier_matches_platform() {
        let modifier = ClipboardPaste::paste_modifier();
        if cfg!(target_os = "macos") {
            assert_eq!(modifier, Key::Meta);
        } else {
            assert_eq!(modifier, Key::Control);
        }
    }

    #[test]
    #[ignore = "Requires a display server and clipboard access"]
    fn test_deliver_round_trip() {
        // Run manually: cargo test test_deliver_round_trip -- --ignored
        let delivery = ClipboardPaste::new(Duration::from_millis(50));
        delivery.deliver("voicekey test").ok();
    }
}
