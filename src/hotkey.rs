//! Global hotkey registration and event dispatch.

use anyhow::{anyhow, Context, Result};
use global_hotkey::{
    hotkey::{Code, HotKey, Modifiers},
    GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState,
};
use tracing::info;

use crate::config::ComboConfig;

/// What a registered combo does when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeyAction {
    /// Toggle-mode record hotkey
    Toggle,
    /// Advance to the next language
    CycleLanguage,
    /// Push-to-talk combo (press and release edges both matter)
    PushToTalk,
}

/// OS-wide hotkey registrations for one front end.
///
/// Registration conflicts are fatal: the constructor fails and the process
/// must exit before entering its event loop.
pub struct HotkeyManager {
    manager: GlobalHotKeyManager,
    bindings: Vec<(HotKey, HotkeyAction)>,
}

impl HotkeyManager {
    /// Register the given combos. Fails on parse errors or if the OS rejects
    /// a registration (combo already taken).
    ///
    /// # Errors
    /// Returns an error on an unparseable combo or a registration conflict.
    pub fn new(combos: &[(&ComboConfig, HotkeyAction)]) -> Result<Self> {
        let manager = GlobalHotKeyManager::new().context("failed to create hotkey manager")?;

        let mut bindings = Vec::with_capacity(combos.len());
        for (combo, action) in combos {
            let hotkey = HotKey::new(Some(parse_modifiers(&combo.modifiers)?), parse_key(&combo.key)?);
            manager.register(hotkey).with_context(|| {
                format!(
                    "failed to register {:?} + {} (already in use?)",
                    combo.modifiers, combo.key
                )
            })?;
            info!(
                action = ?action,
                modifiers = ?combo.modifiers,
                key = %combo.key,
                "registered hotkey"
            );
            bindings.push((hotkey, *action));
        }

        Ok(Self { manager, bindings })
    }

    /// Resolve a global hotkey event to its action and press/release edge.
    #[must_use]
    pub fn resolve(&self, event: &GlobalHotKeyEvent) -> Option<(HotkeyAction, HotKeyState)> {
        self.bindings
            .iter()
            .find(|(hotkey, _)| hotkey.id() == event.id)
            .map(|(_, action)| (*action, event.state))
    }
}

impl Drop for HotkeyManager {
    fn drop(&mut self) {
        for (hotkey, _) in &self.bindings {
            if let Err(e) = self.manager.unregister(*hotkey) {
                tracing::error!("failed to unregister hotkey: {}", e);
            }
        }
    }
}

fn parse_modifiers(modifiers: &[String]) -> Result<Modifiers> {
    let mut result = Modifiers::empty();
    for modifier in modifiers {
        match modifier.as_str() {
            "Control" | "Ctrl" => result |= Modifiers::CONTROL,
            "Option" | "Alt" => result |= Modifiers::ALT,
            "Command" | "Super" => result |= Modifiers::SUPER,
            "Shift" => result |= Modifiers::SHIFT,
            _ => return Err(anyhow!("unknown modifier: {}", modifier)),
        }
    }
    Ok(result)
}

fn parse_key(key: &str) -> Result<Code> {
    match key {
        "A" => Ok(Code::KeyA),
        "B" => Ok(Code::KeyB),
        "C" => Ok(Code::KeyC),
        "D" => Ok(Code::KeyD),
        "E" => Ok(Code::KeyE),
        "F" => Ok(Code::KeyF),
        "G" => Ok(Code::KeyG),
        "H" => Ok(Code::KeyH),
        "I" => Ok(Code::KeyI),
        "J" => Ok(Code::KeyJ),
        "K" => Ok(Code::KeyK),
        "L" => Ok(Code::KeyL),
        "M" => Ok(Code::KeyM),
        "N" => Ok(Code::KeyN),
        "O" => Ok(Code::KeyO),
        "P" => Ok(Code::KeyP),
        "Q" => Ok(Code::KeyQ),
        "R" => Ok(Code::KeyR),
        "S" => Ok(Code::KeyS),
        "T" => Ok(Code::KeyT),
        "U" => Ok(Code::KeyU),
        "V" => Ok(Code::KeyV),
        "W" => Ok(Code::KeyW),
        "X" => Ok(Code::KeyX),
        "Y" => Ok(Code::KeyY),
        "Z" => Ok(Code::KeyZ),
        "Space" => Ok(Code::Space),
        _ => Err(anyhow!("unsupported key: {}", key)),
    }
}
