//! Voicekey - hotkey-driven voice dictation
//!
//! Captures microphone audio on a global hotkey, transcribes it with
//! whisper, and pastes the text into the focused application. The library
//! holds everything shared by the two front ends (tray toggle and terminal
//! push-to-talk).

/// Microphone capture
pub mod audio;
/// Configuration management
pub mod config;
/// Recording lifecycle state machine
pub mod controller;
/// Clipboard + paste transcript delivery
pub mod delivery;
/// Global hotkey registration and dispatch
pub mod hotkey;
/// Supported language table
pub mod language;
/// Partial-transcript relay
pub mod relay;
/// Snapshot marshaling to the UI thread
pub mod render;
/// Session state and snapshots
pub mod session;
/// Logging initialization
pub mod telemetry;
/// Speech engine interface and whisper implementation
pub mod transcription;
/// Tray front-end projection
pub mod tray;
/// Terminal front-end projection
pub mod window;
