//! Speech-to-text engine interface and the whisper-backed implementation.

/// Whisper engine implementation
pub mod whisper;

pub use whisper::WhisperEngine;

use thiserror::Error;

/// Callback receiving interim transcripts while recording. Invoked on an
/// engine-owned thread; callers marshal to their UI context themselves.
pub type PartialSink = Box<dyn Fn(String) + Send + Sync>;

/// Errors reported by a speech engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Audio device or capture stream setup failed
    #[error("audio capture init failed: {0}")]
    AudioInit(String),

    /// Failed to load the whisper model
    #[error("failed to load whisper model from {path}: {source}")]
    ModelLoad {
        /// Path to the model file
        path: String,
        /// Underlying error
        source: anyhow::Error,
    },

    /// Inference on the captured audio failed
    #[error("transcription failed")]
    Inference(#[from] anyhow::Error),
}

/// Capability contract for a speech-to-text engine.
///
/// The controller only ever talks to this trait; the concrete engine is
/// swapped for a mock in tests (via `mockall`) and a scripted fake in the
/// integration suite.
#[cfg_attr(test, mockall::automock)]
pub trait SpeechEngine: Send + Sync {
    /// Begin capturing microphone audio.
    fn start(&self);

    /// End the capture. Does not block on inference.
    fn stop(&self);

    /// Retrieve the final transcript for the last capture. Blocks for the
    /// duration of model inference; never called under the session lock.
    ///
    /// # Errors
    /// Returns an error if inference fails; callers degrade to an empty
    /// transcript.
    fn final_text(&self) -> Result<String, EngineError>;

    /// Change the transcription language for subsequent captures. Does not
    /// affect audio already captured in an in-flight recording.
    fn set_language(&self, code: &str);

    /// Install a callback for interim transcripts. Optional; engines without
    /// streaming support ignore it.
    fn set_partial_sink(&self, _sink: PartialSink) {}

    /// Release engine resources. Called once at process shutdown.
    fn shutdown(&self);
}
