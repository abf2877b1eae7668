/// Microphone capture via CPAL
pub mod capture;

pub use capture::{to_16khz_mono, AudioCapture};
