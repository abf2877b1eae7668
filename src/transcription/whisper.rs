//! Whisper-backed speech engine: CPAL capture plus whisper-rs inference.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender, SyncSender};
use std::sync::{mpsc, Arc, Mutex, PoisonError};
use std::time::Duration;

use anyhow::Context;
use tracing::{debug, info, warn};
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use super::{EngineError, PartialSink, SpeechEngine};
use crate::audio::capture::{to_16khz_mono, AudioCapture, TARGET_SAMPLE_RATE};

/// Commands for the capture thread (owner of the non-`Send` CPAL stream).
enum CaptureCommand {
    Start,
    /// Stop the stream and drain remaining samples; acked when the
    /// accumulator holds the complete capture.
    Stop(SyncSender<()>),
    Shutdown,
}

/// Speech engine combining microphone capture and whisper inference.
///
/// Capture runs on a dedicated thread; inference runs on whichever thread
/// calls [`SpeechEngine::final_text`] (the transcription worker) or on the
/// internal partial-transcript loop.
pub struct WhisperEngine {
    ctx: Arc<Mutex<WhisperContext>>,
    threads: i32,
    beam_size: i32,
    language: Arc<Mutex<String>>,
    partial_sink: Arc<Mutex<Option<PartialSink>>>,
    partial_interval: Duration,
    /// Device-rate interleaved samples accumulated during the capture
    samples: Arc<Mutex<Vec<f32>>>,
    recording: Arc<AtomicBool>,
    device_sample_rate: u32,
    device_channels: u16,
    capture_tx: Sender<CaptureCommand>,
}

impl WhisperEngine {
    /// Load the model and bring up the capture thread.
    ///
    /// # Errors
    /// Returns [`EngineError::ModelLoad`] or [`EngineError::AudioInit`];
    /// either is fatal at startup.
    pub fn new(
        model_path: &Path,
        threads: usize,
        beam_size: usize,
        partial_interval: Duration,
        default_language: &str,
    ) -> Result<Self, EngineError> {
        let threads = i32::try_from(threads.max(1)).map_err(|_| EngineError::ModelLoad {
            path: model_path.display().to_string(),
            source: anyhow::anyhow!("threads value too large"),
        })?;
        let beam_size = i32::try_from(beam_size.max(1)).map_err(|_| EngineError::ModelLoad {
            path: model_path.display().to_string(),
            source: anyhow::anyhow!("beam_size value too large"),
        })?;

        let path_str = model_path.to_str().ok_or_else(|| EngineError::ModelLoad {
            path: model_path.display().to_string(),
            source: anyhow::anyhow!("model path contains invalid UTF-8"),
        })?;

        info!(path = %model_path.display(), threads, beam_size, "loading whisper model");
        let ctx = WhisperContext::new_with_params(path_str, WhisperContextParameters::default())
            .map_err(|e| EngineError::ModelLoad {
                path: model_path.display().to_string(),
                source: anyhow::anyhow!("{e:?}"),
            })?;
        info!("whisper model loaded");

        let samples = Arc::new(Mutex::new(Vec::new()));
        let (capture_tx, capture_rx) = mpsc::channel();
        let (init_tx, init_rx) = mpsc::channel();

        let thread_samples = Arc::clone(&samples);
        std::thread::Builder::new()
            .name("audio-capture".to_owned())
            .spawn(move || match AudioCapture::new() {
                Ok(capture) => {
                    let rate = capture.device_sample_rate();
                    let channels = capture.device_channels();
                    if init_tx.send(Ok((rate, channels))).is_ok() {
                        run_capture_loop(capture, &capture_rx, &thread_samples);
                    }
                }
                Err(e) => {
                    init_tx.send(Err(e)).ok();
                }
            })
            .map_err(|e| EngineError::AudioInit(e.to_string()))?;

        let (device_sample_rate, device_channels) = init_rx
            .recv()
            .map_err(|_| EngineError::AudioInit("capture thread died during init".to_owned()))?
            .map_err(|e| EngineError::AudioInit(format!("{e:#}")))?;

        Ok(Self {
            ctx: Arc::new(Mutex::new(ctx)),
            threads,
            beam_size,
            language: Arc::new(Mutex::new(default_language.to_owned())),
            partial_sink: Arc::new(Mutex::new(None)),
            partial_interval,
            samples,
            recording: Arc::new(AtomicBool::new(false)),
            device_sample_rate,
            device_channels,
            capture_tx,
        })
    }

    /// Greedy for beam size 1, beam search otherwise.
    const fn sampling_strategy(beam_size: i32) -> SamplingStrategy {
        if beam_size > 1 {
            SamplingStrategy::BeamSearch {
                beam_size,
                patience: -1.0,
            }
        } else {
            SamplingStrategy::Greedy { best_of: 1 }
        }
    }

    fn current_language(&self) -> String {
        self.language
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Spawn the interim-transcript loop for one capture. Exits when the
    /// recording flag clears.
    fn spawn_partial_loop(&self) {
        {
            let sink = self
                .partial_sink
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if sink.is_none() {
                return;
            }
        }

        let ctx = Arc::clone(&self.ctx);
        let samples = Arc::clone(&self.samples);
        let recording = Arc::clone(&self.recording);
        let language = Arc::clone(&self.language);
        let sink = Arc::clone(&self.partial_sink);
        let interval = self.partial_interval;
        let threads = self.threads;
        let rate = self.device_sample_rate;
        let channels = self.device_channels;

        let spawned = std::thread::Builder::new()
            .name("partial-transcribe".to_owned())
            .spawn(move || loop {
                std::thread::sleep(interval);
                if !recording.load(Ordering::Relaxed) {
                    break;
                }

                let raw = samples
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .clone();
                let audio = to_16khz_mono(&raw, rate, channels);
                // Whisper needs a reasonable window before it says anything
                if audio.len() < TARGET_SAMPLE_RATE as usize {
                    continue;
                }

                let code = language
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .clone();
                // Greedy decoding: interim text favors latency over accuracy
                match run_inference(&ctx, &audio, threads, 1, &code) {
                    Ok(text) if !text.is_empty() => {
                        if let Some(sink) = &*sink.lock().unwrap_or_else(PoisonError::into_inner) {
                            sink(text);
                        }
                    }
                    Ok(_) => {}
                    Err(e) => debug!(error = %e, "partial pass failed"),
                }
            });

        if let Err(e) = spawned {
            warn!(error = %e, "failed to spawn partial-transcript loop");
        }
    }
}

impl SpeechEngine for WhisperEngine {
    fn start(&self) {
        self.samples
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.recording.store(true, Ordering::Relaxed);
        if self.capture_tx.send(CaptureCommand::Start).is_err() {
            warn!("capture thread gone, cannot start recording");
            return;
        }
        self.spawn_partial_loop();
    }

    fn stop(&self) {
        self.recording.store(false, Ordering::Relaxed);
        let (ack_tx, ack_rx) = mpsc::sync_channel(1);
        if self.capture_tx.send(CaptureCommand::Stop(ack_tx)).is_err() {
            warn!("capture thread gone, cannot stop recording");
            return;
        }
        // Wait for the final drain so final_text sees the whole capture
        if ack_rx.recv_timeout(Duration::from_secs(1)).is_err() {
            warn!("capture thread did not ack stop in time");
        }
    }

    fn final_text(&self) -> Result<String, EngineError> {
        let raw = std::mem::take(&mut *self.samples.lock().unwrap_or_else(PoisonError::into_inner));
        let audio = to_16khz_mono(&raw, self.device_sample_rate, self.device_channels);
        debug!(
            raw_samples = raw.len(),
            audio_samples = audio.len(),
            "running final inference"
        );

        // Sub-100ms captures carry no speech
        if audio.len() < TARGET_SAMPLE_RATE as usize / 10 {
            return Ok(String::new());
        }

        run_inference(
            &self.ctx,
            &audio,
            self.threads,
            self.beam_size,
            &self.current_language(),
        )
    }

    fn set_language(&self, code: &str) {
        *self.language.lock().unwrap_or_else(PoisonError::into_inner) = code.to_owned();
    }

    fn set_partial_sink(&self, sink: PartialSink) {
        *self
            .partial_sink
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(sink);
    }

    fn shutdown(&self) {
        self.recording.store(false, Ordering::Relaxed);
        self.capture_tx.send(CaptureCommand::Shutdown).ok();
        info!("whisper engine shut down");
    }
}

// SAFETY: WhisperEngine is thread-safe because:
// 1. WhisperContext is wrapped in Arc<Mutex<>>, ensuring exclusive access
// 2. Every inference path acquires the mutex before touching the context
// 3. All other fields are Arc/Atomic/channel types that are Send + Sync
#[allow(unsafe_code)]
unsafe impl Send for WhisperEngine {}
#[allow(unsafe_code)]
unsafe impl Sync for WhisperEngine {}

/// Capture-thread main loop: drain the ring buffer into the shared
/// accumulator on a short tick, and honor start/stop/shutdown commands.
fn run_capture_loop(
    mut capture: AudioCapture,
    commands: &Receiver<CaptureCommand>,
    samples: &Arc<Mutex<Vec<f32>>>,
) {
    loop {
        match commands.recv_timeout(Duration::from_millis(25)) {
            Ok(CaptureCommand::Start) => {
                if let Err(e) = capture.start() {
                    warn!(error = %e, "failed to start capture");
                }
            }
            Ok(CaptureCommand::Stop(ack)) => {
                if let Err(e) = capture.stop() {
                    warn!(error = %e, "failed to stop capture");
                }
                let mut buffer = samples.lock().unwrap_or_else(PoisonError::into_inner);
                capture.drain_into(&mut buffer);
                drop(buffer);
                ack.send(()).ok();
            }
            Ok(CaptureCommand::Shutdown) | Err(RecvTimeoutError::Disconnected) => {
                debug!("capture thread exiting");
                break;
            }
            Err(RecvTimeoutError::Timeout) => {
                let mut buffer = samples.lock().unwrap_or_else(PoisonError::into_inner);
                capture.drain_into(&mut buffer);
            }
        }
    }
}

/// One whisper pass over `audio` (16 kHz mono). Shared by the final and
/// partial paths; the context mutex serializes them.
fn run_inference(
    ctx: &Arc<Mutex<WhisperContext>>,
    audio: &[f32],
    threads: i32,
    beam_size: i32,
    language: &str,
) -> Result<String, EngineError> {
    let mut state = ctx
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .create_state()
        .context("failed to create whisper state")?;

    let mut params = FullParams::new(WhisperEngine::sampling_strategy(beam_size));
    params.set_n_threads(threads);
    params.set_print_special(false);
    params.set_print_progress(false);
    params.set_print_realtime(false);
    params.set_print_timestamps(false);
    params.set_language(Some(language));
    params.set_translate(false);

    let start = std::time::Instant::now();
    state
        .full(params, audio)
        .context("whisper inference failed")?;

    let mut result = String::new();
    for segment in state.as_iter() {
        result.push_str(&segment.to_string());
    }
    let result = result.trim().to_owned();

    debug!(
        segments = state.full_n_segments(),
        text_len = result.len(),
        inference_ms = start.elapsed().as_millis(),
        "inference pass complete"
    );

    Ok(result)
}
