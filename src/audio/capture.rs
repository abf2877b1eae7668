//! Microphone capture into a lock-free ring buffer.
//!
//! The CPAL stream stays alive (paused) between recordings so starting a
//! capture is just a flag flip plus a stream resume. The audio callback only
//! pushes into the ring buffer while the recording flag is set.

use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use ringbuf::{
    traits::{Consumer, Observer, Producer, Split},
    HeapCons, HeapRb,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Sample rate whisper inference expects.
pub const TARGET_SAMPLE_RATE: u32 = 16_000;

/// Ring buffer capacity in seconds of device-rate audio.
const RING_CAPACITY_SECS: usize = 60;

/// Microphone capture handle. Not `Send` (the CPAL stream is thread-bound);
/// the engine keeps it on a dedicated capture thread.
pub struct AudioCapture {
    // Kept alive so the stream is not dropped
    stream: cpal::Stream,
    consumer: HeapCons<f32>,
    is_recording: Arc<AtomicBool>,
    device_sample_rate: u32,
    device_channels: u16,
}

impl AudioCapture {
    /// Open the default input device and build a paused capture stream.
    ///
    /// # Errors
    /// Returns an error if no input device is available or stream creation
    /// fails. Fatal at startup: without a microphone there is nothing to do.
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .context("no input device available")?;

        let device_name = device.name().unwrap_or_else(|_| "unknown".to_owned());
        let supported_config = device
            .default_input_config()
            .context("failed to get default input config")?;

        let device_sample_rate = supported_config.sample_rate().0;
        let device_channels = supported_config.channels();
        info!(
            device = %device_name,
            rate = device_sample_rate,
            channels = device_channels,
            "audio input device ready"
        );

        let capacity =
            device_sample_rate as usize * device_channels as usize * RING_CAPACITY_SECS;
        let (mut producer, consumer) = HeapRb::<f32>::new(capacity).split();

        let is_recording = Arc::new(AtomicBool::new(false));
        let recording_flag = Arc::clone(&is_recording);

        let stream = device
            .build_input_stream(
                &supported_config.into(),
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if recording_flag.load(Ordering::Relaxed) {
                        let pushed = producer.push_slice(data);
                        if pushed < data.len() {
                            warn!("ring buffer full, dropped {} samples", data.len() - pushed);
                        }
                    }
                },
                move |err| {
                    warn!("audio stream error: {}", err);
                },
                None,
            )
            .context("failed to build input stream")?;

        // Validate the stream once, then leave the mic inactive until a
        // recording starts.
        stream.play().context("failed to start audio stream")?;
        stream.pause().context("failed to pause audio stream")?;
        debug!("audio stream initialized (paused)");

        Ok(Self {
            stream,
            consumer,
            is_recording,
            device_sample_rate,
            device_channels,
        })
    }

    /// Native sample rate of the input device.
    #[must_use]
    pub const fn device_sample_rate(&self) -> u32 {
        self.device_sample_rate
    }

    /// Channel count of the input device.
    #[must_use]
    pub const fn device_channels(&self) -> u16 {
        self.device_channels
    }

    /// Begin capturing: discard stale samples, raise the flag, resume the
    /// stream.
    ///
    /// # Errors
    /// Returns an error if the stream cannot be resumed.
    pub fn start(&mut self) -> Result<()> {
        self.consumer.clear();
        // Flag first so no callback slice is lost while resuming
        self.is_recording.store(true, Ordering::Relaxed);
        self.stream.play().context("failed to resume audio stream")?;
        debug!("capture started");
        Ok(())
    }

    /// Stop capturing and pause the stream. Remaining samples stay in the
    /// ring buffer until drained.
    ///
    /// # Errors
    /// Returns an error if the stream cannot be paused.
    pub fn stop(&mut self) -> Result<()> {
        self.is_recording.store(false, Ordering::Relaxed);
        self.stream.pause().context("failed to pause audio stream")?;
        debug!("capture stopped");
        Ok(())
    }

    /// Append all currently buffered device-rate samples to `out`.
    pub fn drain_into(&mut self, out: &mut Vec<f32>) {
        out.reserve(self.consumer.occupied_len());
        while let Some(sample) = self.consumer.try_pop() {
            out.push(sample);
        }
    }
}

/// Convert interleaved device-rate samples to 16 kHz mono via channel
/// averaging and linear-interpolation resampling.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn to_16khz_mono(samples: &[f32], sample_rate: u32, channels: u16) -> Vec<f32> {
    let mono: Vec<f32> = if channels <= 1 {
        samples.to_vec()
    } else {
        let channels_f64 = f64::from(channels);
        samples
            .chunks(channels as usize)
            .map(|frame| {
                let sum: f64 = frame.iter().map(|&s| f64::from(s)).sum();
                (sum / channels_f64) as f32
            })
            .collect()
    };

    if sample_rate == TARGET_SAMPLE_RATE || mono.is_empty() {
        return mono;
    }

    let ratio = f64::from(sample_rate) / f64::from(TARGET_SAMPLE_RATE);
    let output_len = ((mono.len() as f64) / ratio).ceil() as usize;

    let mut resampled = Vec::with_capacity(output_len);
    for i in 0..output_len {
        let src_idx = (i as f64) * ratio;
        let floor = (src_idx.floor() as usize).min(mono.len() - 1);
        let ceil = (floor + 1).min(mono.len() - 1);
        let fract = src_idx - src_idx.floor();

        let s1 = f64::from(mono[floor]);
        let s2 = f64::from(mono[ceil]);
        resampled.push(s1.mul_add(1.0 - fract, s2 * fract) as f32);
    }
    resampled
}
