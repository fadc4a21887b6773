/*
 * @file audio.rs
 * @brief Audio capture and WAV helpers for Guidi
 * @author Kevin Thomas
 * @date 2025
 *
 * MIT License
 *
 * Copyright (c) 2025 Kevin Thomas
 *
 * Permission is hereby granted, free of charge, to any person obtaining a copy
 * of this software and associated documentation files (the "Software"), to deal
 * in the Software without restriction, including without limitation the rights
 * to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
 * copies of the Software, and to permit persons to whom the Software is
 * furnished to do so, subject to the following conditions:
 *
 * The above copyright notice and this permission notice shall be included in all
 * copies or substantial portions of the Software.
 *
 * THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
 * IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
 * FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
 * AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
 * LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
 * OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
 * SOFTWARE.
 */

//! Audio capture, speech endpointing and WAV encoding.
//!
//! This module owns the microphone (through CPAL) and decides when a spoken
//! phrase starts and ends. Everything here is blocking; callers run it off
//! the async executor.

use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig, StreamError};
use hound::{WavSpec, WavWriter};

/// Sample rate for audio recording (16kHz).
///
/// Value is expressed in Hertz and matches Whisper's preferred input rate.
pub const SAMPLE_RATE: u32 = 16000;

/// Number of audio channels (mono).
const CHANNELS: u16 = 1;

/// Bits per sample for WAV encoding.
const BITS_PER_SAMPLE: u16 = 16;

/// Minimum RMS amplitude considered speech, regardless of calibration.
///
/// Values much above ~300 miss normal speaking levels on some microphones.
pub const SILENCE_RMS_THRESHOLD: f32 = 150.0;

/// Multiplier applied to the calibrated ambient level.
const AMBIENT_RATIO: f32 = 1.5;

/// Length of the fixed ambient-noise calibration window.
pub const CALIBRATION: Duration = Duration::from_secs(1);

/// Analysis frame of 100 ms.
const FRAME_SAMPLES: usize = (SAMPLE_RATE / 10) as usize;

/// Trailing silence that ends a phrase.
const PAUSE: Duration = Duration::from_millis(800);

/// Audio kept from before speech onset so the first syllable is not clipped.
const PRE_ROLL: Duration = Duration::from_millis(500);

/// Hard cap on a single phrase.
const MAX_PHRASE: Duration = Duration::from_secs(30);

/// How often the capture loop drains the device buffer.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

type SharedSamples = Arc<Mutex<Vec<i16>>>;

/// An open microphone stream.
///
/// # Details
/// Samples accumulate in a shared buffer while the guard is alive. Dropping
/// the guard drops the CPAL stream, which stops capture and releases the
/// device on every exit path, including early returns and errors.
pub struct Microphone {
    _stream: Stream,
    samples: SharedSamples,
}

impl Microphone {
    /// Opens the default input device and starts capturing.
    ///
    /// # Errors
    /// Returns an error when no microphone is available or the stream cannot
    /// be built or started.
    pub fn open() -> Result<Self> {
        let device = default_input_device()?;
        let config = input_config();
        let samples = shared_samples();
        let stream = build_input_stream(&device, &config, samples.clone())?;
        stream.play().context("Failed to start input stream")?;
        Ok(Self {
            _stream: stream,
            samples,
        })
    }

    /// Removes and returns everything captured since the last drain.
    pub fn drain(&self) -> Vec<i16> {
        match self.samples.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }

    /// Blocks for `duration` and returns what was captured meanwhile.
    pub fn capture_for(&self, duration: Duration) -> Vec<i16> {
        std::thread::sleep(duration);
        self.drain()
    }
}

/// Records one spoken phrase from the default microphone.
///
/// # Details
/// Captures [`CALIBRATION`] of ambient noise to set the speech threshold,
/// then waits up to `timeout` for speech to begin and records until a
/// trailing pause. The microphone is released before this returns.
///
/// # Returns
/// * `Ok(Some(samples))` - A complete phrase.
/// * `Ok(None)` - Nobody spoke before `timeout` elapsed.
///
/// # Errors
/// Returns an error if the microphone cannot be opened.
pub fn record_phrase(timeout: Duration) -> Result<Option<Vec<i16>>> {
    let mic = Microphone::open()?;
    let ambient = mic.capture_for(CALIBRATION);
    let threshold = threshold_for_ambient(rms(&ambient));
    tracing::debug!(threshold, "calibrated for ambient noise");

    let mut endpointer = Endpointer::new(threshold, timeout);
    let mut pending = Vec::new();
    let deadline = Instant::now() + timeout + MAX_PHRASE + PAUSE;
    while Instant::now() < deadline {
        pending.extend(mic.capture_for(POLL_INTERVAL));
        while pending.len() >= FRAME_SAMPLES {
            let frame: Vec<i16> = pending.drain(..FRAME_SAMPLES).collect();
            match endpointer.push(&frame) {
                Endpoint::Pending => {}
                Endpoint::Complete(phrase) => return Ok(Some(phrase)),
                Endpoint::TimedOut => return Ok(None),
            }
        }
    }
    Ok(endpointer.finish())
}

/// Speech threshold derived from a calibrated ambient RMS level.
pub fn threshold_for_ambient(ambient_rms: f32) -> f32 {
    (ambient_rms * AMBIENT_RATIO).max(SILENCE_RMS_THRESHOLD)
}

/// Root mean square amplitude of 16-bit PCM samples.
pub fn rms(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let energy = samples
        .iter()
        .map(|sample| (*sample as f32).powi(2))
        .sum::<f32>()
        / samples.len() as f32;
    energy.sqrt()
}

/// Outcome of feeding one frame to an [`Endpointer`].
#[derive(Debug, PartialEq, Eq)]
pub enum Endpoint {
    Pending,
    Complete(Vec<i16>),
    TimedOut,
}

/// Energy-based phrase detector over fixed-size frames.
///
/// # Details
/// Before onset, frames are kept in a short pre-roll and counted against
/// the start timeout. The first frame at or above the threshold starts the
/// phrase; it ends after [`PAUSE`] of consecutive quiet frames or at
/// [`MAX_PHRASE`].
pub struct Endpointer {
    threshold: f32,
    timeout_samples: usize,
    pause_samples: usize,
    max_phrase_samples: usize,
    pre_roll_frames: usize,
    waited: usize,
    silence_run: usize,
    pre_roll: VecDeque<Vec<i16>>,
    phrase: Vec<i16>,
    started: bool,
}

impl Endpointer {
    pub fn new(threshold: f32, timeout: Duration) -> Self {
        Self {
            threshold,
            timeout_samples: samples_for(timeout),
            pause_samples: samples_for(PAUSE),
            max_phrase_samples: samples_for(MAX_PHRASE),
            pre_roll_frames: (samples_for(PRE_ROLL) / FRAME_SAMPLES).max(1),
            waited: 0,
            silence_run: 0,
            pre_roll: VecDeque::new(),
            phrase: Vec::new(),
            started: false,
        }
    }

    /// Feeds one frame of samples.
    pub fn push(&mut self, frame: &[i16]) -> Endpoint {
        let loud = rms(frame) >= self.threshold;
        if !self.started {
            self.pre_roll.push_back(frame.to_vec());
            while self.pre_roll.len() > self.pre_roll_frames {
                self.pre_roll.pop_front();
            }
            if loud {
                self.started = true;
                self.phrase = self.pre_roll.drain(..).flatten().collect();
                return Endpoint::Pending;
            }
            self.waited += frame.len();
            if self.waited >= self.timeout_samples {
                return Endpoint::TimedOut;
            }
            return Endpoint::Pending;
        }

        self.phrase.extend_from_slice(frame);
        if loud {
            self.silence_run = 0;
        } else {
            self.silence_run += frame.len();
        }
        if self.silence_run >= self.pause_samples || self.phrase.len() >= self.max_phrase_samples {
            return Endpoint::Complete(std::mem::take(&mut self.phrase));
        }
        Endpoint::Pending
    }

    /// Returns whatever phrase was in progress when input stopped.
    pub fn finish(self) -> Option<Vec<i16>> {
        (self.started && !self.phrase.is_empty()).then_some(self.phrase)
    }
}

fn samples_for(duration: Duration) -> usize {
    (duration.as_secs_f64() * SAMPLE_RATE as f64) as usize
}

/// Encodes samples as an in-memory 16 kHz mono WAV file.
///
/// # Errors
/// Returns an error if the WAV writer fails.
pub fn encode_wav(samples: &[i16]) -> Result<Vec<u8>> {
    let spec = WavSpec {
        channels: CHANNELS,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: BITS_PER_SAMPLE,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec).context("Failed to start WAV")?;
        for &sample in samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}

/// Locates the system default input device.
///
/// # Errors
/// Returns an error when the user has no available microphone.
fn default_input_device() -> Result<Device> {
    cpal::default_host()
        .default_input_device()
        .ok_or_else(|| anyhow!("No input device"))
}

/// Mono 16 kHz capture with the default buffer size.
fn input_config() -> StreamConfig {
    StreamConfig {
        channels: CHANNELS,
        sample_rate: cpal::SampleRate(SAMPLE_RATE),
        buffer_size: cpal::BufferSize::Default,
    }
}

fn shared_samples() -> SharedSamples {
    Arc::new(Mutex::new(Vec::new()))
}

fn build_input_stream(
    device: &Device,
    config: &StreamConfig,
    samples: SharedSamples,
) -> Result<Stream> {
    device
        .build_input_stream(
            config,
            move |data: &[f32], _: &_| push_samples(&samples, data),
            log_stream_error,
            None,
        )
        .map_err(|err| anyhow!(err))
}

/// Converts floating-point frames into 16-bit PCM and appends them to the buffer.
fn push_samples(buffer: &SharedSamples, data: &[f32]) {
    if let Ok(mut guard) = buffer.lock() {
        guard.extend(
            data.iter()
                .map(|&sample| (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16),
        );
    }
}

fn log_stream_error(error: StreamError) {
    tracing::warn!(%error, "audio stream error");
}
