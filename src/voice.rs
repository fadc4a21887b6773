/*
 * @file voice.rs
 * @brief Voice input and output for Guidi
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

//! Voice input and output for the session loop.
//!
//! [`VoiceIo`] is what the session sees: `listen` turns speech into text and
//! `speak` reads replies aloud. [`VoiceManager`] implements it from three
//! parts (recorder, transcriber, synthesizer) so each can be swapped out.

use std::env;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use crate::audio;
use crate::config::{AppConfig, TranscriptionConfig};
use crate::speech::{CommandSynthesizer, Synthesizer};

/// Separator used to break replies into speakable chunks.
const CHUNK_SEPARATOR: &str = ". ";

/// Speech in, speech out.
#[async_trait]
pub trait VoiceIo: Send + Sync {
    /// Records and transcribes one utterance.
    ///
    /// Every failure (no device, timeout, silence, recognition error) is
    /// collapsed into `None`. Nothing is printed; the caller announces the
    /// capture and echoes what was heard.
    async fn listen(&self, timeout: Duration) -> Option<String>;

    /// Reads `text` aloud; `None` or empty text does nothing.
    fn speak(&self, text: Option<&str>) -> Result<()>;
}

/// Captures one phrase of 16 kHz mono PCM. Runs on a blocking thread.
pub trait PhraseRecorder: Clone + Send + Sync + 'static {
    fn record(&self, timeout: Duration) -> Result<Option<Vec<i16>>>;
}

/// Converts a WAV recording into text.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, wav: Vec<u8>) -> Result<String>;
}

/// Records from the default system microphone.
#[derive(Clone, Copy, Debug, Default)]
pub struct MicrophoneRecorder;

impl PhraseRecorder for MicrophoneRecorder {
    fn record(&self, timeout: Duration) -> Result<Option<Vec<i16>>> {
        audio::record_phrase(timeout)
    }
}

/// Client for an OpenAI-compatible `/audio/transcriptions` endpoint.
#[derive(Clone)]
pub struct RemoteTranscriber {
    http: reqwest::Client,
    config: TranscriptionConfig,
}

#[derive(Deserialize)]
struct TranscriptionResponse {
    text: String,
}

impl RemoteTranscriber {
    pub fn new(config: TranscriptionConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/audio/transcriptions",
            self.config.api_base.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl Transcriber for RemoteTranscriber {
    async fn transcribe(&self, wav: Vec<u8>) -> Result<String> {
        let api_key = env::var(&self.config.api_key_env)
            .with_context(|| format!("{} is not set", self.config.api_key_env))?;
        let file = Part::bytes(wav)
            .file_name("speech.wav")
            .mime_str("audio/wav")?;
        let mut form = Form::new()
            .part("file", file)
            .text("model", self.config.model.clone())
            .text("response_format", "json");
        if let Some(language) = &self.config.language {
            form = form.text("language", language.clone());
        }

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(api_key)
            .multipart(form)
            .send()
            .await
            .context("Failed to reach transcription service")?
            .error_for_status()
            .context("Transcription service rejected the request")?;
        let parsed: TranscriptionResponse = response
            .json()
            .await
            .context("Failed to parse transcription response")?;
        Ok(parsed.text.trim().to_string())
    }
}

/// Voice front end built from a recorder, a transcriber and a synthesizer.
pub struct VoiceManager<R, T, S> {
    recorder: R,
    transcriber: T,
    synthesizer: S,
}

/// The production voice stack: microphone, remote Whisper, local TTS command.
pub type SystemVoice = VoiceManager<MicrophoneRecorder, RemoteTranscriber, CommandSynthesizer>;

impl SystemVoice {
    pub fn from_config(config: &AppConfig) -> Self {
        let synthesizer = match &config.tts_command {
            Some(program) => CommandSynthesizer::new(program.clone(), config.speech_rate),
            None => CommandSynthesizer::platform_default(config.speech_rate),
        };
        tracing::debug!(
            tts = synthesizer.program(),
            stt = %config.transcription.model,
            "voice stack ready"
        );
        VoiceManager::new(
            MicrophoneRecorder,
            RemoteTranscriber::new(config.transcription.clone()),
            synthesizer,
        )
    }
}

impl<R, T, S> VoiceManager<R, T, S> {
    pub fn new(recorder: R, transcriber: T, synthesizer: S) -> Self {
        Self {
            recorder,
            transcriber,
            synthesizer,
        }
    }
}

#[async_trait]
impl<R, T, S> VoiceIo for VoiceManager<R, T, S>
where
    R: PhraseRecorder,
    T: Transcriber,
    S: Synthesizer,
{
    async fn listen(&self, timeout: Duration) -> Option<String> {
        let recorder = self.recorder.clone();
        let recorded = tokio::task::spawn_blocking(move || recorder.record(timeout)).await;
        let samples = match recorded {
            Ok(Ok(Some(samples))) => samples,
            Ok(Ok(None)) => {
                tracing::debug!("no speech before timeout");
                return None;
            }
            Ok(Err(err)) => {
                tracing::warn!(error = %err, "microphone error");
                return None;
            }
            Err(err) => {
                tracing::warn!(error = %err, "recording task failed");
                return None;
            }
        };

        let wav = match audio::encode_wav(&samples) {
            Ok(wav) => wav,
            Err(err) => {
                tracing::warn!(error = %err, "failed to encode recording");
                return None;
            }
        };

        match self.transcriber.transcribe(wav).await {
            Ok(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
            Ok(_) => {
                tracing::debug!("transcription was empty");
                None
            }
            Err(err) => {
                tracing::warn!(error = %err, "speech recognition failed");
                None
            }
        }
    }

    fn speak(&self, text: Option<&str>) -> Result<()> {
        let Some(text) = text.filter(|text| !text.is_empty()) else {
            return Ok(());
        };
        for chunk in speech_chunks(text) {
            self.synthesizer.say(chunk)?;
        }
        Ok(())
    }
}

/// Splits text on the literal `". "` for chunked playback.
///
/// Chunks without speakable content are skipped.
pub fn speech_chunks(text: &str) -> impl Iterator<Item = &str> {
    text.split(CHUNK_SEPARATOR)
        .filter(|chunk| !chunk.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Clone)]
    struct CannedRecorder(Option<Vec<i16>>);

    impl PhraseRecorder for CannedRecorder {
        fn record(&self, _timeout: Duration) -> Result<Option<Vec<i16>>> {
            Ok(self.0.clone())
        }
    }

    #[derive(Clone)]
    struct BrokenRecorder;

    impl PhraseRecorder for BrokenRecorder {
        fn record(&self, _timeout: Duration) -> Result<Option<Vec<i16>>> {
            anyhow::bail!("No input device")
        }
    }

    struct CannedTranscriber(Result<String, String>);

    #[async_trait]
    impl Transcriber for CannedTranscriber {
        async fn transcribe(&self, wav: Vec<u8>) -> Result<String> {
            assert_eq!(&wav[..4], b"RIFF");
            self.0.clone().map_err(anyhow::Error::msg)
        }
    }

    #[derive(Default)]
    struct RecordingSynth {
        spoken: Mutex<Vec<String>>,
    }

    impl Synthesizer for RecordingSynth {
        fn say(&self, text: &str) -> Result<()> {
            self.spoken.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    fn speaker() -> VoiceManager<CannedRecorder, CannedTranscriber, RecordingSynth> {
        VoiceManager::new(
            CannedRecorder(None),
            CannedTranscriber(Ok(String::new())),
            RecordingSynth::default(),
        )
    }

    fn spoken<R, T>(voice: &VoiceManager<R, T, RecordingSynth>) -> Vec<String> {
        voice.synthesizer.spoken.lock().unwrap().clone()
    }

    #[test]
    fn speak_nothing_makes_no_calls() {
        let voice = speaker();
        voice.speak(None).unwrap();
        voice.speak(Some("")).unwrap();
        assert!(spoken(&voice).is_empty());
    }

    #[test]
    fn speak_splits_on_period_space() {
        let voice = speaker();
        voice.speak(Some("A. B. C.")).unwrap();
        assert_eq!(spoken(&voice), vec!["A", "B", "C."]);
    }

    #[test]
    fn speak_keeps_decimals_and_abbreviations_lexical() {
        let voice = speaker();
        voice.speak(Some("It is 3.5 km from St. Mark's.")).unwrap();
        assert_eq!(spoken(&voice), vec!["It is 3.5 km from St", "Mark's."]);
    }

    #[test]
    fn speak_stops_at_first_failure() {
        struct FailingSynth;
        impl Synthesizer for FailingSynth {
            fn say(&self, _text: &str) -> Result<()> {
                anyhow::bail!("tts unavailable")
            }
        }
        let voice = VoiceManager::new(
            CannedRecorder(None),
            CannedTranscriber(Ok(String::new())),
            FailingSynth,
        );
        assert!(voice.speak(Some("One. Two.")).is_err());
    }

    #[tokio::test]
    async fn listen_returns_trimmed_transcript() {
        let voice = VoiceManager::new(
            CannedRecorder(Some(vec![1000; 1600])),
            CannedTranscriber(Ok("  taj_mahal.jpg \n".into())),
            RecordingSynth::default(),
        );
        assert_eq!(
            voice.listen(Duration::from_secs(4)).await.as_deref(),
            Some("taj_mahal.jpg")
        );
    }

    #[tokio::test]
    async fn listen_absorbs_every_failure() {
        let timed_out = VoiceManager::new(
            CannedRecorder(None),
            CannedTranscriber(Ok("unused".into())),
            RecordingSynth::default(),
        );
        assert_eq!(timed_out.listen(Duration::from_secs(1)).await, None);

        let no_device = VoiceManager::new(
            BrokenRecorder,
            CannedTranscriber(Ok("unused".into())),
            RecordingSynth::default(),
        );
        assert_eq!(no_device.listen(Duration::from_secs(1)).await, None);

        let service_error = VoiceManager::new(
            CannedRecorder(Some(vec![1000; 1600])),
            CannedTranscriber(Err("503".into())),
            RecordingSynth::default(),
        );
        assert_eq!(service_error.listen(Duration::from_secs(1)).await, None);

        let blank = VoiceManager::new(
            CannedRecorder(Some(vec![1000; 1600])),
            CannedTranscriber(Ok("   ".into())),
            RecordingSynth::default(),
        );
        assert_eq!(blank.listen(Duration::from_secs(1)).await, None);
    }

    #[test]
    fn transcription_endpoint_joins_base() {
        let transcriber = RemoteTranscriber::new(TranscriptionConfig::default());
        assert_eq!(
            transcriber.endpoint(),
            "https://api.groq.com/openai/v1/audio/transcriptions"
        );
    }
}
