/*
 * @file session.rs
 * @brief Guidi session loop
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

//! Interactive session orchestration.
//!
//! A session walks through configuration (voice on/off, optional starting
//! image) and then a turn loop that collects an utterance, dispatches it to
//! the agent, and displays or speaks the reply until the operator leaves.

use std::future::Future;
use std::ops::ControlFlow;
use std::path::Path;
use std::pin::Pin;
use std::time::{Duration, Instant};

use anyhow::Result;

use crate::agent::Agent;
use crate::chat::{ChatClient, OpenAiCompatClient};
use crate::config::{load_config, AppConfig};
use crate::image::ImageData;
use crate::message::Message;
use crate::terminal::{ConsoleTerminal, Input, Terminal, Tone};
use crate::voice::{SystemVoice, VoiceIo};

const BANNER: &str = "Guide Agent - FAST MODE";
const VOICE_PROMPT: &str = "Use voice input/output? (y/n): ";
const IMAGE_CHOICE_PROMPT: &str = "Start with image upload? (y/n): ";
const IMAGE_PATH_PROMPT: &str = "Image path (or press Enter to skip): ";
const TURN_PROMPT: &str = "You: ";
const EXIT_HINT: &str = "Type 'exit' or 'quit' to end.";

/// Pause after each answered turn before listening again.
const TURN_PAUSE: Duration = Duration::from_millis(300);

/// Runs the tour guide on the real terminal, microphone and chat service.
///
/// # Details
/// Loads configuration, builds every adapter once and hands them to a
/// [`Session`].
///
/// # Errors
/// Returns an error only for startup failures such as an unusable terminal.
pub async fn run_guide() -> Result<()> {
    let config = load_config();
    let client = OpenAiCompatClient::from_config(&config);
    let voice = SystemVoice::from_config(&config);
    let agent = Agent::guide(config.model.clone());
    let mut terminal = ConsoleTerminal::new()?;
    tracing::debug!(
        agent = %agent.persona().name,
        model = agent.model(),
        "guide ready"
    );

    let summary = Session::new(&agent, &client, &voice, &mut terminal)
        .with_options(SessionOptions::from_config(&config))
        .run()
        .await?;
    tracing::info!(turns = summary.turns, end = ?summary.end, "session finished");
    Ok(())
}

/// Knobs that shape the turn loop.
#[derive(Clone, Debug)]
pub struct SessionOptions {
    pub listen_timeout: Duration,
    /// Feed earlier turns back to the agent as history.
    pub remember_history: bool,
    pub turn_pause: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl SessionOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            listen_timeout: config.listen_timeout(),
            remember_history: config.remember_history,
            turn_pause: TURN_PAUSE,
        }
    }
}

/// Choices captured during configuration; fixed for the rest of the session.
#[derive(Clone, Debug, Default)]
pub struct SessionSettings {
    pub use_voice: bool,
    pub initial_image: Option<ImageData>,
}

/// Why the session stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EndReason {
    /// The operator typed or said `exit` or `quit`.
    Exit,
    Interrupted,
    EndOfInput,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionSummary {
    /// Turns that produced a reply.
    pub turns: usize,
    pub end: EndReason,
}

/// Resolves once the operator asks to stop.
pub type Interrupt = Pin<Box<dyn Future<Output = ()> + Send>>;

/// One interactive run of the assistant.
pub struct Session<'a> {
    agent: &'a Agent,
    client: &'a dyn ChatClient,
    voice: &'a dyn VoiceIo,
    terminal: &'a mut dyn Terminal,
    options: SessionOptions,
    interrupt: Box<dyn Fn() -> Interrupt + 'a>,
}

impl<'a> Session<'a> {
    pub fn new(
        agent: &'a Agent,
        client: &'a dyn ChatClient,
        voice: &'a dyn VoiceIo,
        terminal: &'a mut dyn Terminal,
    ) -> Self {
        Self {
            agent,
            client,
            voice,
            terminal,
            options: SessionOptions::default(),
            interrupt: Box::new(ctrl_c_interrupt),
        }
    }

    pub fn with_options(mut self, options: SessionOptions) -> Self {
        self.options = options;
        self
    }

    /// Replaces Ctrl-C as the signal that stops listening or a pending
    /// request. Prompts still stop on the terminal's own interrupt.
    pub fn with_interrupt<F>(mut self, interrupt: F) -> Self
    where
        F: Fn() -> Interrupt + 'a,
    {
        self.interrupt = Box::new(interrupt);
        self
    }

    /// Configures the session and runs turns until the operator leaves.
    ///
    /// # Returns
    /// A [`SessionSummary`] describing how many turns were answered and why
    /// the session ended.
    ///
    /// # Errors
    /// Surfaces failures that happen before the turn loop starts (terminal
    /// errors, an unreadable starting image). Failures inside a turn are
    /// reported and the loop continues.
    pub async fn run(mut self) -> Result<SessionSummary> {
        self.terminal.show(Tone::Banner, BANNER);
        let settings = match self.configure().await? {
            ControlFlow::Continue(settings) => settings,
            ControlFlow::Break(end) => return Ok(self.finish(end, 0)),
        };
        self.turn_loop(&settings).await
    }

    async fn configure(&mut self) -> Result<ControlFlow<EndReason, SessionSettings>> {
        let use_voice = match self.read_input(VOICE_PROMPT)? {
            ControlFlow::Continue(answer) => is_yes(&answer),
            ControlFlow::Break(end) => return Ok(ControlFlow::Break(end)),
        };
        let wants_image = match self.read_input(IMAGE_CHOICE_PROMPT)? {
            ControlFlow::Continue(answer) => is_yes(&answer),
            ControlFlow::Break(end) => return Ok(ControlFlow::Break(end)),
        };
        self.terminal.show(Tone::Info, EXIT_HINT);

        let initial_image = if wants_image {
            match self.initial_image(use_voice).await? {
                ControlFlow::Continue(image) => image,
                ControlFlow::Break(end) => return Ok(ControlFlow::Break(end)),
            }
        } else {
            None
        };
        Ok(ControlFlow::Continue(SessionSettings {
            use_voice,
            initial_image,
        }))
    }

    /// Asks for a starting image by voice or typed path.
    ///
    /// A path that does not exist leaves the session text-only. A path that
    /// exists but cannot be read is an error.
    async fn initial_image(
        &mut self,
        use_voice: bool,
    ) -> Result<ControlFlow<EndReason, Option<ImageData>>> {
        let candidate = if use_voice {
            self.terminal
                .show(Tone::Info, "Say the image filename (e.g., taj_mahal.jpg)");
            match self.listen().await {
                ControlFlow::Continue(heard) => heard,
                ControlFlow::Break(end) => return Ok(ControlFlow::Break(end)),
            }
        } else {
            match self.read_input(IMAGE_PATH_PROMPT)? {
                ControlFlow::Continue(path) => Some(path),
                ControlFlow::Break(end) => return Ok(ControlFlow::Break(end)),
            }
        };

        let requested = candidate.map(|path| path.trim().to_string());
        match requested {
            Some(path) if !path.is_empty() && Path::new(&path).exists() => {
                let image = ImageData::load(&path)?;
                tracing::info!(
                    path = %path,
                    mime = image.mime_type(),
                    bytes = image.bytes().len(),
                    "starting image loaded"
                );
                self.terminal.show(Tone::Info, &format!("Image loaded: {path}"));
                Ok(ControlFlow::Continue(Some(image)))
            }
            Some(path) if path.is_empty() && !use_voice => Ok(ControlFlow::Continue(None)),
            _ => {
                self.terminal.show(Tone::Warn, "Image not found");
                Ok(ControlFlow::Continue(None))
            }
        }
    }

    async fn turn_loop(&mut self, settings: &SessionSettings) -> Result<SessionSummary> {
        let mut history: Vec<Message> = Vec::new();
        let mut turns = 0;

        loop {
            let utterance = match self.next_utterance(settings.use_voice).await {
                Ok(ControlFlow::Continue(utterance)) => utterance,
                Ok(ControlFlow::Break(end)) => return Ok(self.finish(end, turns)),
                Err(err) => {
                    tracing::warn!(error = %err, "failed to read input");
                    self.terminal.show(Tone::Error, &format!("Error: {err:#}"));
                    continue;
                }
            };
            let user_input = utterance.as_deref().map(str::trim).unwrap_or_default();
            if user_input.is_empty() {
                self.terminal.show(Tone::Warn, "Please try again.");
                continue;
            }
            if is_exit(user_input) {
                return Ok(self.finish(EndReason::Exit, turns));
            }

            self.terminal.progress("Processing...");
            let started = Instant::now();
            let agent = self.agent;
            let client = self.client;
            let dispatch = async {
                match &settings.initial_image {
                    Some(image) => agent.run_with_image(client, user_input, image, &history).await,
                    None => agent.run(client, user_input, &history).await,
                }
            };
            let interrupted = (self.interrupt)();
            let outcome = tokio::select! {
                outcome = dispatch => outcome,
                _ = interrupted => {
                    return Ok(self.finish(EndReason::Interrupted, turns));
                }
            };

            match outcome {
                Ok(reply) => {
                    let elapsed = started.elapsed();
                    self.terminal.show(Tone::Guide, &reply);
                    self.terminal
                        .show(Tone::Info, &format!("({:.1}s)", elapsed.as_secs_f64()));
                    turns += 1;
                    if self.options.remember_history {
                        history.push(Message::user(user_input));
                        history.push(Message::assistant(reply.as_str()));
                    }
                    if settings.use_voice {
                        if let Err(err) = self.voice.speak(Some(&reply)) {
                            self.terminal.show(Tone::Error, &format!("Error: {err:#}"));
                        }
                    }
                    if !self.options.turn_pause.is_zero() {
                        tokio::time::sleep(self.options.turn_pause).await;
                    }
                }
                Err(err) => {
                    tracing::warn!(error = %err, "turn failed");
                    self.terminal.show(Tone::Error, &format!("Error: {err}"));
                }
            }
        }
    }

    /// Reads the next utterance by voice or keyboard.
    ///
    /// `Continue(None)` means nothing usable was heard.
    async fn next_utterance(
        &mut self,
        use_voice: bool,
    ) -> Result<ControlFlow<EndReason, Option<String>>> {
        if use_voice {
            return Ok(self.listen().await);
        }
        Ok(match self.read_input(TURN_PROMPT)? {
            ControlFlow::Continue(line) => ControlFlow::Continue(Some(line)),
            ControlFlow::Break(end) => ControlFlow::Break(end),
        })
    }

    async fn listen(&mut self) -> ControlFlow<EndReason, Option<String>> {
        self.terminal.progress("Listening...");
        let voice = self.voice;
        let interrupted = (self.interrupt)();
        let heard = tokio::select! {
            heard = voice.listen(self.options.listen_timeout) => heard,
            _ = interrupted => return ControlFlow::Break(EndReason::Interrupted),
        };
        if let Some(text) = &heard {
            self.terminal.show(Tone::Heard, text);
        }
        ControlFlow::Continue(heard)
    }

    fn read_input(&mut self, prompt: &str) -> Result<ControlFlow<EndReason, String>> {
        Ok(match self.terminal.read_line(prompt)? {
            Input::Line(line) => ControlFlow::Continue(line),
            Input::Interrupted => ControlFlow::Break(EndReason::Interrupted),
            Input::Eof => ControlFlow::Break(EndReason::EndOfInput),
        })
    }

    fn finish(&mut self, end: EndReason, turns: usize) -> SessionSummary {
        let farewell = match end {
            EndReason::Interrupted => "Interrupted by user",
            EndReason::Exit | EndReason::EndOfInput => "Session ended!",
        };
        self.terminal.show(Tone::Info, farewell);
        SessionSummary { turns, end }
    }
}

fn ctrl_c_interrupt() -> Interrupt {
    Box::pin(operator_interrupt())
}

/// Resolves when the operator presses Ctrl-C; never resolves if the signal
/// handler cannot be installed.
async fn operator_interrupt() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

fn is_yes(answer: &str) -> bool {
    answer.trim().eq_ignore_ascii_case("y")
}

fn is_exit(input: &str) -> bool {
    input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit")
}
