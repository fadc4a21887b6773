/*
 * @file lib.rs
 * @brief Guidi library root
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

//! Guidi - a voice-capable tour guide assistant.
//!
//! This library provides a conversational travel guide that uses:
//! - an OpenAI-compatible chat endpoint (Gemini by default) for answers,
//!   optionally with a photo of the place being discussed
//! - a Whisper transcription endpoint for spoken questions
//! - a local speech command (`say` or `espeak`) for spoken replies
//!
//! # Example
//! ```no_run
//! use anyhow::Result;
//! use guidi::session;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     dotenv::dotenv().ok();
//!     session::run_guide().await
//! }
//! ```

pub mod agent;
pub mod audio;
pub mod chat;
pub mod config;
pub mod error;
pub mod image;
pub mod message;
pub mod session;
pub mod speech;
pub mod terminal;
pub mod voice;

pub use agent::{Agent, Persona};
pub use chat::{ChatClient, OpenAiCompatClient};
pub use error::ChatError;
pub use image::ImageData;
pub use message::{build_messages, ContentPart, Message, MessageContent, Role};
pub use voice::VoiceIo;
