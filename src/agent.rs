/*
 * @file agent.rs
 * @brief Tour guide persona and agent
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

//! The tour guide persona and the agent that dispatches turns for it.

use crate::chat::ChatClient;
use crate::error::ChatError;
use crate::image::ImageData;
use crate::message::{build_messages, Message};

/// System instructions for the built-in tour guide.
///
/// Topic restriction lives here only; nothing in code enforces it.
pub const GUIDE_SYSTEM_PROMPT: &str = "You are a professional Tour Guide AI.

Tasks:
- Explain history of the place from the image
- Cultural importance
- Architecture
- Answer follow-up questions accurately
- Provide interesting facts and anecdotes

Tone:
- Friendly
- Knowledgeable
- Like a real tour guide
- Engaging and informative

Focus ONLY on:
- Travel places
- Historical sites
- Cultural insights
- Architecture and landmarks

Note:
- If the user asks about anything else, say: sorry, I can only help with guiding.

DO NOT:
- Provide travel booking information
- Give pricing or logistics details
- Discuss non-travel topics
";

pub const GUIDE_NAME: &str = "GuideAgent";

/// Immutable name and system prompt of an assistant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Persona {
    pub name: String,
    pub system_prompt: String,
}

impl Persona {
    pub fn new(name: impl Into<String>, system_prompt: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            system_prompt: system_prompt.into(),
        }
    }

    pub fn guide() -> Self {
        Self::new(GUIDE_NAME, GUIDE_SYSTEM_PROMPT)
    }
}

/// A persona bound to a model identifier.
///
/// # Details
/// The agent holds no per-call state: each `run` assembles a fresh message
/// list and hands it to the supplied client.
#[derive(Clone, Debug)]
pub struct Agent {
    persona: Persona,
    model: String,
}

impl Agent {
    pub fn new(persona: Persona, model: impl Into<String>) -> Self {
        Self {
            persona,
            model: model.into(),
        }
    }

    /// The tour guide agent on `model`.
    pub fn guide(model: impl Into<String>) -> Self {
        Self::new(Persona::guide(), model)
    }

    pub fn persona(&self) -> &Persona {
        &self.persona
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Answers a text-only turn.
    ///
    /// # Parameters
    /// * `client` - Chat adapter used for the request.
    /// * `user_input` - The current utterance.
    /// * `history` - Prior turns, inserted between the system prompt and `user_input`.
    ///
    /// # Errors
    /// Returns whatever the client reports; nothing is caught here.
    pub async fn run(
        &self,
        client: &dyn ChatClient,
        user_input: &str,
        history: &[Message],
    ) -> Result<String, ChatError> {
        self.dispatch(client, user_input, None, history).await
    }

    /// Answers a turn with `image` attached after the text.
    pub async fn run_with_image(
        &self,
        client: &dyn ChatClient,
        user_input: &str,
        image: &ImageData,
        history: &[Message],
    ) -> Result<String, ChatError> {
        self.dispatch(client, user_input, Some(image), history).await
    }

    async fn dispatch(
        &self,
        client: &dyn ChatClient,
        user_input: &str,
        image: Option<&ImageData>,
        history: &[Message],
    ) -> Result<String, ChatError> {
        let messages = build_messages(&self.persona.system_prompt, history, user_input, image);
        tracing::debug!(
            agent = %self.persona.name,
            with_image = image.is_some(),
            history = history.len(),
            "dispatching turn"
        );
        let reply = client.complete(&self.model, &messages).await?;
        Ok(reply.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{ContentPart, MessageContent, Role};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records every request and answers with a fixed reply.
    #[derive(Default)]
    struct RecordingClient {
        requests: Mutex<Vec<(String, Vec<Message>)>>,
    }

    #[async_trait]
    impl ChatClient for RecordingClient {
        async fn complete(&self, model: &str, messages: &[Message]) -> Result<String, ChatError> {
            self.requests
                .lock()
                .unwrap()
                .push((model.to_string(), messages.to_vec()));
            Ok("  Built in 1632.  ".to_string())
        }
    }

    #[tokio::test]
    async fn run_sends_persona_prompt_and_trims_reply() {
        let client = RecordingClient::default();
        let agent = Agent::guide("test-model");

        let reply = agent.run(&client, "When was the Taj Mahal built?", &[]).await.unwrap();

        assert_eq!(reply, "Built in 1632.");
        let requests = client.requests.lock().unwrap();
        let (model, messages) = &requests[0];
        assert_eq!(model, "test-model");
        assert_eq!(messages[0], Message::system(GUIDE_SYSTEM_PROMPT));
        assert_eq!(messages[1], Message::user("When was the Taj Mahal built?"));
    }

    #[tokio::test]
    async fn run_with_image_attaches_image_part() {
        let client = RecordingClient::default();
        let agent = Agent::guide("m");
        let image = ImageData::new(vec![7; 4], "image/jpeg");

        agent.run_with_image(&client, "What is this?", &image, &[]).await.unwrap();

        let requests = client.requests.lock().unwrap();
        let last = requests[0].1.last().unwrap();
        assert_eq!(last.role, Role::User);
        assert_eq!(
            last.content,
            MessageContent::Parts(vec![
                ContentPart::Text("What is this?".into()),
                ContentPart::Image(image.clone()),
            ])
        );
    }

    #[tokio::test]
    async fn repeated_runs_are_independent() {
        let client = RecordingClient::default();
        let agent = Agent::guide("m");

        let first = agent.run(&client, "Tell me about Kyoto", &[]).await.unwrap();
        let second = agent.run(&client, "Tell me about Kyoto", &[]).await.unwrap();

        assert_eq!(first, second);
        let requests = client.requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0], requests[1]);
        assert_eq!(requests[1].1.len(), 2);
    }

    #[tokio::test]
    async fn history_sits_between_system_and_user() {
        let client = RecordingClient::default();
        let agent = Agent::guide("m");
        let history = vec![Message::user("Hi"), Message::assistant("Hello, traveller!")];

        agent.run(&client, "Where next?", &history).await.unwrap();

        let requests = client.requests.lock().unwrap();
        let messages = &requests[0].1;
        assert_eq!(messages.len(), 4);
        assert_eq!(&messages[1..3], history.as_slice());
    }

    #[test]
    fn guide_persona_restricts_topics_in_prompt() {
        let persona = Persona::guide();
        assert_eq!(persona.name, "GuideAgent");
        assert!(persona.system_prompt.contains("DO NOT"));
        assert!(persona.system_prompt.contains("booking"));
    }
}
