/*
 * @file message.rs
 * @brief Chat message model and builder
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

//! Role-tagged chat messages and the builder that assembles a request.
//!
//! Messages serialize directly into the OpenAI chat-completions wire shape,
//! so the chat adapter can post them without a second conversion layer.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::image::ImageData;

/// Author of a chat message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single role-tagged entry in a chat request.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Message {
    pub role: Role,
    pub content: MessageContent,
}

/// Message body: plain text or an ordered list of typed parts.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

/// One typed unit inside a multimodal message.
#[derive(Clone, Debug, PartialEq)]
pub enum ContentPart {
    Text(String),
    Image(ImageData),
}

impl Serialize for ContentPart {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(2))?;
        match self {
            ContentPart::Text(text) => {
                map.serialize_entry("type", "text")?;
                map.serialize_entry("text", text)?;
            }
            ContentPart::Image(image) => {
                map.serialize_entry("type", "image_url")?;
                map.serialize_entry("image_url", &ImageUrl { url: image.data_url() })?;
            }
        }
        map.end()
    }
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

impl Message {
    /// Creates a system message.
    pub fn system(text: impl Into<String>) -> Self {
        Self::text(Role::System, text)
    }

    /// Creates a plain-text user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self::text(Role::User, text)
    }

    /// Creates an assistant message.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::text(Role::Assistant, text)
    }

    /// Creates a user message carrying the text followed by an image part.
    pub fn user_with_image(text: impl Into<String>, image: ImageData) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Parts(vec![
                ContentPart::Text(text.into()),
                ContentPart::Image(image),
            ]),
        }
    }

    fn text(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            content: MessageContent::Text(text.into()),
        }
    }
}

/// Assembles the message sequence for one request.
///
/// # Details
/// The system prompt always comes first, followed by `history` in its
/// original order and finally the current user turn. When `image` is
/// supplied the user turn becomes a two-part message (text, then image).
/// History is copied verbatim; role alternation is not checked.
///
/// # Parameters
/// * `system_prompt` - Persona instructions for the system message.
/// * `history` - Prior turns, excluding any system message.
/// * `user_text` - The current utterance. Empty text is passed through.
/// * `image` - Optional image attached to the current turn.
///
/// # Returns
/// A vector of `history.len() + 2` messages.
pub fn build_messages(
    system_prompt: &str,
    history: &[Message],
    user_text: &str,
    image: Option<&ImageData>,
) -> Vec<Message> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(Message::system(system_prompt));
    messages.extend(history.iter().cloned());
    messages.push(match image {
        Some(image) => Message::user_with_image(user_text, image.clone()),
        None => Message::user(user_text),
    });
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_image() -> ImageData {
        ImageData::new(vec![1, 2, 3], "image/png")
    }

    #[test]
    fn builds_system_history_user_in_order() {
        let history = vec![
            Message::user("Where is Petra?"),
            Message::assistant("In Jordan."),
        ];
        let messages = build_messages("Be a guide.", &history, "Who built it?", None);

        assert_eq!(messages.len(), history.len() + 2);
        assert_eq!(messages[0], Message::system("Be a guide."));
        assert_eq!(&messages[1..3], history.as_slice());
        assert_eq!(messages[3], Message::user("Who built it?"));
    }

    #[test]
    fn empty_history_yields_two_messages() {
        let messages = build_messages("prompt", &[], "hello", None);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].role, Role::User);
    }

    #[test]
    fn malformed_history_passes_through() {
        let history = vec![Message::user("one"), Message::user("two")];
        let messages = build_messages("p", &history, "three", None);
        assert_eq!(messages[1], Message::user("one"));
        assert_eq!(messages[2], Message::user("two"));
    }

    #[test]
    fn empty_user_text_is_not_filtered() {
        let messages = build_messages("p", &[], "", None);
        assert_eq!(messages[1], Message::user(""));
    }

    #[test]
    fn image_turn_has_text_then_image_part() {
        let image = sample_image();
        let messages = build_messages("p", &[], "What is this?", Some(&image));
        let last = messages.last().expect("user turn");

        assert_eq!(last.role, Role::User);
        match &last.content {
            MessageContent::Parts(parts) => {
                assert_eq!(parts.len(), 2);
                assert_eq!(parts[0], ContentPart::Text("What is this?".into()));
                assert_eq!(parts[1], ContentPart::Image(image));
            }
            other => panic!("expected parts, got {other:?}"),
        }
    }

    #[test]
    fn serializes_to_chat_completion_shape() {
        let messages = build_messages("p", &[], "look", Some(&sample_image()));
        let value = serde_json::to_value(&messages).expect("serialize");

        assert_eq!(
            value,
            json!([
                { "role": "system", "content": "p" },
                {
                    "role": "user",
                    "content": [
                        { "type": "text", "text": "look" },
                        { "type": "image_url", "image_url": { "url": "data:image/png;base64,AQID" } }
                    ]
                }
            ])
        );
    }
}
