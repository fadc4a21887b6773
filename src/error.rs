//! Failures surfaced by the chat-completion adapter.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatError {
    /// The credential variable is unset or empty.
    #[error("{0} is not set; export it or add it to .env")]
    MissingApiKey(String),

    #[error("chat request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-success HTTP status with the provider's error message.
    #[error("chat service returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("malformed chat response: {0}")]
    Malformed(String),
}
