//! Error types for the streaming pipeline and the transcript store

use thiserror::Error;

use crate::transcript::MessageId;

/// Failure of a completion request or its response stream
///
/// Cancellation is not represented here; a stopped turn is a successful,
/// early finalization.
#[derive(Debug, Error)]
pub enum StreamError {
    /// Server answered with a non-success status
    #[error("API error: {status} - {body}")]
    Status { status: u16, body: String },

    /// Server answered with success but no body to read
    #[error("response has no body")]
    MissingBody,

    /// Connection, timeout, or body read failure inside reqwest
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Body read failure from a non-HTTP byte source
    #[error("stream read error: {0}")]
    Read(String),
}

impl StreamError {
    /// Short title for user-facing notifications
    pub fn notification_title(&self) -> &'static str {
        match self {
            StreamError::Status { .. } => "Request failed",
            StreamError::MissingBody => "Empty response",
            StreamError::Transport(_) => "Connection error",
            StreamError::Read(_) => "Stream interrupted",
        }
    }
}

/// Rejected transcript mutation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TranscriptError {
    #[error("message id already present: {0}")]
    DuplicateId(MessageId),

    #[error("message {0} is already streaming")]
    AlreadyStreaming(MessageId),
}
