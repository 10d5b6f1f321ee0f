//! Chatter Core - streaming conversation engine
//!
//! This crate provides everything below the terminal UI:
//! - Transcript store with snapshot publishing
//! - SSE decoding of chat/completions reply streams
//! - The conversation controller (send, stop, clear)
//! - Configuration and filesystem layout

pub mod ai;
pub mod config;
pub mod constants;
pub mod controller;
pub mod error;
pub mod paths;
pub mod transcript;

// Re-exports for convenience
pub use ai::{AiClient, CompletionBackend, RequestOptions};
pub use config::ChatConfig;
pub use controller::{ConversationController, Notification, Severity, TurnOutcome, TurnPhase};
pub use error::{StreamError, TranscriptError};
pub use transcript::{Message, MessageId, Role, Snapshot, Transcript};
