//! AI provider layer
//!
//! Talks to an OpenAI-compatible chat/completions endpoint and decodes its
//! SSE reply stream.

pub mod client;
pub mod sse;
pub mod types;

pub use client::{AiClient, ByteStream, CompletionBackend};
pub use sse::{FragmentStream, SseEvent, SseLineBuffer};
pub use types::{ChatRequest, RequestOptions, WireMessage};
