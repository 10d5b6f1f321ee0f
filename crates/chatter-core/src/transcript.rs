//! Conversation transcript
//!
//! An ordered log of message records. Every committed mutation is published as
//! a fresh immutable snapshot, so observers can detect change by pointer
//! identity (`Arc::ptr_eq`) instead of diffing contents.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::error::TranscriptError;

/// Opaque, unique message identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(Uuid);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Author of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single transcript entry
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
    /// True while the record is receiving fragments
    pub streaming: bool,
}

impl Message {
    /// A finished user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            role: Role::User,
            content: content.into(),
            created_at: Utc::now(),
            streaming: false,
        }
    }

    /// An empty assistant record waiting for fragments
    pub fn assistant_placeholder() -> Self {
        Self {
            id: MessageId::new(),
            role: Role::Assistant,
            content: String::new(),
            created_at: Utc::now(),
            streaming: true,
        }
    }

    /// Whether this record belongs in an outbound request payload
    ///
    /// In-flight assistant records and empty (cancelled before any content)
    /// replies are never echoed back to the server.
    pub fn is_sendable(&self) -> bool {
        match self.role {
            Role::User => true,
            Role::Assistant => !self.streaming && !self.content.is_empty(),
        }
    }
}

/// Immutable view of the transcript at one point in time
pub type Snapshot = Arc<[Message]>;

/// Ordered message store with snapshot publishing
pub struct Transcript {
    messages: Snapshot,
    tx: watch::Sender<Snapshot>,
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}

impl Transcript {
    pub fn new() -> Self {
        let empty: Snapshot = Arc::from(Vec::new());
        let (tx, _rx) = watch::channel(empty.clone());
        Self {
            messages: empty,
            tx,
        }
    }

    /// Current snapshot (cheap pointer clone)
    pub fn snapshot(&self) -> Snapshot {
        self.messages.clone()
    }

    /// Observe every committed mutation
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.tx.subscribe()
    }

    /// True iff some record is still receiving fragments
    pub fn is_streaming(&self) -> bool {
        self.messages.iter().any(|m| m.streaming)
    }

    /// Add a record to the end
    pub fn append(&mut self, record: Message) -> Result<(), TranscriptError> {
        if self.messages.iter().any(|m| m.id == record.id) {
            return Err(TranscriptError::DuplicateId(record.id));
        }
        if record.streaming {
            if let Some(active) = self.messages.iter().find(|m| m.streaming) {
                return Err(TranscriptError::AlreadyStreaming(active.id));
            }
        }

        trace!(id = %record.id, role = %record.role, "transcript append");
        let next: Vec<Message> = self
            .messages
            .iter()
            .cloned()
            .chain(std::iter::once(record))
            .collect();
        self.commit(next);
        Ok(())
    }

    /// Apply `updater` to the record matching `id`
    ///
    /// Only streaming records are mutable. The updater may append to the
    /// content and flip `streaming` off; identity fields are restored and a
    /// content change that is not a pure extension is rejected. Returns
    /// whether a change was committed; an absent id is a no-op.
    pub fn replace<F>(&mut self, id: MessageId, updater: F) -> bool
    where
        F: FnOnce(Message) -> Message,
    {
        let Some(index) = self.messages.iter().position(|m| m.id == id) else {
            trace!(%id, "replace on absent record ignored");
            return false;
        };

        let current = &self.messages[index];
        if !current.streaming {
            debug!(%id, "replace on finalized record ignored");
            return false;
        }

        let mut updated = updater(current.clone());
        updated.id = current.id;
        updated.role = current.role;
        updated.created_at = current.created_at;
        if !updated.content.starts_with(current.content.as_str()) {
            warn!(%id, "rejected non-append content change");
            return false;
        }

        let mut next = self.messages.to_vec();
        next[index] = updated;
        self.commit(next);
        true
    }

    /// Delete the record matching `id`; returns whether it existed
    pub fn remove(&mut self, id: MessageId) -> bool {
        if !self.messages.iter().any(|m| m.id == id) {
            return false;
        }
        let next: Vec<Message> = self
            .messages
            .iter()
            .filter(|m| m.id != id)
            .cloned()
            .collect();
        self.commit(next);
        true
    }

    /// Drop every record
    pub fn clear(&mut self) {
        debug!(count = self.messages.len(), "transcript cleared");
        self.commit(Vec::new());
    }

    fn commit(&mut self, next: Vec<Message>) {
        let snapshot: Snapshot = Arc::from(next);
        self.messages = snapshot.clone();
        self.tx.send_replace(snapshot);
    }
}
