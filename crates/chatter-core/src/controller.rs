//! Conversation controller
//!
//! Owns the transcript and runs one request/response turn at a time:
//! append the user message and an empty assistant placeholder, open the
//! stream, apply fragments to the placeholder in arrival order, then finalize
//! (completed or stopped) or discard (failed) the placeholder.
//!
//! The controller is shared behind `Arc` so the UI can call
//! [`ConversationController::stop_generation`] while a turn is suspended.
//! Locks are only taken between suspension points, never across an `.await`.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::ai::client::CompletionBackend;
use crate::ai::sse::FragmentStream;
use crate::ai::types::{ChatRequest, RequestOptions};
use crate::error::StreamError;
use crate::transcript::{Message, MessageId, Snapshot, Transcript};

/// Notification severity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// User-facing notification emitted by the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub severity: Severity,
}

impl Notification {
    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity: Severity::Error,
        }
    }

    pub fn warning(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity: Severity::Warning,
        }
    }
}

/// How a `send_message` call ended
#[derive(Debug)]
pub enum TurnOutcome {
    /// Blank input, or the turn could not be opened; nothing changed
    Ignored,
    /// Another turn is in flight; nothing happened
    Busy,
    /// Stream ended normally; the reply is finalized
    Completed,
    /// Stopped by the user; the partial reply is finalized
    Cancelled,
    /// Request or stream failed; the placeholder was removed
    Failed(StreamError),
}

/// Progress of the in-flight turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    Idle,
    /// Waiting for response headers
    Connecting,
    /// Reading the response body
    Streaming,
}

struct InFlight {
    turn: u64,
    token: CancellationToken,
    phase: TurnPhase,
}

pub struct ConversationController<B> {
    backend: B,
    options: RequestOptions,
    transcript: Mutex<Transcript>,
    in_flight: Mutex<Option<InFlight>>,
    notifications: mpsc::UnboundedSender<Notification>,
    turn_counter: AtomicU64,
}

impl<B: CompletionBackend> ConversationController<B> {
    /// Create a controller and the receiving end of its notification channel
    pub fn new(
        backend: B,
        options: RequestOptions,
    ) -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let controller = Self {
            backend,
            options,
            transcript: Mutex::new(Transcript::new()),
            in_flight: Mutex::new(None),
            notifications: tx,
            turn_counter: AtomicU64::new(0),
        };
        (controller, rx)
    }

    pub fn options(&self) -> &RequestOptions {
        &self.options
    }

    /// Current transcript snapshot
    pub fn snapshot(&self) -> Snapshot {
        self.transcript.lock().snapshot()
    }

    /// Receive a new snapshot after every transcript mutation
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.transcript.lock().subscribe()
    }

    /// True iff some transcript record is still receiving fragments
    pub fn is_streaming(&self) -> bool {
        self.transcript.lock().is_streaming()
    }

    pub fn phase(&self) -> TurnPhase {
        self.in_flight
            .lock()
            .as_ref()
            .map(|f| f.phase)
            .unwrap_or(TurnPhase::Idle)
    }

    /// Signal the in-flight request to stop
    ///
    /// Returns whether there was a request to signal. Safe to call repeatedly
    /// or when idle.
    pub fn stop_generation(&self) -> bool {
        match self.in_flight.lock().as_ref() {
            Some(in_flight) => {
                info!(turn = in_flight.turn, "Stop requested");
                in_flight.token.cancel();
                true
            }
            None => {
                debug!("Stop requested with no turn in flight");
                false
            }
        }
    }

    /// Empty the transcript
    ///
    /// An in-flight turn keeps running; its writes target a record that no
    /// longer exists and are dropped.
    pub fn clear_messages(&self) {
        self.transcript.lock().clear();
    }

    /// Run one full turn for `text`
    pub async fn send_message(&self, text: &str) -> TurnOutcome {
        let text = text.trim();
        if text.is_empty() {
            debug!("Ignoring blank message");
            return TurnOutcome::Ignored;
        }

        let token = CancellationToken::new();
        let turn = {
            let mut in_flight = self.in_flight.lock();
            if let Some(active) = in_flight.as_ref() {
                warn!(active = active.turn, "Rejected message while a reply is streaming");
                self.notify(Notification::warning(
                    "Still responding",
                    "Wait for the current reply to finish or stop it first.",
                ));
                return TurnOutcome::Busy;
            }
            let turn = self.turn_counter.fetch_add(1, Ordering::Relaxed) + 1;
            *in_flight = Some(InFlight {
                turn,
                token: token.clone(),
                phase: TurnPhase::Connecting,
            });
            turn
        };

        let user = Message::user(text);
        let user_id = user.id;
        let placeholder = Message::assistant_placeholder();
        let placeholder_id = placeholder.id;

        // Runs on every exit, including the future being dropped mid-turn
        let _turn_guard = scopeguard::guard((), |()| self.end_turn(turn, placeholder_id));

        let request = {
            let mut transcript = self.transcript.lock();
            // Unreachable while this turn holds the in-flight slot: every
            // earlier placeholder has been finalized or removed and both ids
            // are fresh. Roll back rather than report a turn that never ran.
            if let Err(e) = transcript
                .append(user)
                .and_then(|()| transcript.append(placeholder))
            {
                error!(turn, "Failed to open turn: {}", e);
                transcript.remove(user_id);
                return TurnOutcome::Ignored;
            }
            debug!(turn, %user_id, %placeholder_id, "User message and reply placeholder appended");
            ChatRequest::from_transcript(&transcript.snapshot(), &self.options)
        };

        info!(turn, messages = request.messages.len(), "=== TURN START ===");

        let opened = tokio::select! {
            biased;
            _ = token.cancelled() => None,
            result = self.backend.open_stream(&request) => Some(result),
        };
        let body = match opened {
            None => return self.finish_cancelled(turn, placeholder_id),
            Some(Err(e)) => return self.fail_turn(turn, placeholder_id, e),
            Some(Ok(body)) => body,
        };

        self.set_phase(turn, TurnPhase::Streaming);
        let mut decoder = FragmentStream::new(body);
        let mut fragments = 0usize;

        loop {
            let pulled = tokio::select! {
                biased;
                _ = token.cancelled() => None,
                next = decoder.next_fragment() => Some(next),
            };
            match pulled {
                None => return self.finish_cancelled(turn, placeholder_id),
                Some(Some(Ok(fragment))) => {
                    fragments += 1;
                    self.transcript.lock().replace(placeholder_id, |mut reply| {
                        reply.content.push_str(&fragment);
                        reply
                    });
                }
                Some(Some(Err(e))) => return self.fail_turn(turn, placeholder_id, e),
                Some(None) => break,
            }
        }

        self.finalize(placeholder_id);
        if !decoder.saw_done() {
            warn!(turn, "Body ended without [DONE] marker");
        }
        info!(turn, fragments, "Turn completed");
        TurnOutcome::Completed
    }

    fn finish_cancelled(&self, turn: u64, placeholder_id: MessageId) -> TurnOutcome {
        self.finalize(placeholder_id);
        info!(turn, "Turn stopped by user");
        TurnOutcome::Cancelled
    }

    fn fail_turn(&self, turn: u64, placeholder_id: MessageId, e: StreamError) -> TurnOutcome {
        self.transcript.lock().remove(placeholder_id);
        error!(turn, "Turn failed: {}", e);
        self.notify(Notification::error(e.notification_title(), e.to_string()));
        TurnOutcome::Failed(e)
    }

    /// Mark the reply as finished, keeping whatever content arrived
    fn finalize(&self, placeholder_id: MessageId) {
        self.transcript.lock().replace(placeholder_id, |mut reply| {
            reply.streaming = false;
            reply
        });
    }

    fn set_phase(&self, turn: u64, phase: TurnPhase) {
        if let Some(in_flight) = self.in_flight.lock().as_mut() {
            if in_flight.turn == turn {
                debug!(turn, ?phase, "Turn phase");
                in_flight.phase = phase;
            }
        }
    }

    fn end_turn(&self, turn: u64, placeholder_id: MessageId) {
        // No-op unless the turn exited without finalizing (dropped future)
        self.finalize(placeholder_id);

        let mut in_flight = self.in_flight.lock();
        if in_flight.as_ref().is_some_and(|f| f.turn == turn) {
            *in_flight = None;
        }
    }

    fn notify(&self, notification: Notification) {
        // Receiver may be gone during shutdown
        let _ = self.notifications.send(notification);
    }
}
