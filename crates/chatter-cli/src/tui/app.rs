//! Main application state and event loop

use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{
        DisableBracketedPaste, EnableBracketedPaste, Event, EventStream, KeyCode, KeyEventKind,
        KeyModifiers,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures::StreamExt;
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    Frame, Terminal,
};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use chatter_core::{CompletionBackend, ConversationController, Notification, Snapshot, TurnPhase};

use crate::tui::components::{render_messages, render_status_bar, render_toasts, Toast, ToastQueue};
use crate::tui::input::InputLine;
use crate::tui::theme::Theme;

/// Loop wake-up interval for toast expiry and phase changes
const TICK: Duration = Duration::from_millis(16);

/// Rows moved per PageUp/PageDown
const PAGE_SCROLL: usize = 10;

pub struct App<B> {
    controller: Arc<ConversationController<B>>,
    transcript_rx: watch::Receiver<Snapshot>,
    /// Latest transcript snapshot, re-read on every change notification
    messages: Snapshot,
    notifications: mpsc::UnboundedReceiver<Notification>,
    toasts: ToastQueue,
    input: InputLine,
    theme: Theme,
    model: String,
    endpoint: String,
    /// Rows hidden below the transcript viewport; 0 follows new output
    scroll_from_bottom: usize,
    /// Phase seen at the last draw
    drawn_phase: TurnPhase,
    needs_redraw: bool,
    should_quit: bool,
}

impl<B: CompletionBackend + 'static> App<B> {
    pub fn new(
        controller: Arc<ConversationController<B>>,
        notifications: mpsc::UnboundedReceiver<Notification>,
        endpoint: impl Into<String>,
    ) -> Self {
        let transcript_rx = controller.subscribe();
        let messages = controller.snapshot();
        let model = controller.options().model.clone();
        Self {
            controller,
            transcript_rx,
            messages,
            notifications,
            toasts: ToastQueue::new(),
            input: InputLine::new(),
            theme: Theme::default(),
            model,
            endpoint: endpoint.into(),
            scroll_from_bottom: 0,
            drawn_phase: TurnPhase::Idle,
            needs_redraw: true,
            should_quit: false,
        }
    }

    /// Send the input line as a new turn
    ///
    /// The turn runs on its own task so the UI keeps drawing and can stop it.
    /// While a turn is in flight the text stays in the input and the
    /// controller answers with a busy warning.
    fn submit(&mut self) {
        if self.input.content().trim().is_empty() {
            return;
        }
        let text = if self.controller.phase() == TurnPhase::Idle {
            self.input.take()
        } else {
            self.input.content().to_string()
        };

        self.scroll_from_bottom = 0;
        let controller = Arc::clone(&self.controller);
        tokio::spawn(async move {
            let outcome = controller.send_message(&text).await;
            debug!(?outcome, "Turn finished");
        });
    }

    fn handle_key(&mut self, code: KeyCode, modifiers: KeyModifiers) {
        let ctrl = modifiers.contains(KeyModifiers::CONTROL);
        match code {
            KeyCode::Char('c') if ctrl => {
                self.controller.stop_generation();
                self.should_quit = true;
            }
            KeyCode::Char('l') if ctrl => {
                info!("Clearing conversation");
                self.controller.clear_messages();
                self.scroll_from_bottom = 0;
            }
            KeyCode::Esc => {
                self.controller.stop_generation();
            }
            KeyCode::Enter => self.submit(),
            KeyCode::PageUp => {
                self.scroll_from_bottom = self.scroll_from_bottom.saturating_add(PAGE_SCROLL);
            }
            KeyCode::PageDown => {
                self.scroll_from_bottom = self.scroll_from_bottom.saturating_sub(PAGE_SCROLL);
            }
            KeyCode::Up => {
                self.scroll_from_bottom = self.scroll_from_bottom.saturating_add(1);
            }
            KeyCode::Down => {
                self.scroll_from_bottom = self.scroll_from_bottom.saturating_sub(1);
            }
            _ => {
                self.input.handle_key(code, modifiers);
            }
        }
    }

    fn show_notification(&mut self, notification: Notification) {
        debug!(title = %notification.title, "Showing notification");
        self.toasts.push(Toast::from(notification));
    }

    /// Pick up the newest snapshot
    fn refresh_transcript(&mut self) {
        self.messages = self.transcript_rx.borrow_and_update().clone();
    }

    fn ui(&mut self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Fill(1),
                Constraint::Length(3),
                Constraint::Length(1),
            ])
            .split(f.area());

        let phase = self.controller.phase();
        self.drawn_phase = phase;

        self.scroll_from_bottom = render_messages(
            f,
            chunks[0],
            &self.theme,
            &self.messages,
            self.scroll_from_bottom,
        );
        self.input
            .render(f, chunks[1], &self.theme, phase != TurnPhase::Idle);
        render_status_bar(
            f,
            chunks[2],
            &self.theme,
            &self.model,
            &self.endpoint,
            phase,
            self.messages.len(),
        );

        let area = f.area();
        render_toasts(f.buffer_mut(), area, &self.toasts, &self.theme);
    }

    /// Run the application
    pub async fn run(&mut self) -> Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let result = self.main_loop(&mut terminal).await;

        // Don't leave a request running after the UI is gone
        self.controller.stop_generation();

        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableBracketedPaste
        )?;
        terminal.show_cursor()?;
        result
    }

    /// Main event loop
    async fn main_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> Result<()> {
        let mut event_stream = EventStream::new();

        loop {
            // Tick toasts (auto-dismiss expired) - mark dirty if any expired
            if self.toasts.tick() {
                self.needs_redraw = true;
            }

            // Countdown bars animate while toasts are up
            if !self.toasts.is_empty() {
                self.needs_redraw = true;
            }

            // Phase changes (connecting/streaming) have no transcript event
            if self.controller.phase() != self.drawn_phase {
                self.needs_redraw = true;
            }

            // Only render if something changed
            if self.needs_redraw {
                terminal.draw(|f| self.ui(f))?;
                self.needs_redraw = false;
            }

            tokio::select! {
                biased; // Prefer input over background updates

                maybe_event = event_stream.next() => {
                    match maybe_event {
                        Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                            self.handle_key(key.code, key.modifiers);
                            self.needs_redraw = true;
                        }
                        Some(Ok(Event::Paste(text))) => {
                            self.input.insert_str(&text);
                            self.needs_redraw = true;
                        }
                        Some(Ok(Event::Resize(_, _))) => {
                            self.needs_redraw = true;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            tracing::warn!("Terminal event error: {}", e);
                        }
                        None => {
                            info!("Terminal event stream closed");
                            self.should_quit = true;
                        }
                    }
                }
                Ok(()) = self.transcript_rx.changed() => {
                    self.refresh_transcript();
                    self.needs_redraw = true;
                }
                Some(notification) = self.notifications.recv() => {
                    self.show_notification(notification);
                    self.needs_redraw = true;
                }
                _ = tokio::time::sleep(TICK) => {
                    // Timeout - loop again for toast expiry and phase changes
                }
            }

            if self.should_quit {
                break;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chatter_core::ai::{ByteStream, ChatRequest};
    use chatter_core::{RequestOptions, StreamError};

    /// Backend whose server always answers 500
    struct FailingBackend;

    #[async_trait]
    impl CompletionBackend for FailingBackend {
        async fn open_stream(&self, _request: &ChatRequest) -> Result<ByteStream, StreamError> {
            Err(StreamError::Status {
                status: 500,
                body: "boom".to_string(),
            })
        }
    }

    fn app() -> App<FailingBackend> {
        let (controller, notifications) =
            ConversationController::new(FailingBackend, RequestOptions::default());
        App::new(
            Arc::new(controller),
            notifications,
            "http://localhost:1234/v1/chat/completions",
        )
    }

    fn type_text(app: &mut App<FailingBackend>, text: &str) {
        for ch in text.chars() {
            app.handle_key(KeyCode::Char(ch), KeyModifiers::NONE);
        }
    }

    async fn next_notification(app: &mut App<FailingBackend>) -> Notification {
        tokio::time::timeout(Duration::from_secs(5), app.notifications.recv())
            .await
            .expect("timed out waiting for notification")
            .expect("notification channel closed")
    }

    #[tokio::test]
    async fn test_blank_enter_sends_nothing() {
        let mut app = app();
        type_text(&mut app, "   ");
        app.handle_key(KeyCode::Enter, KeyModifiers::NONE);
        tokio::task::yield_now().await;

        assert!(app.controller.snapshot().is_empty());
        assert_eq!(app.input.content(), "   ");
    }

    #[tokio::test]
    async fn test_failed_turn_surfaces_toast() {
        let mut app = app();
        type_text(&mut app, "hi");
        app.handle_key(KeyCode::Enter, KeyModifiers::NONE);
        assert!(app.input.content().is_empty());

        let notification = next_notification(&mut app).await;
        assert_eq!(notification.title, "Request failed");
        app.show_notification(notification);
        assert!(!app.toasts.is_empty());

        app.refresh_transcript();
        assert_eq!(app.messages.len(), 1, "only the user message remains");
    }

    #[tokio::test]
    async fn test_ctrl_l_clears_transcript() {
        let mut app = app();
        type_text(&mut app, "hi");
        app.handle_key(KeyCode::Enter, KeyModifiers::NONE);
        next_notification(&mut app).await;
        assert_eq!(app.controller.snapshot().len(), 1);

        app.handle_key(KeyCode::Char('l'), KeyModifiers::CONTROL);
        assert!(app.controller.snapshot().is_empty());
        assert!(app.input.content().is_empty(), "ctrl-l is not typed into the input");
    }

    #[tokio::test]
    async fn test_esc_when_idle_and_ctrl_c_quits() {
        let mut app = app();
        app.handle_key(KeyCode::Esc, KeyModifiers::NONE);
        assert!(!app.should_quit);

        app.handle_key(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert!(app.should_quit);
    }

    #[tokio::test]
    async fn test_scroll_keys() {
        let mut app = app();
        app.handle_key(KeyCode::PageUp, KeyModifiers::NONE);
        app.handle_key(KeyCode::Up, KeyModifiers::NONE);
        assert_eq!(app.scroll_from_bottom, PAGE_SCROLL + 1);
        app.handle_key(KeyCode::PageDown, KeyModifiers::NONE);
        app.handle_key(KeyCode::PageDown, KeyModifiers::NONE);
        assert_eq!(app.scroll_from_bottom, 0);
    }
}
