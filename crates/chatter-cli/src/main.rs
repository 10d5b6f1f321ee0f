//! Chatter - terminal chat client for OpenAI-compatible endpoints
//!
//! Streams replies from a local or remote chat/completions server into a
//! full-screen transcript.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

use chatter_core::{paths, AiClient, ChatConfig, ConversationController};

mod tui;

/// Chatter - streaming chat in the terminal
#[derive(Parser)]
#[command(name = "chatter")]
#[command(about = "Terminal chat client for OpenAI-compatible endpoints", long_about = None)]
struct Cli {
    /// Config file (defaults to ~/.chatter/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// chat/completions URL
    #[arg(short, long)]
    endpoint: Option<String>,

    /// Model ID
    #[arg(short, long)]
    model: Option<String>,

    /// Sampling temperature
    #[arg(short, long)]
    temperature: Option<f32>,
}

impl Cli {
    /// Command-line flags win over file and environment
    fn apply_overrides(&self, config: &mut ChatConfig) {
        if let Some(endpoint) = &self.endpoint {
            config.endpoint = endpoint.clone();
        }
        if let Some(model) = &self.model {
            config.model = model.clone();
        }
        if let Some(temperature) = self.temperature {
            config.temperature = temperature;
        }
    }
}

/// Restore terminal state - called on panic or unexpected exit
fn restore_terminal() {
    use crossterm::{
        execute,
        terminal::{disable_raw_mode, LeaveAlternateScreen},
    };
    let _ = disable_raw_mode();
    let _ = execute!(std::io::stdout(), LeaveAlternateScreen);
}

/// Log to a file; stdout/stderr belong to the TUI
fn init_logging() {
    let log_dir = paths::logs_dir();
    std::fs::create_dir_all(&log_dir).ok();

    let writer = match std::fs::File::create(log_dir.join("chatter.log")) {
        Ok(file) => BoxMakeWriter::new(std::sync::Mutex::new(file)),
        Err(_) => BoxMakeWriter::new(std::io::sink),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(writer)
        .with_ansi(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Set up panic hook to restore terminal state
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        restore_terminal();
        original_hook(panic_info);
    }));

    init_logging();

    let cli = Cli::parse();

    let mut config = ChatConfig::load(cli.config.as_deref())?;
    cli.apply_overrides(&mut config);
    tracing::info!(
        "Starting chatter: endpoint={}, model={}",
        config.endpoint,
        config.model
    );

    let client = AiClient::new(&config);
    let endpoint = client.endpoint().to_string();
    let (controller, notifications) =
        ConversationController::new(client, config.request_options());

    let mut app = tui::App::new(Arc::new(controller), notifications, endpoint);
    app.run().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::parse_from([
            "chatter",
            "--endpoint",
            "http://127.0.0.1:8080/v1/chat/completions",
            "-t",
            "0.1",
        ]);
        let mut config = ChatConfig::default();
        cli.apply_overrides(&mut config);

        assert_eq!(config.endpoint, "http://127.0.0.1:8080/v1/chat/completions");
        assert_eq!(config.model, ChatConfig::default().model);
        assert!((config.temperature - 0.1).abs() < f32::EPSILON);
    }
}
