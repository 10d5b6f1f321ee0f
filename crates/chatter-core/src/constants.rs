//! Application constants and configuration defaults
//!
//! Centralized location for magic numbers and default values

use std::time::Duration;

/// HTTP client configuration
pub mod http {
    use super::*;

    /// Connection timeout for HTTP requests
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Streaming timeout - long replies from local models can take minutes
    pub const STREAM_TIMEOUT: Duration = Duration::from_secs(600);

    /// User agent sent with every request
    pub const USER_AGENT: &str = concat!("chatter/", env!("CARGO_PKG_VERSION"));
}

/// Completion request defaults
pub mod ai {
    /// Default chat/completions endpoint (LM Studio style local server)
    pub const DEFAULT_ENDPOINT: &str = "http://localhost:1234/v1/chat/completions";

    /// Default model ID
    pub const DEFAULT_MODEL: &str = "local-model";

    /// Default sampling temperature
    pub const DEFAULT_TEMPERATURE: f32 = 0.7;

    /// `-1` asks the server for an unbounded reply
    pub const UNBOUNDED_MAX_TOKENS: i64 = -1;
}

/// SSE wire format
pub mod sse {
    /// Prefix of every content-bearing event line
    pub const DATA_PREFIX: &str = "data: ";

    /// Payload that terminates the stream
    pub const DONE_SENTINEL: &str = "[DONE]";
}

/// Local filesystem layout
pub mod fs {
    /// Config directory name (under the home directory)
    pub const CONFIG_DIR_NAME: &str = ".chatter";

    /// Config file name inside the config directory
    pub const CONFIG_FILE_NAME: &str = "config.toml";

    /// Logs subdirectory name
    pub const LOGS_DIR_NAME: &str = "logs";
}
