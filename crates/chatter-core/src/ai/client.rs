//! Completion endpoint client
//!
//! `CompletionBackend` is the seam between the conversation controller and
//! the network; `AiClient` is the reqwest implementation.

use std::time::Instant;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::StreamExt;
use reqwest::Client;
use tracing::{debug, error, info};

use super::types::ChatRequest;
use crate::config::ChatConfig;
use crate::constants;
use crate::error::StreamError;

/// Raw response body, chunk by chunk
pub type ByteStream = BoxStream<'static, Result<Bytes, StreamError>>;

/// Anything that can open a streaming completion
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Send `request` and resolve once response headers are in
    ///
    /// Non-success statuses and body-less responses resolve to an error; the
    /// returned stream yields the body as it arrives.
    async fn open_stream(&self, request: &ChatRequest) -> Result<ByteStream, StreamError>;
}

/// HTTP client for an OpenAI-compatible chat/completions endpoint
pub struct AiClient {
    http: Client,
    endpoint: String,
}

impl AiClient {
    /// Create the HTTP client with configuration suited to SSE streaming
    fn create_http_client(config: &ChatConfig) -> Client {
        Client::builder()
            .user_agent(constants::http::USER_AGENT)
            .connect_timeout(config.connect_timeout())
            // Long overall timeout; a streamed reply keeps the request open
            .timeout(config.stream_timeout())
            .build()
            .unwrap_or_else(|e| {
                error!("Failed to build HTTP client: {}. Using default client.", e);
                Client::new()
            })
    }

    pub fn new(config: &ChatConfig) -> Self {
        Self {
            http: Self::create_http_client(config),
            endpoint: config.endpoint.clone(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl CompletionBackend for AiClient {
    async fn open_stream(&self, request: &ChatRequest) -> Result<ByteStream, StreamError> {
        let call_start = Instant::now();
        info!(
            "Model: {}, Messages: {}, Endpoint: {}",
            request.model,
            request.messages.len(),
            self.endpoint
        );

        let response = self
            .http
            .post(&self.endpoint)
            .header("content-type", "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status();
        info!("API response: {} in {:?}", status, call_start.elapsed());

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!("API error response: {} - {}", status, error_text);
            return Err(StreamError::Status {
                status: status.as_u16(),
                body: error_text,
            });
        }

        if response.content_length() == Some(0) {
            error!("API response carried no body");
            return Err(StreamError::MissingBody);
        }

        debug!("Starting body stream");
        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(StreamError::from))
            .boxed())
    }
}
