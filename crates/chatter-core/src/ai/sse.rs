//! SSE (Server-Sent Events) stream decoding
//!
//! Turns a chat/completions response body into a pull-based sequence of text
//! fragments:
//! - `SseLineBuffer` reassembles byte chunks into complete lines
//! - `parse_line` classifies one line (`data: ` payload, `[DONE]`, noise)
//! - `FragmentStream` drives both over a byte source, one fragment per pull

use std::collections::VecDeque;
use std::time::Instant;

use futures::StreamExt;
use tracing::{debug, info, trace, warn};

use super::client::ByteStream;
use super::types::ChunkEnvelope;
use crate::constants::sse::{DATA_PREFIX, DONE_SENTINEL};
use crate::error::StreamError;

/// Reassembles raw chunks into complete, non-blank lines
///
/// Lines are split on the `\n` byte before any UTF-8 decoding. That byte never
/// occurs inside a multi-byte sequence, so a character split across two chunks
/// is decoded only once both halves have arrived.
#[derive(Debug, Default)]
pub struct SseLineBuffer {
    /// Bytes after the last newline seen so far
    partial: Vec<u8>,
    /// Prefix of `partial` already known to hold no newline
    scanned: usize,
}

impl SseLineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk; returns every line it completes
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.partial.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut start = 0;
        let mut search_from = self.scanned;
        while let Some(offset) = self.partial[search_from..].iter().position(|&b| b == b'\n') {
            let end = search_from + offset;
            if let Some(line) = decode_line(&self.partial[start..end]) {
                lines.push(line);
            }
            start = end + 1;
            search_from = start;
        }
        self.partial.drain(..start);
        self.scanned = self.partial.len();
        lines
    }

    /// Flush the unterminated tail once the source is exhausted
    pub fn finish(&mut self) -> Option<String> {
        self.scanned = 0;
        let tail = std::mem::take(&mut self.partial);
        decode_line(&tail)
    }
}

fn decode_line(bytes: &[u8]) -> Option<String> {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    let text = String::from_utf8_lossy(bytes);
    if text.trim().is_empty() {
        None
    } else {
        Some(text.into_owned())
    }
}

/// Classification of a single event line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    /// Text to append to the reply
    Fragment(String),
    /// `data: [DONE]`
    Done,
    /// Comment, non-data field, content-less event, or malformed payload
    Skip,
}

/// Classify one complete line
pub fn parse_line(line: &str) -> SseEvent {
    let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
        return SseEvent::Skip;
    };

    if payload == DONE_SENTINEL {
        return SseEvent::Done;
    }

    match serde_json::from_str::<ChunkEnvelope>(payload) {
        Ok(envelope) => envelope
            .into_content()
            .map(SseEvent::Fragment)
            .unwrap_or(SseEvent::Skip),
        Err(e) => {
            warn!("Failed to parse SSE JSON ({}): {}", e, payload);
            SseEvent::Skip
        }
    }
}

/// Lazy, single-pass sequence of reply fragments over a response body
///
/// Once it has returned `None` (end of body or `[DONE]`) or an error, every
/// further pull returns `None`.
pub struct FragmentStream {
    source: ByteStream,
    lines: SseLineBuffer,
    /// Decoded but not yet handed out, in arrival order
    ready: VecDeque<String>,
    finished: bool,
    saw_done: bool,
    started: Instant,
    chunk_count: usize,
    event_count: usize,
    bytes_received: usize,
}

impl FragmentStream {
    pub fn new(source: ByteStream) -> Self {
        Self {
            source,
            lines: SseLineBuffer::new(),
            ready: VecDeque::new(),
            finished: false,
            saw_done: false,
            started: Instant::now(),
            chunk_count: 0,
            event_count: 0,
            bytes_received: 0,
        }
    }

    /// Pull the next fragment
    ///
    /// Suspends only while waiting for the next body chunk.
    pub async fn next_fragment(&mut self) -> Option<Result<String, StreamError>> {
        loop {
            if let Some(fragment) = self.ready.pop_front() {
                return Some(Ok(fragment));
            }
            if self.finished {
                return None;
            }

            match self.source.next().await {
                Some(Ok(bytes)) => {
                    self.chunk_count += 1;
                    self.bytes_received += bytes.len();
                    debug!(
                        "SSE chunk #{} received: {} bytes (total: {} bytes)",
                        self.chunk_count,
                        bytes.len(),
                        self.bytes_received
                    );
                    for line in self.lines.push(&bytes) {
                        self.handle_line(&line);
                    }
                }
                Some(Err(e)) => {
                    warn!(
                        "Stream read error at chunk #{}: {}",
                        self.chunk_count + 1,
                        e
                    );
                    self.finished = true;
                    return Some(Err(e));
                }
                None => {
                    if let Some(line) = self.lines.finish() {
                        self.handle_line(&line);
                    }
                    self.finished = true;
                    info!(
                        "SSE stream ended after {:?}: {} chunks, {} events, {} bytes",
                        self.started.elapsed(),
                        self.chunk_count,
                        self.event_count,
                        self.bytes_received
                    );
                }
            }
        }
    }

    /// Whether the server sent the `[DONE]` marker
    pub fn saw_done(&self) -> bool {
        self.saw_done
    }

    fn handle_line(&mut self, line: &str) {
        if self.saw_done {
            trace!("Ignoring line after [DONE]");
            return;
        }
        self.event_count += 1;

        match parse_line(line) {
            SseEvent::Fragment(text) => {
                trace!("  -> Fragment: {} chars", text.len());
                self.ready.push_back(text);
            }
            SseEvent::Done => {
                info!(
                    "SSE stream [DONE] marker received after {:?}, {} events, {} bytes",
                    self.started.elapsed(),
                    self.event_count,
                    self.bytes_received
                );
                self.saw_done = true;
                self.finished = true;
            }
            SseEvent::Skip => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn stream_of(chunks: &[&str]) -> FragmentStream {
        stream_of_bytes(chunks.iter().map(|c| c.as_bytes().to_vec()).collect())
    }

    fn stream_of_bytes(chunks: Vec<Vec<u8>>) -> FragmentStream {
        let items: Vec<Result<Bytes, StreamError>> =
            chunks.into_iter().map(|c| Ok(Bytes::from(c))).collect();
        FragmentStream::new(futures::stream::iter(items).boxed())
    }

    async fn collect(mut decoder: FragmentStream) -> Vec<String> {
        let mut out = Vec::new();
        while let Some(item) = decoder.next_fragment().await {
            out.push(item.expect("unexpected stream error"));
        }
        out
    }

    // parse_line tests
    #[test]
    fn test_parse_line_fragment() {
        assert_eq!(
            parse_line(r#"data: {"choices":[{"delta":{"content":"Hi"}}]}"#),
            SseEvent::Fragment("Hi".to_string())
        );
    }

    #[test]
    fn test_parse_line_done() {
        assert_eq!(parse_line("data: [DONE]"), SseEvent::Done);
    }

    #[test]
    fn test_parse_line_noise() {
        assert_eq!(parse_line(": keep-alive"), SseEvent::Skip);
        assert_eq!(parse_line("event: message"), SseEvent::Skip);
        assert_eq!(parse_line("data: {not json"), SseEvent::Skip);
        assert_eq!(parse_line(r#"data:{"choices":[]}"#), SseEvent::Skip);
        assert_eq!(
            parse_line(r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#),
            SseEvent::Skip
        );
    }

    // SseLineBuffer tests
    #[test]
    fn test_line_buffer_multiple_lines_in_one_chunk() {
        let mut buf = SseLineBuffer::new();
        let lines = buf.push(b"data: a\n\ndata: b\n");
        assert_eq!(lines, vec!["data: a", "data: b"]);
        assert!(buf.partial.is_empty());
    }

    #[test]
    fn test_line_buffer_retains_partial_line() {
        let mut buf = SseLineBuffer::new();
        assert!(buf.push(b"data: he").is_empty());
        assert_eq!(buf.partial.len(), 8);
        assert_eq!(buf.push(b"llo\ndata: x"), vec!["data: hello"]);
        assert_eq!(buf.finish().as_deref(), Some("data: x"));
        assert_eq!(buf.finish(), None);
    }

    #[test]
    fn test_line_buffer_resumes_scan_after_partial_chunks() {
        let line = format!("data: {}", "x".repeat(4096));
        let mut buf = SseLineBuffer::new();
        for byte in line.as_bytes() {
            assert!(buf.push(std::slice::from_ref(byte)).is_empty());
            // Everything retained has already been searched
            assert_eq!(buf.scanned, buf.partial.len());
        }

        let lines = buf.push(b"\ndata: y\ndata: z");
        assert_eq!(lines, vec![line, "data: y".to_string()]);
        assert_eq!(buf.partial, b"data: z");
        assert_eq!(buf.scanned, 7);
        assert_eq!(buf.finish().as_deref(), Some("data: z"));
        assert_eq!(buf.scanned, 0);
    }

    #[test]
    fn test_line_buffer_strips_carriage_return() {
        let mut buf = SseLineBuffer::new();
        assert_eq!(buf.push(b"data: a\r\n\r\n"), vec!["data: a"]);
    }

    #[test]
    fn test_line_buffer_multibyte_split_across_chunks() {
        let text = "data: caf\u{e9} \u{1f980}\n";
        let bytes = text.as_bytes();
        // Split inside the 4-byte crab emoji
        let cut = bytes.len() - 3;
        let mut buf = SseLineBuffer::new();
        assert!(buf.push(&bytes[..cut]).is_empty());
        assert_eq!(buf.push(&bytes[cut..]), vec!["data: caf\u{e9} \u{1f980}"]);
    }

    // FragmentStream tests
    #[tokio::test]
    async fn test_single_fragment_then_done() {
        let decoder = stream_of(&[
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\n",
            "data: [DONE]\n",
        ]);
        assert_eq!(collect(decoder).await, vec!["Hi"]);
    }

    #[tokio::test]
    async fn test_content_split_across_chunks_yields_once() {
        let decoder = stream_of(&[
            "data: {\"choices\":[{\"delta\":{\"conte",
            "nt\":\"Hi\"}}]}\n",
        ]);
        assert_eq!(collect(decoder).await, vec!["Hi"]);
    }

    #[tokio::test]
    async fn test_malformed_line_does_not_interrupt() {
        let decoder = stream_of(&[
            "data: {\"choices\":[{\"delta\":{\"content\":\"A\"}}]}\n",
            "data: {not json\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"B\"}}]}\n",
        ]);
        assert_eq!(collect(decoder).await, vec!["A", "B"]);
    }

    #[tokio::test]
    async fn test_multibyte_fragment_split_across_chunks() {
        let line = "data: {\"choices\":[{\"delta\":{\"content\":\"\u{65e5}\u{672c}\"}}]}\n";
        let bytes = line.as_bytes();
        let cut = line.find('\u{65e5}').unwrap() + 1;
        let decoder = stream_of_bytes(vec![bytes[..cut].to_vec(), bytes[cut..].to_vec()]);
        assert_eq!(collect(decoder).await, vec!["\u{65e5}\u{672c}"]);
    }

    #[tokio::test]
    async fn test_stops_at_done_marker() {
        let mut decoder = stream_of(&[
            "data: {\"choices\":[{\"delta\":{\"content\":\"A\"}}]}\ndata: [DONE]\ndata: {\"choices\":[{\"delta\":{\"content\":\"late\"}}]}\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"later\"}}]}\n",
        ]);
        assert_eq!(decoder.next_fragment().await.unwrap().unwrap(), "A");
        assert!(decoder.next_fragment().await.is_none());
        assert!(decoder.saw_done());
        assert!(decoder.next_fragment().await.is_none());
    }

    #[tokio::test]
    async fn test_end_of_body_without_done() {
        let mut decoder = stream_of(&[
            "data: {\"choices\":[{\"delta\":{\"content\":\"A\"}}]}\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"B\"}}]}",
        ]);
        assert_eq!(decoder.next_fragment().await.unwrap().unwrap(), "A");
        assert_eq!(decoder.next_fragment().await.unwrap().unwrap(), "B");
        assert!(decoder.next_fragment().await.is_none());
        assert!(!decoder.saw_done());
    }

    #[tokio::test]
    async fn test_fragments_keep_order_within_chunk() {
        let decoder = stream_of(&[
            "data: {\"choices\":[{\"delta\":{\"content\":\"1\"}}]}\ndata: {\"choices\":[{\"delta\":{\"content\":\"2\"}}]}\ndata: {\"choices\":[{\"delta\":{\"content\":\"3\"}}]}\n",
        ]);
        assert_eq!(collect(decoder).await, vec!["1", "2", "3"]);
    }

    #[tokio::test]
    async fn test_read_error_ends_sequence() {
        let items: Vec<Result<Bytes, StreamError>> = vec![
            Ok(Bytes::from_static(
                b"data: {\"choices\":[{\"delta\":{\"content\":\"A\"}}]}\n",
            )),
            Err(StreamError::Read("connection reset".to_string())),
            Ok(Bytes::from_static(
                b"data: {\"choices\":[{\"delta\":{\"content\":\"B\"}}]}\n",
            )),
        ];
        let mut decoder = FragmentStream::new(futures::stream::iter(items).boxed());

        assert_eq!(decoder.next_fragment().await.unwrap().unwrap(), "A");
        assert!(matches!(
            decoder.next_fragment().await,
            Some(Err(StreamError::Read(_)))
        ));
        assert!(decoder.next_fragment().await.is_none());
    }
}
