// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use std::time::Duration;

use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::Client;

use crate::error::{ApiError, EchoError};
use crate::llm::message::{Message, Role};

/// Request timeout used when a provider is built without settings.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Build an HTTP client with an overall request timeout.
pub(crate) fn http_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!("Falling back to default HTTP client: {}", e);
            Client::new()
        })
}

/// Parse numeric Retry-After header (seconds).
pub(crate) fn parse_retry_after_seconds(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok())
}

/// Construct a standardized server error.
pub(crate) fn server_error(status: u16, message: impl Into<String>) -> EchoError {
    EchoError::Api(ApiError::ServerError {
        status,
        message: message.into(),
    })
}

/// Map an HTTP status without a parseable vendor body to an error.
pub(crate) fn status_error(status: u16, body: &str, retry_after: Option<u64>) -> EchoError {
    match status {
        401 | 403 => EchoError::Api(ApiError::AuthenticationFailed),
        429 => EchoError::Api(ApiError::RateLimited(retry_after.unwrap_or(10) as u32)),
        _ => server_error(status, body),
    }
}

/// Shape history for vendors that require a user-first, alternating
/// conversation: leading assistant turns are dropped and consecutive turns
/// from the same role are joined with a newline. Blank messages are skipped.
pub(crate) fn coalesce_turns(messages: &[Message]) -> Vec<(Role, String)> {
    let mut turns: Vec<(Role, String)> = Vec::new();

    for message in messages.iter().filter(|m| m.has_content()) {
        if turns.is_empty() && message.role == Role::Assistant {
            continue;
        }
        match turns.last_mut() {
            Some((role, text)) if *role == message.role => {
                text.push('\n');
                text.push_str(&message.content);
            }
            _ => turns.push((message.role, message.content.clone())),
        }
    }

    turns
}

/// Incremental decoder for a `text/event-stream` body.
///
/// Raw bytes are held until a whole line has arrived, so a multi-byte
/// character split across network chunks is decoded intact.
#[derive(Debug, Default)]
pub(crate) struct SseDecoder {
    pending: Vec<u8>,
    event: Vec<String>,
}

impl SseDecoder {
    /// Complete lines available after appending `chunk`, without line endings
    fn lines(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);
        let Some(last) = self.pending.iter().rposition(|&b| b == b'\n') else {
            return Vec::new();
        };
        let complete: Vec<u8> = self.pending.drain(..=last).collect();
        complete[..last]
            .split(|&b| b == b'\n')
            .map(|line| {
                let line = line.strip_suffix(b"\r").unwrap_or(line);
                String::from_utf8_lossy(line).into_owned()
            })
            .collect()
    }

    /// `data:` payloads of the complete lines. Comments, `event:` lines and
    /// empty payloads are skipped.
    pub(crate) fn data(&mut self, chunk: &[u8]) -> Vec<String> {
        self.lines(chunk)
            .into_iter()
            .filter_map(|line| {
                line.trim()
                    .strip_prefix("data:")
                    .map(|data| data.trim().to_string())
            })
            .filter(|data| !data.is_empty())
            .collect()
    }

    /// Whole events (the lines before a blank line), joined with `\n`
    pub(crate) fn events(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut events = Vec::new();
        for line in self.lines(chunk) {
            if !line.trim().is_empty() {
                self.event.push(line);
            } else if !self.event.is_empty() {
                events.push(self.event.join("\n"));
                self.event.clear();
            }
        }
        events
    }
}

/// Loopback server for streaming tests that need control over how the body
/// is split into chunks, which wiremock does not offer.
#[cfg(test)]
pub(crate) mod chunked_server {
    use std::time::Duration;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    /// Split `body` one byte into the first occurrence of `ch`, so the
    /// character's encoding straddles the two chunks.
    pub(crate) fn split_inside(body: &str, ch: char) -> Vec<Vec<u8>> {
        let at = body.find(ch).expect("character present") + 1;
        vec![body.as_bytes()[..at].to_vec(), body.as_bytes()[at..].to_vec()]
    }

    /// Answer one request with a chunked `text/event-stream` body sent as
    /// `chunks`, pausing between them. Returns the base URL.
    pub(crate) async fn serve(chunks: Vec<Vec<u8>>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            read_request(&mut socket).await;

            socket
                .write_all(
                    b"HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\n\
                      transfer-encoding: chunked\r\nconnection: close\r\n\r\n",
                )
                .await
                .unwrap();
            for chunk in chunks {
                socket
                    .write_all(format!("{:x}\r\n", chunk.len()).as_bytes())
                    .await
                    .unwrap();
                socket.write_all(&chunk).await.unwrap();
                socket.write_all(b"\r\n").await.unwrap();
                socket.flush().await.unwrap();
                tokio::time::sleep(Duration::from_millis(30)).await;
            }
            socket.write_all(b"0\r\n\r\n").await.unwrap();
            socket.flush().await.unwrap();
        });

        format!("http://{}", addr)
    }

    async fn read_request(socket: &mut TcpStream) {
        let mut data = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                return;
            }
            data.extend_from_slice(&buf[..n]);
            let Some(head_end) = data.windows(4).position(|w| w == b"\r\n\r\n") else {
                continue;
            };
            let head = String::from_utf8_lossy(&data[..head_end]).to_ascii_lowercase();
            let length = head
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|value| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if data.len() >= head_end + 4 + length {
                return;
            }
        }
    }
}
