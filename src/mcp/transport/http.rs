use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{StatusCode, Url};
use serde::Serialize;
use serde_json::Value;

use super::{classify, reply_to, Incoming, Transport};
use crate::error::{RelayError, Result};
use crate::mcp::types::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};

const SESSION_HEADER: &str = "mcp-session-id";
const PROTOCOL_HEADER: &str = "mcp-protocol-version";
const ACCEPT_BOTH: &str = "application/json, text/event-stream";

/// Streamable HTTP: every message is a POST, answered with JSON or an event stream.
pub struct HttpTransport {
    http: reqwest::Client,
    url: Url,
    session_id: Option<String>,
    protocol_version: Option<String>,
}

impl HttpTransport {
    pub fn new(url: Url) -> Result<Self> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            http,
            url,
            session_id: None,
            protocol_version: None,
        })
    }

    async fn post<M: Serialize + ?Sized>(&mut self, message: &M) -> Result<reqwest::Response> {
        let mut request = self
            .http
            .post(self.url.clone())
            .header(ACCEPT, ACCEPT_BOTH)
            .json(message);
        if let Some(session) = &self.session_id {
            request = request.header(SESSION_HEADER, session);
        }
        if let Some(version) = &self.protocol_version {
            request = request.header(PROTOCOL_HEADER, version);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RelayError::Transport(format!(
                "server returned HTTP {}: {}",
                status, body
            )));
        }

        if let Some(session) = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
        {
            if self.session_id.as_deref() != Some(session) {
                tracing::debug!("server assigned session {}", session);
                self.session_id = Some(session.to_string());
            }
        }

        Ok(response)
    }

    async fn read_event_stream(
        &mut self,
        response: reqwest::Response,
        request: &JsonRpcRequest,
    ) -> Result<JsonRpcResponse> {
        let mut stream = response.bytes_stream();
        let mut parser = SseParser::default();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            for data in parser.push(&chunk) {
                if let Some(response) = self.handle_event(&data, request.id).await? {
                    return Ok(response);
                }
            }
        }
        if let Some(data) = parser.finish() {
            if let Some(response) = self.handle_event(&data, request.id).await? {
                return Ok(response);
            }
        }

        Err(RelayError::Transport(format!(
            "event stream ended before '{}' was answered",
            request.method
        )))
    }

    /// Handle one event, returning the response to request `id` if this is it.
    async fn handle_event(&mut self, data: &str, id: u64) -> Result<Option<JsonRpcResponse>> {
        // Priming events carry an id but no data.
        let data = data.trim();
        if data.is_empty() {
            return Ok(None);
        }
        let value: Value = match serde_json::from_str(data) {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!("ignoring non-JSON event from server: {}", data);
                return Ok(None);
            }
        };

        match classify(value)? {
            Incoming::Response(response) if response.has_id(id) => Ok(Some(response)),
            Incoming::Response(response) => {
                tracing::debug!(id = ?response.id, "skipping response for another request");
                Ok(None)
            }
            Incoming::ServerMessage { method, id: server_id } => {
                match reply_to(&method, server_id) {
                    Some(reply) => {
                        tracing::debug!(%method, "answering server request");
                        self.post(&reply).await?;
                    }
                    None => tracing::debug!(%method, "skipping server notification"),
                }
                Ok(None)
            }
        }
    }
}

fn is_event_stream(response: &reqwest::Response) -> bool {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("text/event-stream"))
        .unwrap_or(false)
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(&mut self, request: &JsonRpcRequest) -> Result<JsonRpcResponse> {
        let response = self.post(request).await?;

        if is_event_stream(&response) {
            return self.read_event_stream(response, request).await;
        }

        let value: Value = response.json().await?;
        match classify(value)? {
            Incoming::Response(response) if response.has_id(request.id) => Ok(response),
            Incoming::Response(response) => Err(RelayError::Protocol(format!(
                "expected response to request {}, got id {:?}",
                request.id, response.id
            ))),
            Incoming::ServerMessage { method, .. } => Err(RelayError::Protocol(format!(
                "expected response to request {}, got '{}' message",
                request.id, method
            ))),
        }
    }

    async fn notify(&mut self, notification: &JsonRpcNotification) -> Result<()> {
        let response = self.post(notification).await?;
        if response.status() != StatusCode::ACCEPTED {
            tracing::debug!(status = %response.status(), "notification answered with a body");
        }
        Ok(())
    }

    fn set_protocol_version(&mut self, version: &str) {
        self.protocol_version = Some(version.to_string());
    }

    async fn close(&mut self) -> Result<()> {
        let Some(session) = self.session_id.take() else {
            return Ok(());
        };

        let response = self
            .http
            .delete(self.url.clone())
            .header(SESSION_HEADER, &session)
            .send()
            .await?;

        // 405 means the server does not let clients end sessions.
        let status = response.status();
        if !status.is_success() && status != StatusCode::METHOD_NOT_ALLOWED {
            return Err(RelayError::Transport(format!(
                "failed to end session {}: HTTP {}",
                session, status
            )));
        }
        Ok(())
    }
}

/// Incremental parser for `text/event-stream` bodies, yielding the data of each event.
#[derive(Default)]
pub(crate) struct SseParser {
    buffer: Vec<u8>,
    data: Vec<String>,
}

impl SseParser {
    pub(crate) fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();

        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\n', '\r']);
            if let Some(event) = self.handle_line(line) {
                events.push(event);
            }
        }

        events
    }

    /// Flush whatever the stream left unterminated.
    pub(crate) fn finish(&mut self) -> Option<String> {
        if !self.buffer.is_empty() {
            let raw = std::mem::take(&mut self.buffer);
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\n', '\r']).to_string();
            if let Some(event) = self.handle_line(&line) {
                return Some(event);
            }
        }
        self.dispatch()
    }

    fn handle_line(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.find(':') {
            Some(pos) => {
                let value = &line[pos + 1..];
                (&line[..pos], value.strip_prefix(' ').unwrap_or(value))
            }
            None => (line, ""),
        };

        if field == "data" {
            self.data.push(value.to_string());
        }
        None
    }

    fn dispatch(&mut self) -> Option<String> {
        if self.data.is_empty() {
            return None;
        }
        let event = self.data.join("\n");
        self.data.clear();
        Some(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_event() {
        let mut parser = SseParser::default();
        let events = parser.push(b"event: message\ndata: {\"a\":1}\n\n");
        assert_eq!(events, vec!["{\"a\":1}".to_string()]);
    }

    #[test]
    fn test_event_split_across_chunks() {
        let mut parser = SseParser::default();
        assert!(parser.push(b"data: {\"jsonrpc\":").is_empty());
        assert!(parser.push(b"\"2.0\"}\r\n").is_empty());
        let events = parser.push(b"\r\n");
        assert_eq!(events, vec!["{\"jsonrpc\":\"2.0\"}".to_string()]);
    }

    #[test]
    fn test_multiline_data_and_comments() {
        let mut parser = SseParser::default();
        let events = parser.push(b": keep-alive\ndata: first\ndata: second\n\ndata: third\n\n");
        assert_eq!(
            events,
            vec!["first\nsecond".to_string(), "third".to_string()]
        );
    }

    #[test]
    fn test_finish_flushes_unterminated_event() {
        let mut parser = SseParser::default();
        assert!(parser.push(b"data: tail").is_empty());
        assert_eq!(parser.finish(), Some("tail".to_string()));
        assert_eq!(parser.finish(), None);
    }

    #[test]
    fn test_multibyte_split() {
        let mut parser = SseParser::default();
        let bytes = "data: caf\u{e9}\n\n".as_bytes();
        let (a, b) = bytes.split_at(10);
        assert!(parser.push(a).is_empty());
        assert_eq!(parser.push(b), vec!["caf\u{e9}".to_string()]);
    }
}
