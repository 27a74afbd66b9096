//! Transport layer for MCP JSON-RPC communication.
//!
//! MCP uses newline-delimited JSON over stdin/stdout. Nothing else may be
//! written to stdout while the server runs.

use std::io;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::protocol::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};

/// Message that can be received from the client.
#[derive(Debug)]
pub enum IncomingMessage {
    Request(JsonRpcRequest),
    Notification(JsonRpcNotification),
}

/// Transport for reading/writing JSON-RPC messages.
pub struct StdioTransport<R, W> {
    reader: R,
    writer: W,
}

impl StdioTransport<BufReader<tokio::io::Stdin>, tokio::io::Stdout> {
    /// Create a transport using stdin/stdout.
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl<R, W> StdioTransport<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Create a transport with custom reader/writer.
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    /// Read the next JSON-RPC message, skipping blank lines.
    ///
    /// Returns `Ok(None)` on EOF.
    pub async fn read_message(&mut self) -> io::Result<Option<IncomingMessage>> {
        let mut line = String::new();

        loop {
            line.clear();
            if self.reader.read_line(&mut line).await? == 0 {
                return Ok(None);
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            tracing::debug!("Received: {}", trimmed);
            return parse_message(trimmed).map(Some);
        }
    }

    /// Write a JSON-RPC response to the transport.
    pub async fn write_response(&mut self, response: &JsonRpcResponse) -> io::Result<()> {
        let json = serde_json::to_string(response).map_err(|e| {
            io::Error::new(io::ErrorKind::InvalidData, format!("Serialization error: {}", e))
        })?;

        tracing::debug!("Sending: {}", json);

        self.writer.write_all(json.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await
    }

    /// Consume the transport, returning the writer.
    pub fn into_writer(self) -> W {
        self.writer
    }
}

fn parse_message(line: &str) -> io::Result<IncomingMessage> {
    // Requests carry an id; notifications do not.
    if let Ok(request) = serde_json::from_str::<JsonRpcRequest>(line) {
        return Ok(IncomingMessage::Request(request));
    }

    if let Ok(notification) = serde_json::from_str::<JsonRpcNotification>(line) {
        return Ok(IncomingMessage::Notification(notification));
    }

    tracing::warn!("Failed to parse message: {}", line);
    Err(io::Error::new(
        io::ErrorKind::InvalidData,
        format!("Invalid JSON-RPC message: {}", line),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::RequestId;

    fn transport(input: &str) -> StdioTransport<&[u8], Vec<u8>> {
        StdioTransport::new(input.as_bytes(), Vec::new())
    }

    #[tokio::test]
    async fn test_read_request() {
        let mut transport = transport("{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"tools/list\"}\n");

        match transport.read_message().await.unwrap() {
            Some(IncomingMessage::Request(req)) => {
                assert_eq!(req.method, "tools/list");
                assert_eq!(req.id, RequestId::Number(1));
            }
            other => panic!("Expected request, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_read_notification() {
        let mut transport =
            transport("{\"jsonrpc\":\"2.0\",\"method\":\"notifications/initialized\"}\n");

        match transport.read_message().await.unwrap() {
            Some(IncomingMessage::Notification(notif)) => {
                assert_eq!(notif.method, "notifications/initialized");
            }
            other => panic!("Expected notification, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_skips_blank_lines() {
        let mut transport = transport("\n   \n{\"jsonrpc\":\"2.0\",\"id\":\"x\",\"method\":\"ping\"}\n");

        let msg = transport.read_message().await.unwrap();
        assert!(matches!(msg, Some(IncomingMessage::Request(_))));
        assert!(transport.read_message().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_invalid_message() {
        let mut transport = transport("{not json}\n");

        let err = transport.read_message().await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[tokio::test]
    async fn test_write_response() {
        let mut transport = transport("");

        let response =
            JsonRpcResponse::success(RequestId::Number(1), serde_json::json!({"ok": true}));
        transport.write_response(&response).await.unwrap();

        let output = String::from_utf8(transport.into_writer()).unwrap();
        assert_eq!(output, "{\"jsonrpc\":\"2.0\",\"id\":1,\"result\":{\"ok\":true}}\n");
    }

    #[tokio::test]
    async fn test_read_eof() {
        let mut transport = transport("");
        assert!(transport.read_message().await.unwrap().is_none());
    }
}
