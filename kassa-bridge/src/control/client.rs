//! Client side of the control protocol
//!
//! Lets the CLI drive a bridge that is already serving instead of opening
//! the settings database a second time.

use std::io::ErrorKind;
use std::time::Duration;

use http::StatusCode;
use serde_json::Value;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Covers the longest command, a receipt with its copy delay
const DEFAULT_CLIENT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("No control server listening on {0}")]
    Unreachable(String),

    #[error("Control server did not answer in time")]
    Timeout,

    #[error("Malformed response from control server")]
    Malformed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Decoded response of the control server
#[derive(Debug, Clone, PartialEq)]
pub struct ClientReply {
    pub status: StatusCode,
    pub body: Value,
}

impl ClientReply {
    pub fn is_success(&self) -> bool {
        self.status == StatusCode::OK
    }

    /// The `error` field of a failure body, if any
    pub fn error(&self) -> Option<&str> {
        self.body.get("error").and_then(Value::as_str)
    }
}

#[derive(Debug, Clone)]
pub struct ControlClient {
    addr: String,
    timeout: Duration,
}

impl ControlClient {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            timeout: DEFAULT_CLIENT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub async fn get(&self, path: &str) -> Result<ClientReply, ClientError> {
        self.request("GET", path, "").await
    }

    pub async fn post(&self, path: &str, body: &str) -> Result<ClientReply, ClientError> {
        self.request("POST", path, body).await
    }

    /// One request per connection, like the server expects
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: &str,
    ) -> Result<ClientReply, ClientError> {
        let mut stream = match timeout(self.timeout, TcpStream::connect(&self.addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e))
                if matches!(
                    e.kind(),
                    ErrorKind::ConnectionRefused | ErrorKind::AddrNotAvailable
                ) =>
            {
                return Err(ClientError::Unreachable(self.addr.clone()));
            }
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => return Err(ClientError::Timeout),
        };

        let raw = format!(
            "{method} {path} HTTP/1.1\r\nHost: {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{body}",
            self.addr,
            body.len()
        );
        stream.write_all(raw.as_bytes()).await?;

        let mut response = Vec::new();
        timeout(self.timeout, stream.read_to_end(&mut response))
            .await
            .map_err(|_| ClientError::Timeout)??;

        parse_reply(&response)
    }
}

fn parse_reply(raw: &[u8]) -> Result<ClientReply, ClientError> {
    let text = std::str::from_utf8(raw).map_err(|_| ClientError::Malformed)?;
    let (head, body) = text.split_once("\r\n\r\n").ok_or(ClientError::Malformed)?;

    let status = head
        .split_whitespace()
        .nth(1)
        .and_then(|code| code.parse::<u16>().ok())
        .and_then(|code| StatusCode::from_u16(code).ok())
        .ok_or(ClientError::Malformed)?;
    let body = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(body).map_err(|_| ClientError::Malformed)?
    };

    Ok(ClientReply { status, body })
}
