//! Response serialization
//!
//! Every response carries the CORS headers, `Connection: close` and a byte
//! accurate `Content-Length`.

use http::StatusCode;
use serde_json::Value;

const CORS_HEADERS: &str = "Access-Control-Allow-Origin: *\r\n\
                            Access-Control-Allow-Methods: GET, POST, OPTIONS\r\n\
                            Access-Control-Allow-Headers: Content-Type\r\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: StatusCode,
    /// `None` only for the CORS preflight
    pub content_type: Option<&'static str>,
    pub body: String,
}

impl Response {
    pub fn json(status: StatusCode, body: &Value) -> Self {
        Self {
            status,
            content_type: Some("application/json"),
            body: body.to_string(),
        }
    }

    pub fn html(status: StatusCode, body: String) -> Self {
        Self {
            status,
            content_type: Some("text/html"),
            body,
        }
    }

    /// Empty 200 answering an OPTIONS request
    pub fn preflight() -> Self {
        Self {
            status: StatusCode::OK,
            content_type: None,
            body: String::new(),
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut head = format!(
            "HTTP/1.1 {} {}\r\n",
            self.status.as_u16(),
            self.status.canonical_reason().unwrap_or("Unknown")
        );
        if let Some(content_type) = self.content_type {
            head.push_str(&format!("Content-Type: {}\r\n", content_type));
        }
        head.push_str(&format!("Content-Length: {}\r\n", self.body.len()));
        head.push_str(CORS_HEADERS);
        head.push_str("Connection: close\r\n\r\n");

        let mut bytes = head.into_bytes();
        bytes.extend_from_slice(self.body.as_bytes());
        bytes
    }
}
