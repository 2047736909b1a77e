//! Minimal request framing
//!
//! One request per connection. Bytes are accumulated until the peer closes,
//! a read fails, or the header block plus `Content-Length` body bytes are in.

use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::timeout;

/// Upper bound for a buffered request
pub const MAX_REQUEST_BYTES: usize = 1024 * 1024;

/// Maximum silence between two reads
pub const READ_IDLE_TIMEOUT: Duration = Duration::from_secs(5);

const HEADER_END: &[u8] = b"\r\n\r\n";

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("Invalid request")]
    Malformed,

    #[error("Request too large")]
    TooLarge,

    #[error("No data before timeout")]
    Timeout,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A parsed control request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    /// Path without query string
    pub path: String,
    pub body: String,
}

/// Read one request's raw bytes from the connection
///
/// A read error or timeout after some bytes arrived ends the read and the
/// partial buffer is returned; only an empty buffer is an error.
pub async fn read_request<R>(reader: &mut R, idle: Duration) -> Result<Vec<u8>, RequestError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::with_capacity(4096);
    let mut chunk = [0u8; 8192];

    loop {
        match timeout(idle, reader.read(&mut chunk)).await {
            Ok(Ok(0)) => break,
            Ok(Ok(n)) => {
                buf.extend_from_slice(&chunk[..n]);
                if buf.len() > MAX_REQUEST_BYTES {
                    return Err(RequestError::TooLarge);
                }
                if is_complete(&buf) {
                    break;
                }
            }
            Ok(Err(e)) => {
                if buf.is_empty() {
                    return Err(e.into());
                }
                break;
            }
            Err(_) => {
                if buf.is_empty() {
                    return Err(RequestError::Timeout);
                }
                break;
            }
        }
    }

    Ok(buf)
}

/// Header block received and `Content-Length` body bytes after it
fn is_complete(buf: &[u8]) -> bool {
    let Some(header_end) = find(buf, HEADER_END) else {
        return false;
    };
    let body_len = buf.len() - (header_end + HEADER_END.len());
    body_len >= content_length(&buf[..header_end])
}

fn content_length(headers: &[u8]) -> usize {
    String::from_utf8_lossy(headers)
        .split("\r\n")
        .skip(1)
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse().ok())
        .unwrap_or(0)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Parse a buffered request
///
/// Lines are CRLF separated. The first line must carry at least a method and
/// a path; headers are skipped and the body is every line after the first
/// empty one, joined again with CRLF.
pub fn parse(raw: &[u8]) -> Result<Request, RequestError> {
    let text = std::str::from_utf8(raw).map_err(|_| RequestError::Malformed)?;
    let lines: Vec<&str> = text.split("\r\n").collect();

    let request_line = lines.first().ok_or(RequestError::Malformed)?;
    let mut parts = request_line.split_whitespace();
    let (Some(method), Some(target)) = (parts.next(), parts.next()) else {
        return Err(RequestError::Malformed);
    };

    let path = target.split('?').next().unwrap_or(target);

    let body = lines
        .iter()
        .position(|line| line.is_empty())
        .map(|blank| lines[blank + 1..].join("\r\n"))
        .unwrap_or_default();

    Ok(Request {
        method: method.to_string(),
        path: path.to_string(),
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_get() {
        let req = parse(b"GET /status HTTP/1.1\r\nHost: localhost\r\n\r\n").unwrap();
        assert_eq!(req.method, "GET");
        assert_eq!(req.path, "/status");
        assert_eq!(req.body, "");
    }

    #[test]
    fn test_parse_body_rejoined() {
        let raw = b"POST /print HTTP/1.1\r\nContent-Type: application/json\r\n\r\n{\"a\":\r\n1}";
        let req = parse(raw).unwrap();
        assert_eq!(req.method, "POST");
        assert_eq!(req.body, "{\"a\":\r\n1}");
    }

    #[test]
    fn test_parse_strips_query() {
        let req = parse(b"GET /status?ts=123 HTTP/1.1\r\n\r\n").unwrap();
        assert_eq!(req.path, "/status");
    }

    #[test]
    fn test_parse_without_version() {
        let req = parse(b"GET /").unwrap();
        assert_eq!(req.path, "/");
    }

    #[test]
    fn test_parse_rejects_short_request_line() {
        assert!(matches!(parse(b"GET\r\n\r\n"), Err(RequestError::Malformed)));
        assert!(matches!(parse(b""), Err(RequestError::Malformed)));
        assert!(matches!(parse(&[0xFF, 0xFE]), Err(RequestError::Malformed)));
    }

    #[test]
    fn test_is_complete() {
        assert!(!is_complete(b"GET / HTTP/1.1\r\nHost: x\r\n"));
        assert!(is_complete(b"GET / HTTP/1.1\r\nHost: x\r\n\r\n"));
        assert!(!is_complete(b"POST /print HTTP/1.1\r\ncontent-length: 4\r\n\r\n{}"));
        assert!(is_complete(b"POST /print HTTP/1.1\r\nContent-Length: 2\r\n\r\n{}"));
    }

    #[tokio::test]
    async fn test_read_request_stops_at_content_length() {
        let (mut client, mut server) = tokio::io::duplex(64);
        let writer = tokio::spawn(async move {
            use tokio::io::AsyncWriteExt;
            client
                .write_all(b"POST /test HTTP/1.1\r\nContent-Length: 2\r\n\r\n")
                .await
                .unwrap();
            client.write_all(b"{}").await.unwrap();
            // Keep the connection open; the reader must not wait for EOF
            tokio::time::sleep(Duration::from_secs(10)).await;
            drop(client);
        });

        let raw = read_request(&mut server, Duration::from_secs(2)).await.unwrap();
        assert!(raw.ends_with(b"\r\n\r\n{}"));
        writer.abort();
    }

    #[tokio::test]
    async fn test_read_request_until_eof() {
        let (mut client, mut server) = tokio::io::duplex(64);
        tokio::spawn(async move {
            use tokio::io::AsyncWriteExt;
            client.write_all(b"GET /status HTTP/1.1\r\n").await.unwrap();
        });

        let raw = read_request(&mut server, Duration::from_secs(2)).await.unwrap();
        assert_eq!(raw, b"GET /status HTTP/1.1\r\n");
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_request_idle_timeout() {
        let (_client, mut server) = tokio::io::duplex(64);
        let result = read_request(&mut server, Duration::from_millis(100)).await;
        assert!(matches!(result, Err(RequestError::Timeout)));
    }
}
