//! Printing types

use std::fmt;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use chrono::{DateTime, Local};
use kassa_printer::DEFAULT_PORT;
use serde::{Deserialize, Serialize};

/// Address of the active receipt printer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrinterEndpoint {
    pub ip: Ipv4Addr,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl PrinterEndpoint {
    pub fn new(ip: Ipv4Addr, port: u16) -> Self {
        Self { ip, port }
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(self.ip, self.port))
    }
}

impl fmt::Display for PrinterEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.ip, self.port)
    }
}

/// Counters shown by `/` and the status command
///
/// `print_count` moves once per logical print or test page, never per copy.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintStats {
    pub print_count: u64,
    pub last_print_time: Option<DateTime<Local>>,
    pub last_error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_display_and_addr() {
        let endpoint = PrinterEndpoint::new(Ipv4Addr::new(192, 168, 1, 50), 9100);
        assert_eq!(endpoint.to_string(), "192.168.1.50:9100");
        assert_eq!(endpoint.socket_addr().port(), 9100);
    }

    #[test]
    fn test_endpoint_default_port() {
        let endpoint: PrinterEndpoint = serde_json::from_str(r#"{"ip":"10.0.0.7"}"#).unwrap();
        assert_eq!(endpoint.port, 9100);
    }
}
