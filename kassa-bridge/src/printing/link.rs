//! Delivery seam between the print service and the wire

use std::time::Duration;

use async_trait::async_trait;
use kassa_printer::{NetworkPrinter, PrintResult, Printer};

use super::types::PrinterEndpoint;

/// Sends one finished job to a printer
#[async_trait]
pub trait PrinterLink: Send + Sync {
    async fn deliver(&self, endpoint: &PrinterEndpoint, data: &[u8]) -> PrintResult<()>;
}

/// Raw TCP delivery, one connection per job
#[derive(Debug, Clone)]
pub struct TcpLink {
    timeout: Duration,
}

impl TcpLink {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for TcpLink {
    fn default() -> Self {
        Self::new(kassa_printer::DEFAULT_TIMEOUT)
    }
}

#[async_trait]
impl PrinterLink for TcpLink {
    async fn deliver(&self, endpoint: &PrinterEndpoint, data: &[u8]) -> PrintResult<()> {
        NetworkPrinter::from_socket_addr(endpoint.socket_addr())
            .with_timeout(self.timeout)
            .print(data)
            .await
    }
}
