//! Printer adapters for sending ESC/POS data
//!
//! Network printers (raw TCP, port 9100). Every job opens a fresh connection;
//! receipt printers serve one client at a time and see little traffic, so
//! nothing is pooled.

use crate::error::{PrintError, PrintResult};
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tracing::{debug, info, instrument, trace, warn};

/// Raw printing port used by virtually every network receipt printer
pub const DEFAULT_PORT: u16 = 9100;

/// Time a print job may take from connect to completed write
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Trait for printer adapters
#[allow(async_fn_in_trait)]
pub trait Printer {
    /// Send raw ESC/POS data to the printer
    async fn print(&self, data: &[u8]) -> PrintResult<()>;

    /// Check if the printer is online/reachable
    async fn is_online(&self) -> bool;
}

/// Network printer (TCP port 9100)
#[derive(Debug, Clone)]
pub struct NetworkPrinter {
    addr: SocketAddr,
    timeout: Duration,
}

impl NetworkPrinter {
    /// Create a new network printer from host and port
    pub fn new(host: &str, port: u16) -> PrintResult<Self> {
        let addr_str = format!("{}:{}", host, port);
        Self::from_addr(&addr_str)
    }

    /// Create from a socket address string (e.g., "192.168.1.100:9100")
    pub fn from_addr(addr: &str) -> PrintResult<Self> {
        let addr: SocketAddr = addr
            .parse()
            .map_err(|_| PrintError::InvalidConfig(format!("Invalid address: {}", addr)))?;

        Ok(Self::from_socket_addr(addr))
    }

    /// Create from an already parsed socket address
    pub fn from_socket_addr(addr: SocketAddr) -> Self {
        Self {
            addr,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set job timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Get the printer address
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get the job timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Printer for NetworkPrinter {
    /// Deliver one job over a new connection.
    ///
    /// The write task and a timer race for the outcome; whichever claims the
    /// [`Resolution`] first decides it. Both tasks are aborted afterwards so
    /// the socket never outlives the call.
    #[instrument(skip(data), fields(addr = %self.addr, data_len = data.len()))]
    async fn print(&self, data: &[u8]) -> PrintResult<()> {
        let (resolution, outcome) = Resolution::new();
        let addr = self.addr;
        let timeout = self.timeout;
        let payload = data.to_vec();

        let writer = {
            let resolution = resolution.clone();
            tokio::spawn(async move {
                match write_job(addr, &payload).await {
                    Ok(mut stream) => {
                        if resolution.resolve(Ok(())) {
                            debug!("Write completed");
                        }
                        let _ = stream.shutdown().await;
                    }
                    Err(e) => {
                        resolution.resolve(Err(e));
                    }
                }
            })
        };

        let timer = {
            let resolution = resolution.clone();
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                resolution.resolve(Err(PrintError::Timeout(format!(
                    "No completion from {} within {:?}",
                    addr, timeout
                ))));
            })
        };

        let result = outcome
            .await
            .unwrap_or_else(|_| Err(PrintError::Aborted(addr.to_string())));

        writer.abort();
        timer.abort();

        match &result {
            Ok(()) => info!("Print job sent successfully"),
            Err(e) => warn!(error = %e, "Print job failed"),
        }
        result
    }

    #[instrument(fields(addr = %self.addr))]
    async fn is_online(&self) -> bool {
        probe(self.addr, Duration::from_millis(500)).await.is_some()
    }
}

/// Connect and write the whole job, returning the still-open stream
async fn write_job(addr: SocketAddr, data: &[u8]) -> PrintResult<TcpStream> {
    debug!("Connecting to printer");

    let mut stream = TcpStream::connect(addr)
        .await
        .map_err(|e| PrintError::Connection(format!("{}: {}", addr, e)))?;

    debug!("Connected, sending {} bytes", data.len());

    stream.write_all(data).await.map_err(|e| {
        PrintError::Io(std::io::Error::new(
            e.kind(),
            format!("Write failed: {}", e),
        ))
    })?;
    stream.flush().await?;

    Ok(stream)
}

/// Check TCP reachability, returning the time it took to connect
///
/// Refusals and timeouts are an ordinary answer here, not an error.
pub async fn probe(addr: SocketAddr, timeout: Duration) -> Option<Duration> {
    let started = Instant::now();
    match tokio::time::timeout(timeout, TcpStream::connect(addr)).await {
        Ok(Ok(_stream)) => Some(started.elapsed()),
        Ok(Err(e)) => {
            trace!(%addr, error = %e, "Probe refused");
            None
        }
        Err(_) => {
            trace!(%addr, "Probe timeout");
            None
        }
    }
}

/// Exactly-once outcome slot shared by racing tasks
///
/// The first caller of [`Resolution::resolve`] wins the compare-and-swap and
/// delivers its value; every later call is ignored.
pub(crate) struct Resolution<T> {
    resolved: AtomicBool,
    tx: Mutex<Option<oneshot::Sender<T>>>,
}

impl<T> Resolution<T> {
    pub(crate) fn new() -> (Arc<Self>, oneshot::Receiver<T>) {
        let (tx, rx) = oneshot::channel();
        let resolution = Arc::new(Self {
            resolved: AtomicBool::new(false),
            tx: Mutex::new(Some(tx)),
        });
        (resolution, rx)
    }

    /// Returns true if this call decided the outcome
    pub(crate) fn resolve(&self, outcome: T) -> bool {
        if self
            .resolved
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        if let Some(tx) = self.tx.lock().take() {
            let _ = tx.send(outcome);
        }
        true
    }

    #[cfg(test)]
    pub(crate) fn is_resolved(&self) -> bool {
        self.resolved.load(Ordering::Acquire)
    }
}
