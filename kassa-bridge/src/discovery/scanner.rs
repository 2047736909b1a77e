//! Subnet scanner
//!
//! Probes `.1`-`.254` of the local /24 on the printer port in bounded
//! batches. Reachability on that port is the only signal; any other service
//! listening there is reported as a printer too.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use kassa_printer::{DEFAULT_PORT, probe};
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, info, trace, warn};

/// Host addresses probed per scan
pub const SUBNET_HOSTS: usize = 254;

/// Scanner settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    /// Candidate interface names, first with an IPv4 address wins
    pub interfaces: Vec<String>,
    /// First three octets; skips interface detection when set
    pub subnet: Option<[u8; 3]>,
    pub port: u16,
    pub batch_size: usize,
    pub probe_timeout: Duration,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            interfaces: ["en0", "en1", "eth0", "wlan0"]
                .into_iter()
                .map(String::from)
                .collect(),
            subnet: None,
            port: DEFAULT_PORT,
            batch_size: 20,
            probe_timeout: Duration::from_secs(1),
        }
    }
}

/// A host that accepted a connection on the probed port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredPrinter {
    pub ip: Ipv4Addr,
    pub port: u16,
    /// Time to connect
    pub latency: Duration,
}

/// Discovery scanner
///
/// Idle until [`start_scan`](Self::start_scan) or [`scan`](Self::scan) claims
/// it; at most one scan runs at a time.
pub struct NetworkScanner {
    config: ScanConfig,
    scanning: AtomicBool,
    cancel: AtomicBool,
    found: Mutex<Vec<DiscoveredPrinter>>,
    progress: watch::Sender<f64>,
}

impl NetworkScanner {
    pub fn new(config: ScanConfig) -> Self {
        let (progress, _) = watch::channel(0.0);
        Self {
            config,
            scanning: AtomicBool::new(false),
            cancel: AtomicBool::new(false),
            found: Mutex::new(Vec::new()),
            progress,
        }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Start a scan in the background
    ///
    /// Returns false without side effects when a scan is already running.
    pub fn start_scan(self: &Arc<Self>) -> bool {
        if !self.claim() {
            return false;
        }

        let scanner = Arc::clone(self);
        tokio::spawn(async move {
            scanner.run().await;
        });
        true
    }

    /// Run a scan to completion on the current task
    ///
    /// `None` when another scan is already running.
    pub async fn scan(&self) -> Option<Vec<DiscoveredPrinter>> {
        if !self.claim() {
            return None;
        }
        Some(self.run().await)
    }

    /// Stop issuing batches; probes already in flight still finish
    pub fn stop_scan(&self) {
        if self.is_scanning() {
            debug!("Scan cancellation requested");
        }
        self.cancel.store(true, Ordering::Release);
    }

    pub fn is_scanning(&self) -> bool {
        self.scanning.load(Ordering::Acquire)
    }

    /// Fraction of hosts probed, 0.0 to 1.0
    pub fn progress(&self) -> f64 {
        *self.progress.borrow()
    }

    pub fn subscribe_progress(&self) -> watch::Receiver<f64> {
        self.progress.subscribe()
    }

    /// Printers found by the current or last scan
    pub fn found_printers(&self) -> Vec<DiscoveredPrinter> {
        self.found.lock().clone()
    }

    fn claim(&self) -> bool {
        if self
            .scanning
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Scan already running");
            return false;
        }

        self.cancel.store(false, Ordering::Release);
        self.found.lock().clear();
        self.progress.send_replace(0.0);
        true
    }

    async fn run(&self) -> Vec<DiscoveredPrinter> {
        match self.resolve_subnet() {
            Some(subnet) => self.scan_subnet(subnet).await,
            None => warn!(
                interfaces = ?self.config.interfaces,
                "No IPv4 address on candidate interfaces, scan skipped"
            ),
        }

        self.scanning.store(false, Ordering::Release);
        self.found_printers()
    }

    fn resolve_subnet(&self) -> Option<[u8; 3]> {
        self.config.subnet.or_else(|| {
            local_ipv4(&self.config.interfaces).map(|ip| {
                let [a, b, c, _] = ip.octets();
                [a, b, c]
            })
        })
    }

    async fn scan_subnet(&self, subnet: [u8; 3]) {
        let [a, b, c] = subnet;
        let port = self.config.port;
        let probe_timeout = self.config.probe_timeout;
        info!(subnet = %format!("{a}.{b}.{c}.0/24"), port, "Scanning for printers");

        let hosts: Vec<Ipv4Addr> = (1..=SUBNET_HOSTS as u8)
            .map(|host| Ipv4Addr::new(a, b, c, host))
            .collect();
        let mut completed = 0usize;

        for batch in hosts.chunks(self.config.batch_size.max(1)) {
            if self.cancel.load(Ordering::Acquire) {
                info!(completed, "Scan cancelled");
                return;
            }

            let mut probes = JoinSet::new();
            for &ip in batch {
                probes.spawn(async move {
                    let latency = probe(SocketAddr::from((ip, port)), probe_timeout).await;
                    (ip, latency)
                });
            }

            while let Some(joined) = probes.join_next().await {
                completed += 1;
                match joined {
                    Ok((ip, Some(latency))) => self.record(DiscoveredPrinter { ip, port, latency }),
                    Ok((ip, None)) => trace!(%ip, "No answer"),
                    Err(e) => trace!(error = %e, "Probe task failed"),
                }
                self.progress.send_replace(completed as f64 / SUBNET_HOSTS as f64);
            }
        }

        self.progress.send_replace(1.0);
        info!(found = self.found.lock().len(), "Scan complete");
    }

    fn record(&self, printer: DiscoveredPrinter) {
        let mut found = self.found.lock();
        if found.iter().any(|known| known.ip == printer.ip) {
            return;
        }
        info!(
            ip = %printer.ip,
            port = printer.port,
            latency_ms = printer.latency.as_millis() as u64,
            "Printer found"
        );
        found.push(printer);
    }
}

/// IPv4 address of the first candidate interface that has one
pub fn local_ipv4(candidates: &[String]) -> Option<Ipv4Addr> {
    let interfaces = match local_ip_address::list_afinet_netifas() {
        Ok(interfaces) => interfaces,
        Err(e) => {
            warn!(error = %e, "Failed to list network interfaces");
            return None;
        }
    };

    candidates.iter().find_map(|name| {
        interfaces.iter().find_map(|(iface, addr)| match addr {
            IpAddr::V4(v4) if iface == name => Some(*v4),
            _ => None,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    fn loopback_config(port: u16) -> ScanConfig {
        ScanConfig {
            interfaces: Vec::new(),
            subnet: Some([127, 0, 0]),
            port,
            batch_size: 20,
            probe_timeout: Duration::from_millis(500),
        }
    }

    #[test]
    fn test_default_config() {
        let config = ScanConfig::default();
        assert_eq!(config.interfaces, vec!["en0", "en1", "eth0", "wlan0"]);
        assert_eq!(config.port, 9100);
        assert_eq!(config.batch_size, 20);
        assert_eq!(config.probe_timeout, Duration::from_secs(1));
    }

    #[test]
    fn test_local_ipv4_unknown_interface() {
        assert_eq!(local_ipv4(&["no-such-iface0".to_string()]), None);
        assert_eq!(local_ipv4(&[]), None);
    }

    #[tokio::test]
    async fn test_single_listener_found_once() {
        let listener = TcpListener::bind("127.0.0.50:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                drop(socket);
            }
        });

        let scanner = NetworkScanner::new(loopback_config(port));
        let found = scanner.scan().await.unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].ip, Ipv4Addr::new(127, 0, 0, 50));
        assert_eq!(found[0].port, port);
        assert_eq!(scanner.progress(), 1.0);
        assert!(!scanner.is_scanning());
    }

    #[tokio::test]
    async fn test_no_interface_ends_empty() {
        let scanner = NetworkScanner::new(ScanConfig {
            interfaces: vec!["no-such-iface0".to_string()],
            ..ScanConfig::default()
        });

        let found = scanner.scan().await.unwrap();
        assert!(found.is_empty());
        assert_eq!(scanner.progress(), 0.0);
        assert!(!scanner.is_scanning());
    }

    #[tokio::test]
    async fn test_second_start_is_rejected() {
        let scanner = Arc::new(NetworkScanner::new(loopback_config(1)));

        assert!(scanner.start_scan());
        assert!(!scanner.start_scan());
        assert!(scanner.scan().await.is_none());

        scanner.stop_scan();
        while scanner.is_scanning() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(scanner.start_scan());
    }

    #[tokio::test]
    async fn test_cancel_stops_between_batches() {
        let scanner = Arc::new(NetworkScanner::new(loopback_config(1)));
        let mut progress = scanner.subscribe_progress();

        assert!(scanner.start_scan());
        progress.wait_for(|p| *p > 0.0).await.unwrap();
        scanner.stop_scan();

        while scanner.is_scanning() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let stopped_at = scanner.progress();
        let completed = (stopped_at * SUBNET_HOSTS as f64).round() as usize;
        assert!(stopped_at < 1.0);
        assert!(completed > 0);
        assert_eq!(completed % 20, 0);
    }

    #[tokio::test]
    async fn test_progress_is_monotonic() {
        let scanner = Arc::new(NetworkScanner::new(loopback_config(1)));
        let mut progress = scanner.subscribe_progress();

        assert!(scanner.start_scan());

        let mut last = 0.0;
        while progress.changed().await.is_ok() {
            let value = *progress.borrow_and_update();
            assert!(value >= last, "{value} < {last}");
            last = value;
            if value >= 1.0 {
                break;
            }
        }
        assert_eq!(last, 1.0);
    }
}
